use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use procwarden_process::{
    exists, run_to_completion, CommandLine, ManagedProcess, ProcessOptions,
};
use tracing_subscriber::EnvFilter;

/// Procwarden process runner
#[derive(Parser)]
#[command(name = "procwarden")]
#[command(about = "Run external programs and reap them reliably")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command to completion and print its output
    Run {
        /// Working directory for the command
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Pass the command to the platform shell
        #[arg(long)]
        shell: bool,

        /// Command and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Check whether a program is on the search path
    Exists {
        /// Program name
        program: String,
    },
    /// Exercise spawning, capture, lookup and interruption
    SelfTest,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            cwd,
            shell,
            command,
        } => run(cwd, shell, command),
        Commands::Exists { program } => {
            let found = exists(&program)
                .with_context(|| format!("Failed to look up '{}'", program))?;
            println!("{}", found);
            Ok(if found {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::SelfTest => self_test(),
    }
}

fn run(cwd: Option<PathBuf>, shell: bool, command: Vec<String>) -> Result<ExitCode> {
    let command = if shell {
        CommandLine::shell(command.join(" "))
    } else {
        CommandLine::Argv(command)
    };

    let mut options = ProcessOptions::new();
    if let Some(dir) = cwd {
        options = options.working_dir(dir);
    }

    let mut process = ManagedProcess::spawn(command, options)?;
    let output = process.output()?.clone();
    let code = process.wait()?;

    std::io::stdout().write_all(&output.stdout)?;
    std::io::stderr().write_all(&output.stderr)?;
    tracing::info!(exit_code = code, seconds = process.running_secs(), "Command finished");

    Ok(match u8::try_from(code) {
        Ok(code) => ExitCode::from(code),
        Err(_) => ExitCode::FAILURE,
    })
}

fn self_test() -> Result<ExitCode> {
    let mut ls = ManagedProcess::spawn("ls", ProcessOptions::new())?;
    print!("{}", ls.output()?.stdout_lossy());
    eprint!("{}", ls.output()?.stderr_lossy());
    ls.interrupt()?;

    let listing = run_to_completion(["ls", "-lah"], None)?;
    print!("{}{}", listing.stdout_lossy(), listing.stderr_lossy());

    println!("\n---------------------\n");

    let head = run_to_completion(CommandLine::shell("ls -l | head -2"), None)?;
    print!("{}{}", head.stdout_lossy(), head.stderr_lossy());

    println!("\"reaver\" exists: {}", exists("reaver")?);

    // Never-ending process; the handle going out of scope stops it
    let mut yes = ManagedProcess::spawn("yes", ProcessOptions::new().discard_output(true))?;
    println!("\"yes\" running: {}", yes.is_running());
    drop(yes);

    Ok(ExitCode::SUCCESS)
}
