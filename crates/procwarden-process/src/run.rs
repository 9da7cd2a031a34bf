//! One-shot helpers built on [`ManagedProcess`]

use std::path::Path;

use tracing::{debug, warn};

use crate::{
    child::ManagedProcess,
    command::CommandLine,
    config::ProcessOptions,
    error::Result,
    output::CapturedOutput,
};

/// Program used to locate executables on the search path
#[cfg(unix)]
const LOOKUP_PROGRAM: &str = "which";
#[cfg(windows)]
const LOOKUP_PROGRAM: &str = "where";

/// Run `command` to completion and return its captured output
///
/// # Examples
/// ```no_run
/// use procwarden_process::{run_to_completion, CommandLine};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let listing = run_to_completion(["ls", "-lah"], None)?;
/// let head = run_to_completion(CommandLine::shell("ls -l | head -2"), None)?;
/// println!("{}{}", listing.stdout_lossy(), head.stdout_lossy());
/// # Ok(())
/// # }
/// ```
pub fn run_to_completion(
    command: impl Into<CommandLine>,
    working_dir: Option<&Path>,
) -> Result<CapturedOutput> {
    let mut options = ProcessOptions::new();
    if let Some(dir) = working_dir {
        options = options.working_dir(dir);
    }

    let mut process = ManagedProcess::spawn(command, options)?;
    let output = process.output()?.clone();
    Ok(output)
}

/// Check whether `program` can be found on the search path
///
/// The lookup tool's output decides: nothing on either stream, or a failing
/// exit status, means the program is not installed.
pub fn exists(program: &str) -> Result<bool> {
    let mut lookup = ManagedProcess::spawn([LOOKUP_PROGRAM, program], ProcessOptions::new())?;

    let found = !lookup.output()?.is_blank() && lookup.wait()? == 0;
    debug!(program = %program, found, "Program lookup");

    Ok(found)
}

/// Run `f` against a freshly spawned process, then interrupt it
///
/// Teardown runs on every exit path of `f`. If `f` succeeds but the
/// interrupt fails, the interrupt's error is returned.
///
/// # Examples
/// ```no_run
/// use procwarden_process::{with_process, ProcessOptions};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let pid = with_process("yes", ProcessOptions::new().discard_output(true), |yes| {
///     Ok(yes.pid())
/// })?;
/// # Ok(())
/// # }
/// ```
pub fn with_process<T, F>(
    command: impl Into<CommandLine>,
    options: ProcessOptions,
    f: F,
) -> Result<T>
where
    F: FnOnce(&mut ManagedProcess) -> Result<T>,
{
    let mut process = ManagedProcess::spawn(command, options)?;
    let result = f(&mut process);

    match (result, process.interrupt()) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), teardown) => {
            if let Err(teardown) = teardown {
                warn!(pid = %process.pid(), error = %teardown, "Teardown failed after error");
            }
            Err(e)
        }
    }
}
