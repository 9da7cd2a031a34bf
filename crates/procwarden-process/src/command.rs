//! Command line resolution
//!
//! A [`CommandLine`] is resolved exactly once, at spawn time, into the argument
//! vector handed to the OS. Shell interpretation never happens implicitly: a
//! raw string is tokenized on spaces and executed directly, and only
//! [`CommandLine::Shell`] goes through the platform shell.

use std::fmt;

use crate::error::{ProcessError, Result};

/// Command to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// Space-separated invocation, tokenized on single spaces
    Raw(String),
    /// Pre-tokenized argument list
    Argv(Vec<String>),
    /// Script passed verbatim to the platform shell (`sh -c` / `cmd /C`)
    Shell(String),
}

impl CommandLine {
    /// Create a shell invocation
    ///
    /// Use this for pipes, globs, redirection or quoting.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::Shell(script.into())
    }

    /// Resolve into the argument vector passed to the OS
    ///
    /// Fails with [`ProcessError::InvalidCommand`] when no program remains.
    pub fn to_argv(&self) -> Result<Vec<String>> {
        let argv = match self {
            Self::Raw(line) => tokenize(line),
            Self::Argv(args) => args.clone(),
            Self::Shell(script) => {
                if script.trim().is_empty() {
                    Vec::new()
                } else {
                    shell_argv(script)
                }
            }
        };

        match argv.first() {
            Some(program) if !program.is_empty() => Ok(argv),
            _ => Err(ProcessError::InvalidCommand(format!(
                "no program in {:?}",
                self
            ))),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(line) => f.write_str(line),
            Self::Argv(args) => f.write_str(&args.join(" ")),
            Self::Shell(script) => write!(f, "shell: {}", script),
        }
    }
}

/// Split on single spaces, dropping the empty tokens that repeated spaces produce
pub fn tokenize(line: &str) -> Vec<String> {
    line.split(' ')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(unix)]
fn shell_argv(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

#[cfg(windows)]
fn shell_argv(script: &str) -> Vec<String> {
    vec!["cmd".to_string(), "/C".to_string(), script.to_string()]
}

impl From<&str> for CommandLine {
    fn from(line: &str) -> Self {
        Self::Raw(line.to_string())
    }
}

impl From<String> for CommandLine {
    fn from(line: String) -> Self {
        Self::Raw(line)
    }
}

impl From<Vec<String>> for CommandLine {
    fn from(args: Vec<String>) -> Self {
        Self::Argv(args)
    }
}

impl From<Vec<&str>> for CommandLine {
    fn from(args: Vec<&str>) -> Self {
        Self::Argv(args.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for CommandLine {
    fn from(args: &[&str]) -> Self {
        Self::Argv(args.iter().map(|arg| arg.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for CommandLine {
    fn from(args: [&str; N]) -> Self {
        Self::Argv(args.iter().map(|arg| arg.to_string()).collect())
    }
}
