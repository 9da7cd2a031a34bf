//! Process options

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use serde::{Deserialize, Serialize};

/// Options applied when spawning a [`ManagedProcess`](crate::ManagedProcess)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessOptions {
    /// Redirect both stdout and stderr to the null device
    pub discard_output: bool,
    /// Working directory (None = current dir)
    pub working_dir: Option<PathBuf>,
    /// Environment variables (added to parent env)
    pub env: HashMap<String, String>,
    /// Capture stdout
    pub capture_stdout: bool,
    /// Capture stderr
    pub capture_stderr: bool,
}

impl ProcessOptions {
    /// Create default options: both streams captured, inherited cwd and env
    pub fn new() -> Self {
        Self {
            discard_output: false,
            working_dir: None,
            env: HashMap::new(),
            capture_stdout: true,
            capture_stderr: true,
        }
    }

    /// Send all output to the null device
    ///
    /// Use for long-running processes whose output will never be drained.
    pub fn discard_output(mut self, discard: bool) -> Self {
        self.discard_output = discard;
        self
    }

    /// Set working directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Enable/disable stdout capture
    pub fn capture_stdout(mut self, capture: bool) -> Self {
        self.capture_stdout = capture;
        self
    }

    /// Enable/disable stderr capture
    pub fn capture_stderr(mut self, capture: bool) -> Self {
        self.capture_stderr = capture;
        self
    }

    pub(crate) fn stdout_stdio(&self) -> Stdio {
        Self::stdio(!self.discard_output && self.capture_stdout)
    }

    pub(crate) fn stderr_stdio(&self) -> Stdio {
        Self::stdio(!self.discard_output && self.capture_stderr)
    }

    fn stdio(capture: bool) -> Stdio {
        if capture {
            Stdio::piped()
        } else {
            Stdio::null()
        }
    }
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self::new()
    }
}
