//! Captured output of a finished process

use std::borrow::Cow;

/// Bytes drained from a process's stdout and stderr
///
/// Both streams come from the same drain, so they are always set together.
/// Streams that were not captured are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Raw stdout bytes
    pub stdout: Vec<u8>,
    /// Raw stderr bytes
    pub stderr: Vec<u8>,
}

impl CapturedOutput {
    /// Stdout decoded as UTF-8, replacing invalid sequences
    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// Stderr decoded as UTF-8, replacing invalid sequences
    pub fn stderr_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }

    /// True when neither stream contains anything but whitespace
    pub fn is_blank(&self) -> bool {
        self.stdout.iter().all(u8::is_ascii_whitespace)
            && self.stderr.iter().all(u8::is_ascii_whitespace)
    }
}
