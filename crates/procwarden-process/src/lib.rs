//! # procwarden-process
//!
//! **Purpose**: Child process lifecycle management with guaranteed teardown
//!
//! Starts external programs, captures their output, polls their status, and
//! stops them with an interrupt that escalates to a forced kill.
//!
//! ## Features
//!
//! - **Synchronous Spawning**: The process starts when the handle is created
//! - **Explicit Commands**: Tokenized argv by default, shell only on request
//! - **Output Capture**: stdout/stderr drained once and cached
//! - **Graceful Shutdown**: SIGINT, 1s grace period, then SIGKILL
//! - **Drop Finalization**: A running child never outlives its handle
//! - **Helpers**: One-shot execution and `which`-style program lookup
//!
//! ## Usage
//!
//! ```rust,no_run
//! use procwarden_process::{ManagedProcess, ProcessOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Long-running process whose output is irrelevant
//! let mut yes = ManagedProcess::spawn("yes", ProcessOptions::new().discard_output(true))?;
//! assert!(yes.poll()?.is_none());
//!
//! // Clean shutdown
//! yes.interrupt()?;
//! # Ok(())
//! # }
//! ```

pub mod child;
pub mod command;
pub mod config;
pub mod error;
pub mod output;
pub mod run;
pub mod signal;

pub use child::{ManagedProcess, INTERRUPT_POLL_INTERVAL, INTERRUPT_TIMEOUT};
pub use command::CommandLine;
pub use config::ProcessOptions;
pub use error::{ProcessError, Result};
pub use output::CapturedOutput;
pub use run::{exists, run_to_completion, with_process};
