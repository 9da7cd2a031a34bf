//! Signal delivery
//!
//! Two signal kinds are used: a cooperative interrupt the child may handle,
//! and a forceful terminate it cannot intercept. Both are fixed per platform
//! at compile time.

use std::process::Child;

use tracing::debug;

use crate::error::{ProcessError, Result};

#[cfg(unix)]
pub use nix::sys::signal::Signal;

/// Cooperative termination request
#[cfg(unix)]
pub const INTERRUPT_SIGNAL: Signal = Signal::SIGINT;

/// Non-cooperative termination
#[cfg(unix)]
pub const TERMINATE_SIGNAL: Signal = Signal::SIGKILL;

/// Outcome of a signal send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Signal reached the process
    Delivered,
    /// Process no longer exists (benign race)
    AlreadyExited,
}

/// Ask the child to stop
pub fn interrupt(child: &mut Child) -> Result<Delivery> {
    #[cfg(unix)]
    {
        send(child.id(), INTERRUPT_SIGNAL)
    }

    #[cfg(not(unix))]
    {
        // No cooperative interrupt for arbitrary children here
        kill(child)
    }
}

/// Force the child to stop
pub fn terminate(child: &mut Child) -> Result<Delivery> {
    #[cfg(unix)]
    {
        send(child.id(), TERMINATE_SIGNAL)
    }

    #[cfg(not(unix))]
    {
        kill(child)
    }
}

/// Send `signal` to `pid`, treating "no such process" as already exited
#[cfg(unix)]
pub fn send(pid: u32, signal: Signal) -> Result<Delivery> {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| ProcessError::Signal {
        pid,
        signal: signal.as_str(),
        source: Errno::EINVAL.into(),
    })?;

    match kill(Pid::from_raw(raw), signal) {
        Ok(()) => {
            debug!(pid = %pid, signal = signal.as_str(), "Signal delivered");
            Ok(Delivery::Delivered)
        }
        Err(Errno::ESRCH) => {
            debug!(pid = %pid, signal = signal.as_str(), "Process already gone");
            Ok(Delivery::AlreadyExited)
        }
        Err(errno) => Err(ProcessError::Signal {
            pid,
            signal: signal.as_str(),
            source: errno.into(),
        }),
    }
}

#[cfg(not(unix))]
fn kill(child: &mut Child) -> Result<Delivery> {
    let pid = child.id();
    match child.kill() {
        Ok(()) => {
            debug!(pid = %pid, "Process terminated");
            Ok(Delivery::Delivered)
        }
        Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(Delivery::AlreadyExited),
        Err(source) => Err(ProcessError::Signal {
            pid,
            signal: "KILL",
            source,
        }),
    }
}
