//! Managed child process wrapper

use std::io::{self, Read};
use std::process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::{
    command::CommandLine,
    config::ProcessOptions,
    error::{ProcessError, Result},
    output::CapturedOutput,
    signal::{self, Delivery},
};

/// Interval between exit checks while waiting on an interrupt
pub const INTERRUPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long an interrupted process gets before it is force-killed
pub const INTERRUPT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Upper bound on reaping a force-killed process during drop
const DROP_REAP_GRACE: Duration = Duration::from_millis(100);
const DROP_REAP_INTERVAL: Duration = Duration::from_millis(10);

/// Handle owning one child process from spawn until it is reaped
///
/// Dropping a handle whose process is still running interrupts it (see
/// [`ManagedProcess::interrupt`]), so no child outlives its handle.
#[derive(Debug)]
pub struct ManagedProcess {
    /// Underlying OS child
    child: Child,
    /// Resolved argument vector
    command: Vec<String>,
    /// Options the process was spawned with
    options: ProcessOptions,
    /// Process ID
    pid: u32,
    started_at: Instant,
    /// Set the first time termination is observed
    finished_at: Option<Instant>,
    exit_code: Option<i32>,
    /// Joint stdout/stderr drain, set at most once
    output: Option<CapturedOutput>,
}

impl ManagedProcess {
    /// Spawn `command` immediately
    ///
    /// Fails with [`ProcessError::Spawn`] if the program cannot be executed.
    ///
    /// # Examples
    /// ```no_run
    /// use procwarden_process::{ManagedProcess, ProcessOptions};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut ls = ManagedProcess::spawn("ls -l", ProcessOptions::new())?;
    /// println!("{}", String::from_utf8_lossy(ls.stdout()?));
    /// # Ok(())
    /// # }
    /// ```
    pub fn spawn(command: impl Into<CommandLine>, options: ProcessOptions) -> Result<Self> {
        let command = command.into();
        let argv = command.to_argv()?;
        let Some((program, args)) = argv.split_first() else {
            return Err(ProcessError::InvalidCommand(command.to_string()));
        };

        debug!(
            command = ?argv,
            working_dir = ?options.working_dir,
            discard_output = options.discard_output,
            "Spawning process"
        );

        let mut cmd = Command::new(program);
        cmd.args(args);

        if let Some(ref dir) = options.working_dir {
            cmd.current_dir(dir);
        }

        for (key, value) in &options.env {
            cmd.env(key, value);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(options.stdout_stdio());
        cmd.stderr(options.stderr_stdio());

        let started_at = Instant::now();
        let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;
        let pid = child.id();

        info!(pid = %pid, command = %program, "Process spawned");

        Ok(Self {
            child,
            command: argv,
            options,
            pid,
            started_at,
            finished_at: None,
            exit_code: None,
            output: None,
        })
    }

    /// Get process ID
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Argument vector the process was started with
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Get process options
    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }

    /// Exit code if the process has terminated, `None` while it runs
    ///
    /// Never blocks. A process killed by a signal reports the negated signal
    /// number.
    pub fn poll(&mut self) -> Result<Option<i32>> {
        if let Some(code) = self.exit_code {
            return Ok(Some(code));
        }

        match self.child.try_wait().map_err(ProcessError::Wait)? {
            Some(status) => Ok(Some(self.record_exit(status))),
            None => Ok(None),
        }
    }

    /// Check if process is still running
    pub fn is_running(&mut self) -> bool {
        matches!(self.poll(), Ok(None))
    }

    /// Block until the process exits and return its exit code
    ///
    /// Calling this on a process that writes more than a pipe buffer's worth of
    /// captured output can block forever; use [`ManagedProcess::output`] instead.
    pub fn wait(&mut self) -> Result<i32> {
        if let Some(code) = self.exit_code {
            return Ok(code);
        }

        let status = self.child.wait().map_err(ProcessError::Wait)?;
        Ok(self.record_exit(status))
    }

    /// Wait for the process to finish and return everything it wrote
    ///
    /// The streams are drained once; later calls return the cached bytes.
    pub fn output(&mut self) -> Result<&CapturedOutput> {
        let output = match self.output.take() {
            Some(output) => output,
            None => self.drain()?,
        };
        Ok(self.output.insert(output))
    }

    /// Wait for the process to finish and return its stdout
    pub fn stdout(&mut self) -> Result<&[u8]> {
        Ok(&self.output()?.stdout)
    }

    /// Wait for the process to finish and return its stderr
    pub fn stderr(&mut self) -> Result<&[u8]> {
        Ok(&self.output()?.stderr)
    }

    /// Time since spawn, or total lifetime once the exit has been observed
    pub fn running_duration(&mut self) -> Duration {
        if self.finished_at.is_none() {
            if let Err(e) = self.poll() {
                warn!(pid = %self.pid, error = %e, "Failed to poll process");
            }
        }

        self.finished_at
            .unwrap_or_else(Instant::now)
            .duration_since(self.started_at)
    }

    /// [`running_duration`](Self::running_duration) truncated to whole seconds
    pub fn running_secs(&mut self) -> u64 {
        self.running_duration().as_secs()
    }

    /// Interrupt the process, force-killing it if it has not exited in time
    ///
    /// Sends [`INTERRUPT_SIGNAL`](crate::signal::INTERRUPT_SIGNAL), then checks
    /// every [`INTERRUPT_POLL_INTERVAL`] for up to [`INTERRUPT_TIMEOUT`]. A
    /// process still running after that receives
    /// [`TERMINATE_SIGNAL`](crate::signal::TERMINATE_SIGNAL); this call does not
    /// wait for it to die.
    ///
    /// A process that has already exited is left alone and `Ok(())` is returned.
    pub fn interrupt(&mut self) -> Result<()> {
        if self.poll()?.is_some() {
            debug!(pid = %self.pid, "Process already exited, nothing to interrupt");
            return Ok(());
        }

        debug!(pid = %self.pid, "Interrupting process");

        if signal::interrupt(&mut self.child)? == Delivery::AlreadyExited {
            return Ok(());
        }

        let deadline = Instant::now() + INTERRUPT_TIMEOUT;
        loop {
            if let Some(code) = self.poll()? {
                debug!(pid = %self.pid, exit_code = code, "Process exited after interrupt");
                return Ok(());
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            thread::sleep(INTERRUPT_POLL_INTERVAL.min(remaining));
        }

        warn!(
            pid = %self.pid,
            timeout_ms = INTERRUPT_TIMEOUT.as_millis() as u64,
            "Process ignored interrupt, force-killing"
        );
        signal::terminate(&mut self.child)?;

        Ok(())
    }

    fn record_exit(&mut self, status: ExitStatus) -> i32 {
        let code = exit_code(status);
        self.exit_code = Some(code);
        self.finished_at = Some(Instant::now());
        debug!(pid = %self.pid, exit_code = code, "Process exited");
        code
    }

    /// Read both pipes to end-of-stream, then reap
    ///
    /// The pipes are read while the process may still be running so a child
    /// writing more than a pipe buffer never stalls; the result is only
    /// returned once the exit has been observed.
    fn drain(&mut self) -> Result<CapturedOutput> {
        let stdout = self.child.stdout.take();
        let stderr = self.child.stderr.take();

        let (stdout, stderr) = read_both(stdout, stderr)?;
        self.wait()?;

        debug!(
            pid = %self.pid,
            stdout_len = stdout.len(),
            stderr_len = stderr.len(),
            "Output drained"
        );

        Ok(CapturedOutput { stdout, stderr })
    }
}

impl Drop for ManagedProcess {
    fn drop(&mut self) {
        match self.poll() {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(e) => {
                warn!(pid = %self.pid, error = %e, "Cannot determine process state on drop");
                return;
            }
        }

        debug!(pid = %self.pid, "Handle dropped while process running");

        if let Err(e) = self.interrupt() {
            warn!(pid = %self.pid, error = %e, "Failed to stop process on drop");
            return;
        }

        let deadline = Instant::now() + DROP_REAP_GRACE;
        while matches!(self.poll(), Ok(None)) && Instant::now() < deadline {
            thread::sleep(DROP_REAP_INTERVAL);
        }
    }
}

fn read_both(
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
) -> io::Result<(Vec<u8>, Vec<u8>)> {
    match (stdout, stderr) {
        (Some(stdout), Some(stderr)) => thread::scope(|scope| {
            let stdout_reader = scope.spawn(move || read_all(Some(stdout)));
            let stderr = read_all(Some(stderr));
            let stdout = stdout_reader
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload));
            Ok((stdout?, stderr?))
        }),
        (stdout, stderr) => Ok((read_all(stdout)?, read_all(stderr)?)),
    }
}

fn read_all(stream: Option<impl Read>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buf)?;
    }
    Ok(buf)
}

fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        status
            .code()
            .or_else(|| status.signal().map(|signo| -signo))
            .unwrap_or(-1)
    }

    #[cfg(not(unix))]
    {
        status.code().unwrap_or(-1)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn defaults() -> ProcessOptions {
        ProcessOptions::new()
    }

    #[test]
    fn test_is_running() {
        let mut child = ManagedProcess::spawn("sleep 1", defaults()).unwrap();
        assert!(child.is_running());

        child.wait().unwrap();
        assert!(!child.is_running());
    }

    #[test]
    fn test_poll_does_not_block() {
        let mut child = ManagedProcess::spawn("sleep 5", defaults()).unwrap();

        let start = Instant::now();
        assert_eq!(child.poll().unwrap(), None);
        assert!(start.elapsed() < Duration::from_millis(500));

        child.interrupt().unwrap();
    }

    #[test]
    fn test_wait_is_idempotent() {
        let mut child = ManagedProcess::spawn(["sh", "-c", "exit 3"], defaults()).unwrap();

        assert_eq!(child.wait().unwrap(), 3);
        assert_eq!(child.wait().unwrap(), 3);
        assert_eq!(child.poll().unwrap(), Some(3));
    }

    #[test]
    fn test_spawn_missing_program() {
        let err = ManagedProcess::spawn("procwarden-no-such-program-7f3a", defaults()).unwrap_err();
        match err {
            ProcessError::Spawn { program, .. } => {
                assert_eq!(program, "procwarden-no-such-program-7f3a")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_output_is_memoized() {
        let mut child =
            ManagedProcess::spawn(["sh", "-c", "echo out; echo err >&2"], defaults()).unwrap();

        let first = child.output().unwrap().clone();
        let second = child.output().unwrap().clone();

        assert_eq!(first.stdout, b"out\n");
        assert_eq!(first.stderr, b"err\n");
        assert_eq!(first, second);
        assert_eq!(child.stdout().unwrap(), b"out\n");
        assert_eq!(child.stderr().unwrap(), b"err\n");
    }

    #[test]
    fn test_large_output_does_not_deadlock() {
        let mut child = ManagedProcess::spawn(
            ["sh", "-c", "head -c 300000 /dev/zero; head -c 200000 /dev/zero >&2"],
            defaults(),
        )
        .unwrap();

        let output = child.output().unwrap();
        assert_eq!(output.stdout.len(), 300_000);
        assert_eq!(output.stderr.len(), 200_000);
    }

    #[test]
    fn test_discard_output_drains_empty() {
        let mut child =
            ManagedProcess::spawn("echo hidden", defaults().discard_output(true)).unwrap();

        let output = child.output().unwrap();
        assert!(output.stdout.is_empty());
        assert!(output.stderr.is_empty());
        assert_eq!(child.poll().unwrap(), Some(0));
    }

    #[test]
    fn test_interrupt_running_process() {
        let mut child = ManagedProcess::spawn("sleep 30", defaults()).unwrap();

        let start = Instant::now();
        child.interrupt().unwrap();

        assert!(start.elapsed() < INTERRUPT_TIMEOUT + Duration::from_millis(500));
        assert_eq!(child.poll().unwrap(), Some(-2));
    }

    #[test]
    fn test_interrupt_escalates_when_ignored() {
        let mut child = ManagedProcess::spawn(
            CommandLine::shell("trap '' INT; while true; do sleep 0.1; done"),
            defaults(),
        )
        .unwrap();
        // Give the shell time to install the trap
        thread::sleep(Duration::from_millis(200));

        let start = Instant::now();
        child.interrupt().unwrap();
        let elapsed = start.elapsed();

        assert!(elapsed >= INTERRUPT_TIMEOUT);
        assert!(elapsed < INTERRUPT_TIMEOUT + Duration::from_millis(500));
        assert_eq!(child.wait().unwrap(), -9);
    }

    #[test]
    fn test_interrupt_after_exit_is_noop() {
        let mut child = ManagedProcess::spawn("true", defaults()).unwrap();
        thread::sleep(Duration::from_millis(50));

        child.interrupt().unwrap();
        assert_eq!(child.poll().unwrap(), Some(0));
    }

    #[test]
    fn test_running_duration_stable_after_exit() {
        let mut child = ManagedProcess::spawn("true", defaults()).unwrap();
        child.wait().unwrap();

        let first = child.running_duration();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(child.running_duration(), first);
        assert_eq!(child.running_secs(), 0);
    }

    #[test]
    fn test_running_duration_grows_while_running() {
        let mut child = ManagedProcess::spawn("sleep 5", defaults()).unwrap();

        let first = child.running_duration();
        thread::sleep(Duration::from_millis(20));
        let second = child.running_duration();
        assert!(second >= first);

        child.interrupt().unwrap();
    }

    #[test]
    fn test_drop_stops_process() {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        let child = ManagedProcess::spawn("sleep 30", defaults()).unwrap();
        let pid = Pid::from_raw(child.pid() as i32);
        drop(child);

        assert_eq!(kill(pid, None), Err(Errno::ESRCH));
    }

    #[test]
    fn test_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut child = ManagedProcess::spawn("pwd", defaults().working_dir(dir.path())).unwrap();

        let reported = String::from_utf8_lossy(child.stdout().unwrap()).trim().to_string();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(std::path::Path::new(&reported).canonicalize().unwrap(), expected);
    }

    #[test]
    fn test_env() {
        let mut child = ManagedProcess::spawn(
            ["sh", "-c", "printf %s \"$PROCWARDEN_TEST\""],
            defaults().env("PROCWARDEN_TEST", "value"),
        )
        .unwrap();

        assert_eq!(child.stdout().unwrap(), b"value");
    }
}
