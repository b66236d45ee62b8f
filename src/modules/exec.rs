//! Process execution
//!
//! The [`ProcessExecutor`] trait is the seam between modules and the OS.
//! [`LocalExecutor`] spawns the invocation directly (no shell), optionally
//! bounded by a timeout and a cancellation token. On Unix a child whose
//! output is captured leads its own process group, and the whole group is
//! killed when the bound is hit, so helpers it spawned (pip build backends)
//! cannot keep the call alive by holding its pipes open.

use super::command::Invocation;
use super::{ModuleError, ModuleResult};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How often a running child is polled for exit, timeout and cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Result of running a process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Exit code, `-1` when the process was terminated by a signal
    pub rc: i32,
    /// Captured standard output (empty when streamed)
    pub stdout: String,
    /// Captured standard error (empty when streamed)
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.rc == 0
    }

    /// One-line description for error messages: stderr, or stdout when
    /// stderr is empty
    pub fn summary(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }
}

/// Options for a single execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Kill the child after this long
    pub timeout: Option<Duration>,
    /// Kill the child when cancelled
    pub cancel: CancellationToken,
    /// Inherit the parent's stdout/stderr instead of capturing
    pub stream: bool,
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// Runs an invocation and reports its exit status and output
pub trait ProcessExecutor: Send + Sync {
    /// Run `invocation` to completion.
    ///
    /// A non-zero exit is not an error here; it is reported through
    /// [`CommandResult::rc`]. Failing to spawn, timing out and cancellation
    /// are errors.
    fn execute(&self, invocation: &Invocation, options: &ExecuteOptions)
        -> ModuleResult<CommandResult>;
}

/// Spawns processes on the local machine
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    fn build_command(invocation: &Invocation, options: &ExecuteOptions) -> ModuleResult<Command> {
        let program = invocation
            .program()
            .ok_or_else(|| ModuleError::InvalidParameter("invocation is empty".to_string()))?;

        let mut command = Command::new(program);
        command.args(invocation.args()).stdin(Stdio::null());
        if options.stream {
            // stays in the terminal's foreground group so Ctrl-C reaches it
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
            #[cfg(unix)]
            {
                use std::os::unix::process::CommandExt;
                command.process_group(0);
            }
        }
        Ok(command)
    }
}

impl ProcessExecutor for LocalExecutor {
    fn execute(
        &self,
        invocation: &Invocation,
        options: &ExecuteOptions,
    ) -> ModuleResult<CommandResult> {
        let mut command = Self::build_command(invocation, options)?;
        debug!("Spawning: {}", invocation);

        let mut child = command.spawn().map_err(|e| {
            ModuleError::ExecutionFailed(format!(
                "Failed to execute '{}': {}",
                invocation.program().unwrap_or_default(),
                e
            ))
        })?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let bound = Bound::new(options);
        let status = wait(&mut child, &bound)?;

        let stdout = match stdout {
            Some(rx) => collect(&rx, child.id(), &bound)?,
            None => String::new(),
        };
        let stderr = match stderr {
            Some(rx) => collect(&rx, child.id(), &bound)?,
            None => String::new(),
        };

        Ok(CommandResult {
            rc: status.code().unwrap_or(-1),
            stdout,
            stderr,
        })
    }
}

/// Deadline and cancellation token for one execution
struct Bound<'a> {
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    cancel: &'a CancellationToken,
}

impl<'a> Bound<'a> {
    fn new(options: &'a ExecuteOptions) -> Self {
        Self {
            timeout: options.timeout,
            deadline: options.timeout.map(|t| Instant::now() + t),
            cancel: &options.cancel,
        }
    }

    /// The error to stop with, if the execution has been cancelled or has
    /// run past its deadline
    fn exceeded(&self) -> Option<ModuleError> {
        if self.cancel.is_cancelled() {
            return Some(ModuleError::Cancelled);
        }
        match (self.deadline, self.timeout) {
            (Some(deadline), Some(timeout)) if Instant::now() >= deadline => {
                Some(ModuleError::Timeout { timeout })
            }
            _ => None,
        }
    }
}

/// Read a pipe to the end on a helper thread so the child never blocks on a
/// full pipe while we poll it
fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut buf) {
            warn!("Failed to read child output: {}", e);
        }
        // the receiver is gone when the call already gave up
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Wait for the drained output of an exited child.
///
/// Processes the child left behind may still hold the pipe, so this is
/// bounded like the child itself; the reader thread is abandoned when the
/// bound is hit.
fn collect(rx: &Receiver<String>, pid: u32, bound: &Bound<'_>) -> ModuleResult<String> {
    loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(output) => return Ok(output),
            Err(RecvTimeoutError::Disconnected) => return Ok(String::new()),
            Err(RecvTimeoutError::Timeout) => {
                if let Some(err) = bound.exceeded() {
                    kill_group(pid);
                    return Err(err);
                }
            }
        }
    }
}

/// Wait for `child`, killing it on timeout or cancellation
fn wait(child: &mut Child, bound: &Bound<'_>) -> ModuleResult<ExitStatus> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }

        if let Some(err) = bound.exceeded() {
            kill(child);
            return Err(err);
        }

        thread::sleep(POLL_INTERVAL);
    }
}

fn kill(child: &mut Child) {
    kill_group(child.id());
    if let Err(e) = child.kill() {
        debug!("Failed to kill child process {}: {}", child.id(), e);
    }
    // reap
    let _ = child.wait();
}

/// Kill every process in the group led by `pid`
#[cfg(unix)]
fn kill_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        debug!("Failed to kill process group {}: {}", pid, e);
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}
