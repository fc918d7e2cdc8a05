//! Builder for executing external tool commands with bounded runtime.
//!
//! Every tool invocation in discprobe goes through [`ToolCommand`]: the child
//! is spawned as the leader of its own process group, stdout and stderr are
//! captured in memory, and the run races against a deadline. When the
//! deadline expires the whole group is terminated (SIGTERM, a short grace
//! period, then SIGKILL) and the child is reaped before the call returns, so
//! no zombies or stray grandchildren survive a timeout. An execution future
//! dropped mid-run (a handler abandoned on client disconnect) kills the
//! group the same way, straight to SIGKILL.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Grace period between SIGTERM and SIGKILL when a deadline expires.
const KILL_GRACE: Duration = Duration::from_millis(300);

/// Upper bound on draining captured output after a kill.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use discprobe::command::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> discprobe::error::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .arg("-v").arg("error")
///     .arg("-show_entries").arg("format=duration")
///     .arg("/path/to/video.mkv")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Duration,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument. Paths are passed through byte-exact.
    pub fn arg(mut self, s: impl Into<OsString>) -> Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(mut self, iter: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(mut self, d: Duration) -> Self {
        self.timeout = d;
        self
    }

    /// Name used in error messages: the program's file name.
    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// Dropping the returned future before it resolves kills the process
    /// group immediately; the child is reaped in the background.
    ///
    /// # Errors
    ///
    /// - Returns [`Error::Timeout`] if the deadline expires; the process
    ///   group is killed and the child reaped before this returns.
    /// - Returns [`Error::Tool`] if the process exits with a non-zero
    ///   status; the message carries trimmed stderr first, the exit status
    ///   as fallback, and any stray stdout appended after a blank line.
    /// - Returns [`Error::Tool`] if spawning the process fails.
    pub async fn execute(&self) -> Result<ToolOutput> {
        let tool = self.tool_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Make the child the leader of a fresh process group so a kill on
        // the negative pid reaches every descendant it spawns.
        #[cfg(unix)]
        unsafe {
            cmd.pre_exec(|| {
                if libc::setpgid(0, 0) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        // If this future is dropped before the child is reaped, the runtime
        // kills the child and reaps it in the background.
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| Error::Tool {
            tool: tool.clone(),
            message: format!("failed to spawn: {e}"),
        })?;

        let stdout_task = drain_pipe(child.stdout.take());
        let stderr_task = drain_pipe(child.stderr.take());

        // `kill_on_drop` only reaches the direct child; the guard extends an
        // abandoned run's kill to the whole group.
        #[cfg(unix)]
        let mut group_guard = GroupKillGuard::new(child.id());

        let status = tokio::select! {
            res = child.wait() => Some(res.map_err(|e| Error::Tool {
                tool: tool.clone(),
                message: format!("I/O error waiting for process: {e}"),
            })?),
            _ = tokio::time::sleep(self.timeout) => None,
        };

        match status {
            Some(status) => {
                #[cfg(unix)]
                group_guard.disarm();

                let stdout = collect(stdout_task).await;
                let stderr = collect(stderr_task).await;

                if !status.success() {
                    return Err(Error::Tool {
                        tool,
                        message: failure_message(&stdout, &stderr, status),
                    });
                }

                Ok(ToolOutput {
                    status,
                    stdout,
                    stderr,
                })
            }
            None => {
                kill_and_reap(&mut child).await;
                #[cfg(unix)]
                group_guard.disarm();

                // Partial output is only useful for diagnostics here; the
                // caller sees the distinct timeout kind. Both drains are
                // awaited so neither task outlives the call.
                let _ = collect(stdout_task).await;
                let stderr = collect(stderr_task).await;
                if !stderr.trim().is_empty() {
                    tracing::debug!(%tool, stderr = %stderr.trim(), "partial stderr from timed out tool");
                }

                Err(Error::timeout(tool, self.timeout))
            }
        }
    }
}

/// Compose a failure message: trimmed stderr first, the exit status as
/// fallback, stray stdout appended after a blank line.
fn failure_message(stdout: &str, stderr: &str, status: ExitStatus) -> String {
    let mut message = stderr.trim().to_string();
    if message.is_empty() {
        message = format!("exited with status {status}");
    }
    let out = stdout.trim();
    if !out.is_empty() {
        message.push_str("\n\n");
        message.push_str(out);
    }
    message
}

/// Terminate the child's process group and reap the child.
///
/// SIGTERM first, then after [`KILL_GRACE`] a SIGKILL, both addressed to the
/// negative pid. The final `wait` guarantees the child leaves the process
/// table before this returns.
async fn kill_and_reap(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            signal_group(pid as i32, libc::SIGTERM);
            tokio::time::sleep(KILL_GRACE).await;
            signal_group(pid as i32, libc::SIGKILL);
        }
    }

    #[cfg(not(unix))]
    {
        let _ = child.start_kill();
    }

    let _ = child.wait().await;
}

/// Send a signal to a whole process group, falling back to the direct pid
/// if the group signal is rejected.
#[cfg(unix)]
fn signal_group(pid: i32, signal: libc::c_int) {
    let rc = unsafe { libc::kill(-pid, signal) };
    if rc != 0 {
        unsafe {
            libc::kill(pid, signal);
        }
    }
}

/// Kills the process group when an execution future is abandoned.
///
/// Armed from spawn until the child has been reaped; dropping the future at
/// an await point fires it, so a caller that gives up on a run cannot leave
/// the tool behind.
#[cfg(unix)]
struct GroupKillGuard {
    pid: Option<i32>,
    armed: bool,
}

#[cfg(unix)]
impl GroupKillGuard {
    fn new(pid: Option<u32>) -> Self {
        Self {
            pid: pid.map(|p| p as i32),
            armed: true,
        }
    }

    /// The child has been reaped; its pid may be reused and must not be
    /// signalled past this point.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

#[cfg(unix)]
impl Drop for GroupKillGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(pid) = self.pid {
            signal_group(pid, libc::SIGKILL);
        }
    }
}

/// Read a captured pipe to the end on a background task.
fn drain_pipe<R>(pipe: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    })
}

/// Await a drain task with an upper bound, returning lossy UTF-8.
///
/// After a group kill the pipes close almost immediately; the bound only
/// matters if some descendant escaped the group and still holds the write
/// end open.
async fn collect(task: JoinHandle<Vec<u8>>) -> String {
    match tokio::time::timeout(DRAIN_TIMEOUT, task).await {
        Ok(Ok(buf)) => String::from_utf8_lossy(&buf).to_string(),
        _ => String::new(),
    }
}
