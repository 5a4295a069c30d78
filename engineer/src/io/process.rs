//! Child processes with a wall-clock budget and bounded output capture.

use std::io::{Read, Write};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Human-readable log of both streams, with truncation and timeout notes.
    pub fn render_log(&self, label: &str) -> String {
        let mut buf = String::new();
        buf.push_str("=== stdout ===\n");
        buf.push_str(&self.stdout_lossy());
        if self.stdout_truncated > 0 {
            buf.push_str(&format!(
                "\n[{label} stdout truncated {} bytes]\n",
                self.stdout_truncated
            ));
        }
        buf.push_str("\n=== stderr ===\n");
        buf.push_str(&self.stderr_lossy());
        if self.stderr_truncated > 0 {
            buf.push_str(&format!(
                "\n[{label} stderr truncated {} bytes]\n",
                self.stderr_truncated
            ));
        }
        if self.timed_out {
            buf.push_str(&format!("\n[{label} timed out]\n"));
        } else {
            buf.push_str(&format!("\n[{label} {}]\n", self.status));
        }
        buf
    }
}

/// How long a killed process group gets to release its pipes.
const KILL_GRACE: Duration = Duration::from_millis(500);

/// Run `cmd` with a timeout, feeding `stdin` and draining both output pipes.
///
/// The child leads its own process group. On timeout the whole group is
/// killed, so processes it started cannot keep the pipes open past the budget.
/// The same happens when the child exits in time but something it left
/// running still holds the pipes at the deadline.
///
/// Stdin is written from its own thread so a child that produces output before
/// reading all of its input cannot deadlock the pipes. Bytes beyond
/// `output_limit_bytes` are counted and discarded.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    stdin: Option<Vec<u8>>,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    if stdin.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    #[cfg(unix)]
    cmd.process_group(0);

    debug!("spawning child process");
    let deadline = Instant::now() + timeout;
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };
    let mut group = ProcessGroup::new(child.id());

    let stdin_rx = match stdin {
        Some(input) => {
            let mut child_stdin = child
                .stdin
                .take()
                .ok_or_else(|| anyhow!("stdin was not piped"))?;
            Some(spawn_worker(move || -> Result<()> {
                child_stdin.write_all(&input).context("write stdin")?;
                Ok(())
            }))
        }
        None => None,
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_rx = spawn_worker(move || read_stream_limited(stdout, output_limit_bytes));
    let stderr_rx = spawn_worker(move || read_stream_limited(stderr, output_limit_bytes));

    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            child.kill().context("kill command")?;
            group.kill();
            child.wait().context("wait command after kill")?
        }
    };

    let (stdout, stdout_truncated) =
        await_worker(&stdout_rx, "stdout reader", deadline, &mut group)
            .transpose()
            .context("join stdout")?
            .unwrap_or_default();
    let (stderr, stderr_truncated) =
        await_worker(&stderr_rx, "stderr reader", deadline, &mut group)
            .transpose()
            .context("join stderr")?
            .unwrap_or_default();

    if let Some(rx) = stdin_rx {
        // A child that exits without reading all input closes the pipe early.
        match await_worker(&rx, "stdin writer", deadline, &mut group) {
            Some(Err(err)) if !group.killed && status.success() => return Err(err),
            _ => {}
        }
    }

    let timed_out = group.killed;
    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

/// The process group led by a spawned child.
struct ProcessGroup {
    id: u32,
    killed: bool,
}

impl ProcessGroup {
    fn new(id: u32) -> Self {
        Self { id, killed: false }
    }

    /// SIGKILL every process left in the group. Best effort: the group may
    /// already be gone.
    #[cfg(unix)]
    #[allow(unsafe_code)]
    fn kill(&mut self) {
        self.killed = true;
        let Ok(pgid) = libc::pid_t::try_from(self.id) else {
            warn!(pgid = self.id, "process group id out of range");
            return;
        };
        // SAFETY: killpg only sends a signal; it touches no memory we own.
        let ret = unsafe { libc::killpg(pgid, libc::SIGKILL) };
        if ret != 0 {
            debug!(pgid, "process group already gone");
        }
    }

    #[cfg(not(unix))]
    fn kill(&mut self) {
        self.killed = true;
    }
}

fn spawn_worker<T, F>(work: F) -> Receiver<Result<T>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // The receiver is gone only when the run gave up on this worker.
        let _ = tx.send(work());
    });
    rx
}

/// Wait for a worker until `deadline`, or at least `KILL_GRACE`. A worker
/// still blocked by then gets the group killed and `KILL_GRACE` to finish;
/// after that it is abandoned and `None` is returned.
fn await_worker<T>(
    rx: &Receiver<Result<T>>,
    what: &str,
    deadline: Instant,
    group: &mut ProcessGroup,
) -> Option<Result<T>> {
    loop {
        let wait = if group.killed {
            KILL_GRACE
        } else {
            deadline
                .saturating_duration_since(Instant::now())
                .max(KILL_GRACE)
        };
        match rx.recv_timeout(wait) {
            Ok(result) => return Some(result),
            Err(RecvTimeoutError::Disconnected) => {
                return Some(Err(anyhow!("{what} thread panicked")));
            }
            Err(RecvTimeoutError::Timeout) if !group.killed => {
                warn!(what, "pipes still open at the deadline, killing process group");
                group.kill();
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(what, "still blocked after killing the process group, giving up");
                return None;
            }
        }
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}
