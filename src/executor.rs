//! Running a [`CommandSpec`] as a child process.
//!
//! stdout and stderr are piped separately and drained on their own reader
//! threads so a chatty stream can never fill its pipe and stall the child.
//! The exit status is classified into an [`ExecutionOutcome`]; exit code 1
//! with a clean stderr is ripgrep's "no matches" and is not an error.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::command::CommandSpec;
use crate::errors::ExecutionError;

/// How long to keep collecting output after a timed-out child was killed.
const DRAIN_GRACE: Duration = Duration::from_millis(500);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured output of one finished process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// A successful run: either the tool found something or it cleanly
/// reported that it did not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Matches(ExecutionResult),
    NoMatches(ExecutionResult),
}

impl ExecutionOutcome {
    pub fn result(&self) -> &ExecutionResult {
        match self {
            ExecutionOutcome::Matches(r) | ExecutionOutcome::NoMatches(r) => r,
        }
    }

    pub fn into_result(self) -> ExecutionResult {
        match self {
            ExecutionOutcome::Matches(r) | ExecutionOutcome::NoMatches(r) => r,
        }
    }
}

/// Runs commands. The process-backed implementation is [`ProcessExecutor`];
/// tests substitute recording stubs.
pub trait Executor {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionOutcome, ExecutionError>;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionOutcome, ExecutionError> {
        (**self).execute(spec)
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionOutcome, ExecutionError> {
        (**self).execute(spec)
    }
}

/// Map an exit status and captured streams to an outcome.
///
/// * `Some(0)` -> [`ExecutionOutcome::Matches`]
/// * `Some(1)` with blank stderr -> [`ExecutionOutcome::NoMatches`]
/// * anything else (including death by signal) -> [`ExecutionError::Failed`]
pub fn classify(
    code: Option<i32>,
    stdout: String,
    stderr: String,
) -> Result<ExecutionOutcome, ExecutionError> {
    match code {
        Some(0) => Ok(ExecutionOutcome::Matches(ExecutionResult {
            stdout,
            stderr,
            exit_code: 0,
        })),
        Some(1) if stderr.trim().is_empty() => Ok(ExecutionOutcome::NoMatches(ExecutionResult {
            stdout,
            stderr,
            exit_code: 1,
        })),
        code => Err(ExecutionError::Failed {
            code,
            stdout,
            stderr,
        }),
    }
}

// ---------------------------------------------------------------------------
// Process-backed executor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

type Chunk = (Stream, std::io::Result<Vec<u8>>);

/// Spawns one child per call. With a timeout set, a child still running when
/// it elapses is killed and the call fails with [`ExecutionError::TimedOut`].
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout: timeout.filter(|t| !t.is_zero()),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Executor for ProcessExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionOutcome, ExecutionError> {
        tracing::debug!(command = %spec, "spawning");
        let started = Instant::now();

        let mut child = Command::new(spec.program())
            .args(spec.get_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecutionError::Launch {
                program: spec.program().to_string(),
                source,
            })?;

        let chunks = spawn_readers(&mut child);
        let deadline = self.timeout.map(|t| started + t);

        let mut out = Output::default();
        for _ in 0..2 {
            let chunk = match deadline {
                None => chunks.recv().ok(),
                Some(deadline) => match chunks.recv_deadline(deadline) {
                    Ok(chunk) => Some(chunk),
                    Err(RecvTimeoutError::Timeout) => {
                        return Err(self.kill_after_timeout(child, &chunks, out));
                    }
                    Err(RecvTimeoutError::Disconnected) => None,
                },
            };
            if let Some(chunk) = chunk
                && let Err(e) = out.store(chunk)
            {
                return Err(abandon(&mut child, e));
            }
        }

        // Both pipes are closed; the child is exiting or already gone.
        let status = match deadline {
            None => match child.wait() {
                Ok(status) => status,
                Err(e) => return Err(abandon(&mut child, e)),
            },
            Some(deadline) => match wait_until(&mut child, deadline) {
                Ok(Some(status)) => status,
                Ok(None) => return Err(self.kill_after_timeout(child, &chunks, out)),
                Err(e) => return Err(abandon(&mut child, e)),
            },
        };

        tracing::debug!(
            code = ?status.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "process finished"
        );
        classify(status.code(), out.stdout(), out.stderr())
    }
}

impl ProcessExecutor {
    fn kill_after_timeout(
        &self,
        mut child: Child,
        chunks: &Receiver<Chunk>,
        mut out: Output,
    ) -> ExecutionError {
        let after = self.timeout.unwrap_or_default();
        tracing::warn!(timeout_secs = after.as_secs(), "killing timed-out process");
        reap(&mut child);

        // Keep whatever the readers managed to collect before the kill.
        let grace = Instant::now() + DRAIN_GRACE;
        while let Ok(chunk) = chunks.recv_deadline(grace) {
            let _ = out.store(chunk);
        }
        ExecutionError::TimedOut {
            after,
            stdout: out.stdout(),
            stderr: out.stderr(),
        }
    }
}

/// Kill the child and wait for it so no process or zombie outlives the call.
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Give up on a child after an I/O failure while collecting its output.
fn abandon(child: &mut Child, err: std::io::Error) -> ExecutionError {
    tracing::warn!(error = %err, pid = child.id(), "abandoning process after I/O error");
    reap(child);
    ExecutionError::Io(err)
}

/// Drain both pipes on background threads; each sends its bytes on EOF.
fn spawn_readers(child: &mut Child) -> Receiver<Chunk> {
    let (tx, rx) = crossbeam_channel::bounded(2);
    if let Some(pipe) = child.stdout.take() {
        let tx = tx.clone();
        thread::spawn(move || {
            let _ = tx.send((Stream::Stdout, read_all(pipe)));
        });
    }
    if let Some(pipe) = child.stderr.take() {
        thread::spawn(move || {
            let _ = tx.send((Stream::Stderr, read_all(pipe)));
        });
    }
    rx
}

fn read_all(mut pipe: impl Read) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)?;
    Ok(buf)
}

fn wait_until(
    child: &mut Child,
    deadline: Instant,
) -> std::io::Result<Option<std::process::ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[derive(Default)]
struct Output {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl Output {
    fn store(&mut self, (stream, bytes): Chunk) -> std::io::Result<()> {
        let bytes = bytes?;
        match stream {
            Stream::Stdout => self.stdout = bytes,
            Stream::Stderr => self.stderr = bytes,
        }
        Ok(())
    }

    fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}
