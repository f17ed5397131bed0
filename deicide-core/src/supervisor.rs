//! Process supervision for dev orchestration.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::package::Package;

/// Substring of a process's stdout interpreted as a readiness signal.
pub const READY_MARKER: &str = "ready";

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_DEV_COMMAND: &str = "npm run dev";

/// Lifecycle state of a managed process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Pending,
    Starting,
    Ready,
    Failed,
    Terminated,
}

/// One line of output from a managed process, tagged with its origin.
#[derive(Debug, Clone)]
pub struct OutputLine {
    pub package: String,
    pub line: String,
    pub stderr: bool,
}

struct ManagedProcess {
    child: Option<Child>,
    state: ProcessState,
}

/// Supervises the long-running dev processes of a startup sequence.
///
/// Processes are started strictly sequentially: package N+1 is not spawned
/// until package N has reached `Ready`. Readiness is a race between the
/// first stdout line containing [`READY_MARKER`] and a fixed timeout; both
/// outcomes count as ready, since not every task reliably emits a marker.
///
/// The supervisor is the exclusive owner of every child handle. Reader
/// threads are pure stream pumps feeding one channel; only the control
/// thread mutates the process map or consumes the channel.
pub struct Supervisor {
    dev_command: String,
    ready_timeout: Duration,
    processes: IndexMap<String, ManagedProcess>,
    tx: Sender<OutputLine>,
    rx: Receiver<OutputLine>,
}

impl Supervisor {
    pub fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self {
            dev_command: DEFAULT_DEV_COMMAND.to_string(),
            ready_timeout: DEFAULT_READY_TIMEOUT,
            processes: IndexMap::new(),
            tx,
            rx,
        }
    }

    /// Overrides the dev task command run in each package directory.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.dev_command = command.into();
        self
    }

    /// Overrides the readiness timeout.
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// Current state of a tracked process.
    pub fn state(&self, name: &str) -> Option<ProcessState> {
        self.processes.get(name).map(|p| p.state)
    }

    /// Tracked processes in start order.
    pub fn states(&self) -> Vec<(String, ProcessState)> {
        self.processes
            .iter()
            .map(|(name, p)| (name.clone(), p.state))
            .collect()
    }

    /// Starts every package in order, waiting for readiness between starts.
    ///
    /// On any spawn failure, everything started so far is torn down before
    /// the error propagates.
    pub fn start_all<F>(&mut self, packages: &[&Package], on_line: &mut F) -> Result<()>
    where
        F: FnMut(&OutputLine),
    {
        for package in packages {
            if let Err(e) = self.start(package, on_line) {
                self.teardown();
                return Err(e);
            }
        }
        Ok(())
    }

    /// Spawns one package's dev task and blocks until it is ready.
    pub fn start<F>(&mut self, package: &Package, on_line: &mut F) -> Result<()>
    where
        F: FnMut(&OutputLine),
    {
        let name = package.name.clone();
        self.processes.insert(
            name.clone(),
            ManagedProcess {
                child: None,
                state: ProcessState::Pending,
            },
        );
        self.set_state(&name, ProcessState::Starting);

        let spawned = Command::new("sh")
            .arg("-c")
            .arg(&self.dev_command)
            .current_dir(&package.location)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                self.set_state(&name, ProcessState::Failed);
                return Err(Error::Spawn {
                    package: name,
                    source: e,
                });
            }
        };

        if let Some(stdout) = child.stdout.take() {
            Self::spawn_reader(name.clone(), stdout, false, self.tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            Self::spawn_reader(name.clone(), stderr, true, self.tx.clone());
        }

        if let Some(managed) = self.processes.get_mut(&name) {
            managed.child = Some(child);
        }

        self.wait_ready(&name, on_line);
        Ok(())
    }

    /// Drains output until the marker appears on this package's stdout or
    /// the timeout elapses. A timeout is optimistic success, not a failure.
    fn wait_ready<F>(&mut self, name: &str, on_line: &mut F)
    where
        F: FnMut(&OutputLine),
    {
        let deadline = Instant::now() + self.ready_timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.rx.recv_timeout(remaining.min(POLL_INTERVAL)) {
                Ok(line) => {
                    let marker_hit =
                        !line.stderr && line.package == name && line.line.contains(READY_MARKER);
                    on_line(&line);
                    if marker_hit {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.set_state(name, ProcessState::Ready);
    }

    /// Forwards output from all running processes until the shutdown flag
    /// goes high, then tears everything down. Operator-initiated shutdown
    /// is a clean exit, not an error.
    pub fn supervise<F>(&mut self, shutdown: &AtomicBool, on_line: &mut F) -> Result<()>
    where
        F: FnMut(&OutputLine),
    {
        while !shutdown.load(Ordering::SeqCst) {
            match self.rx.recv_timeout(POLL_INTERVAL) {
                Ok(line) => on_line(&line),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.teardown();
        Ok(())
    }

    /// Best-effort termination of every live handle, in any order.
    ///
    /// Kill is immediate and the follow-up wait only reaps, so the control
    /// thread never blocks on a non-responsive child. Entries that never
    /// produced a handle keep their state.
    pub fn teardown(&mut self) {
        for managed in self.processes.values_mut() {
            if let Some(mut child) = managed.child.take() {
                let _ = child.kill();
                let _ = child.wait();
                managed.state = ProcessState::Terminated;
            }
        }
    }

    fn set_state(&mut self, name: &str, state: ProcessState) {
        if let Some(managed) = self.processes.get_mut(name) {
            managed.state = state;
        }
    }

    fn spawn_reader<R>(package: String, stream: R, stderr: bool, tx: Sender<OutputLine>)
    where
        R: Read + Send + 'static,
    {
        thread::spawn(move || {
            let reader = BufReader::new(stream);
            for line in reader.lines() {
                let Ok(line) = line else { break };
                let trimmed = line.trim_end();
                if trimmed.is_empty() {
                    continue;
                }
                let sent = tx.send(OutputLine {
                    package: package.clone(),
                    line: trimmed.to_string(),
                    stderr,
                });
                if sent.is_err() {
                    break;
                }
            }
        });
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.teardown();
    }
}
