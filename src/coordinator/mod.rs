//! Single-instance coordination.
//!
//! The first process to take the singleton lock becomes the primary: it
//! collects its own requests and everything secondaries relay until nothing
//! arrives for a quiet period, then runs the merged batch. Secondaries relay
//! their requests and exit without touching the filesystem.

pub mod batch;
pub mod lock;
pub mod relay;

pub use batch::BatchState;
pub use lock::{LockState, SingletonLock, holder_pid};
pub use relay::{MAX_MESSAGE_BYTES, RelayClient, RelayMessage, RelayServer};

use crossbeam_channel::RecvTimeoutError;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{Config, runtime_dir};
use crate::errors::UnfolderError;
use crate::flatten::FolderRequest;
use crate::shutdown;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorOptions {
    pub runtime_dir: PathBuf,
    pub instance_name: String,
    pub quiet_period: Duration,
    pub poll_interval: Duration,
    pub relay_timeout: Duration,
}

impl CoordinatorOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            runtime_dir: runtime_dir(cfg.runtime_dir.as_deref()),
            instance_name: cfg.instance_name.clone(),
            quiet_period: cfg.quiet_period,
            poll_interval: cfg.poll_interval,
            relay_timeout: cfg.relay_timeout,
        }
    }
}

pub enum Role {
    Primary(Primary),
    Secondary(Secondary),
}

pub struct InstanceCoordinator {
    opts: CoordinatorOptions,
}

impl InstanceCoordinator {
    pub fn new(opts: CoordinatorOptions) -> Self {
        Self { opts }
    }

    /// Take the singleton lock or find it held. The primary binds the relay
    /// before returning, so a failure there is an IPC setup error.
    pub fn elect(&self) -> Result<Role, UnfolderError> {
        let o = &self.opts;
        match SingletonLock::try_acquire(&o.runtime_dir, &o.instance_name)? {
            LockState::Acquired(lock) => {
                let server = RelayServer::bind(&o.runtime_dir, &o.instance_name)?;
                info!(instance = %o.instance_name, "running as primary instance");
                Ok(Role::Primary(Primary {
                    server,
                    lock,
                    opts: self.opts.clone(),
                }))
            }
            LockState::AlreadyHeld => {
                debug!(
                    instance = %o.instance_name,
                    holder = ?holder_pid(&o.runtime_dir, &o.instance_name),
                    "another instance is primary"
                );
                let client = RelayClient::new(&o.runtime_dir, &o.instance_name, o.relay_timeout);
                Ok(Role::Secondary(Secondary { client }))
            }
        }
    }

    /// Elect, then run batches as primary or relay as secondary.
    ///
    /// A secondary whose relay fails runs the election once more: the
    /// primary may have stopped its relay and be about to release the lock.
    pub fn run<F>(&self, requests: Vec<FolderRequest>, on_batch: F) -> Result<Finish, UnfolderError>
    where
        F: FnMut(Vec<FolderRequest>),
    {
        let first_err = match self.elect()? {
            Role::Primary(primary) => return Ok(Finish::Primary(primary.run(requests, on_batch))),
            Role::Secondary(secondary) => match secondary.relay(&requests) {
                Ok(n) => return Ok(Finish::Relayed(n)),
                Err(e) => e,
            },
        };
        debug!(error = %first_err, "relay failed; retrying the election");
        match self.elect()? {
            Role::Primary(primary) => Ok(Finish::Primary(primary.run(requests, on_batch))),
            Role::Secondary(secondary) => secondary.relay(&requests).map(Finish::Relayed),
        }
    }
}

/// How this process took part in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finish {
    Primary(PrimaryReport),
    /// Number of paths handed to the running primary
    Relayed(usize),
}

/// What a primary did before releasing the lock.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PrimaryReport {
    pub batches: usize,
    pub relayed_messages: usize,
    /// Collection was cut short by Ctrl-C; pending requests were dropped
    pub interrupted: bool,
}

pub struct Primary {
    // Field order matters: the relay closes before the lock is released.
    server: RelayServer,
    lock: SingletonLock,
    opts: CoordinatorOptions,
}

impl Primary {
    /// Collect, run `on_batch` for each merged batch and release everything.
    ///
    /// Requests acknowledged while a batch runs are collected into a
    /// follow-up batch, so the relay only closes once nothing is pending.
    pub fn run<F>(mut self, own: Vec<FolderRequest>, mut on_batch: F) -> PrimaryReport
    where
        F: FnMut(Vec<FolderRequest>),
    {
        let mut report = PrimaryReport::default();
        let mut state = BatchState::new();
        state.absorb(own);

        loop {
            if !self.collect(&mut state, &mut report) {
                warn!(dropped = state.len(), "shutdown requested; batch not run");
                report.interrupted = true;
                break;
            }

            let merged = state.take();
            if !merged.is_empty() {
                info!(folders = merged.len(), "running batch");
                on_batch(merged);
                report.batches += 1;
            }

            report.relayed_messages += self.absorb_pending(&mut state);
            if state.is_empty() {
                self.server.stop();
                report.relayed_messages += self.absorb_pending(&mut state);
                if state.is_empty() {
                    break;
                }
            }
            debug!(pending = state.len(), "requests arrived during the batch");
        }

        debug!(lock = %self.lock.path().display(), "releasing primary role");
        report
    }

    /// Wait until nothing has arrived for the quiet period. False when a
    /// shutdown was requested instead.
    fn collect(&mut self, state: &mut BatchState, report: &mut PrimaryReport) -> bool {
        loop {
            if shutdown::is_requested() {
                return false;
            }
            match self.server.recv_timeout(self.opts.poll_interval) {
                Ok(msg) => {
                    report.relayed_messages += 1;
                    let added = state.absorb(msg.requests());
                    debug!(pid = msg.pid, added, total = state.len(), "relayed request merged");
                }
                Err(RecvTimeoutError::Timeout) => {
                    if state.quiet_for() >= self.opts.quiet_period {
                        return true;
                    }
                }
                // Relay already closed: nothing more can arrive.
                Err(RecvTimeoutError::Disconnected) => return true,
            }
        }
    }

    fn absorb_pending(&self, state: &mut BatchState) -> usize {
        let pending = self.server.drain();
        let n = pending.len();
        for msg in pending {
            state.absorb(msg.requests());
        }
        n
    }
}

pub struct Secondary {
    client: RelayClient,
}

impl Secondary {
    /// Best effort: the caller reports a failure but never retries as primary.
    pub fn relay(&self, requests: &[FolderRequest]) -> Result<usize, UnfolderError> {
        let n = self.client.send_requests(requests)?;
        info!(paths = n, "requests handed to the primary instance");
        Ok(n)
    }
}
