//! Relay channel from secondary instances to the primary.
//!
//! Transport is a Unix domain socket `<runtime_dir>/<name>.sock` (loopback
//! TCP plus a `<name>.port` file elsewhere). Each connection carries one JSON
//! line, a [`RelayMessage`], and the primary answers `ok` once the message
//! is queued for the current batch. That answer is the acknowledgement a
//! secondary waits for before exiting.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

use crate::errors::UnfolderError;
use crate::flatten::FolderRequest;

/// Upper bound for one encoded message, newline included.
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024;

const ACK: &str = "ok";
const ACCEPT_POLL: Duration = Duration::from_millis(20);
const CONNECTION_TIMEOUT: Duration = Duration::from_millis(500);

/// Folder arguments from one secondary, relative to its working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayMessage {
    pub pid: u32,
    pub cwd: PathBuf,
    pub paths: Vec<String>,
}

impl RelayMessage {
    pub fn requests(&self) -> Vec<FolderRequest> {
        self.paths
            .iter()
            .map(|raw| FolderRequest::new(raw.clone(), self.cwd.clone()))
            .collect()
    }

    /// One JSON line, refused when over [`MAX_MESSAGE_BYTES`].
    pub fn encode(&self) -> Result<String, UnfolderError> {
        let mut line =
            serde_json::to_string(self).map_err(|e| UnfolderError::Relay(e.to_string()))?;
        line.push('\n');
        if line.len() > MAX_MESSAGE_BYTES {
            return Err(UnfolderError::Relay(format!(
                "message of {} bytes exceeds the {MAX_MESSAGE_BYTES} byte limit",
                line.len()
            )));
        }
        Ok(line)
    }

    pub fn decode(line: &str) -> Result<Self, UnfolderError> {
        serde_json::from_str(line.trim_end()).map_err(|e| UnfolderError::Relay(e.to_string()))
    }

    /// Split `paths` into as few messages as fit the size limit, keeping order.
    pub fn chunked(pid: u32, cwd: &Path, paths: &[String]) -> Result<Vec<Self>, UnfolderError> {
        let empty = RelayMessage {
            pid,
            cwd: cwd.to_path_buf(),
            paths: Vec::new(),
        };
        let base = empty.encode()?.len();

        let mut out = Vec::new();
        let mut current = empty.clone();
        let mut size = base;
        for p in paths {
            let cost = serde_json::to_string(p)
                .map_err(|e| UnfolderError::Relay(e.to_string()))?
                .len()
                + 1;
            if base + cost > MAX_MESSAGE_BYTES {
                return Err(UnfolderError::Relay(format!("path too long to relay: {p}")));
            }
            if size + cost > MAX_MESSAGE_BYTES {
                out.push(std::mem::replace(&mut current, empty.clone()));
                size = base;
            }
            current.paths.push(p.clone());
            size += cost;
        }
        if !current.paths.is_empty() {
            out.push(current);
        }
        Ok(out)
    }
}

#[cfg(unix)]
mod transport {
    use std::io;
    use std::os::unix::net::{UnixListener, UnixStream};
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    pub type Listener = UnixListener;
    pub type Stream = UnixStream;

    pub fn endpoint(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.sock"))
    }

    /// Only the lock holder binds, so a leftover socket file is stale.
    pub fn bind(endpoint: &Path) -> io::Result<Listener> {
        let _ = std::fs::remove_file(endpoint);
        UnixListener::bind(endpoint)
    }

    pub fn accept(listener: &Listener) -> io::Result<Stream> {
        listener.accept().map(|(s, _)| s)
    }

    pub fn connect(endpoint: &Path, _timeout: Duration) -> io::Result<Stream> {
        UnixStream::connect(endpoint)
    }

    pub fn cleanup(endpoint: &Path) {
        let _ = std::fs::remove_file(endpoint);
    }
}

#[cfg(not(unix))]
mod transport {
    use std::fs;
    use std::io;
    use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    pub type Listener = TcpListener;
    pub type Stream = TcpStream;

    pub fn endpoint(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.port"))
    }

    pub fn bind(endpoint: &Path) -> io::Result<Listener> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
        let port = listener.local_addr()?.port();
        fs::write(endpoint, port.to_string())?;
        Ok(listener)
    }

    pub fn accept(listener: &Listener) -> io::Result<Stream> {
        listener.accept().map(|(s, _)| s)
    }

    pub fn connect(endpoint: &Path, timeout: Duration) -> io::Result<Stream> {
        let port: u16 = fs::read_to_string(endpoint)?
            .trim()
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        TcpStream::connect_timeout(&SocketAddr::from((Ipv4Addr::LOCALHOST, port)), timeout)
    }

    pub fn cleanup(endpoint: &Path) {
        let _ = fs::remove_file(endpoint);
    }
}

pub fn endpoint(dir: &Path, name: &str) -> PathBuf {
    transport::endpoint(dir, name)
}

/// Primary side: an accept thread feeding a channel.
pub struct RelayServer {
    endpoint: PathBuf,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    rx: Receiver<RelayMessage>,
}

impl RelayServer {
    pub fn bind(dir: &Path, name: &str) -> Result<Self, UnfolderError> {
        let endpoint = transport::endpoint(dir, name);
        let listener = transport::bind(&endpoint)
            .map_err(UnfolderError::ipc(format!("bind relay {}", endpoint.display())))?;
        listener
            .set_nonblocking(true)
            .map_err(UnfolderError::ipc("configure relay listener"))?;

        let (tx, rx) = unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        let worker = {
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("relay-accept".into())
                .spawn(move || accept_loop(listener, tx, stop))
                .map_err(UnfolderError::ipc("spawn relay thread"))?
        };
        debug!(endpoint = %endpoint.display(), "relay listening");
        Ok(Self {
            endpoint,
            stop,
            worker: Some(worker),
            rx,
        })
    }

    pub fn endpoint(&self) -> &Path {
        &self.endpoint
    }

    /// Wait for the next relayed message. `Disconnected` once stopped and
    /// drained.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<RelayMessage, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Everything queued right now, without waiting.
    pub fn drain(&self) -> Vec<RelayMessage> {
        self.rx.try_iter().collect()
    }

    /// Stop accepting. Messages acknowledged before this returns stay
    /// queued and can still be drained.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(w) = self.worker.take() {
            if w.join().is_err() {
                warn!("relay thread panicked");
            }
            transport::cleanup(&self.endpoint);
            debug!(endpoint = %self.endpoint.display(), "relay closed");
        }
    }
}

impl Drop for RelayServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Each connection gets its own thread so a stalled client cannot hold up
/// the others. Connection threads are joined before the loop returns, so
/// everything acknowledged is queued once `stop` comes back.
fn accept_loop(listener: transport::Listener, tx: Sender<RelayMessage>, stop: Arc<AtomicBool>) {
    let mut connections: Vec<JoinHandle<()>> = Vec::new();
    while !stop.load(Ordering::Relaxed) {
        connections.retain(|c| !c.is_finished());
        match transport::accept(&listener) {
            Ok(stream) => {
                let tx = tx.clone();
                let spawned = thread::Builder::new()
                    .name("relay-conn".into())
                    .spawn(move || {
                        if let Err(e) = serve_connection(stream, &tx) {
                            debug!(error = %e, "relay connection dropped");
                        }
                    });
                match spawned {
                    Ok(handle) => connections.push(handle),
                    Err(e) => warn!(error = %e, "could not spawn relay connection thread"),
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(e) => {
                warn!(error = %e, "relay accept failed");
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
    for c in connections {
        if c.join().is_err() {
            warn!("relay connection thread panicked");
        }
    }
}

fn serve_connection(stream: transport::Stream, tx: &Sender<RelayMessage>) -> io::Result<()> {
    // Accepted sockets inherit non-blocking mode on some platforms.
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(CONNECTION_TIMEOUT))?;
    stream.set_write_timeout(Some(CONNECTION_TIMEOUT))?;

    let mut reader = BufReader::new((&stream).take(MAX_MESSAGE_BYTES as u64 + 1));
    let mut line = String::new();
    reader.read_line(&mut line)?;

    let reply = if line.len() > MAX_MESSAGE_BYTES {
        warn!(bytes = line.len(), "oversized relay message rejected");
        "error: message too large".to_string()
    } else {
        match RelayMessage::decode(&line) {
            Ok(msg) => {
                trace!(pid = msg.pid, paths = msg.paths.len(), "relay message received");
                match tx.send(msg) {
                    Ok(()) => ACK.to_string(),
                    Err(_) => "error: not accepting requests".to_string(),
                }
            }
            Err(e) => {
                warn!(error = %e, "malformed relay message rejected");
                format!("error: {e}")
            }
        }
    };
    (&stream).write_all(format!("{reply}\n").as_bytes())?;
    (&stream).flush()
}

/// Secondary side: hand requests to the running primary.
#[derive(Debug, Clone)]
pub struct RelayClient {
    endpoint: PathBuf,
    timeout: Duration,
}

impl RelayClient {
    pub fn new(dir: &Path, name: &str, timeout: Duration) -> Self {
        Self {
            endpoint: transport::endpoint(dir, name),
            timeout,
        }
    }

    /// Relay requests in as many messages as needed. Returns how many paths
    /// were acknowledged.
    pub fn send_requests(&self, requests: &[FolderRequest]) -> Result<usize, UnfolderError> {
        let mut sent = 0;
        let pid = std::process::id();
        for group in requests.chunk_by(|a, b| a.cwd == b.cwd) {
            let raws: Vec<String> = group.iter().map(|r| r.raw.clone()).collect();
            for msg in RelayMessage::chunked(pid, &group[0].cwd, &raws)? {
                self.send(&msg)?;
                sent += msg.paths.len();
            }
        }
        Ok(sent)
    }

    /// Send one message, retrying with linear backoff until the timeout
    /// while the primary is not listening yet.
    pub fn send(&self, msg: &RelayMessage) -> Result<(), UnfolderError> {
        let line = msg.encode()?;
        let deadline = Instant::now() + self.timeout;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.try_send(&line) {
                Ok(()) => {
                    debug!(paths = msg.paths.len(), attempt, "relay acknowledged");
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    return Err(UnfolderError::Relay(e.to_string()));
                }
                Err(e) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(UnfolderError::Relay(format!(
                            "no answer from {} after {attempt} attempt(s): {e}",
                            self.endpoint.display()
                        )));
                    }
                    trace!(attempt, error = %e, "relay not ready; retrying");
                    let backoff = Duration::from_millis(25 * u64::from(attempt));
                    thread::sleep(backoff.min(deadline - now));
                }
            }
        }
    }

    fn try_send(&self, line: &str) -> io::Result<()> {
        let stream = transport::connect(&self.endpoint, self.timeout)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        (&stream).write_all(line.as_bytes())?;
        (&stream).flush()?;

        let mut reply = String::new();
        BufReader::new(&stream).read_line(&mut reply)?;
        match reply.trim() {
            ACK => Ok(()),
            "" => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before acknowledgement",
            )),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("primary refused request: {other}"),
            )),
        }
    }
}
