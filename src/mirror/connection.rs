//! FTP connection provider and the `RemoteFs` seam.
//!
//! Sessions are cheap and single-owner: one per recursive unit of work, one
//! per file transfer, never shared across threads (FTP control connections do
//! not tolerate concurrent use). Closing happens in `Drop` so every exit path
//! releases the socket.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use suppaftp::FtpStream;
use suppaftp::types::FileType;
use thiserror::Error;
use tracing::debug;

use crate::base_system::retry::RetryPolicy;

use super::classify;
use super::paths::entry_name;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("ftp: {0}")]
    Ftp(#[from] suppaftp::FtpError),
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("connect {host}: {source}")]
    Connect { host: String, source: io::Error },
    #[error("config error: {0}")]
    Config(String),
    #[error("remote path does not exist: {0}")]
    Vanished(String),
}

impl MirrorError {
    /// Transient-connection and transfer errors are retried; a confirmed
    /// missing path or a broken config document is terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            MirrorError::Ftp(_) | MirrorError::Io { .. } | MirrorError::Connect { .. } => true,
            MirrorError::Config(_) | MirrorError::Vanished(_) => false,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        MirrorError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Everything the walker, scheduler and file mirror need from a remote tree.
///
/// The production implementation is [`FtpSession`]; tests drive the engine
/// against an in-memory tree instead.
pub trait RemoteFs {
    /// Entry names of a remote directory (no `.`/`..`, names only).
    fn list(&mut self, path: &str) -> Result<Vec<String>, MirrorError>;

    /// Directory probe. Any failure means "not a directory", which cannot be
    /// told apart from "does not exist"; see [`classify`].
    fn is_directory(&mut self, path: &str) -> bool;

    /// Whether the path shows up in its parent's listing. Used to turn a
    /// download failure on a vanished path into a terminal outcome instead
    /// of an endless retry.
    fn exists(&mut self, path: &str) -> Result<bool, MirrorError>;

    /// Size of a remote file in bytes.
    fn size(&mut self, path: &str) -> Result<u64, MirrorError>;

    /// Full binary content of a remote file.
    fn download(&mut self, path: &str) -> Result<Vec<u8>, MirrorError>;
}

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct FtpEndpoint {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl FtpEndpoint {
    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// One authenticated FTP control connection in binary mode.
pub struct FtpSession {
    stream: FtpStream,
}

impl FtpSession {
    /// Connect through the retry policy: refused connections, login failures
    /// and socket timeouts are all retried per the policy before anything is
    /// returned to the caller.
    pub fn open(endpoint: &FtpEndpoint, retry: &RetryPolicy) -> Result<Self, MirrorError> {
        retry
            .run(
                &format!("connect {}", endpoint.addr()),
                MirrorError::is_retryable,
                || Self::open_once(endpoint),
            )
            .map_err(|e| e.into_source())
    }

    /// Single connection attempt, no retry. Used by transfer workers whose
    /// whole unit of work (connect + download) is already wrapped.
    pub fn open_once(endpoint: &FtpEndpoint) -> Result<Self, MirrorError> {
        let mut stream = FtpStream::connect(endpoint.addr())?;
        stream
            .get_ref()
            .set_read_timeout(Some(endpoint.timeout))
            .and_then(|_| stream.get_ref().set_write_timeout(Some(endpoint.timeout)))
            .map_err(|source| MirrorError::Connect {
                host: endpoint.addr(),
                source,
            })?;
        stream.login(&endpoint.username, &endpoint.password)?;
        stream.transfer_type(FileType::Binary)?;
        debug!("connected to {}", endpoint.addr());
        Ok(Self { stream })
    }
}

impl RemoteFs for FtpSession {
    fn list(&mut self, path: &str) -> Result<Vec<String>, MirrorError> {
        let raw = self.stream.nlst(Some(path))?;
        Ok(raw
            .iter()
            .filter_map(|line| entry_name(line))
            .map(str::to_string)
            .collect())
    }

    fn is_directory(&mut self, path: &str) -> bool {
        classify::probe_directory(&mut self.stream, path)
    }

    fn exists(&mut self, path: &str) -> Result<bool, MirrorError> {
        let (parent, name) = split_parent(path);
        let entries = self.list(parent)?;
        Ok(entries.iter().any(|e| e == name))
    }

    fn size(&mut self, path: &str) -> Result<u64, MirrorError> {
        Ok(self.stream.size(path)? as u64)
    }

    fn download(&mut self, path: &str) -> Result<Vec<u8>, MirrorError> {
        Ok(self.stream.retr_as_buffer(path)?.into_inner())
    }
}

impl Drop for FtpSession {
    fn drop(&mut self) {
        let _ = self.stream.quit();
    }
}

fn split_parent(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(0) => ("/", &path[1..]),
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("/", path),
    }
}
