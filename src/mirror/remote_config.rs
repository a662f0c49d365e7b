//! Fetch and parse the backup configuration stored on the server itself.
//!
//! The device exposes a single JSON document (`syncbak.conf.json` by default)
//! at the FTP root describing every backup profile. A missing or unparsable
//! document is terminal: it is never retried and fails the run.

use tracing::info;

use super::connection::{MirrorError, RemoteFs};
use super::models::SyncConfig;

pub const DEFAULT_CONFIG_FILE: &str = "syncbak.conf.json";

/// Check the root listing for `file_name`, then download and parse it.
pub fn fetch_remote_config<R: RemoteFs>(
    fs: &mut R,
    file_name: &str,
) -> Result<SyncConfig, MirrorError> {
    let root_entries = fs.list("/")?;
    if !root_entries.iter().any(|e| e == file_name) {
        return Err(MirrorError::Config(format!(
            "could not find config file: {file_name}"
        )));
    }

    let raw = fs.download(&format!("/{file_name}"))?;
    let config: SyncConfig = serde_json::from_slice(&raw)
        .map_err(|err| MirrorError::Config(format!("invalid {file_name}: {err}")))?;

    info!(
        "loaded remote config {file_name} ({} profile(s))",
        config.profiles.len()
    );
    Ok(config)
}
