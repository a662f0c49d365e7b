//! File mirror: one remote file to one local path over a dedicated session.

use std::fs;

use tracing::{info, warn};

use super::connection::{MirrorError, RemoteFs};
use super::models::MirrorTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Mirrored,
    /// The task pointed at a directory after all. The scheduler should never
    /// submit one, but the remote tree can change between discovery and
    /// transfer.
    SkippedDirectory,
}

/// Download `task.remote` into `task.local`, overwriting without asking.
///
/// On a failed download the parent listing is consulted: a path that is no
/// longer there becomes [`MirrorError::Vanished`], which the retry policy
/// treats as terminal — otherwise a file deleted mid-run would be retried
/// until the heat death of the link.
pub fn mirror_file<R: RemoteFs>(
    fs_remote: &mut R,
    task: &MirrorTask,
) -> Result<FileOutcome, MirrorError> {
    if fs_remote.is_directory(&task.remote) {
        warn!("could not mirror a directory, skipping {}", task.remote);
        return Ok(FileOutcome::SkippedDirectory);
    }

    info!("mirroring {} to {}", task.remote, task.local.display());
    let content = match fs_remote.download(&task.remote) {
        Ok(content) => content,
        Err(err) => {
            if let Ok(false) = fs_remote.exists(&task.remote) {
                return Err(MirrorError::Vanished(task.remote.clone()));
            }
            return Err(err);
        }
    };

    fs::write(&task.local, content).map_err(|source| MirrorError::io(&task.local, source))?;
    info!(
        "successfully mirrored {} to {}",
        task.remote,
        task.local.display()
    );
    Ok(FileOutcome::Mirrored)
}
