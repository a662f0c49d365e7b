//! Directory walker: local skeleton pre-creation and size estimation.
//!
//! The structure phase runs single-threaded and to completion before any
//! transfer starts, so concurrent file writes can assume their parent
//! directory already exists. Exclusion is an exact-path check at every level;
//! because the walk never descends into an excluded directory, its whole
//! subtree is skipped.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::connection::{MirrorError, RemoteFs};
use super::models::ExclusionSet;
use super::paths::join_remote;

/// Recreate every non-excluded remote directory under `local_path`.
///
/// File leaves are not touched here; they appear during the transfer phase.
pub fn mirror_structure<R: RemoteFs>(
    fs_remote: &mut R,
    remote_path: &str,
    local_path: &Path,
    exclusions: &ExclusionSet,
) -> Result<(), MirrorError> {
    fs::create_dir_all(local_path).map_err(|source| MirrorError::io(local_path, source))?;

    if !fs_remote.is_directory(remote_path) {
        return Ok(());
    }

    debug!("creating skeleton for {remote_path}");
    for name in fs_remote.list(remote_path)? {
        let child_remote = join_remote(remote_path, &name);
        if exclusions.contains(&child_remote) {
            info!("excluded, skipping {child_remote}");
            continue;
        }
        if !fs_remote.is_directory(&child_remote) {
            continue;
        }
        mirror_structure(fs_remote, &child_remote, &local_path.join(&name), exclusions)?;
    }
    Ok(())
}

/// Sum the sizes of every non-excluded file under `remote_path`.
///
/// Same walk and same exclusion rules as the mirror itself, so the estimate
/// matches what a run would actually transfer.
pub fn estimate_size<R: RemoteFs>(
    fs_remote: &mut R,
    remote_path: &str,
    exclusions: &ExclusionSet,
) -> Result<u64, MirrorError> {
    if !fs_remote.is_directory(remote_path) {
        return fs_remote.size(remote_path);
    }

    let mut total = 0u64;
    for name in fs_remote.list(remote_path)? {
        let child_remote = join_remote(remote_path, &name);
        if exclusions.contains(&child_remote) {
            continue;
        }
        if fs_remote.is_directory(&child_remote) {
            total += estimate_size(fs_remote, &child_remote, exclusions)?;
        } else {
            total += fs_remote.size(&child_remote).unwrap_or(0);
        }
    }
    Ok(total)
}
