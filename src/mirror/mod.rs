//! Recursive FTP mirroring engine.
//!
//! Submodules:
//! - `models`        — profiles, exclusion set, tasks, run statistics
//! - `paths`         — remote path normalization and local mapping
//! - `connection`    — FTP session provider and the `RemoteFs` seam
//! - `remote_config` — the `syncbak.conf.json` document on the server
//! - `classify`      — directory probe
//! - `walker`        — structure pre-creation and size estimation
//! - `scheduler`     — discovery walk and the transfer worker pool
//! - `transfer`      — single-file download
//! - `progress`      — CLI progress bar
//!
//! A run is two strictly ordered phases per data root: the walker recreates
//! the directory skeleton locally, then the scheduler discovers every
//! non-excluded file and feeds the worker pool. Failed files are reported and
//! counted, never fatal to the rest of the run.

pub mod classify;
pub mod connection;
pub mod models;
pub mod paths;
pub mod progress;
pub mod remote_config;
pub mod scheduler;
pub mod transfer;
pub mod walker;

#[cfg(test)]
pub(crate) mod fake;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::base_system::retry::RetryPolicy;

use connection::{FtpEndpoint, FtpSession, MirrorError, RemoteFs};
use models::{BackupProfile, ExclusionSet, MirrorStats};
use paths::local_destination;
use progress::MirrorProgress;
use scheduler::{TransferEvent, TransferPool};

#[derive(Debug, Clone)]
pub struct MirrorOptions {
    pub workers: usize,
    pub retry: RetryPolicy,
    pub show_progress: bool,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            workers: scheduler::default_workers(),
            retry: RetryPolicy::default(),
            show_progress: true,
        }
    }
}

/// Mirror one remote root into `local_root`: skeleton first, then transfers.
pub fn mirror_tree<R, C>(
    connector: &Arc<C>,
    options: &MirrorOptions,
    remote_root: &str,
    local_root: &Path,
    exclusions: &ExclusionSet,
) -> Result<MirrorStats, MirrorError>
where
    R: RemoteFs + 'static,
    C: Fn() -> Result<R, MirrorError> + Send + Sync + 'static,
{
    let mut stats = MirrorStats::default();

    // One session covers the whole structure + discovery walk; transfers get
    // their own dedicated sessions inside the pool.
    let mut session = options
        .retry
        .run("connect for discovery", MirrorError::is_retryable, || {
            connector()
        })
        .map_err(|e| e.into_source())?;

    walker::mirror_structure(&mut session, remote_root, local_root, exclusions)?;

    if !session.is_directory(remote_root) {
        warn!("data root {remote_root} is not a directory, nothing to mirror");
        return Ok(stats);
    }

    let tasks = scheduler::discover_tasks(&mut session, remote_root, local_root, exclusions)?;
    drop(session);

    let total = tasks.len();
    info!(
        "mirroring {remote_root} to {} ({total} file(s))",
        local_root.display()
    );

    let mut progress = MirrorProgress::new(total, options.show_progress);
    let mut pool = TransferPool::new(options.workers, Arc::clone(connector), options.retry);
    for task in tasks {
        pool.submit(task);
    }
    pool.drain(total, |event| {
        progress.inc();
        match event {
            TransferEvent::Done { .. } => stats.mirrored += 1,
            TransferEvent::SkippedDirectory { .. } => stats.skipped_dirs += 1,
            TransferEvent::Failed { remote, error } => {
                warn!("giving up on {remote}: {error}");
                stats.failed += 1;
            }
        }
    });
    pool.shutdown();
    progress.finish();

    Ok(stats)
}

/// Mirror every data root of a profile into the target directory.
pub fn run_profile(
    endpoint: &FtpEndpoint,
    profile: &BackupProfile,
    target: &Path,
    options: &MirrorOptions,
) -> Result<MirrorStats, MirrorError> {
    let exclusions = profile.exclusion_set();
    let connector = session_connector(endpoint.clone());
    let started = Instant::now();

    let mut stats = MirrorStats::default();
    for root in profile.data_paths() {
        let local_root = local_destination(target, &root);
        stats.merge(mirror_tree(
            &connector,
            options,
            &root,
            &local_root,
            &exclusions,
        )?);
    }

    info!(
        "profile done: {} mirrored, {} failed, {} skipped in {:.1}s",
        stats.mirrored,
        stats.failed,
        stats.skipped_dirs,
        started.elapsed().as_secs_f64()
    );
    Ok(stats)
}

/// Total bytes a run of this profile would transfer.
pub fn estimate_profile(
    endpoint: &FtpEndpoint,
    profile: &BackupProfile,
    retry: &RetryPolicy,
) -> Result<u64, MirrorError> {
    let exclusions = profile.exclusion_set();
    let mut session = FtpSession::open(endpoint, retry)?;

    let mut total = 0u64;
    for root in profile.data_paths() {
        total += walker::estimate_size(&mut session, &root, &exclusions)?;
    }
    Ok(total)
}

fn session_connector(
    endpoint: FtpEndpoint,
) -> Arc<impl Fn() -> Result<FtpSession, MirrorError> + Send + Sync + 'static> {
    Arc::new(move || FtpSession::open_once(&endpoint))
}
