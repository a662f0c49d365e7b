//! Data models for the mirroring engine.
//!
//! Contains the remote configuration document (`BackupProfiles` JSON), the
//! exclusion set, transfer tasks and run statistics.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use serde::Deserialize;

use super::paths::normalize_remote;

/// The whole `syncbak.conf.json` document as stored on the server.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(rename = "BackupProfiles")]
    pub profiles: BTreeMap<String, BackupProfile>,
}

impl SyncConfig {
    /// Resolve the active profile: an explicit name wins, otherwise a sole
    /// profile is picked implicitly.
    pub fn select(&self, name: Option<&str>) -> Option<(&str, &BackupProfile)> {
        if let Some(name) = name {
            return self
                .profiles
                .get_key_value(name)
                .map(|(k, v)| (k.as_str(), v));
        }
        if self.profiles.len() == 1 {
            return self
                .profiles
                .iter()
                .next()
                .map(|(k, v)| (k.as_str(), v));
        }
        None
    }
}

/// One named backup profile: root paths to mirror plus a denylist.
#[derive(Debug, Clone, Deserialize)]
pub struct BackupProfile {
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Data")]
    pub data: Vec<PathEntry>,
    #[serde(rename = "Exclude", default)]
    pub exclude: Vec<PathEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathEntry {
    #[serde(rename = "Path")]
    pub path: String,
}

impl BackupProfile {
    /// Normalized root paths, in document order.
    pub fn data_paths(&self) -> Vec<String> {
        self.data
            .iter()
            .map(|e| normalize_remote(&e.path))
            .collect()
    }

    pub fn exclusion_set(&self) -> ExclusionSet {
        ExclusionSet::new(self.exclude.iter().map(|e| e.path.as_str()))
    }
}

/// Exact-path denylist, checked at every recursion level.
///
/// Membership is plain string equality on the full accumulated remote path.
/// An excluded directory's descendants are skipped because the walkers never
/// descend into it, which must hold in both the structure and discovery
/// phases for the denylist to behave like a prefix match.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    paths: HashSet<String>,
}

impl ExclusionSet {
    pub fn new<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            paths: paths.into_iter().map(normalize_remote).collect(),
        }
    }

    pub fn contains(&self, remote: &str) -> bool {
        self.paths.contains(remote)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// One file transfer: remote source to local destination. Created during
/// discovery, consumed once by a pool worker.
#[derive(Debug, Clone)]
pub struct MirrorTask {
    pub remote: String,
    pub local: PathBuf,
}

/// Per-run counters, summed across all data roots of a profile.
#[derive(Debug, Default, Clone, Copy)]
pub struct MirrorStats {
    pub mirrored: u32,
    pub failed: u32,
    pub skipped_dirs: u32,
}

impl MirrorStats {
    pub fn merge(&mut self, other: MirrorStats) {
        self.mirrored += other.mirrored;
        self.failed += other.failed;
        self.skipped_dirs += other.skipped_dirs;
    }
}
