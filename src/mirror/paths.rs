//! Remote path normalization and remote-to-local path mapping.
//!
//! Remote paths are plain `/`-separated strings, always absolute. No trailing
//! slash is kept (except for the root itself), so joining a child name always
//! inserts exactly one separator.

use std::path::{Path, PathBuf};

/// Normalize a remote path to an absolute form without a trailing slash.
///
/// `"photos/dcim/"` becomes `"/photos/dcim"`, `"./photos"` becomes
/// `"/photos"`. The root stays `"/"`.
pub fn normalize_remote(path: &str) -> String {
    let trimmed = path.trim().trim_start_matches("./");
    let mut out = String::with_capacity(trimmed.len() + 1);
    if !trimmed.starts_with('/') {
        out.push('/');
    }
    out.push_str(trimmed);
    while out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

/// Join a child entry name onto an absolute remote directory path.
pub fn join_remote(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Map a remote path into the local target tree.
///
/// The leading `/` is stripped so the remote tree lands *inside* the target:
/// target `/backup` + remote `/a/b/c.txt` gives `/backup/a/b/c.txt`.
pub fn local_destination(target: &Path, remote: &str) -> PathBuf {
    target.join(remote.trim_start_matches('/'))
}

/// Extract the entry name from an NLST line.
///
/// Servers disagree on whether NLST returns bare names or full paths; take the
/// last component either way. Returns `None` for `.` / `..` and empty lines.
pub fn entry_name(raw: &str) -> Option<&str> {
    let name = raw.trim_end_matches('/').rsplit('/').next().unwrap_or(raw);
    match name {
        "" | "." | ".." => None,
        _ => Some(name),
    }
}
