//! In-memory remote tree used by engine tests.
//!
//! Clones share the same tree through an `Arc`, so a "connector" in tests is
//! just `move || Ok(fake.clone())` — every worker gets its own handle the way
//! production workers get their own FTP session.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::connection::{MirrorError, RemoteFs};
use super::paths::join_remote;

#[derive(Default)]
struct Inner {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    /// Remaining failures per path; `u32::MAX` fails forever.
    failures: BTreeMap<String, u32>,
    download_delay: Duration,
    active_downloads: usize,
    max_active_downloads: usize,
    download_attempts: BTreeMap<String, u32>,
}

#[derive(Clone, Default)]
pub struct FakeRemote {
    inner: Arc<Mutex<Inner>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.inner.lock().unwrap().dirs.insert("/".to_string());
        fake
    }

    pub fn add_dir(&mut self, path: &str) {
        let mut inner = self.inner.lock().unwrap();
        add_parents(&mut inner.dirs, path);
        inner.dirs.insert(path.to_string());
    }

    pub fn add_file(&mut self, path: &str, content: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        add_parents(&mut inner.dirs, path);
        inner.files.insert(path.to_string(), content.to_vec());
    }

    /// Make the next `count` downloads of `path` fail (`u32::MAX` = forever).
    pub fn fail_downloads(&mut self, path: &str, count: u32) {
        self.inner
            .lock()
            .unwrap()
            .failures
            .insert(path.to_string(), count);
    }

    pub fn set_download_delay(&mut self, delay: Duration) {
        self.inner.lock().unwrap().download_delay = delay;
    }

    pub fn download_attempts(&self, path: &str) -> u32 {
        self.inner
            .lock()
            .unwrap()
            .download_attempts
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    pub fn max_concurrent_downloads(&self) -> usize {
        self.inner.lock().unwrap().max_active_downloads
    }
}

fn add_parents(dirs: &mut BTreeSet<String>, path: &str) {
    let mut current = String::new();
    for part in path.trim_start_matches('/').split('/') {
        dirs.insert(if current.is_empty() {
            "/".to_string()
        } else {
            current.clone()
        });
        current = join_remote(if current.is_empty() { "/" } else { &current }, part);
    }
}

impl RemoteFs for FakeRemote {
    fn list(&mut self, path: &str) -> Result<Vec<String>, MirrorError> {
        let inner = self.inner.lock().unwrap();
        if !inner.dirs.contains(path) {
            return Err(MirrorError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
            ));
        }
        let mut names = Vec::new();
        for candidate in inner.dirs.iter().chain(inner.files.keys()) {
            let (parent, name) = match candidate.rfind('/') {
                Some(0) if candidate.len() > 1 => ("/", &candidate[1..]),
                Some(idx) => (&candidate[..idx], &candidate[idx + 1..]),
                _ => continue,
            };
            if parent == path && !name.is_empty() {
                names.push(name.to_string());
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn is_directory(&mut self, path: &str) -> bool {
        self.inner.lock().unwrap().dirs.contains(path)
    }

    fn exists(&mut self, path: &str) -> Result<bool, MirrorError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.dirs.contains(path) || inner.files.contains_key(path))
    }

    fn size(&mut self, path: &str) -> Result<u64, MirrorError> {
        let inner = self.inner.lock().unwrap();
        inner
            .files
            .get(path)
            .map(|c| c.len() as u64)
            .ok_or_else(|| MirrorError::Vanished(path.to_string()))
    }

    fn download(&mut self, path: &str) -> Result<Vec<u8>, MirrorError> {
        let delay;
        {
            let mut inner = self.inner.lock().unwrap();
            *inner.download_attempts.entry(path.to_string()).or_insert(0) += 1;
            inner.active_downloads += 1;
            inner.max_active_downloads = inner.max_active_downloads.max(inner.active_downloads);
            delay = inner.download_delay;
        }
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        let mut inner = self.inner.lock().unwrap();
        inner.active_downloads -= 1;

        if let Some(remaining) = inner.failures.get_mut(path) {
            if *remaining > 0 {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
                return Err(MirrorError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::ConnectionReset, "injected fault"),
                ));
            }
        }

        inner
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| MirrorError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            ))
    }
}
