//! Transfer scheduling: discovery walk plus the bounded worker pool.
//!
//! Discovery is a synchronous walk over one listing session that flattens the
//! remote tree into a task list; only leaf transfers ever reach the pool, so
//! listing can never starve transfer workers. Every worker opens a dedicated
//! session per attempt and reports back over an event channel.

use std::sync::Arc;
use std::thread;

use crossbeam_channel as channel;
use tracing::error;

use crate::base_system::retry::RetryPolicy;

use super::connection::{MirrorError, RemoteFs};
use super::models::{ExclusionSet, MirrorTask};
use super::paths::join_remote;
use super::transfer::{self, FileOutcome};

/// Half the reported hardware concurrency, at least one.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get() / 2)
        .unwrap_or(1)
        .max(1)
}

/// Flatten the remote tree under `remote_path` into transfer tasks.
///
/// Exclusion is checked against the full accumulated remote path at every
/// level, and the walk never enters an excluded directory — so no task is
/// ever produced for anything below one, matching the structure phase.
pub fn discover_tasks<R: RemoteFs>(
    fs_remote: &mut R,
    remote_path: &str,
    local_path: &std::path::Path,
    exclusions: &ExclusionSet,
) -> Result<Vec<MirrorTask>, MirrorError> {
    let mut tasks = Vec::new();
    discover_into(fs_remote, remote_path, local_path, exclusions, &mut tasks)?;
    Ok(tasks)
}

fn discover_into<R: RemoteFs>(
    fs_remote: &mut R,
    remote_path: &str,
    local_path: &std::path::Path,
    exclusions: &ExclusionSet,
    tasks: &mut Vec<MirrorTask>,
) -> Result<(), MirrorError> {
    for name in fs_remote.list(remote_path)? {
        let child_remote = join_remote(remote_path, &name);
        if exclusions.contains(&child_remote) {
            continue;
        }
        let child_local = local_path.join(&name);
        if fs_remote.is_directory(&child_remote) {
            discover_into(fs_remote, &child_remote, &child_local, exclusions, tasks)?;
        } else {
            tasks.push(MirrorTask {
                remote: child_remote,
                local: child_local,
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub enum TransferEvent {
    Done { remote: String },
    SkippedDirectory { remote: String },
    Failed { remote: String, error: String },
}

/// Bounded pool of transfer workers fed over an MPMC channel.
pub struct TransferPool {
    tx: Option<channel::Sender<MirrorTask>>,
    rx_evt: channel::Receiver<TransferEvent>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl TransferPool {
    pub fn new<R, C>(workers: usize, connector: Arc<C>, retry: RetryPolicy) -> Self
    where
        R: RemoteFs + 'static,
        C: Fn() -> Result<R, MirrorError> + Send + Sync + 'static,
    {
        let workers = workers.max(1);
        let (tx, rx) = channel::unbounded::<MirrorTask>();
        let (tx_evt, rx_evt) = channel::unbounded::<TransferEvent>();

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let rx = rx.clone();
            let tx_evt = tx_evt.clone();
            let connector = Arc::clone(&connector);

            handles.push(thread::spawn(move || {
                while let Ok(task) = rx.recv() {
                    let op_name = format!("mirror {}", task.remote);
                    let result = retry.run(&op_name, MirrorError::is_retryable, || {
                        let mut session = connector()?;
                        transfer::mirror_file(&mut session, &task)
                    });

                    let event = match result {
                        Ok(FileOutcome::Mirrored) => TransferEvent::Done {
                            remote: task.remote,
                        },
                        Ok(FileOutcome::SkippedDirectory) => TransferEvent::SkippedDirectory {
                            remote: task.remote,
                        },
                        Err(err) => {
                            error!("{err}");
                            TransferEvent::Failed {
                                remote: task.remote,
                                error: err.to_string(),
                            }
                        }
                    };
                    let _ = tx_evt.send(event);
                }
            }));
        }

        Self {
            tx: Some(tx),
            rx_evt,
            handles,
        }
    }

    pub fn submit(&self, task: MirrorTask) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(task);
        }
    }

    /// Blocks until `expected` events have been observed, handing each to the
    /// caller as it arrives.
    pub fn drain(&self, expected: usize, mut on_event: impl FnMut(TransferEvent)) {
        for _ in 0..expected {
            match self.rx_evt.recv() {
                Ok(event) => on_event(event),
                Err(_) => break,
            }
        }
    }

    pub fn shutdown(&mut self) {
        self.tx.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for TransferPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::fake::FakeRemote;
    use std::path::PathBuf;
    use std::time::Duration;

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn discovery_flattens_tree_and_honors_exclusions() {
        let mut fs = FakeRemote::new();
        fs.add_file("/d1/f1.txt", b"a");
        fs.add_file("/d1/sub/f2.txt", b"b");
        fs.add_file("/d1/keep/f3.txt", b"c");
        let exclusions = ExclusionSet::new(["/d1/sub"]);

        let tasks =
            discover_tasks(&mut fs, "/d1", &PathBuf::from("/out/d1"), &exclusions).unwrap();
        let remotes: Vec<&str> = tasks.iter().map(|t| t.remote.as_str()).collect();

        assert!(remotes.contains(&"/d1/f1.txt"));
        assert!(remotes.contains(&"/d1/keep/f3.txt"));
        // Nothing under the excluded directory is ever submitted.
        assert!(!remotes.iter().any(|r| r.starts_with("/d1/sub")));
        assert_eq!(
            tasks
                .iter()
                .find(|t| t.remote == "/d1/f1.txt")
                .unwrap()
                .local,
            PathBuf::from("/out/d1/f1.txt")
        );
    }

    #[test]
    fn excluded_file_never_becomes_a_task() {
        let mut fs = FakeRemote::new();
        fs.add_file("/d1/secret.txt", b"s");
        fs.add_file("/d1/plain.txt", b"p");
        let exclusions = ExclusionSet::new(["/d1/secret.txt"]);

        let tasks = discover_tasks(&mut fs, "/d1", &PathBuf::from("/out"), &exclusions).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].remote, "/d1/plain.txt");
    }

    #[test]
    fn pool_respects_worker_bound() {
        let mut fs = FakeRemote::new();
        for i in 0..8 {
            fs.add_file(&format!("/d1/f{i}.bin"), b"data");
        }
        fs.set_download_delay(Duration::from_millis(25));
        let out = tempfile::TempDir::new().unwrap();

        let tasks = discover_tasks(
            &mut fs.clone(),
            "/d1",
            &out.path().to_path_buf(),
            &ExclusionSet::default(),
        )
        .unwrap();
        let total = tasks.len();
        assert_eq!(total, 8);

        let fake = fs.clone();
        let connector = Arc::new(move || Ok(fake.clone()));
        let mut pool = TransferPool::new(2, connector, fast_retry(2));
        for task in tasks {
            pool.submit(task);
        }
        let mut done = 0;
        pool.drain(total, |evt| {
            if matches!(evt, TransferEvent::Done { .. }) {
                done += 1;
            }
        });
        pool.shutdown();

        assert_eq!(done, 8);
        assert!(
            fs.max_concurrent_downloads() <= 2,
            "observed {} concurrent downloads",
            fs.max_concurrent_downloads()
        );
    }

    #[test]
    fn failed_file_is_reported_not_fatal() {
        let mut fs = FakeRemote::new();
        fs.add_file("/d1/ok.txt", b"fine");
        fs.add_file("/d1/bad.txt", b"never");
        fs.fail_downloads("/d1/bad.txt", u32::MAX);
        let out = tempfile::TempDir::new().unwrap();

        let tasks = discover_tasks(
            &mut fs.clone(),
            "/d1",
            &out.path().to_path_buf(),
            &ExclusionSet::default(),
        )
        .unwrap();

        let fake = fs.clone();
        let connector = Arc::new(move || Ok(fake.clone()));
        let mut pool = TransferPool::new(1, connector, fast_retry(3));
        let total = tasks.len();
        for task in tasks {
            pool.submit(task);
        }
        let mut failed = Vec::new();
        let mut done = 0;
        pool.drain(total, |evt| match evt {
            TransferEvent::Failed { remote, .. } => failed.push(remote),
            TransferEvent::Done { .. } => done += 1,
            TransferEvent::SkippedDirectory { .. } => {}
        });
        pool.shutdown();

        assert_eq!(done, 1);
        assert_eq!(failed, vec!["/d1/bad.txt".to_string()]);
        // Bounded attempts: the broken file was tried exactly 3 times.
        assert_eq!(fs.download_attempts("/d1/bad.txt"), 3);
    }

    #[test]
    fn default_worker_count_is_at_least_one() {
        assert!(default_workers() >= 1);
    }
}
