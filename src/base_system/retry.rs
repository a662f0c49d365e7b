//! Cooldown/backoff retry policy for network operations.
//!
//! Every FTP operation goes through [`RetryPolicy::run`] with a caller-supplied
//! classification closure, so terminal errors (missing remote path, broken
//! config) escape immediately while transient ones are retried with
//! exponential backoff. `max_attempts = 0` restores the legacy retry-forever
//! behavior for links that are flaky but always come back.

use std::fmt::Display;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Upper bound on attempts; 0 means retry until the operation succeeds.
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("{op}: {source}")]
    Terminal { op: String, source: E },
    #[error("{op}: gave up after {attempts} attempts: {source}")]
    Exhausted { op: String, attempts: u32, source: E },
}

impl<E> RetryError<E> {
    pub fn into_source(self) -> E {
        match self {
            RetryError::Terminal { source, .. } | RetryError::Exhausted { source, .. } => source,
        }
    }
}

impl RetryPolicy {
    /// Fixed half-second delay, no cap on attempts. What the original LAN
    /// backup did for every network call.
    pub fn legacy() -> Self {
        Self {
            max_attempts: 0,
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(500),
        }
    }

    /// Run `op` until it succeeds, a terminal error occurs, or attempts run
    /// out. `retryable` decides which errors are worth another attempt.
    pub fn run<T, E, F>(
        &self,
        op_name: &str,
        retryable: impl Fn(&E) -> bool,
        mut op: F,
    ) -> Result<T, RetryError<E>>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
    {
        let mut delay = self.min_delay.max(Duration::from_millis(1));
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if !retryable(&err) => {
                    return Err(RetryError::Terminal {
                        op: op_name.to_string(),
                        source: err,
                    });
                }
                Err(err) => {
                    if self.max_attempts != 0 && attempt >= self.max_attempts {
                        return Err(RetryError::Exhausted {
                            op: op_name.to_string(),
                            attempts: attempt,
                            source: err,
                        });
                    }
                    let wait = jittered(delay);
                    warn!(
                        "{op_name} failed (attempt {attempt}): {err}; retrying in {}ms",
                        wait.as_millis()
                    );
                    std::thread::sleep(wait);
                    delay = (delay * 2).min(self.max_delay);
                }
            }
        }
    }
}

/// Add up to 25% of clock-derived jitter so parallel workers retrying the
/// same dead server do not thunder in lockstep.
fn jittered(delay: Duration) -> Duration {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    let span = (delay.as_millis() as u64 / 4).max(1);
    delay + Duration::from_millis(nanos % span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let mut remaining_failures = 3;
        let result: Result<&str, _> = fast(10).run("op", |_: &String| true, || {
            if remaining_failures > 0 {
                remaining_failures -= 1;
                Err("flaky".to_string())
            } else {
                Ok("done")
            }
        });
        assert_eq!(result.unwrap(), "done");
    }

    #[test]
    fn bounded_policy_gives_up_with_attempt_count() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast(3).run("op", |_: &String| true, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("down".to_string())
        });
        match result {
            Err(RetryError::Exhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn terminal_errors_escape_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast(10).run("op", |_: &String| false, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("gone forever".to_string())
        });
        assert!(matches!(result, Err(RetryError::Terminal { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// The unlimited policy never terminates on a permanently failing
    /// operation; observable only as "keeps retrying within a window".
    #[test]
    fn unlimited_policy_keeps_retrying_without_terminating() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_thread = Arc::clone(&calls);
        let (tx, rx) = crossbeam_channel::bounded::<()>(1);

        // Detached on purpose; the loop inside runs forever by contract.
        std::thread::spawn(move || {
            let _: Result<(), _> = fast(0).run("op", |_: &String| true, || {
                calls_in_thread.fetch_add(1, Ordering::SeqCst);
                Err("unreachable host".to_string())
            });
            let _ = tx.send(());
        });

        let started = Instant::now();
        while calls.load(Ordering::SeqCst) < 5 && started.elapsed() < Duration::from_secs(2) {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(calls.load(Ordering::SeqCst) >= 5, "expected repeated retries");
        assert!(rx.try_recv().is_err(), "unlimited retry must not terminate");
    }

    #[test]
    fn backoff_delay_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 4,
            min_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(20),
        };
        let started = Instant::now();
        let _: Result<(), _> = policy.run("op", |_: &String| true, || Err("x".to_string()));
        // Waits: ~10 + ~20 + ~20 (3 sleeps for 4 attempts), jitter adds up to 25%.
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
