//! Bounded concurrent batch execution.
//!
//! Takes a snapshot of work items and drives a per-item unit across a
//! fixed-width worker pool. Each unit persists its own result, so partial
//! progress is always valid. Cancellation is cooperative: it stops new units
//! from being dispatched and lets units already running finish on their own
//! (their external calls carry their own timeouts). No unit failure aborts
//! the batch.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default worker-pool width.
pub const DEFAULT_WORKERS: usize = 8;

/// How a completed unit of work ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    /// The unit produced a positive result (resolved, confirmed, ...).
    Hit,
    /// The unit completed without a confident result; it stays eligible
    /// for a future run.
    Miss,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    /// Units that actually ran (hits + misses + failures).
    pub processed: usize,
    pub hits: usize,
    pub misses: usize,
    /// Units that returned an error (e.g. a persistence failure).
    pub failed: usize,
    /// Units never dispatched because the batch was cancelled.
    pub skipped: usize,
}

pub struct BatchRunner {
    workers: usize,
    cancel: CancellationToken,
}

impl BatchRunner {
    pub fn new(workers: usize, cancel: CancellationToken) -> Self {
        Self {
            workers: workers.max(1),
            cancel,
        }
    }

    /// Run `work` over every item with at most `workers` units in flight.
    pub async fn run<T, F, Fut>(&self, label: &str, items: Vec<T>, work: F) -> BatchSummary
    where
        T: std::fmt::Display + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<UnitOutcome>> + Send + 'static,
    {
        let total = items.len();
        let mut summary = BatchSummary {
            total,
            ..Default::default()
        };
        if total == 0 {
            info!("{}: nothing to do", label);
            return summary;
        }

        info!("{}: {} items across {} workers", label, total, self.workers);

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let work = Arc::new(work);
        let started = Instant::now();

        let mut tasks = JoinSet::new();
        for item in items {
            let semaphore = Arc::clone(&semaphore);
            let cancel = self.cancel.clone();
            let work = Arc::clone(&work);
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("worker semaphore closed");
                // Checked after the permit so a cancel during a long batch
                // stops everything still waiting in line
                if cancel.is_cancelled() {
                    return None;
                }
                let name = item.to_string();
                let result = (work.as_ref())(item).await;
                Some((name, result))
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let unit = match joined {
                Ok(unit) => unit,
                Err(err) => {
                    warn!("{}: worker panicked: {}", label, err);
                    summary.processed += 1;
                    summary.failed += 1;
                    continue;
                }
            };
            let Some((name, result)) = unit else {
                summary.skipped += 1;
                continue;
            };
            summary.processed += 1;

            let eta = eta_minutes(started, summary.processed, total - summary.skipped);
            match result {
                Ok(UnitOutcome::Hit) => {
                    summary.hits += 1;
                    info!(
                        "[{}/{}] {} done{}",
                        summary.processed, total, name, eta
                    );
                }
                Ok(UnitOutcome::Miss) => {
                    summary.misses += 1;
                    info!(
                        "[{}/{}] {} no match{}",
                        summary.processed, total, name, eta
                    );
                }
                Err(err) => {
                    summary.failed += 1;
                    warn!(
                        "[{}/{}] {} failed: {}{}",
                        summary.processed, total, name, err, eta
                    );
                }
            }
        }

        let elapsed_min = started.elapsed().as_secs_f64() / 60.0;
        info!(
            "{} finished: {}/{} hits, {} misses, {} failed, {} skipped in {:.1} min",
            label, summary.hits, summary.total, summary.misses, summary.failed, summary.skipped,
            elapsed_min
        );
        summary
    }
}

/// " (eta 1.2 min)" from average unit time so far, or empty once done.
fn eta_minutes(started: Instant, processed: usize, effective_total: usize) -> String {
    if processed == 0 || processed >= effective_total {
        return String::new();
    }
    let avg_secs = started.elapsed().as_secs_f64() / processed as f64;
    let remaining = (effective_total - processed) as f64 * avg_secs / 60.0;
    format!(" (eta {:.1} min)", remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_counts_hits_misses_and_failures() {
        let runner = BatchRunner::new(4, CancellationToken::new());
        let items: Vec<usize> = (0..9).collect();

        let summary = runner
            .run("test batch", items, |n| async move {
                match n % 3 {
                    0 => Ok(UnitOutcome::Hit),
                    1 => Ok(UnitOutcome::Miss),
                    _ => Err(anyhow!("unit {} broke", n)),
                }
            })
            .await;

        assert_eq!(summary.total, 9);
        assert_eq!(summary.processed, 9);
        assert_eq!(summary.hits, 3);
        assert_eq!(summary.misses, 3);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.skipped, 0);
    }

    #[tokio::test]
    async fn test_unit_failure_does_not_abort_batch() {
        let runner = BatchRunner::new(2, CancellationToken::new());
        let completed = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&completed);
        let summary = runner
            .run("test batch", vec![1, 2, 3, 4], move |n| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if n == 1 {
                        Err(anyhow!("boom"))
                    } else {
                        Ok(UnitOutcome::Hit)
                    }
                }
            })
            .await;

        assert_eq!(completed.load(Ordering::SeqCst), 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.hits, 3);
    }

    #[tokio::test]
    async fn test_cancelled_batch_dispatches_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let runner = BatchRunner::new(4, cancel);
        let ran = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&ran);
        let summary = runner
            .run("test batch", vec![1, 2, 3], move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(UnitOutcome::Hit)
                }
            })
            .await;

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.skipped, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_pool_width_bounds_concurrency() {
        let runner = BatchRunner::new(3, CancellationToken::new());
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let in_flight_ref = Arc::clone(&in_flight);
        let peak_ref = Arc::clone(&peak);
        let summary = runner
            .run("test batch", (0..12).collect(), move |_| {
                let in_flight = Arc::clone(&in_flight_ref);
                let peak = Arc::clone(&peak_ref);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(UnitOutcome::Hit)
                }
            })
            .await;

        assert_eq!(summary.hits, 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let runner = BatchRunner::new(4, CancellationToken::new());
        let summary = runner
            .run("test batch", Vec::<usize>::new(), |_| async move {
                Ok(UnitOutcome::Hit)
            })
            .await;
        assert_eq!(summary, BatchSummary::default());
    }

    #[test]
    fn test_eta_formula() {
        let started = Instant::now() - Duration::from_secs(60);
        // 2 of 6 done in 60s -> 4 remaining at 30s each -> 2 minutes
        let eta = eta_minutes(started, 2, 6);
        assert_eq!(eta, " (eta 2.0 min)");

        assert_eq!(eta_minutes(started, 6, 6), "");
        assert_eq!(eta_minutes(started, 0, 6), "");
    }
}
