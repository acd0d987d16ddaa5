//! The `TickExecutor`: fixed-rate, batch-per-tick execution bounded by a
//! concurrency limit.
//!
//! # High-level flow
//! 1. A fresh [`ConcurrencyLimiter`] sized to `max_in_flight` and an empty
//!    aggregate guarded by a mutex are created for the run.
//! 2. For each of `ticks` ticks, `rate` admission attempts are made back to
//!    back. Every granted slot spawns one Tokio task that calls the action,
//!    consumes its metric into the shared aggregate and drops the slot.
//!    Denied attempts are skipped: they are neither queued nor retried.
//! 3. After each batch the executor sleeps a flat `tick`. The delay is not
//!    corrected for the time the batch took, and requests are not spread
//!    within a tick; start times cluster at tick boundaries.
//! 4. Once the ticks are exhausted the executor waits for every spawned task
//!    (draining) and returns the aggregate. A task that panicked is recorded
//!    as a failed unit through [`Metric::panicked`].
//!
//! The limiter and the aggregate lock are the only shared state, and neither
//! is held across the action's I/O.
use std::{future::Future, sync::Arc, time::Duration};

use futures::future::join_all;
use tokio::{sync::Mutex, task::JoinHandle};
use typed_builder::TypedBuilder;

use super::Executor;
use crate::{
    aggregate::Aggregate,
    error::Error,
    limiter::{Admission, ConcurrencyLimiter},
    metric::Metric,
    scenario::Scenario,
};

/// Executor issuing up to `rate` requests per tick for `ticks` ticks.
///
/// # Example
/// ```rust,no_run
/// use std::time::Duration;
/// use volley::{Executor, RequestMetric, RunStatistics, Scenario, TickExecutor};
///
/// # async fn demo() -> volley::Result<()> {
/// let stats: RunStatistics = TickExecutor::builder()
///     .rate(10)
///     .ticks(5)
///     .max_in_flight(20)
///     .build()
///     .exec(
///         &Scenario::builder()
///             .name("noop")
///             .action(|| async {
///                 RequestMetric { latency: Duration::ZERO, bytes: 0, error: None }
///             })
///             .build(),
///     )
///     .await?;
/// assert_eq!(stats.admitted, 50);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct TickExecutor {
    /// Admission attempts per tick.
    pub rate: usize,
    /// Number of ticks the run lasts.
    pub ticks: u64,
    /// Capacity of the run's concurrency limiter.
    pub max_in_flight: usize,
    /// Pause between batches.
    #[builder(default = Duration::from_secs(1))]
    pub tick: Duration,
}

impl<A, F, Fut> Executor<A, F, Fut> for TickExecutor
where
    Self: Send + Sync + Sized,
    A: Aggregate + 'static,
    F: Fn() -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = A::Metric> + Send + 'static,
{
    type Error = Error;

    async fn exec(&self, scenario: &Scenario<A, F, Fut>) -> Result<A, Self::Error> {
        let limiter = ConcurrencyLimiter::new(self.max_in_flight);
        let agg = Arc::new(Mutex::new(A::new()));
        let mut handles = Vec::new();

        tracing::info!(
            "Running scenario: {} ({} x {} ticks, at most {} in flight)",
            scenario.name,
            self.rate,
            self.ticks,
            limiter.capacity()
        );

        for i in 1..=self.ticks {
            let before = handles.len();
            for _ in 0..self.rate {
                if let Some(admission) = limiter.try_admit() {
                    handles.push(spawn_unit(admission, scenario.action.clone(), agg.clone()));
                }
            }
            tracing::debug!(
                "Tick {i}/{}: admitted {}/{}, {} in flight",
                self.ticks,
                handles.len() - before,
                self.rate,
                limiter.in_flight()
            );
            tokio::time::sleep(self.tick).await;
        }

        tracing::info!("Draining {} units of work...", handles.len());
        for res in join_all(handles).await {
            if let Err(e) = res {
                tracing::error!("Unit of work panicked: {e}");
                agg.lock().await.consume(&<A::Metric as Metric>::panicked(e.to_string()));
            }
        }

        let agg = match Arc::try_unwrap(agg) {
            Ok(agg) => agg.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        };
        tracing::info!("Done running scenario: {}!", scenario.name);
        Ok(agg)
    }
}

/// Runs one admitted unit of work. The admission is dropped, and the slot
/// released, however the task ends.
fn spawn_unit<A, F, Fut>(admission: Admission, action: F, agg: Arc<Mutex<A>>) -> JoinHandle<()>
where
    A: Aggregate + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = A::Metric> + Send + 'static,
{
    tokio::spawn(async move {
        let _admission = admission;
        let metric = action().await;
        agg.lock().await.consume(&metric);
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{aggregate::RunStatistics, metric::RequestMetric};

    fn executor(rate: usize, ticks: u64, max_in_flight: usize) -> TickExecutor {
        TickExecutor::builder()
            .rate(rate)
            .ticks(ticks)
            .max_in_flight(max_in_flight)
            .tick(Duration::from_millis(20))
            .build()
    }

    fn scenario<F, Fut>(action: F) -> Scenario<RunStatistics, F, Fut>
    where
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = RequestMetric> + Send,
    {
        Scenario::builder().name("test").action(action).build()
    }

    fn ok() -> RequestMetric {
        RequestMetric {
            latency: Duration::from_millis(1),
            bytes: 2,
            error: None,
        }
    }

    fn aborting() -> RequestMetric {
        panic!("hook aborted")
    }

    #[tokio::test]
    async fn admits_rate_times_ticks_when_capacity_allows() {
        let stats = executor(5, 2, 10)
            .exec(&scenario(|| async { ok() }))
            .await
            .unwrap();

        assert_eq!(stats.admitted, 10);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.total_bytes, 20);
    }

    #[tokio::test]
    async fn zero_rate_admits_nothing() {
        let stats = executor(0, 3, 10)
            .exec(&scenario(|| async { ok() }))
            .await
            .unwrap();

        assert_eq!(stats, RunStatistics::default());
    }

    #[tokio::test]
    async fn denied_admissions_are_skipped_not_queued() {
        // Each unit outlives the whole run, so only the first tick's batch
        // up to capacity gets in.
        let stats = executor(10, 3, 4)
            .exec(&scenario(|| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                ok()
            }))
            .await
            .unwrap();

        assert_eq!(stats.admitted, 4);
    }

    #[tokio::test]
    async fn in_flight_never_exceeds_capacity() {
        let live = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let action = {
            let (live, peak) = (live.clone(), peak.clone());
            move || {
                let (live, peak) = (live.clone(), peak.clone());
                async move {
                    let now = live.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    live.fetch_sub(1, Ordering::SeqCst);
                    ok()
                }
            }
        };

        let stats = executor(8, 4, 3).exec(&scenario(action)).await.unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(stats.admitted >= 3);
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failures_are_counted() {
        let calls = Arc::new(AtomicUsize::new(0));
        let action = {
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    RequestMetric {
                        error: (n % 2 == 0).then(|| "boom".to_owned()),
                        ..ok()
                    }
                }
            }
        };

        let stats = executor(4, 1, 4).exec(&scenario(action)).await.unwrap();

        assert_eq!(stats.admitted, 4);
        assert_eq!(stats.failed, 2);
    }

    #[tokio::test]
    async fn panicked_units_are_counted_as_failures() {
        let stats = executor(3, 1, 3)
            .exec(&scenario(|| async { aborting() }))
            .await
            .unwrap();

        assert_eq!(stats.admitted, 3);
        assert_eq!(stats.failed, 3);
        assert_eq!(stats.total_bytes, 0);
    }
}
