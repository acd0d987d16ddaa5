use std::{fmt::Debug, time::Duration};

use crate::metric::{Metric, RequestMetric};

/// Collects [`Metric`]s into a compact summary.
///
/// Aggregates keep raw counters and sums only. Derived values such as averages
/// are computed later by [`crate::RunReport`], which is why a run that admitted
/// nothing never divides by zero here.
///
/// Units of work complete in any order, so `consume` must not depend on the
/// order metrics arrive in.
pub trait Aggregate
where
    Self: Send + Sync + Debug + Clone,
{
    /// The metric type this aggregate summarizes.
    type Metric: Metric;

    /// Create a new, empty instance of the aggregate.
    fn new() -> Self;

    /// Incorporate a single metric into the aggregate.
    fn consume(&mut self, metric: &Self::Metric);
}

/// Per-run counters for one endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatistics {
    /// Requests that got a limiter slot and finished, normally or by panicking.
    pub admitted: usize,
    /// Admitted requests that hit a transport or validation error.
    pub failed: usize,
    /// Sum of per-request latencies.
    pub total_latency: Duration,
    pub total_bytes: usize,
    /// Wall-clock time of the whole run, draining included.
    pub wall_time: Duration,
}

impl Aggregate for RunStatistics {
    type Metric = RequestMetric;

    fn new() -> Self {
        Self::default()
    }

    fn consume(&mut self, metric: &Self::Metric) {
        self.admitted += 1;
        self.total_latency += metric.latency;
        self.total_bytes += metric.bytes;
        if !metric.success() {
            self.failed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(ms: u64, error: Option<&str>) -> RequestMetric {
        RequestMetric {
            latency: Duration::from_millis(ms),
            bytes: 2,
            error: error.map(str::to_owned),
        }
    }

    #[test]
    fn counts_failures_and_sums_latency() {
        let mut stats = RunStatistics::new();
        for m in [metric(10, None), metric(30, Some("boom")), metric(20, None)] {
            stats.consume(&m);
        }

        assert_eq!(stats.admitted, 3);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total_latency, Duration::from_millis(60));
        assert_eq!(stats.total_bytes, 6);
    }

    #[test]
    fn panicked_units_count_as_failed() {
        let mut stats = RunStatistics::new();
        stats.consume(&metric(10, None));
        stats.consume(&RequestMetric::panicked("hook aborted".to_owned()));

        assert_eq!(stats.admitted, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total_bytes, 2);
    }
}
