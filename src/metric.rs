use std::{fmt::Debug, time::Duration};

/// A `Metric` is a single observation produced by one unit of work.
///
/// Metrics are collected and summarized by an [`crate::Aggregate`], which in
/// turn feeds a [`crate::RunReport`]. They must be cheap to clone and safe to
/// hand across tasks.
pub trait Metric
where
    Self: Send + Sync + Clone + Debug,
{
    /// The observation recorded for a unit of work that panicked before
    /// producing its own metric. It must count as a failure.
    fn panicked(reason: String) -> Self;
}

/// Outcome of one admitted request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestMetric {
    /// Time from issuing the request to the end of validation.
    pub latency: Duration,
    /// Size of the response body, zero on transport failure.
    pub bytes: usize,
    /// Rendered failure, `None` when the response passed validation.
    pub error: Option<String>,
}

impl RequestMetric {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

impl Metric for RequestMetric {
    fn panicked(reason: String) -> Self {
        Self {
            latency: Duration::ZERO,
            bytes: 0,
            error: Some(format!("unit of work panicked: {reason}")),
        }
    }
}
