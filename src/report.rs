use std::{fmt, future::Future, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{aggregate::RunStatistics, error::Result};

/// Final summary of one endpoint run.
///
/// Reports are pure data derived from [`RunStatistics`]; delivering them
/// somewhere is the job of a [`Reporter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub name: String,
    pub total_run: usize,
    pub errored: usize,
    pub total_time_secs: f64,
    /// `None` when nothing was admitted.
    pub average_latency_ms: Option<f64>,
    pub total_bytes: usize,
}

impl RunReport {
    pub fn new(name: impl Into<String>, stats: &RunStatistics) -> Self {
        Self {
            name: name.into(),
            total_run: stats.admitted,
            errored: stats.failed,
            total_time_secs: stats.wall_time.as_secs_f64(),
            average_latency_ms: average(stats.total_latency, stats.admitted)
                .map(|d| d.as_nanos() as f64 / 1_000_000.0),
            total_bytes: stats.total_bytes,
        }
    }
}

fn average(total: Duration, count: usize) -> Option<Duration> {
    (count > 0).then(|| total.div_f64(count as f64))
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name = {} totalRun = {}, errored = {}, totalTime = {:.2} s, avgReqTime = ",
            self.name, self.total_run, self.errored, self.total_time_secs
        )?;
        match self.average_latency_ms {
            Some(ms) => write!(f, "{ms:.2} ms"),
            None => write!(f, "n/a"),
        }
    }
}

/// Delivers [`RunReport`]s to a sink: logs, stdout, a file, a service.
///
/// Reporters are the I/O boundary; everything upstream of them is plain data.
///
/// # Example
/// ```rust
/// use volley::{Reporter, RunReport};
///
/// struct Quiet;
///
/// impl Reporter for Quiet {
///     async fn report(&self, _report: &RunReport) -> volley::Result<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait Reporter {
    fn report(&self, report: &RunReport) -> impl Future<Output = Result<()>> + Send;
}

/// Emits each summary as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    async fn report(&self, report: &RunReport) -> Result<()> {
        tracing::info!(
            endpoint = %report.name,
            total_run = report.total_run,
            errored = report.errored,
            total_time_secs = report.total_time_secs,
            average_latency_ms = ?report.average_latency_ms,
            "[api stress result] {report}"
        );
        Ok(())
    }
}

/// Prints each summary as one JSON object per line on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReporter;

impl Reporter for JsonReporter {
    async fn report(&self, report: &RunReport) -> Result<()> {
        let line = serde_json::to_string(report)?;
        println!("{line}");
        Ok(())
    }
}
