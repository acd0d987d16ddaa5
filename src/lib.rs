//! Volley: rate-capped HTTP load generation with per-response verification.
//!
//! Give volley a list of endpoint descriptors and it drives each one, in turn,
//! at a target number of requests per second for a fixed number of seconds,
//! never letting more than a configured number of requests be in flight. Every
//! response is checked against an expectation (an accepted status set plus a
//! body check), and each endpoint ends with a summary: requests issued,
//! failures, wall-clock time and mean latency.
//!
//! # Architecture
//!
//! The main building blocks are:
//!
//! - [`Endpoint`]: declarative description of one API under test, usually
//!   loaded from a [`StressConfig`] file.
//! - [`ConcurrencyLimiter`]: non-blocking admission gate bounding requests in
//!   flight.
//! - [`RequestExecutor`]: builds and sends one request, drains the response.
//! - [`ResponseValidator`]: checks status and body (`equal`, `equal_json`,
//!   `reg` or `pcp`, the last one running a program through an
//!   [`ExpressionEngine`]).
//! - [`Executor`]: runs a [`Scenario`]. The built-in [`TickExecutor`] fires a
//!   batch of admissions per tick and drains outstanding work at the end.
//! - [`Metric`] and [`Aggregate`]: per-request observations and the per-run
//!   [`RunStatistics`] they fold into.
//! - [`RunReport`] and [`Reporter`]: the final summary and where it goes.
//! - [`Runner`]: ties it together across endpoints, applying [`Overrides`]
//!   and the fail-fast policy.
//!
//! # Example
//!
//! ```rust,no_run
//! use volley::{LogReporter, Overrides, Runner, StressConfig};
//!
//! #[tokio::main]
//! async fn main() -> volley::Result<()> {
//!     let config = StressConfig::from_path("stress_conf.json")?;
//!     let reports = Runner::builder()
//!         .endpoints(config.apis)
//!         .overrides(Overrides::builder().host("staging.internal:8080").build())
//!         .reporter(LogReporter)
//!         .build()
//!         .run()
//!         .await?;
//!     println!("{} endpoints done", reports.len());
//!     Ok(())
//! }
//! ```

/// Metric aggregators
pub mod aggregate;
/// Config file loading
pub mod config;
/// Endpoint descriptors and run overrides
pub mod endpoint;
pub mod error;
/// Orchestrators that define how things will actually run
pub mod executor;
/// Embedded expression language used by `pcp` body checks
pub mod expression;
/// Admission control
pub mod limiter;
/// Single metrics
pub mod metric;
/// Reports and Reporters
pub mod report;
/// Issuing requests
pub mod request;
/// Sequential multi-endpoint driver
pub mod runner;
/// Glue between an action and an executor
pub mod scenario;
/// Response verification
pub mod validate;

pub use aggregate::{Aggregate, RunStatistics};
pub use config::StressConfig;
pub use endpoint::{Endpoint, Expectation, Overrides, RequestBody};
pub use error::{Error, Result};
pub use executor::{Executor, TickExecutor};
pub use expression::{ExpressionEngine, Host, PcpEngine};
pub use limiter::{Admission, ConcurrencyLimiter};
pub use metric::{Metric, RequestMetric};
pub use report::{JsonReporter, LogReporter, Reporter, RunReport};
pub use request::{HttpResponse, Outcome, RequestExecutor};
pub use runner::{FailFastHook, Runner, abort_process};
pub use scenario::Scenario;
pub use validate::{BodyMode, ResponseValidator};
