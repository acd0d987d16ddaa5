use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use typed_builder::TypedBuilder;

use crate::{
    aggregate::RunStatistics,
    endpoint::{Endpoint, Overrides},
    error::{Error, Result},
    executor::{Executor, TickExecutor},
    expression::{ExpressionEngine, PcpEngine},
    metric::RequestMetric,
    report::{Reporter, RunReport},
    request::RequestExecutor,
    scenario::Scenario,
    validate::ResponseValidator,
};

/// Called when an endpoint with `failExit` set sees its first failure.
///
/// Receives the endpoint name and the error. The default,
/// [`abort_process`], never returns.
pub type FailFastHook = Arc<dyn Fn(&str, &Error) + Send + Sync>;

/// Exit code used when fail-fast stops the process.
pub const FAIL_FAST_EXIT_CODE: i32 = 1;

/// Default fail-fast hook: log and terminate the whole process. In-flight
/// work is not cancelled or drained.
pub fn abort_process(endpoint: &str, error: &Error) {
    tracing::error!(endpoint, %error, "fail-fast: aborting process");
    std::process::exit(FAIL_FAST_EXIT_CODE);
}

fn default_fail_fast() -> FailFastHook {
    Arc::new(abort_process)
}

fn default_engine() -> Arc<dyn ExpressionEngine> {
    Arc::new(PcpEngine)
}

/// Runs every selected endpoint, one after another, and reports each.
///
/// Per endpoint: a copy with the [`Overrides`] merged in is made, the request
/// executor and response validator are built from it (a bad descriptor is a
/// configuration error and the runner moves on), then a [`TickExecutor`] drives
/// it for `duration` ticks and the resulting [`RunReport`] goes to the
/// reporter.
#[derive(TypedBuilder)]
pub struct Runner<R> {
    endpoints: Vec<Endpoint>,
    #[builder(default)]
    overrides: Overrides,
    reporter: R,
    #[builder(default = default_engine())]
    engine: Arc<dyn ExpressionEngine>,
    #[builder(default = Duration::from_secs(1))]
    tick: Duration,
    #[builder(default = default_fail_fast())]
    on_fail_fast: FailFastHook,
}

impl<R: Reporter> Runner<R> {
    /// Runs the selected endpoints and returns their reports in order.
    ///
    /// Endpoints that fail to start are logged and left out of the result.
    pub async fn run(&self) -> Result<Vec<RunReport>> {
        let mut reports = Vec::new();

        for endpoint in self.endpoints.iter().filter(|e| self.overrides.selects(e)) {
            let endpoint = self.overrides.apply(endpoint);
            match self.run_endpoint(&endpoint).await {
                Ok(report) => {
                    self.reporter.report(&report).await?;
                    reports.push(report);
                }
                Err(error) => {
                    tracing::warn!(endpoint = %endpoint.name, %error, "Skipping endpoint");
                    if endpoint.fail_exit {
                        (self.on_fail_fast)(endpoint.name.as_str(), &error);
                    }
                }
            }
        }

        if let Some(only) = self.overrides.only.as_ref().filter(|_| reports.is_empty()) {
            tracing::warn!("No endpoint named {only} was run");
        }
        Ok(reports)
    }

    /// Runs a single endpoint as given; overrides are not applied here.
    pub async fn run_endpoint(&self, endpoint: &Endpoint) -> Result<RunReport> {
        let executor = Arc::new(RequestExecutor::new(endpoint)?);
        let validator = ResponseValidator::new(&endpoint.name, &endpoint.expect, self.engine.clone())?;

        tracing::info!(
            endpoint = %endpoint.name,
            method = %endpoint.method,
            url = %executor.url(),
            req_per_sec = endpoint.req_per_sec,
            duration = endpoint.duration,
            max_running_req = endpoint.max_running_req,
            "[api stress start]"
        );

        let name: Arc<str> = Arc::from(endpoint.name.as_str());
        let fail_fast = endpoint.fail_exit.then(|| self.on_fail_fast.clone());
        let action = move || {
            let executor = executor.clone();
            let validator = validator.clone();
            let name = name.clone();
            let fail_fast = fail_fast.clone();
            async move {
                let start = Instant::now();
                let outcome = executor.execute().await;
                let bytes = outcome.as_ref().map_or(0, |r| r.body.len());
                let verdict = validator.validate(outcome);
                let latency = start.elapsed();

                let error = verdict.err().map(|error| {
                    tracing::error!(endpoint = %name, %error, "[errored]");
                    if let Some(hook) = &fail_fast {
                        hook(name.as_ref(), &error);
                    }
                    error.to_string()
                });
                RequestMetric {
                    latency,
                    bytes,
                    error,
                }
            }
        };

        let scenario = Scenario::<RunStatistics, _, _>::builder()
            .name(endpoint.name.clone())
            .action(action)
            .build();
        let ticker = TickExecutor::builder()
            .rate(endpoint.req_per_sec)
            .ticks(endpoint.duration)
            .max_in_flight(endpoint.max_running_req)
            .tick(self.tick)
            .build();

        let started = Instant::now();
        let mut stats = ticker.exec(&scenario).await?;
        stats.wall_time = started.elapsed();

        Ok(RunReport::new(&endpoint.name, &stats))
    }
}
