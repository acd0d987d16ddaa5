//! Executor: orchestration of runtime execution and rate control
//!
//! The `Executor` trait is the runtime that executes a `Scenario`. Different
//! executors provide different execution strategies.
//!
//! The built-in [`TickExecutor`] fires a fixed batch of admission attempts
//! once per tick through a [`crate::ConcurrencyLimiter`], then waits for every
//! admitted unit of work before handing back the aggregate.
pub mod tick;
pub use tick::TickExecutor;

use crate::{aggregate::Aggregate, scenario::Scenario};
use std::future::Future;

/// The runtime hook that executes a `Scenario`.
///
/// This trait is generic over the aggregate, action, and future types to remain
/// flexible and composable.
pub trait Executor<A, F, Fut>
where
    Self: Send + Sync + Sized,
    A: Aggregate,
    F: Fn() -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = A::Metric> + Send,
{
    type Error;
    /// Execute the scenario and return the final aggregate.
    ///
    /// Implementations must not return before every unit of work they started
    /// has finished.
    fn exec(
        &self,
        scenario: &Scenario<A, F, Fut>,
    ) -> impl Future<Output = Result<A, Self::Error>> + Send;
}
