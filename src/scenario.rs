use std::{future::Future, marker::PhantomData};

use typed_builder::TypedBuilder;

use crate::aggregate::Aggregate;

/// A named action to be driven by an [`crate::Executor`].
///
/// The action is called once per admitted unit of work and must resolve to
/// the metric the aggregate `A` consumes. Build anything heavy (clients,
/// compiled patterns) outside the action and capture it.
#[derive(Debug, Clone, TypedBuilder)]
pub struct Scenario<A, F, Fut>
where
    A: Aggregate,
    F: Fn() -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = A::Metric> + Send,
{
    #[builder(setter(into))]
    pub name: String,
    pub action: F,
    #[builder(default, setter(skip))]
    _marker: PhantomData<fn() -> (A, Fut)>,
}
