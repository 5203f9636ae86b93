// Traits module
//
// All trait definitions used across the crate live here: the backend and
// source contracts the sampler consumes, the sink contract it produces into,
// and the pluggable pieces of the action policy.

pub mod action;
pub mod sink;
pub mod source;

pub use action::{ActionExecutor, OptimizationScorer};
pub use sink::Sink;
pub use source::{MetricBackend, MetricSource};

#[cfg(test)]
pub use action::MockActionExecutor;
#[cfg(test)]
pub use source::MockMetricBackend;
