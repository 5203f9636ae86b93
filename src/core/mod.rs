// Core modules
pub mod metrics;
pub mod types;

/// Core prelude module that re-exports commonly used types
pub mod prelude {
    pub use super::metrics::{ProcessInfo, Reading};
    pub use super::types::{Comparison, MetricId, Resource, Severity, Unit};
}
