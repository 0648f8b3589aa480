// Observability: metrics recorded by the pipeline and the use case

pub mod metrics;

pub use metrics::{init, MetricName};
