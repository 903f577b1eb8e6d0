//! Analytics aggregation engine.
//!
//! - `metrics`: independent aggregate computations with per-metric defaults
//! - `orchestrator`: concurrent fan-out of a report kind's metric set
//! - `composer`: assembly of metric results into typed reports
//! - `derived`: comparisons and overlays computed from finished reports

pub mod composer;
pub mod derived;
pub mod metrics;
pub mod orchestrator;

pub use derived::{compare, percentage_change, RandomRealtime, RealtimeSource};
pub use metrics::{Metric, MetricValue};
pub use orchestrator::ReportEngine;
