//! Observability: runtime counters and the sink boundary that feeds them.
//!
//! Cursor and grouping code never touches counter state directly; it emits
//! [`MetricsEvent`]s through [`sink`].

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};
