//! Metrics sink boundary.
//!
//! Cursor logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.

use crate::obs::metrics;
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<&'static dyn MetricsSink>> = const { RefCell::new(None) };
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    SessionBegin { joined: bool },
    UnsupportedBackend,
    CursorDeclared,
    RowFetched,
    GroupEmitted { rows: u64 },
    EntityEmitted,
    CursorClosed,
    EarlyStop,
    CleanupFailed,
    DropCleanup,
    PlainQuery { rows: u64 },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default process-local sink that writes into the thread-local counters.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        metrics::with_state_mut(|m| match event {
            MetricsEvent::SessionBegin { joined } => {
                m.sessions_begun = m.sessions_begun.saturating_add(1);
                if joined {
                    m.sessions_joined = m.sessions_joined.saturating_add(1);
                }
            }
            MetricsEvent::UnsupportedBackend => {
                m.unsupported_backend = m.unsupported_backend.saturating_add(1);
            }
            MetricsEvent::CursorDeclared => {
                m.cursors_declared = m.cursors_declared.saturating_add(1);
            }
            MetricsEvent::RowFetched => m.rows_fetched = m.rows_fetched.saturating_add(1),
            MetricsEvent::GroupEmitted { rows } => {
                m.groups_emitted = m.groups_emitted.saturating_add(1);
                m.max_group_rows = m.max_group_rows.max(rows);
            }
            MetricsEvent::EntityEmitted => {
                m.entities_emitted = m.entities_emitted.saturating_add(1);
            }
            MetricsEvent::CursorClosed => m.cursors_closed = m.cursors_closed.saturating_add(1),
            MetricsEvent::EarlyStop => m.early_stops = m.early_stops.saturating_add(1),
            MetricsEvent::CleanupFailed => {
                m.cleanup_failures = m.cleanup_failures.saturating_add(1);
            }
            MetricsEvent::DropCleanup => m.drop_cleanups = m.drop_cleanups.saturating_add(1),
            MetricsEvent::PlainQuery { rows } => {
                m.plain_queries = m.plain_queries.saturating_add(1);
                m.rows_fetched = m.rows_fetched.saturating_add(rows);
            }
        });
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

/// Record through the scoped override if one is installed, else the global sink.
pub(crate) fn record(event: MetricsEvent) {
    let override_sink = SINK_OVERRIDE.with(|cell| *cell.borrow());

    match override_sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Record to a handle-bound sink, falling back to [`record`].
pub(crate) fn record_to(sink: Option<&'static dyn MetricsSink>, event: MetricsEvent) {
    match sink {
        Some(sink) => sink.record(event),
        None => record(event),
    }
}

/// Snapshot the current counters.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all counters.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
pub fn with_metrics_sink<T>(sink: &'static dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<&'static dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

///
/// TESTS
///
