use serde::{Deserialize, Serialize};
use std::cell::RefCell;

///
/// EventOps
/// Ephemeral, in-memory counters for cursor operations.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventOps {
    // Sessions
    pub sessions_begun: u64,
    pub sessions_joined: u64,
    pub unsupported_backend: u64,

    // Cursor statements
    pub cursors_declared: u64,
    pub cursors_closed: u64,
    pub rows_fetched: u64,

    // Grouping / materialization
    pub groups_emitted: u64,
    pub entities_emitted: u64,
    pub max_group_rows: u64,

    // Termination
    pub early_stops: u64,
    pub cleanup_failures: u64,
    pub drop_cleanups: u64,

    // Non-cursor path
    pub plain_queries: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventOps> = RefCell::new(EventOps::default());
}

/// Borrow counters immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventOps) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow counters mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventOps) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters (useful in tests).
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventOps::default());
}

///
/// EventReport
/// Counter snapshot plus derived averages.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    pub counters: EventOps,
    pub avg_rows_per_cursor: f64,
    pub avg_rows_per_entity: f64,
}

/// Build a report from the in-memory counters.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub(crate) fn report() -> EventReport {
    let counters = with_state(Clone::clone);

    let avg_rows_per_cursor = if counters.cursors_closed > 0 {
        counters.rows_fetched as f64 / counters.cursors_closed as f64
    } else {
        0.0
    };
    let avg_rows_per_entity = if counters.entities_emitted > 0 {
        counters.rows_fetched as f64 / counters.entities_emitted as f64
    } else {
        0.0
    };

    EventReport {
        counters,
        avg_rows_per_cursor,
        avg_rows_per_entity,
    }
}
