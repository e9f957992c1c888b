//! Module: cursor::session
//! Responsibility: one server-side cursor's lifetime inside one transaction.
//! Does not own: row grouping or entity mapping.
//! Boundary: the only code that issues DECLARE / FETCH / CLOSE.

use crate::{
    cursor::CursorDescriptor,
    driver::Connection,
    error::{CursorError, DatabaseStage},
    obs::sink::{MetricsEvent, MetricsSink, record_to},
    row::RawRow,
};
use derive_more::Display;
use tracing::{debug, warn};

///
/// SessionState
///
/// `Begun → Declared → Fetching → Closed`. A failed declare leaves the
/// session in `Begun`; every path ends in `Closed` exactly once.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum SessionState {
    #[display("begun")]
    Begun,
    #[display("declared")]
    Declared,
    #[display("fetching")]
    Fetching,
    #[display("closed")]
    Closed,
}

///
/// TxScope
///
/// Whether the session opened its transaction or joined the caller's.
/// A joined transaction is never committed or rolled back here.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TxScope {
    Owned,
    Joined,
}

///
/// CursorSession
///
/// Owns one cursor from `begin` to `finish`.
///
/// Cleanup is guaranteed two ways: [`CursorSession::finish`] closes the
/// cursor and ends the transaction while surfacing every failure, and `Drop`
/// does the same best-effort for sessions abandoned mid-stream (an early
/// `break`, a dropped iterator, a panic).
///

pub struct CursorSession<'c, C: Connection> {
    conn: &'c mut C,
    descriptor: CursorDescriptor,
    state: SessionState,
    declared: bool,
    tx: Option<TxScope>,
    metrics: Option<&'static dyn MetricsSink>,
}

impl<'c, C: Connection> CursorSession<'c, C> {
    /// Open a session. Fails with `UnsupportedBackend` before issuing any SQL
    /// when the connection cannot host cursors.
    pub fn begin(conn: &'c mut C, descriptor: CursorDescriptor) -> Result<Self, CursorError> {
        Self::begin_with_metrics(conn, descriptor, None)
    }

    pub(crate) fn begin_with_metrics(
        conn: &'c mut C,
        descriptor: CursorDescriptor,
        metrics: Option<&'static dyn MetricsSink>,
    ) -> Result<Self, CursorError> {
        if !conn.supports_cursors() {
            record_to(metrics, MetricsEvent::UnsupportedBackend);

            return Err(CursorError::UnsupportedBackend {
                backend: conn.backend().to_string(),
            });
        }

        let joined = conn.in_transaction();
        if !joined {
            conn.begin()
                .map_err(|err| CursorError::database(DatabaseStage::Begin, err))?;
        }

        record_to(metrics, MetricsEvent::SessionBegin { joined });
        debug!(cursor = %descriptor.name(), joined, "cursor session begun");

        Ok(Self {
            conn,
            descriptor,
            state: SessionState::Begun,
            declared: false,
            tx: Some(if joined {
                TxScope::Joined
            } else {
                TxScope::Owned
            }),
            metrics,
        })
    }

    #[must_use]
    pub const fn descriptor(&self) -> &CursorDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Issue `DECLARE`. Valid once, straight after `begin`.
    pub fn declare(&mut self) -> Result<(), CursorError> {
        if self.state != SessionState::Begun {
            return Err(self.misuse("declare"));
        }

        let sql = self.descriptor.declare_sql();
        self.conn
            .execute(&sql)
            .map_err(|err| CursorError::database(DatabaseStage::Declare, err))?;

        self.state = SessionState::Declared;
        self.declared = true;
        record_to(self.metrics, MetricsEvent::CursorDeclared);
        debug!(cursor = %self.descriptor.name(), "cursor declared");

        Ok(())
    }

    /// Issue one `FETCH FORWARD`; `None` is end-of-stream.
    pub fn fetch_next(&mut self) -> Result<Option<RawRow>, CursorError> {
        if !matches!(self.state, SessionState::Declared | SessionState::Fetching) {
            return Err(self.misuse("fetch"));
        }
        self.state = SessionState::Fetching;

        let sql = self.descriptor.fetch_sql();
        let mut rows = self
            .conn
            .query(&sql)
            .map_err(|err| CursorError::database(DatabaseStage::Fetch, err))?;

        match rows.len() {
            0 => Ok(None),
            1 => {
                record_to(self.metrics, MetricsEvent::RowFetched);
                Ok(rows.pop())
            }
            n => Err(CursorError::database_protocol(
                DatabaseStage::Fetch,
                format!("FETCH FORWARD returned {n} rows, expected at most 1"),
            )),
        }
    }

    /// Issue `CLOSE` if a cursor was declared. Runs at most once; the session
    /// is `Closed` afterwards even if the statement failed.
    pub fn close(&mut self) -> Result<(), CursorError> {
        if self.state == SessionState::Closed {
            return Ok(());
        }

        self.state = SessionState::Closed;
        if !std::mem::take(&mut self.declared) {
            return Ok(());
        }

        let sql = self.descriptor.close_sql();
        record_to(self.metrics, MetricsEvent::CursorClosed);
        debug!(cursor = %self.descriptor.name(), "cursor closed");

        self.conn
            .execute(&sql)
            .map(|_| ())
            .map_err(|err| CursorError::database(DatabaseStage::Close, err))
    }

    /// Close the cursor and end the transaction, folding cleanup failures
    /// into `outcome`. An error already in `outcome` stays the primary error.
    pub fn finish<T>(mut self, outcome: Result<T, CursorError>) -> Result<T, CursorError> {
        let closed = self.close();
        let outcome = self.merge(outcome, closed);

        let ended = self.end_transaction(outcome.is_ok());
        self.merge(outcome, ended)
    }

    // Commit on success, roll back on failure; joined transactions are left alone.
    fn end_transaction(&mut self, success: bool) -> Result<(), CursorError> {
        match self.tx.take() {
            Some(TxScope::Owned) if success => self
                .conn
                .commit()
                .map_err(|err| CursorError::database(DatabaseStage::Commit, err)),
            Some(TxScope::Owned) => self
                .conn
                .rollback()
                .map_err(|err| CursorError::database(DatabaseStage::Rollback, err)),
            Some(TxScope::Joined) | None => Ok(()),
        }
    }

    fn merge<T>(
        &self,
        outcome: Result<T, CursorError>,
        cleanup: Result<(), CursorError>,
    ) -> Result<T, CursorError> {
        let Err(cleanup_err) = cleanup else {
            return outcome;
        };

        record_to(self.metrics, MetricsEvent::CleanupFailed);
        warn!(cursor = %self.descriptor.name(), error = %cleanup_err, "cursor cleanup failed");

        match outcome {
            Ok(_) => Err(cleanup_err),
            Err(primary) => Err(primary.with_secondary(cleanup_err)),
        }
    }

    fn misuse(&self, operation: &'static str) -> CursorError {
        CursorError::invalid_state(self.descriptor.name().raw(), self.state, operation)
    }
}

impl<C: Connection> Drop for CursorSession<'_, C> {
    fn drop(&mut self) {
        if self.state == SessionState::Closed && self.tx.is_none() {
            return;
        }

        record_to(self.metrics, MetricsEvent::DropCleanup);
        debug!(
            cursor = %self.descriptor.name(),
            state = %self.state,
            "cursor session dropped before finish"
        );

        let closed = self.close();
        let commit = closed.is_ok() && !std::thread::panicking();
        let ended = self.end_transaction(commit);

        for err in [closed.err(), ended.err()].into_iter().flatten() {
            record_to(self.metrics, MetricsEvent::CleanupFailed);
            warn!(cursor = %self.descriptor.name(), error = %err, "cursor cleanup on drop failed");
        }
    }
}
