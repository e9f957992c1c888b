//! Scripted in-memory connection for unit tests.

use crate::{
    driver::{Connection, DriverError},
    row::RawRow,
    value::Value,
};
use std::collections::VecDeque;

///
/// MockConnection
///
/// Serves `FETCH` statements one row at a time from a script and records
/// every statement (including `BEGIN`/`COMMIT`/`ROLLBACK`) it receives.
///

pub(crate) struct MockConnection {
    pub(crate) statements: Vec<String>,
    rows: VecDeque<RawRow>,
    supports_cursors: bool,
    in_tx: bool,
    fetches: usize,
    fail_fetch_at: Option<usize>,
    fail_declare: bool,
    fail_close: bool,
    fail_commit: bool,
    fail_query: bool,
    oversized_fetch: bool,
}

impl MockConnection {
    pub(crate) fn new(rows: impl IntoIterator<Item = RawRow>) -> Self {
        Self {
            statements: Vec::new(),
            rows: rows.into_iter().collect(),
            supports_cursors: true,
            in_tx: false,
            fetches: 0,
            fail_fetch_at: None,
            fail_declare: false,
            fail_close: false,
            fail_commit: false,
            fail_query: false,
            oversized_fetch: false,
        }
    }

    pub(crate) fn without_cursors(mut self) -> Self {
        self.supports_cursors = false;
        self
    }

    pub(crate) fn with_open_transaction(mut self) -> Self {
        self.in_tx = true;
        self
    }

    /// Fail the `k`th FETCH (1-based).
    pub(crate) fn fail_fetch_at(mut self, k: usize) -> Self {
        self.fail_fetch_at = Some(k);
        self
    }

    pub(crate) fn fail_declare(mut self) -> Self {
        self.fail_declare = true;
        self
    }

    pub(crate) fn fail_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub(crate) fn fail_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    /// Fail every non-FETCH query.
    pub(crate) fn fail_query(mut self) -> Self {
        self.fail_query = true;
        self
    }

    /// Return every remaining row from a single FETCH.
    pub(crate) fn oversized_fetch(mut self) -> Self {
        self.oversized_fetch = true;
        self
    }

    pub(crate) fn count(&self, prefix: &str) -> usize {
        self.statements
            .iter()
            .filter(|sql| sql.starts_with(prefix))
            .count()
    }

    pub(crate) fn last(&self) -> Option<&str> {
        self.statements.last().map(String::as_str)
    }
}

impl Connection for MockConnection {
    fn backend(&self) -> &str {
        if self.supports_cursors {
            "mockpg"
        } else {
            "mocklite"
        }
    }

    fn supports_cursors(&self) -> bool {
        self.supports_cursors
    }

    fn in_transaction(&self) -> bool {
        self.in_tx
    }

    fn begin(&mut self) -> Result<(), DriverError> {
        self.statements.push("BEGIN".to_string());
        self.in_tx = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.statements.push("COMMIT".to_string());
        self.in_tx = false;
        if self.fail_commit {
            return Err(DriverError::new("could not serialize access"));
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.statements.push("ROLLBACK".to_string());
        self.in_tx = false;
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> Result<Option<RawRow>, DriverError> {
        self.statements.push(sql.to_string());

        if sql.starts_with("DECLARE") && self.fail_declare {
            return Err(DriverError::new("cursor already exists"));
        }
        if sql.starts_with("CLOSE") && self.fail_close {
            return Err(DriverError::new("current transaction is aborted"));
        }

        Ok(None)
    }

    fn query(&mut self, sql: &str) -> Result<Vec<RawRow>, DriverError> {
        self.statements.push(sql.to_string());

        if !sql.starts_with("FETCH") {
            if self.fail_query {
                return Err(DriverError::new("relation \"users\" does not exist"));
            }
            return Ok(self.rows.drain(..).collect());
        }

        self.fetches += 1;
        if self.fail_fetch_at == Some(self.fetches) {
            return Err(DriverError::new("server closed the connection unexpectedly"));
        }
        if self.oversized_fetch {
            return Ok(self.rows.drain(..).collect());
        }

        Ok(self.rows.pop_front().into_iter().collect())
    }
}

/// `{id, name}` rows for flat-query tests.
pub(crate) fn flat_rows(items: &[(i64, &str)]) -> Vec<RawRow> {
    items
        .iter()
        .map(|(id, name)| {
            RawRow::from_pairs([("id", Value::Int(*id)), ("name", Value::from(*name))])
        })
        .collect()
}

/// `{root_id, tags.tag}` rows for join tests.
pub(crate) fn tag_rows(items: &[(i64, &str)]) -> Vec<RawRow> {
    items
        .iter()
        .map(|(root, tag)| {
            RawRow::from_pairs([("root_id", Value::Int(*root)), ("tags.tag", Value::from(*tag))])
        })
        .collect()
}
