//! Driver boundary.
//!
//! The engine never opens sockets or speaks a wire protocol. Everything it
//! needs from a database connection is expressed by [`Connection`]; adapters
//! for concrete drivers live outside this crate.

use crate::row::RawRow;
use thiserror::Error as ThisError;

///
/// DriverError
///
/// Opaque failure reported by the driver. The engine attaches the statement
/// stage when it lifts this into a `CursorError`.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct DriverError {
    pub message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

///
/// Connection
///
/// Synchronous, single-owner database connection.
///
/// Every method is a blocking call; the engine issues them strictly in
/// sequence and never shares a connection between two live cursors.
///

pub trait Connection {
    /// Human-readable backend name, used in diagnostics.
    fn backend(&self) -> &str;

    /// Whether `DECLARE … CURSOR` / `FETCH FORWARD` / `CLOSE` are available.
    fn supports_cursors(&self) -> bool;

    /// Whether a transaction is already open on this connection.
    fn in_transaction(&self) -> bool;

    fn begin(&mut self) -> Result<(), DriverError>;

    fn commit(&mut self) -> Result<(), DriverError>;

    fn rollback(&mut self) -> Result<(), DriverError>;

    /// Run a statement that returns at most one row (DECLARE, CLOSE).
    fn execute(&mut self, sql: &str) -> Result<Option<RawRow>, DriverError>;

    /// Run a statement and collect every row it returns.
    fn query(&mut self, sql: &str) -> Result<Vec<RawRow>, DriverError>;
}
