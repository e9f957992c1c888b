//! ## Crate layout
//! - `core`: cursor sessions, join regrouping, streams, config and metrics.
//! - `error`: the public error type callers match on.
//!
//! The `prelude` module carries what a caller needs to implement a
//! [`Connection`](core::driver::Connection) and drive a cursor stream.

pub use cursorstream_core as core;

pub mod error;

pub use error::Error;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::{
        config::{ClusteringMode, StreamConfig},
        db::{CursorDb, CursorOptions, QuerySource, SelectQuery},
        driver::{Connection, DriverError},
        join::{AssociationSpec, EntityMapper, JoinShape, MapperError, MaterializedEntity, RootKey},
        row::RawRow,
        stream::CursorSummary,
        value::Value,
    };
    pub use crate::error::{Error, ErrorKind, ErrorOrigin};
}
