//! Core runtime for cursorstream: server-side cursor sessions, forward-only
//! fetch, join-row regrouping, and the lazy entity stream built on them.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod config;
pub mod cursor;
pub mod db;
pub mod driver;
pub mod error;
pub mod join;
pub mod obs;
pub mod row;
pub mod stream;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Prelude contains only the vocabulary needed to open and drive a stream.
/// Errors, sinks and configuration stay in their modules.
///

pub mod prelude {
    pub use crate::{
        db::{CursorDb, CursorOptions, QuerySource, SelectQuery},
        driver::Connection,
        join::{AssociationSpec, EntityMapper, JoinShape, MaterializedEntity, RootKey},
        row::RawRow,
        value::Value,
    };
}
