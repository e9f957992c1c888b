use cursorstream_core::{
    config::ConfigError,
    error::{CursorError, ErrorOrigin as CoreErrorOrigin},
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Debug, Deserialize, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }
}

impl From<CursorError> for Error {
    fn from(err: CursorError) -> Self {
        let kind = match err.primary() {
            CursorError::UnsupportedBackend { .. } => {
                ErrorKind::Cursor(CursorErrorKind::Unsupported)
            }
            CursorError::InvalidIdentifier { .. } => {
                ErrorKind::Cursor(CursorErrorKind::InvalidIdentifier)
            }
            CursorError::InvalidState { .. } => ErrorKind::Cursor(CursorErrorKind::InvalidState),
            CursorError::Database(_) => ErrorKind::Database,
            CursorError::MissingColumn { .. } => {
                ErrorKind::Mapping(MappingErrorKind::MissingColumn)
            }
            CursorError::NonClusteredKey { .. } => {
                ErrorKind::Mapping(MappingErrorKind::NonClustered)
            }
            CursorError::Mapping(_) => ErrorKind::Mapping(MappingErrorKind::Mapper),
            CursorError::Chained { .. } => ErrorKind::Internal,
        };

        Self::new(kind, err.origin().into(), err.to_string())
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorKind::Config, ErrorOrigin::Config, err.to_string())
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    Cursor(CursorErrorKind),

    /// The driver rejected a statement; the pass is over and must be restarted.
    Database,

    Mapping(MappingErrorKind),

    /// Configuration could not be read or failed validation.
    Config,

    /// The caller cannot remediate this.
    Internal,
}

///
/// CursorErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum CursorErrorKind {
    /// The connection cannot host server-side cursors.
    Unsupported,

    /// A cursor name cannot be quoted as an identifier.
    InvalidIdentifier,

    /// Lifecycle misuse such as a second declare.
    InvalidState,
}

///
/// MappingErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum MappingErrorKind {
    /// A joined row lacks its root-key column.
    MissingColumn,

    /// Rows for one root entity were not contiguous.
    NonClustered,

    /// The entity mapper rejected the materialized columns.
    Mapper,
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Config,
    Driver,
    Fetch,
    Group,
    Materialize,
    Name,
    Session,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Driver => Self::Driver,
            CoreErrorOrigin::Fetch => Self::Fetch,
            CoreErrorOrigin::Group => Self::Group,
            CoreErrorOrigin::Materialize => Self::Materialize,
            CoreErrorOrigin::Name => Self::Name,
            CoreErrorOrigin::Session => Self::Session,
        }
    }
}
