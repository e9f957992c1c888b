use crate::{cursor::SessionState, driver::DriverError, join::MapperError};
use derive_more::Display;
use std::fmt;
use thiserror::Error as ThisError;

///
/// CursorError
///
/// Every failure surfaced by cursor streaming, from name allocation through
/// entity materialization.
///
/// Cleanup failures (close, commit, rollback) that happen while another error
/// is already in flight are attached via [`CursorError::Chained`]; the
/// original error stays first and is what [`CursorError::primary`] returns.
///

#[derive(Debug, ThisError)]
pub enum CursorError {
    /// The connection cannot host server-side cursors. No SQL was issued.
    #[error("backend '{backend}' does not support server-side cursors")]
    UnsupportedBackend { backend: String },

    /// A supplied or generated cursor name cannot be quoted safely.
    #[error("invalid cursor identifier {name:?}: {reason}")]
    InvalidIdentifier { name: String, reason: &'static str },

    /// Cursor lifecycle misuse (double declare, fetch after close, ...).
    #[error("cursor {cursor} cannot {operation} in state {state}")]
    InvalidState {
        cursor: String,
        state: SessionState,
        operation: &'static str,
    },

    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// A joined row lacks one of the root-key columns.
    #[error("row is missing root key column '{column}'")]
    MissingColumn { column: String },

    /// A root key recurred after its group was already emitted.
    #[error("root key {key} reappeared after its group was emitted; rows are not clustered")]
    NonClusteredKey { key: String },

    #[error("entity mapping failed: {0}")]
    Mapping(#[from] MapperError),

    #[error("{primary} (cleanup also failed: {secondary})")]
    Chained {
        #[source]
        primary: Box<Self>,
        secondary: Box<Self>,
    },
}

impl CursorError {
    pub(crate) fn database(stage: DatabaseStage, err: DriverError) -> Self {
        Self::Database(DatabaseError {
            stage,
            message: err.message,
        })
    }

    pub(crate) fn database_protocol(stage: DatabaseStage, message: impl Into<String>) -> Self {
        Self::Database(DatabaseError {
            stage,
            message: message.into(),
        })
    }

    pub(crate) fn invalid_identifier(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidIdentifier {
            name: name.into(),
            reason,
        }
    }

    pub(crate) fn invalid_state(
        cursor: impl Into<String>,
        state: SessionState,
        operation: &'static str,
    ) -> Self {
        Self::InvalidState {
            cursor: cursor.into(),
            state,
            operation,
        }
    }

    /// Attach a cleanup failure to this error without displacing it.
    #[must_use]
    pub fn with_secondary(self, secondary: Self) -> Self {
        Self::Chained {
            primary: Box::new(self),
            secondary: Box::new(secondary),
        }
    }

    /// The error that started the failure, skipping any attached cleanup errors.
    #[must_use]
    pub fn primary(&self) -> &Self {
        match self {
            Self::Chained { primary, .. } => primary.primary(),
            other => other,
        }
    }

    /// Cleanup failures attached to this error, outermost first.
    #[must_use]
    pub fn secondaries(&self) -> Vec<&Self> {
        let mut out = Vec::new();
        let mut current = self;

        while let Self::Chained { primary, secondary } = current {
            out.push(secondary.as_ref());
            current = primary;
        }

        out
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self.primary() {
            Self::UnsupportedBackend { .. } => ErrorClass::Unsupported,
            Self::InvalidIdentifier { .. } => ErrorClass::InvalidInput,
            Self::InvalidState { .. } | Self::NonClusteredKey { .. } => {
                ErrorClass::InvariantViolation
            }
            Self::Database(_) => ErrorClass::Database,
            Self::MissingColumn { .. } | Self::Mapping(_) => ErrorClass::Mapping,
            Self::Chained { .. } => ErrorClass::Internal,
        }
    }

    #[must_use]
    pub fn origin(&self) -> ErrorOrigin {
        match self.primary() {
            Self::InvalidIdentifier { .. } => ErrorOrigin::Name,
            Self::UnsupportedBackend { .. } | Self::InvalidState { .. } => ErrorOrigin::Session,
            Self::Database(err) => match err.stage {
                DatabaseStage::Fetch => ErrorOrigin::Fetch,
                _ => ErrorOrigin::Driver,
            },
            Self::MissingColumn { .. } | Self::NonClusteredKey { .. } => ErrorOrigin::Group,
            Self::Mapping(_) => ErrorOrigin::Materialize,
            Self::Chained { .. } => ErrorOrigin::Session,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin(), self.class(), self)
    }
}

///
/// DatabaseError
///
/// Failure reported by the driver for one cursor statement.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{stage} failed: {message}")]
pub struct DatabaseError {
    pub stage: DatabaseStage,
    pub message: String,
}

///
/// DatabaseStage
///
/// The statement (or transaction step) that produced a [`DatabaseError`].
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum DatabaseStage {
    #[display("begin")]
    Begin,
    #[display("declare")]
    Declare,
    #[display("fetch")]
    Fetch,
    #[display("close")]
    Close,
    #[display("commit")]
    Commit,
    #[display("rollback")]
    Rollback,
    #[display("query")]
    Query,
}

///
/// ErrorClass
/// Error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Unsupported,
    InvalidInput,
    InvariantViolation,
    Database,
    Mapping,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unsupported => "unsupported",
            Self::InvalidInput => "invalid_input",
            Self::InvariantViolation => "invariant_violation",
            Self::Database => "database",
            Self::Mapping => "mapping",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Component that raised the error.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Name,
    Session,
    Fetch,
    Group,
    Materialize,
    Driver,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Name => "name",
            Self::Session => "session",
            Self::Fetch => "fetch",
            Self::Group => "group",
            Self::Materialize => "materialize",
            Self::Driver => "driver",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
