use crate::{
    cursor::CursorName,
    join::{JoinShape, RootKey},
};

///
/// CursorDescriptor
///
/// Everything needed to open one cursor: its name, the select statement it
/// runs over, and (for join queries) how rows regroup into entities.
/// Immutable once built.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CursorDescriptor {
    name: CursorName,
    sql: String,
    join: Option<JoinShape>,
}

impl CursorDescriptor {
    /// Trailing semicolons are dropped; `DECLARE … FOR` takes a bare query.
    #[must_use]
    pub fn new(name: CursorName, sql: &str) -> Self {
        let sql = sql.trim().trim_end_matches(';').trim_end().to_string();

        Self {
            name,
            sql,
            join: None,
        }
    }

    #[must_use]
    pub fn with_join(mut self, shape: JoinShape) -> Self {
        self.join = Some(shape);
        self
    }

    #[must_use]
    pub const fn name(&self) -> &CursorName {
        &self.name
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub const fn join(&self) -> Option<&JoinShape> {
        self.join.as_ref()
    }

    #[must_use]
    pub const fn is_join(&self) -> bool {
        self.join.is_some()
    }

    #[must_use]
    pub fn root_key(&self) -> Option<&RootKey> {
        self.join.as_ref().map(JoinShape::root_key)
    }

    //
    // Statements
    //

    pub(crate) fn declare_sql(&self) -> String {
        format!(
            "DECLARE {} NO SCROLL CURSOR FOR {}",
            self.name.as_sql(),
            self.sql
        )
    }

    pub(crate) fn fetch_sql(&self) -> String {
        format!("FETCH FORWARD FROM {}", self.name.as_sql())
    }

    pub(crate) fn close_sql(&self) -> String {
        format!("CLOSE {}", self.name.as_sql())
    }
}
