use crate::{error::CursorError, row::RawRow, value::Value};
use std::fmt;

///
/// JoinShape
///
/// Describes how a joined result row splits into the root entity and its
/// associations. Supplied by the query builder alongside the SQL text.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JoinShape {
    root_key: RootKey,
    associations: Vec<AssociationSpec>,
}

impl JoinShape {
    #[must_use]
    pub const fn new(root_key: RootKey) -> Self {
        Self {
            root_key,
            associations: Vec::new(),
        }
    }

    #[must_use]
    pub fn association(mut self, assoc: AssociationSpec) -> Self {
        self.associations.push(assoc);
        self
    }

    #[must_use]
    pub const fn root_key(&self) -> &RootKey {
        &self.root_key
    }

    #[must_use]
    pub fn associations(&self) -> &[AssociationSpec] {
        &self.associations
    }

    /// Columns of `row` not claimed by any association.
    #[must_use]
    pub fn root_columns(&self, row: &RawRow) -> RawRow {
        row.project(|column| {
            let claimed = self.associations.iter().any(|assoc| assoc.claims(column));

            (!claimed).then(|| column.to_string())
        })
    }
}

///
/// RootKey
///
/// Column path(s) identifying the root entity of a joined row.
/// Composite keys are compared as tuples.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RootKey {
    columns: Vec<String>,
}

impl RootKey {
    pub fn column(column: impl Into<String>) -> Self {
        Self {
            columns: vec![column.into()],
        }
    }

    pub fn composite<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Read this key from `row`.
    pub fn key_of(&self, row: &RawRow) -> Result<GroupKey, CursorError> {
        let values = self
            .columns
            .iter()
            .map(|column| {
                row.get(column)
                    .cloned()
                    .ok_or_else(|| CursorError::MissingColumn {
                        column: column.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(GroupKey(values))
    }
}

///
/// GroupKey
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct GroupKey(Vec<Value>);

impl GroupKey {
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [single] => write!(f, "{single}"),
            values => {
                write!(f, "(")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
        }
    }
}

///
/// AssociationSpec
///
/// One nested collection on the root entity and the columns that feed it.
///
/// Without a key every projected row is kept, so identical child rows
/// survive. With a key, rows repeating an already-seen key within one group
/// are dropped; that is how a multi-association join's cartesian product
/// collapses back to one row per child.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssociationSpec {
    name: String,
    selector: ColumnSelector,
    key: Vec<String>,
}

impl AssociationSpec {
    /// Columns named `<prefix><column>`; the prefix is stripped on projection.
    pub fn prefixed(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: ColumnSelector::Prefix(prefix.into()),
            key: Vec::new(),
        }
    }

    /// An explicit list of columns, kept under their own names.
    pub fn columns<S: Into<String>>(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            selector: ColumnSelector::Columns(columns.into_iter().map(Into::into).collect()),
            key: Vec::new(),
        }
    }

    /// Identify child rows by these projected columns (names after any
    /// prefix is stripped).
    #[must_use]
    pub fn keyed_by<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.key = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn key(&self) -> &[String] {
        &self.key
    }

    /// Key of an already projected child row; `None` when the association
    /// is unkeyed.
    #[must_use]
    pub fn child_key(&self, projected: &RawRow) -> Option<Vec<Value>> {
        if self.key.is_empty() {
            return None;
        }

        let values = self
            .key
            .iter()
            .map(|column| projected.get(column).cloned().unwrap_or(Value::Null))
            .collect();

        Some(values)
    }

    #[must_use]
    pub fn claims(&self, column: &str) -> bool {
        match &self.selector {
            ColumnSelector::Prefix(prefix) => column.starts_with(prefix.as_str()),
            ColumnSelector::Columns(columns) => columns.iter().any(|c| c == column),
        }
    }

    /// This association's slice of `row`.
    #[must_use]
    pub fn project(&self, row: &RawRow) -> RawRow {
        match &self.selector {
            ColumnSelector::Prefix(prefix) => {
                row.project(|column| column.strip_prefix(prefix.as_str()).map(str::to_string))
            }
            ColumnSelector::Columns(columns) => row.project(|column| {
                columns
                    .iter()
                    .any(|c| c == column)
                    .then(|| column.to_string())
            }),
        }
    }
}

///
/// ColumnSelector
///

#[derive(Clone, Debug, Eq, PartialEq)]
enum ColumnSelector {
    Prefix(String),
    Columns(Vec<String>),
}
