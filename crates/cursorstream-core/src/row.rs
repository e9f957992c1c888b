//! Raw rows as produced by one driver fetch.
//!
//! Column names are kept exactly as the driver reports them; joined columns
//! conventionally use a dotted path (`tags.name`) so association columns can
//! be selected by prefix.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::{
    iter::{self, Chain, Once},
    slice, vec,
};

///
/// RawRow
///
/// Ordered column → value mapping for a single fetched row.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct RawRow {
    columns: Vec<(String, Value)>,
}

impl RawRow {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Build a row from `(column, value)` pairs, keeping their order.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            columns: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Append one column. Lookups return the first column with a given name.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.push((column.into(), value.into()));
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// True when every column is NULL (an outer-join miss for a projection).
    #[must_use]
    pub fn is_all_null(&self) -> bool {
        self.columns.iter().all(|(_, value)| value.is_null())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Project columns through `select`, which may rename or drop each column.
    #[must_use]
    pub fn project(&self, mut select: impl FnMut(&str) -> Option<String>) -> Self {
        let columns = self
            .columns
            .iter()
            .filter_map(|(name, value)| select(name).map(|renamed| (renamed, value.clone())))
            .collect();

        Self { columns }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

///
/// RowGroup
///
/// Contiguous rows sharing one root-entity key, in arrival order.
/// The first row is held apart, so a group can never be empty.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RowGroup {
    first: RawRow,
    rest: Vec<RawRow>,
}

impl RowGroup {
    pub(crate) const fn new(first: RawRow) -> Self {
        Self {
            first,
            rest: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, row: RawRow) {
        self.rest.push(row);
    }

    /// First row of the group; root columns are read from it.
    #[must_use]
    pub const fn first_row(&self) -> &RawRow {
        &self.first
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.rest.len() + 1
    }

    /// Always false.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawRow> {
        self.into_iter()
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<RawRow> {
        self.into_iter().collect()
    }
}

impl IntoIterator for RowGroup {
    type Item = RawRow;
    type IntoIter = Chain<Once<RawRow>, vec::IntoIter<RawRow>>;

    fn into_iter(self) -> Self::IntoIter {
        iter::once(self.first).chain(self.rest)
    }
}

impl<'a> IntoIterator for &'a RowGroup {
    type Item = &'a RawRow;
    type IntoIter = Chain<Once<&'a RawRow>, slice::Iter<'a, RawRow>>;

    fn into_iter(self) -> Self::IntoIter {
        iter::once(&self.first).chain(&self.rest)
    }
}

///
/// TESTS
///
