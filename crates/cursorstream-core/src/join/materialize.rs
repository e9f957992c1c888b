use crate::{
    join::JoinShape,
    row::{RawRow, RowGroup},
    value::Value,
};
use std::collections::HashSet;
use thiserror::Error as ThisError;

///
/// MapperError
///
/// Failure raised by an [`EntityMapper`] for a malformed entity.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct MapperError {
    pub message: String,
}

impl MapperError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn missing_column(column: &str) -> Self {
        Self::new(format!("missing column '{column}'"))
    }

    #[must_use]
    pub fn type_mismatch(column: &str, expected: &str, found: &Value) -> Self {
        Self::new(format!(
            "column '{column}' expected {expected}, found {found}"
        ))
    }
}

///
/// MaterializedEntity
///
/// One root entity's columns plus its association collections, before the
/// mapper turns it into a typed value.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MaterializedEntity {
    root: RawRow,
    associations: Vec<Association>,
}

impl MaterializedEntity {
    /// A flat (non-join) row: all columns belong to the root.
    #[must_use]
    pub const fn flat(row: RawRow) -> Self {
        Self {
            root: row,
            associations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn root(&self) -> &RawRow {
        &self.root
    }

    /// Root column lookup that reports a mapper error when absent.
    pub fn require(&self, column: &str) -> Result<&Value, MapperError> {
        self.root
            .get(column)
            .ok_or_else(|| MapperError::missing_column(column))
    }

    #[must_use]
    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    /// Rows of the named association; `None` when the shape has no such association.
    #[must_use]
    pub fn association(&self, name: &str) -> Option<&[RawRow]> {
        self.associations
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.rows.as_slice())
    }

    #[must_use]
    pub fn into_parts(self) -> (RawRow, Vec<Association>) {
        (self.root, self.associations)
    }
}

///
/// Association
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Association {
    pub name: String,
    pub rows: Vec<RawRow>,
}

///
/// EntityMapper
///
/// The object-relational boundary: turns raw columns into a typed entity.
///

pub trait EntityMapper {
    type Entity;

    fn instantiate(&self, entity: MaterializedEntity) -> Result<Self::Entity, MapperError>;
}

impl<E, F> EntityMapper for F
where
    F: Fn(MaterializedEntity) -> Result<E, MapperError>,
{
    type Entity = E;

    fn instantiate(&self, entity: MaterializedEntity) -> Result<E, MapperError> {
        self(entity)
    }
}

///
/// RawMapper
///
/// Identity mapper: yields [`MaterializedEntity`] values untouched.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct RawMapper;

impl EntityMapper for RawMapper {
    type Entity = MaterializedEntity;

    fn instantiate(&self, entity: MaterializedEntity) -> Result<MaterializedEntity, MapperError> {
        Ok(entity)
    }
}

///
/// EntityMaterializer
///
/// Folds one [`RowGroup`] into a [`MaterializedEntity`]. Every call builds
/// its own de-duplication state, so nothing carries over between groups.
///

#[derive(Clone, Copy, Debug)]
pub struct EntityMaterializer<'a> {
    shape: &'a JoinShape,
}

impl<'a> EntityMaterializer<'a> {
    #[must_use]
    pub const fn new(shape: &'a JoinShape) -> Self {
        Self { shape }
    }

    /// Root columns come from the first row. Each association collects the
    /// projection of every row, minus outer-join misses (all NULL). Keyed
    /// associations also drop rows whose child key was already seen.
    #[must_use]
    pub fn materialize(&self, group: RowGroup) -> MaterializedEntity {
        let root = self.shape.root_columns(group.first_row());

        let associations = self
            .shape
            .associations()
            .iter()
            .map(|assoc| {
                let mut seen = HashSet::new();
                let rows = group
                    .iter()
                    .map(|row| assoc.project(row))
                    .filter(|projected| !projected.is_all_null())
                    .filter(|projected| {
                        assoc
                            .child_key(projected)
                            .is_none_or(|key| seen.insert(key))
                    })
                    .collect();

                Association {
                    name: assoc.name().to_string(),
                    rows,
                }
            })
            .collect();

        MaterializedEntity { root, associations }
    }
}
