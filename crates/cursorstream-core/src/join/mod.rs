//! Module: join
//! Responsibility: regrouping joined rows into root entities with associations.
//! Does not own: fetching rows or the cursor lifecycle.
//! Boundary: pure transforms over `RawRow`; no driver access.

mod grouper;
mod materialize;
mod shape;

#[cfg(test)]
mod tests;

pub use grouper::JoinRowGrouper;
pub use materialize::{
    Association, EntityMapper, EntityMaterializer, MapperError, MaterializedEntity, RawMapper,
};
pub use shape::{AssociationSpec, GroupKey, JoinShape, RootKey};
