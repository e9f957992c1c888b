use crate::{
    config::ClusteringMode,
    error::CursorError,
    join::{GroupKey, RootKey},
    row::{RawRow, RowGroup},
};
use std::collections::HashSet;

///
/// JoinRowGrouper
///
/// Push-based regrouping of a joined row stream into [`RowGroup`]s.
///
/// Rows must arrive clustered by root key: every row of one root entity
/// before any row of the next. The grouper holds only the current group's
/// rows. In `Assume` mode a key that comes back after its group closed
/// starts a new group for the same entity; `Verify` mode reports it.
///

#[derive(Debug)]
pub struct JoinRowGrouper {
    root_key: RootKey,
    mode: ClusteringMode,
    current: Option<(GroupKey, RowGroup)>,
    emitted: HashSet<GroupKey>,
}

impl JoinRowGrouper {
    #[must_use]
    pub fn new(root_key: RootKey, mode: ClusteringMode) -> Self {
        Self {
            root_key,
            mode,
            current: None,
            emitted: HashSet::new(),
        }
    }

    /// Feed one row; returns the previous group when this row starts a new one.
    pub fn push(&mut self, row: RawRow) -> Result<Option<RowGroup>, CursorError> {
        let key = self.root_key.key_of(&row)?;

        if let Some((current, group)) = self.current.as_mut()
            && *current == key
        {
            group.push(row);
            return Ok(None);
        }

        self.check_unseen(&key)?;
        let completed = self.take_group();
        self.current = Some((key, RowGroup::new(row)));

        Ok(completed)
    }

    /// Flush the trailing group at end of stream.
    pub fn finish(&mut self) -> Option<RowGroup> {
        self.take_group()
    }

    /// Rows held for the group currently being assembled.
    #[must_use]
    pub fn buffered_rows(&self) -> usize {
        self.current.as_ref().map_or(0, |(_, group)| group.len())
    }

    fn check_unseen(&self, key: &GroupKey) -> Result<(), CursorError> {
        if self.mode == ClusteringMode::Verify && self.emitted.contains(key) {
            return Err(CursorError::NonClusteredKey {
                key: key.to_string(),
            });
        }

        Ok(())
    }

    fn take_group(&mut self) -> Option<RowGroup> {
        let (key, group) = self.current.take()?;
        if self.mode == ClusteringMode::Verify {
            self.emitted.insert(key);
        }

        Some(group)
    }
}
