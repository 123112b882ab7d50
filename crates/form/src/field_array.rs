//! Field arrays
//!
//! A [`FieldArray`] mirrors one list field and gives every row a
//! [`StableId`] that survives insertions, removals and reordering. The raw
//! rows themselves live in the form's value tree; every operation takes
//! them as `&mut Vec<Value>` and keeps ids and rows in lockstep.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use formwork_schema::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::FormError;
use crate::remap::IndexRemap;

/// Identity of one field-array row. Never reused within a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StableId(u64);

impl StableId {
    /// Wraps a raw id. Ids minted by an [`IdSource`] start at 1.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic id counter shared by every field array of one form.
#[derive(Debug, Clone, Default)]
pub struct IdSource(Arc<AtomicU64>);

impl IdSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next id.
    pub fn next_id(&self) -> StableId {
        StableId(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// A row as seen by a renderer: its identity and current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldItem {
    pub id: StableId,
    pub index: usize,
}

/// Id bookkeeping for one list field.
#[derive(Debug, Clone)]
pub struct FieldArray {
    path: FieldPath,
    ids: Vec<StableId>,
    positions: HashMap<StableId, usize>,
    source: IdSource,
}

impl FieldArray {
    /// Creates the array for the list at `path`, minting one id per row.
    pub fn new(path: FieldPath, source: IdSource, entries: &[Value]) -> Self {
        let mut array = Self {
            path,
            ids: Vec::new(),
            positions: HashMap::new(),
            source,
        };
        array.ids = (0..entries.len()).map(|_| array.source.next_id()).collect();
        array.reindex();
        array
    }

    /// The list path this array mirrors.
    #[must_use]
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub(crate) fn set_path(&mut self, path: FieldPath) {
        self.path = path;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids in row order.
    #[must_use]
    pub fn ids(&self) -> &[StableId] {
        &self.ids
    }

    /// Rows in order with their ids.
    #[must_use]
    pub fn items(&self) -> Vec<FieldItem> {
        self.ids
            .iter()
            .enumerate()
            .map(|(index, &id)| FieldItem { id, index })
            .collect()
    }

    /// Current position of `id`.
    #[must_use]
    pub fn index_of(&self, id: StableId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    #[must_use]
    pub fn contains(&self, id: StableId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Adds a row at the end.
    pub fn append(&mut self, entries: &mut Vec<Value>, value: Value) -> (StableId, IndexRemap) {
        let position = entries.len();
        self.insert_at(entries, position, value)
    }

    /// Adds a row at the front.
    pub fn prepend(&mut self, entries: &mut Vec<Value>, value: Value) -> (StableId, IndexRemap) {
        self.insert_at(entries, 0, value)
    }

    /// Adds a row at `position` (`0..=len`).
    pub fn insert(
        &mut self,
        entries: &mut Vec<Value>,
        position: usize,
        value: Value,
    ) -> Result<(StableId, IndexRemap), FormError> {
        if position > entries.len() {
            return Err(self.out_of_range(position));
        }
        Ok(self.insert_at(entries, position, value))
    }

    /// Removes the row `id`. Later rows shift down; their ids do not change.
    pub fn remove(
        &mut self,
        entries: &mut Vec<Value>,
        id: StableId,
    ) -> Result<(Value, IndexRemap), FormError> {
        let index = self.require(id)?;
        let before = self.ids.clone();
        let value = entries.remove(index);
        self.ids.remove(index);
        self.reindex();
        debug!(list = %self.path, %id, index, "removed item");
        Ok((value, IndexRemap::between(&before, &self.ids)))
    }

    /// Moves the row `id` to `position` (`0..len`).
    pub fn move_to(
        &mut self,
        entries: &mut Vec<Value>,
        id: StableId,
        position: usize,
    ) -> Result<IndexRemap, FormError> {
        let from = self.require(id)?;
        if position >= entries.len() {
            return Err(self.out_of_range(position));
        }
        let before = self.ids.clone();
        let value = entries.remove(from);
        entries.insert(position, value);
        let moved = self.ids.remove(from);
        self.ids.insert(position, moved);
        self.reindex();
        debug!(list = %self.path, %id, from, to = position, "moved item");
        Ok(IndexRemap::between(&before, &self.ids))
    }

    /// Exchanges the positions of rows `a` and `b`.
    pub fn swap(
        &mut self,
        entries: &mut [Value],
        a: StableId,
        b: StableId,
    ) -> Result<IndexRemap, FormError> {
        let i = self.require(a)?;
        let j = self.require(b)?;
        let before = self.ids.clone();
        entries.swap(i, j);
        self.ids.swap(i, j);
        self.reindex();
        debug!(list = %self.path, %a, %b, "swapped items");
        Ok(IndexRemap::between(&before, &self.ids))
    }

    /// Replaces every row. All rows get fresh ids.
    pub fn replace(&mut self, entries: &mut Vec<Value>, values: Vec<Value>) -> IndexRemap {
        let before = std::mem::take(&mut self.ids);
        *entries = values;
        self.ids = (0..entries.len()).map(|_| self.source.next_id()).collect();
        self.reindex();
        debug!(list = %self.path, len = entries.len(), "replaced items");
        IndexRemap::between(&before, &self.ids)
    }

    /// Re-establishes one id per row after the rows were written directly.
    ///
    /// Surviving positions keep their ids; extra rows get new ones.
    pub fn sync(&mut self, entries: &[Value]) -> IndexRemap {
        let before = self.ids.clone();
        if entries.len() < self.ids.len() {
            self.ids.truncate(entries.len());
        } else {
            while self.ids.len() < entries.len() {
                self.ids.push(self.source.next_id());
            }
        }
        self.reindex();
        IndexRemap::between(&before, &self.ids)
    }

    fn insert_at(
        &mut self,
        entries: &mut Vec<Value>,
        position: usize,
        value: Value,
    ) -> (StableId, IndexRemap) {
        let before = self.ids.clone();
        let id = self.source.next_id();
        entries.insert(position, value);
        self.ids.insert(position, id);
        self.reindex();
        debug!(list = %self.path, %id, position, "inserted item");
        (id, IndexRemap::between(&before, &self.ids))
    }

    fn require(&self, id: StableId) -> Result<usize, FormError> {
        self.index_of(id).ok_or_else(|| FormError::UnknownItem {
            list: self.path.clone(),
            id,
        })
    }

    fn out_of_range(&self, position: usize) -> FormError {
        FormError::PositionOutOfRange {
            list: self.path.clone(),
            position,
            len: self.ids.len(),
        }
    }

    fn reindex(&mut self) {
        self.positions = self
            .ids
            .iter()
            .enumerate()
            .map(|(index, &id)| (id, index))
            .collect();
    }
}
