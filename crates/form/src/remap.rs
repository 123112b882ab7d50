//! Index remapping after field-array edits
//!
//! Per-row state (errors, flags, nested arrays) is keyed by path, and paths
//! carry positions. An [`IndexRemap`] records where every old position went
//! so that state can be re-keyed to follow its row.

use formwork_schema::{FieldPath, PathSegment};

use crate::field_array::StableId;

/// Old index → new index for one list. `None` means the row is gone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexRemap {
    targets: Vec<Option<usize>>,
}

impl IndexRemap {
    /// A remap that leaves `len` rows where they are.
    #[must_use]
    pub fn identity(len: usize) -> Self {
        Self {
            targets: (0..len).map(Some).collect(),
        }
    }

    /// Derives the remap from the id order before and after an edit.
    #[must_use]
    pub fn between(before: &[StableId], after: &[StableId]) -> Self {
        Self {
            targets: before
                .iter()
                .map(|id| after.iter().position(|other| other == id))
                .collect(),
        }
    }

    /// Where the row at `old` now lives.
    #[must_use]
    pub fn get(&self, old: usize) -> Option<usize> {
        self.targets.get(old).copied().flatten()
    }

    /// Whether no row moved or disappeared.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.targets
            .iter()
            .enumerate()
            .all(|(old, new)| *new == Some(old))
    }

    /// Rewrites `path` if it points into a row of the list at `list`.
    ///
    /// Paths outside the list, and the list path itself, are returned
    /// unchanged. Paths into a removed row yield `None`.
    #[must_use]
    pub fn apply(&self, list: &FieldPath, path: &FieldPath) -> Option<FieldPath> {
        let Some(rest) = path.strip_prefix(list) else {
            return Some(path.clone());
        };
        let Some((PathSegment::Index(old), tail)) = rest.split_first() else {
            return Some(path.clone());
        };
        let new = self.get(*old)?;
        let mut next = list.index(new);
        for segment in tail {
            next.push(segment.clone());
        }
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u64]) -> Vec<StableId> {
        raw.iter().copied().map(StableId::from_raw).collect()
    }

    #[test]
    fn removal_shifts_later_rows() {
        let remap = IndexRemap::between(&ids(&[1, 2, 3]), &ids(&[1, 3]));
        assert_eq!(remap.get(0), Some(0));
        assert_eq!(remap.get(1), None);
        assert_eq!(remap.get(2), Some(1));
        assert!(!remap.is_identity());
    }

    #[test]
    fn apply_rewrites_only_rows_of_the_list() {
        let remap = IndexRemap::between(&ids(&[1, 2, 3]), &ids(&[3, 1, 2]));
        let list = FieldPath::from("techs");

        assert_eq!(
            remap.apply(&list, &FieldPath::from("techs.2.title")),
            Some(FieldPath::from("techs.0.title"))
        );
        assert_eq!(
            remap.apply(&list, &FieldPath::from("techs")),
            Some(FieldPath::from("techs"))
        );
        assert_eq!(
            remap.apply(&list, &FieldPath::from("name")),
            Some(FieldPath::from("name"))
        );
    }

    #[test]
    fn apply_drops_removed_rows() {
        let remap = IndexRemap::between(&ids(&[1, 2]), &ids(&[2]));
        assert_eq!(
            remap.apply(&FieldPath::from("techs"), &FieldPath::from("techs.0.title")),
            None
        );
    }

    #[test]
    fn identity_is_identity() {
        assert!(IndexRemap::identity(3).is_identity());
        assert!(IndexRemap::between(&ids(&[1, 2]), &ids(&[1, 2, 3])).is_identity());
    }
}
