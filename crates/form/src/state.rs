//! Per-field interaction state and form status

use std::collections::HashMap;

use bitflags::bitflags;
use formwork_schema::FieldPath;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Flags representing the interaction state of one field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldFlags: u8 {
        /// The user has left the field at least once.
        const TOUCHED = 0b0000_0001;
        /// The value differs from the default.
        const DIRTY = 0b0000_0010;
    }
}

/// Flags for every field that has any, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct FieldStates {
    flags: HashMap<FieldPath, FieldFlags>,
}

impl FieldStates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags of the field at `path` (empty when never touched).
    #[must_use]
    pub fn flags(&self, path: &FieldPath) -> FieldFlags {
        self.flags.get(path).copied().unwrap_or_default()
    }

    /// Whether `path` carries `flag`.
    #[must_use]
    pub fn has(&self, path: &FieldPath, flag: FieldFlags) -> bool {
        self.flags(path).contains(flag)
    }

    /// Sets or clears `flag` on `path`.
    pub fn set(&mut self, path: &FieldPath, flag: FieldFlags, on: bool) {
        if on {
            self.flags.entry(path.clone()).or_default().insert(flag);
        } else if let Some(flags) = self.flags.get_mut(path) {
            flags.remove(flag);
            if flags.is_empty() {
                self.flags.remove(path);
            }
        }
    }

    /// Clears `flag` on `path` and everything below it.
    pub fn clear_subtree(&mut self, prefix: &FieldPath, flag: FieldFlags) {
        self.flags.retain(|path, flags| {
            if path.starts_with(prefix) {
                flags.remove(flag);
            }
            !flags.is_empty()
        });
    }

    /// Paths carrying `flag`, sorted by their dotted form.
    #[must_use]
    pub fn paths_with(&self, flag: FieldFlags) -> Vec<FieldPath> {
        let mut paths: Vec<FieldPath> = self
            .flags
            .iter()
            .filter(|(_, flags)| flags.contains(flag))
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort_by_cached_key(ToString::to_string);
        paths
    }

    /// Re-keys every entry through `rewrite`; `None` drops it.
    pub fn rewrite_paths(&mut self, mut rewrite: impl FnMut(&FieldPath) -> Option<FieldPath>) {
        self.flags = std::mem::take(&mut self.flags)
            .into_iter()
            .filter_map(|(path, flags)| rewrite(&path).map(|p| (p, flags)))
            .collect();
    }

    /// Drops all flags.
    pub fn clear(&mut self) {
        self.flags.clear();
    }
}

/// Lifecycle phase of a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormPhase {
    #[default]
    Editing,
    /// Between the start of a submit and its outcome.
    Submitting,
}

/// Submission bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormStatus {
    pub phase: FormPhase,
    /// Submit attempts, successful or not.
    pub submit_count: u32,
    pub is_submitted: bool,
    /// Whether the latest submit passed validation.
    pub is_submit_successful: bool,
}
