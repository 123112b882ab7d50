//! Error types for validation failures
//!
//! Two categories:
//! - [`ErrorTree`]: path-addressed messages for ordinary invalid input. These
//!   are values, never raised.
//! - [`SchemaDefect`]: a rule predicate or transform that itself failed. This
//!   is a bug in the schema definition and is returned as `Err`.

use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::path::{FieldPath, PathSegment};

// ============================================================================
// ERROR KIND
// ============================================================================

/// Taxonomy of user-facing validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The raw value is missing or cannot be converted to the declared type.
    TypeCoercion,
    /// A declared constraint or refinement failed.
    RuleViolation,
    /// A list has fewer or more items than allowed.
    CollectionSize,
    /// A strict object received keys it does not declare.
    UnrecognizedKeys,
    /// Set by the caller rather than produced by the engine.
    Manual,
}

impl ErrorKind {
    /// Short machine-readable name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TypeCoercion => "type_coercion",
            Self::RuleViolation => "rule_violation",
            Self::CollectionSize => "collection_size",
            Self::UnrecognizedKeys => "unrecognized_keys",
            Self::Manual => "manual",
        }
    }
}

// ============================================================================
// FIELD ERROR
// ============================================================================

/// The single message recorded for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Which family of failure this is.
    pub kind: ErrorKind,
    /// Code of the rule that failed (`"required"`, `"min_length"`, ...).
    pub code: Cow<'static, str>,
    /// Human-readable message.
    pub message: String,
}

impl FieldError {
    /// Creates a new field error.
    pub fn new(
        kind: ErrorKind,
        code: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a "required" error for an absent value.
    #[must_use]
    pub fn required() -> Self {
        Self::new(ErrorKind::TypeCoercion, "required", "Required")
    }

    /// Creates an "invalid_type" error.
    #[must_use]
    pub fn invalid_type(expected: &str, received: &str) -> Self {
        Self::new(
            ErrorKind::TypeCoercion,
            "invalid_type",
            format!("Expected {expected}, received {received}"),
        )
    }

    /// Creates an error set by the caller.
    pub fn manual(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Manual, "manual", message)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// ============================================================================
// ERROR TREE
// ============================================================================

/// Path-addressed validation errors, in traversal order.
///
/// A composite path (an object or a list) may carry its own entry next to
/// entries for its children, e.g. a minimum-count message on `techs` plus a
/// message on `techs.0.title`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorTree {
    entries: IndexMap<FieldPath, FieldError>,
}

impl ErrorTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `error` at `path`, replacing any previous entry.
    pub fn insert(&mut self, path: FieldPath, error: FieldError) {
        self.entries.insert(path, error);
    }

    /// The error at exactly `path`.
    #[must_use]
    pub fn get(&self, path: &FieldPath) -> Option<&FieldError> {
        self.entries.get(path)
    }

    /// The message at exactly `path`.
    #[must_use]
    pub fn message(&self, path: &FieldPath) -> Option<&str> {
        self.get(path).map(|e| e.message.as_str())
    }

    /// Whether there is an entry at exactly `path`.
    #[must_use]
    pub fn contains(&self, path: &FieldPath) -> bool {
        self.entries.contains_key(path)
    }

    /// Whether `prefix` or anything below it has an entry.
    #[must_use]
    pub fn has_errors_under(&self, prefix: &FieldPath) -> bool {
        self.entries.keys().any(|p| p.starts_with(prefix))
    }

    /// Removes the entry at exactly `path`.
    pub fn remove(&mut self, path: &FieldPath) -> Option<FieldError> {
        self.entries.shift_remove(path)
    }

    /// Removes `prefix` and every entry below it.
    pub fn remove_subtree(&mut self, prefix: &FieldPath) {
        self.entries.retain(|p, _| !p.starts_with(prefix));
    }

    /// Keeps only entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&FieldPath, &FieldError) -> bool) {
        self.entries.retain(|p, e| keep(p, e));
    }

    /// Rewrites every path through `rewrite`; `None` drops the entry.
    pub fn rewrite_paths(&mut self, mut rewrite: impl FnMut(&FieldPath) -> Option<FieldPath>) {
        self.entries = std::mem::take(&mut self.entries)
            .into_iter()
            .filter_map(|(path, error)| rewrite(&path).map(|p| (p, error)))
            .collect();
    }

    /// Moves every entry of `other` into this tree.
    pub fn merge(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    /// Entries below (and including) `prefix`, with paths relative to it.
    #[must_use]
    pub fn subtree(&self, prefix: &FieldPath) -> Self {
        self.entries
            .iter()
            .filter_map(|(path, error)| {
                let rest = path.strip_prefix(prefix)?;
                Some((rest.iter().cloned().collect(), error.clone()))
            })
            .collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in traversal order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldPath, &FieldError)> {
        self.entries.iter()
    }

    /// All paths in traversal order.
    pub fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.entries.keys()
    }

    /// Renders the tree in the nested shape form renderers index into:
    /// `{"techs": {"message": "...", "type": "...", "0": {"title": {...}}}}`.
    #[must_use]
    pub fn to_nested_json(&self) -> Value {
        let mut root = Map::new();
        for (path, error) in &self.entries {
            let mut node = &mut root;
            for segment in path.segments() {
                let key = match segment {
                    PathSegment::Key(key) => key.clone(),
                    PathSegment::Index(index) => index.to_string(),
                };
                let slot = node
                    .entry(key)
                    .or_insert_with(|| Value::Object(Map::new()));
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                node = match slot {
                    Value::Object(map) => map,
                    _ => unreachable!("slot was just made an object"),
                };
            }
            node.insert("message".into(), Value::String(error.message.clone()));
            node.insert("type".into(), Value::String(error.code.to_string()));
        }
        Value::Object(root)
    }
}

impl FromIterator<(FieldPath, FieldError)> for ErrorTree {
    fn from_iter<I: IntoIterator<Item = (FieldPath, FieldError)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ErrorTree {
    type Item = (&'a FieldPath, &'a FieldError);
    type IntoIter = indexmap::map::Iter<'a, FieldPath, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.entries.len())?;
        for (path, error) in &self.entries {
            if path.is_root() {
                write!(f, "\n  (root): {error}")?;
            } else {
                write!(f, "\n  {path}: {error}")?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// SCHEMA DEFECT
// ============================================================================

/// A fault in the schema definition itself, surfaced during validation.
///
/// Never produced for bad input; only for predicates or transforms that
/// cannot do their job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaDefect {
    /// A rule predicate errored instead of answering pass/fail.
    #[error("rule `{rule}` at `{path}` could not be evaluated: {reason}")]
    RuleFailed {
        path: FieldPath,
        rule: String,
        reason: String,
    },

    /// A transform errored.
    #[error("transform `{transform}` at `{path}` failed: {reason}")]
    TransformFailed {
        path: FieldPath,
        transform: String,
        reason: String,
    },

    /// Normalized output could not be read into the requested Rust type.
    #[error("normalized output does not fit the target type: {reason}")]
    OutputShape { reason: String },
}

impl SchemaDefect {
    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::RuleFailed { .. } => "SCHEMA_RULE_FAILED",
            Self::TransformFailed { .. } => "SCHEMA_TRANSFORM_FAILED",
            Self::OutputShape { .. } => "SCHEMA_OUTPUT_SHAPE",
        }
    }
}

/// Failure of [`parse`](crate::engine::parse).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Ordinary invalid input.
    #[error("invalid input: {0}")]
    Invalid(ErrorTree),

    /// The schema itself is broken.
    #[error(transparent)]
    Defect(#[from] SchemaDefect),
}

impl ParseError {
    /// Whether this is a schema defect rather than invalid input.
    #[must_use]
    pub fn is_defect(&self) -> bool {
        matches!(self, Self::Defect(_))
    }

    /// The error tree, for invalid input.
    #[must_use]
    pub fn errors(&self) -> Option<&ErrorTree> {
        match self {
            Self::Invalid(tree) => Some(tree),
            Self::Defect(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_and_lookup() {
        let mut tree = ErrorTree::new();
        tree.insert(FieldPath::from("name"), FieldError::required());
        assert_eq!(tree.message(&FieldPath::from("name")), Some("Required"));
        assert!(tree.get(&FieldPath::from("email")).is_none());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn composite_and_child_entries_coexist() {
        let mut tree = ErrorTree::new();
        tree.insert(
            FieldPath::from("techs"),
            FieldError::new(ErrorKind::CollectionSize, "too_small", "at least two"),
        );
        tree.insert(FieldPath::from("techs.0.title"), FieldError::required());

        assert!(tree.contains(&FieldPath::from("techs")));
        assert!(tree.contains(&FieldPath::from("techs.0.title")));
        assert!(tree.has_errors_under(&FieldPath::from("techs.0")));
        assert!(!tree.has_errors_under(&FieldPath::from("techs.1")));
    }

    #[test]
    fn remove_subtree_drops_descendants_only() {
        let mut tree: ErrorTree = [
            (FieldPath::from("a"), FieldError::required()),
            (FieldPath::from("a.0"), FieldError::required()),
            (FieldPath::from("b"), FieldError::required()),
        ]
        .into_iter()
        .collect();
        tree.remove_subtree(&FieldPath::from("a"));
        assert_eq!(tree.paths().cloned().collect::<Vec<_>>(), vec![
            FieldPath::from("b")
        ]);
    }

    #[test]
    fn subtree_is_relative() {
        let tree: ErrorTree = [
            (FieldPath::from("techs.1.title"), FieldError::required()),
            (FieldPath::from("name"), FieldError::required()),
        ]
        .into_iter()
        .collect();
        let sub = tree.subtree(&FieldPath::from("techs.1"));
        assert_eq!(sub.len(), 1);
        assert!(sub.contains(&FieldPath::from("title")));
    }

    #[test]
    fn nested_json_shape() {
        let tree: ErrorTree = [
            (
                FieldPath::from("techs"),
                FieldError::new(ErrorKind::CollectionSize, "too_small", "min two"),
            ),
            (FieldPath::from("techs.0.title"), FieldError::required()),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            tree.to_nested_json(),
            json!({
                "techs": {
                    "message": "min two",
                    "type": "too_small",
                    "0": { "title": { "message": "Required", "type": "required" } }
                }
            })
        );
    }

    #[test]
    fn serializes_as_flat_map() {
        let tree: ErrorTree = [(FieldPath::from("name"), FieldError::required())]
            .into_iter()
            .collect();
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["name"]["message"], json!("Required"));
        assert_eq!(json["name"]["kind"], json!("type_coercion"));
    }

    #[test]
    fn defect_codes() {
        let defect = SchemaDefect::OutputShape {
            reason: "missing field".into(),
        };
        assert_eq!(defect.code(), "SCHEMA_OUTPUT_SHAPE");
        let err = ParseError::from(defect);
        assert!(err.is_defect());
        assert!(err.errors().is_none());
    }
}
