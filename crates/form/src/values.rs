//! Path-addressed access into a raw value tree.

use formwork_schema::{FieldPath, PathSegment};
use serde_json::{Map, Value};

use crate::error::FormError;

/// The value at `path`, if every step exists.
#[must_use]
pub fn get<'v>(root: &'v Value, path: &FieldPath) -> Option<&'v Value> {
    path.segments()
        .iter()
        .try_fold(root, |node, segment| match segment {
            PathSegment::Key(key) => node.get(key.as_str()),
            PathSegment::Index(index) => node.get(*index),
        })
}

/// Mutable access to the value at `path`, if every step exists.
pub fn get_mut<'v>(root: &'v mut Value, path: &FieldPath) -> Option<&'v mut Value> {
    path.segments()
        .iter()
        .try_fold(root, |node, segment| match segment {
            PathSegment::Key(key) => node.get_mut(key.as_str()),
            PathSegment::Index(index) => node.get_mut(*index),
        })
}

/// Writes `value` at `path`.
///
/// Missing object steps are created; list positions must already exist.
pub fn set(root: &mut Value, path: &FieldPath, value: Value) -> Result<(), FormError> {
    let mut node = root;
    let mut walked = FieldPath::root();
    for segment in path.segments() {
        node = step_mut(node, segment, &walked)?;
        walked.push(segment.clone());
    }
    *node = value;
    Ok(())
}

fn step_mut<'v>(
    node: &'v mut Value,
    segment: &PathSegment,
    walked: &FieldPath,
) -> Result<&'v mut Value, FormError> {
    match segment {
        PathSegment::Key(key) => {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            node.as_object_mut()
                .map(|map| map.entry(key.clone()).or_insert(Value::Null))
                .ok_or_else(|| FormError::UnknownField {
                    path: walked.key(key.as_str()),
                })
        }
        PathSegment::Index(index) => {
            let len = node
                .as_array()
                .map(Vec::len)
                .ok_or_else(|| FormError::NotAList {
                    path: walked.clone(),
                })?;
            node.get_mut(*index)
                .ok_or_else(|| FormError::PositionOutOfRange {
                    list: walked.clone(),
                    position: *index,
                    len,
                })
        }
    }
}
