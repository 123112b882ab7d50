//! Validation engine
//!
//! A depth-first walk pairing a [`SchemaNode`] tree with a raw
//! [`serde_json::Value`] tree. Siblings are always all visited, so a failed
//! run reports every invalid field at once; within one node evaluation stops
//! at the first failing step.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{ErrorKind, ErrorTree, FieldError, ParseError, SchemaDefect};
use crate::node::{ListNode, ObjectNode, PrimitiveKind, PrimitiveNode, SchemaNode, UnknownKeys};
use crate::path::FieldPath;
use crate::rule::{self, Rule};

/// Outcome of validating a whole value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// Every node passed; holds the coerced and transformed value.
    Success(Value),
    /// At least one node failed; holds every error found.
    Failure(ErrorTree),
}

impl Validation {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// The normalized value, on success.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// The error tree, on failure.
    #[must_use]
    pub fn errors(&self) -> Option<&ErrorTree> {
        match self {
            Self::Success(_) => None,
            Self::Failure(errors) => Some(errors),
        }
    }

    /// Converts into a `Result` with the error tree as the error.
    pub fn into_result(self) -> Result<Value, ErrorTree> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(errors) => Err(errors),
        }
    }
}

/// Validates `raw` against `schema`.
///
/// Invalid input is reported as [`Validation::Failure`]; `Err` is reserved
/// for a broken schema (a predicate or transform that errored).
pub fn validate(schema: &SchemaNode, raw: &Value) -> Result<Validation, SchemaDefect> {
    let mut errors = ErrorTree::new();
    let outcome = walk(schema, Some(raw), &FieldPath::root(), &mut errors)?;

    let validation = match outcome {
        Outcome::Valid(value) if errors.is_empty() => Validation::Success(value),
        Outcome::Absent if errors.is_empty() => Validation::Success(Value::Null),
        _ => Validation::Failure(errors),
    };
    match &validation {
        Validation::Success(_) => debug!("validation succeeded"),
        Validation::Failure(errors) => debug!(errors = errors.len(), "validation failed"),
    }
    Ok(validation)
}

/// Validates `raw` and deserializes the normalized value into `T`.
///
/// A normalized value that does not fit `T` means the schema and the type
/// disagree, which is reported as [`SchemaDefect::OutputShape`].
pub fn parse<T: DeserializeOwned>(schema: &SchemaNode, raw: &Value) -> Result<T, ParseError> {
    match validate(schema, raw)? {
        Validation::Success(value) => serde_json::from_value(value).map_err(|e| {
            ParseError::Defect(SchemaDefect::OutputShape {
                reason: e.to_string(),
            })
        }),
        Validation::Failure(errors) => Err(ParseError::Invalid(errors)),
    }
}

/// Per-node result. Errors are written to the shared tree as they are found.
enum Outcome {
    Valid(Value),
    /// An optional node with no value; omitted from the parent object.
    Absent,
    Invalid,
}

fn walk(
    node: &SchemaNode,
    raw: Option<&Value>,
    path: &FieldPath,
    errors: &mut ErrorTree,
) -> Result<Outcome, SchemaDefect> {
    trace!(path = %path, node = node.type_name(), "visiting");
    match node {
        SchemaNode::Primitive(p) => walk_primitive(p, raw, path, errors),
        SchemaNode::Object(o) => walk_object(o, raw, path, errors),
        SchemaNode::List(l) => walk_list(l, raw, path, errors),
    }
}

/// Handles undefined and `null` for composite nodes, returning the present
/// value otherwise.
fn present<'v>(
    raw: Option<&'v Value>,
    optional: bool,
    expected: &str,
    path: &FieldPath,
    errors: &mut ErrorTree,
) -> Result<&'v Value, Outcome> {
    match raw {
        None | Some(Value::Null) if optional => Err(Outcome::Absent),
        None => {
            errors.insert(path.clone(), FieldError::required());
            Err(Outcome::Invalid)
        }
        Some(Value::Null) => {
            errors.insert(path.clone(), FieldError::invalid_type(expected, "null"));
            Err(Outcome::Invalid)
        }
        Some(value) => Ok(value),
    }
}

fn check_rule(rule: &Rule, value: &Value, path: &FieldPath) -> Result<bool, SchemaDefect> {
    rule.check(value).map_err(|reason| SchemaDefect::RuleFailed {
        path: path.clone(),
        rule: rule.code().to_owned(),
        reason,
    })
}

/// Runs `rules` in order and records the first failure at `path`.
fn first_failure(
    rules: &[Rule],
    value: &Value,
    path: &FieldPath,
    errors: &mut ErrorTree,
) -> Result<bool, SchemaDefect> {
    for rule in rules {
        if !check_rule(rule, value, path)? {
            trace!(path = %path, rule = rule.code(), "rule failed");
            errors.insert(path.clone(), rule.to_error());
            return Ok(false);
        }
    }
    Ok(true)
}

fn walk_primitive(
    node: &PrimitiveNode,
    raw: Option<&Value>,
    path: &FieldPath,
    errors: &mut ErrorTree,
) -> Result<Outcome, SchemaDefect> {
    let raw = match raw {
        None | Some(Value::Null) if node.optional => return Ok(Outcome::Absent),
        None => {
            errors.insert(path.clone(), FieldError::required());
            return Ok(Outcome::Invalid);
        }
        Some(value) => value,
    };

    let mut value = match node.coercion {
        Some(coercion) => match coercion.apply(raw) {
            Ok(value) => value,
            Err(error) => {
                errors.insert(path.clone(), error);
                return Ok(Outcome::Invalid);
            }
        },
        None => raw.clone(),
    };

    if !node.kind.accepts(&value) {
        errors.insert(
            path.clone(),
            FieldError::invalid_type(node.kind.name(), rule::type_name(Some(&value))),
        );
        return Ok(Outcome::Invalid);
    }
    if node.kind == PrimitiveKind::Number {
        value = normalize_number(value);
    }

    if !first_failure(&node.rules, &value, path, errors)? {
        return Ok(Outcome::Invalid);
    }

    for transform in &node.transforms {
        value = transform
            .apply(value)
            .map_err(|reason| SchemaDefect::TransformFailed {
                path: path.clone(),
                transform: transform.name().to_owned(),
                reason,
            })?;
    }
    Ok(Outcome::Valid(value))
}

fn normalize_number(value: Value) -> Value {
    match &value {
        Value::Number(n) if n.is_f64() => n.as_f64().map_or(value.clone(), rule::number_to_value),
        _ => value,
    }
}

fn walk_object(
    node: &ObjectNode,
    raw: Option<&Value>,
    path: &FieldPath,
    errors: &mut ErrorTree,
) -> Result<Outcome, SchemaDefect> {
    let raw = match present(raw, node.optional, "object", path, errors) {
        Ok(value) => value,
        Err(outcome) => return Ok(outcome),
    };
    let Value::Object(input) = raw else {
        errors.insert(
            path.clone(),
            FieldError::invalid_type("object", rule::type_name(Some(raw))),
        );
        return Ok(Outcome::Invalid);
    };

    let mut output = Map::new();
    let mut valid = true;
    for (name, child) in &node.fields {
        match walk(child, input.get(name), &path.key(name.as_str()), errors)? {
            Outcome::Valid(value) => {
                output.insert(name.clone(), value);
            }
            Outcome::Absent => {}
            Outcome::Invalid => valid = false,
        }
    }

    let unknown: Vec<&String> = input
        .keys()
        .filter(|key| !node.fields.contains_key(key.as_str()))
        .collect();
    if !unknown.is_empty() {
        match node.unknown_keys {
            UnknownKeys::Strip => {}
            UnknownKeys::Passthrough => {
                for key in unknown {
                    output.insert(key.clone(), input[key.as_str()].clone());
                }
            }
            UnknownKeys::Strict => {
                let listed = unknown
                    .iter()
                    .map(|key| format!("'{key}'"))
                    .collect::<Vec<_>>()
                    .join(", ");
                errors.insert(
                    path.clone(),
                    FieldError::new(
                        ErrorKind::UnrecognizedKeys,
                        "unrecognized_keys",
                        format!("Unrecognized key(s) in object: {listed}"),
                    ),
                );
                valid = false;
            }
        }
    }

    if !valid {
        return Ok(Outcome::Invalid);
    }

    let output = Value::Object(output);
    for refinement in &node.refinements {
        let target = path.join(&refinement.target);
        if !check_rule(&refinement.rule, &output, &target)? {
            trace!(path = %target, "refinement failed");
            errors.insert(target, refinement.rule.to_error());
            return Ok(Outcome::Invalid);
        }
    }
    Ok(Outcome::Valid(output))
}

fn walk_list(
    node: &ListNode,
    raw: Option<&Value>,
    path: &FieldPath,
    errors: &mut ErrorTree,
) -> Result<Outcome, SchemaDefect> {
    let raw = match present(raw, node.optional, "array", path, errors) {
        Ok(value) => value,
        Err(outcome) => return Ok(outcome),
    };
    let Value::Array(items) = raw else {
        errors.insert(
            path.clone(),
            FieldError::invalid_type("array", rule::type_name(Some(raw))),
        );
        return Ok(Outcome::Invalid);
    };

    let mut valid = first_failure(&node.rules, raw, path, errors)?;

    let mut output = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match walk(&node.item, Some(item), &path.index(index), errors)? {
            Outcome::Valid(value) => output.push(value),
            Outcome::Absent => output.push(Value::Null),
            Outcome::Invalid => valid = false,
        }
    }

    Ok(if valid {
        Outcome::Valid(Value::Array(output))
    } else {
        Outcome::Invalid
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{list, number, object, string};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn float_integers_normalize() {
        let schema: SchemaNode = number().into();
        assert_eq!(validate(&schema, &json!(80.0)).unwrap(), Validation::Success(json!(80)));
        assert_eq!(validate(&schema, &json!(2.5)).unwrap(), Validation::Success(json!(2.5)));
    }

    #[test]
    fn null_without_coercion_is_a_type_error() {
        let schema: SchemaNode = object().field("name", string()).into();
        let errors = validate(&schema, &json!({ "name": null })).unwrap();
        assert_eq!(
            errors.errors().unwrap().message(&FieldPath::from("name")),
            Some("Expected string, received null")
        );
    }

    #[test]
    fn optional_null_is_omitted() {
        let schema: SchemaNode = object().field("nick", string().optional()).into();
        assert_eq!(
            validate(&schema, &json!({ "nick": null })).unwrap(),
            Validation::Success(json!({}))
        );
    }

    #[test]
    fn list_and_item_errors_coexist() {
        let schema: SchemaNode = object()
            .field("tags", list(string().min_length(2)).min_items(2))
            .into();
        let outcome = validate(&schema, &json!({ "tags": ["a"] })).unwrap();
        let errors = outcome.errors().unwrap();
        assert_eq!(
            errors.paths().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["tags", "tags.0"]
        );
    }

    #[test]
    fn transform_defect_is_err() {
        let schema: SchemaNode = number().trim().into();
        let defect = validate(&schema, &json!(3)).unwrap_err();
        assert_eq!(defect.code(), "SCHEMA_TRANSFORM_FAILED");
    }
}
