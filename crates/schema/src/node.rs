//! Schema nodes and their builders
//!
//! A schema is an immutable tree of [`SchemaNode`]s built with constructor
//! functions and consuming builder methods:
//!
//! ```rust
//! use formwork_schema::prelude::*;
//!
//! let signup: SchemaNode = object()
//!     .field("name", string().min_length(1).message("Name is required").capitalize_words())
//!     .field("age", number().coerce().min(18.0))
//!     .field("tags", list(string().non_empty()).max_items(5))
//!     .into();
//!
//! let outcome = signup.validate(&serde_json::json!({
//!     "name": "ada lovelace",
//!     "age": "36",
//!     "tags": ["math"],
//! }))?;
//! assert!(outcome.is_success());
//! # Ok::<(), formwork_schema::SchemaDefect>(())
//! ```
//!
//! There is no shared builder state, so a finished tree can be cloned,
//! shared across threads and reused freely.

use indexmap::IndexMap;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::engine::{self, Validation};
use crate::error::{ParseError, SchemaDefect};
use crate::path::{FieldPath, PathSegment};
use crate::rule::{self, Coercion, Rule, Transform};

// ============================================================================
// SCHEMA NODE
// ============================================================================

/// A composable validator/transformer for one field or substructure.
#[derive(Debug, Clone)]
pub enum SchemaNode {
    Primitive(PrimitiveNode),
    Object(ObjectNode),
    List(ListNode),
}

impl SchemaNode {
    /// Validates `raw` against this node. See [`engine::validate`].
    pub fn validate(&self, raw: &Value) -> Result<Validation, SchemaDefect> {
        engine::validate(self, raw)
    }

    /// Validates `raw` and reads the normalized output into `T`.
    pub fn parse<T: DeserializeOwned>(&self, raw: &Value) -> Result<T, ParseError> {
        engine::parse(self, raw)
    }

    /// Whether an absent or `null` value is accepted.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        match self {
            Self::Primitive(p) => p.optional,
            Self::Object(o) => o.optional,
            Self::List(l) => l.optional,
        }
    }

    /// Short name of the node type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Primitive(p) => p.kind.name(),
            Self::Object(_) => "object",
            Self::List(_) => "array",
        }
    }

    /// The list node, if this is one.
    #[must_use]
    pub fn as_list(&self) -> Option<&ListNode> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// The object node, if this is one.
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The node that validates values at `path` below this one.
    ///
    /// Any index descends into a list's item schema.
    #[must_use]
    pub fn node_at(&self, path: &FieldPath) -> Option<&SchemaNode> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| match (node, segment) {
                (Self::Object(o), PathSegment::Key(key)) => o.fields.get(key),
                (Self::List(l), PathSegment::Index(_)) => Some(l.item.as_ref()),
                _ => None,
            })
    }

    /// The value used to seed a form or a new list row.
    ///
    /// A declared default wins. Otherwise strings start empty, numbers at
    /// their declared minimum (or zero), booleans false, objects with each
    /// required child's default and lists empty.
    #[must_use]
    pub fn default_value(&self) -> Value {
        match self {
            Self::Primitive(p) => p.default_value(),
            Self::Object(o) => o.default_value(),
            Self::List(l) => l.default.clone().unwrap_or_else(|| Value::Array(Vec::new())),
        }
    }
}

impl From<PrimitiveNode> for SchemaNode {
    fn from(node: PrimitiveNode) -> Self {
        Self::Primitive(node)
    }
}

impl From<ObjectNode> for SchemaNode {
    fn from(node: ObjectNode) -> Self {
        Self::Object(node)
    }
}

impl From<ListNode> for SchemaNode {
    fn from(node: ListNode) -> Self {
        Self::List(node)
    }
}

// ============================================================================
// PRIMITIVE
// ============================================================================

/// The primitive type a leaf node expects after coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    String,
    Number,
    Boolean,
    /// Accepts any non-absent value as is.
    Any,
}

impl PrimitiveKind {
    /// Name used in type error messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Any => "any",
        }
    }

    /// Whether `value` already has this type.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Any => true,
        }
    }

    fn coercion(self) -> Option<Coercion> {
        match self {
            Self::String => Some(Coercion::ToString),
            Self::Number => Some(Coercion::ToNumber),
            Self::Boolean => Some(Coercion::ToBoolean),
            Self::Any => None,
        }
    }
}

/// A leaf node: optional coercion, ordered rules, ordered transforms.
#[derive(Debug, Clone)]
pub struct PrimitiveNode {
    pub(crate) kind: PrimitiveKind,
    pub(crate) coercion: Option<Coercion>,
    pub(crate) rules: Vec<Rule>,
    pub(crate) transforms: Vec<Transform>,
    pub(crate) default: Option<Value>,
    pub(crate) optional: bool,
    lower_bound: Option<f64>,
}

/// A string leaf.
#[must_use]
pub fn string() -> PrimitiveNode {
    PrimitiveNode::new(PrimitiveKind::String)
}

/// A number leaf. Text is rejected unless [`PrimitiveNode::coerce`] is set.
#[must_use]
pub fn number() -> PrimitiveNode {
    PrimitiveNode::new(PrimitiveKind::Number)
}

/// A boolean leaf.
#[must_use]
pub fn boolean() -> PrimitiveNode {
    PrimitiveNode::new(PrimitiveKind::Boolean)
}

/// A leaf that accepts any present value.
#[must_use]
pub fn any() -> PrimitiveNode {
    PrimitiveNode::new(PrimitiveKind::Any)
}

impl PrimitiveNode {
    /// Creates an unconstrained leaf of `kind`.
    #[must_use]
    pub fn new(kind: PrimitiveKind) -> Self {
        Self {
            kind,
            coercion: None,
            rules: Vec::new(),
            transforms: Vec::new(),
            default: None,
            optional: false,
            lower_bound: None,
        }
    }

    /// Converts raw input to this node's type before any rule runs.
    pub fn coerce(mut self) -> Self {
        self.coercion = self.kind.coercion();
        self
    }

    /// Appends a rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Replaces the message of the most recently added rule.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        if let Some(last) = self.rules.pop() {
            self.rules.push(last.with_message(message.into()));
        }
        self
    }

    pub fn min_length(self, min: usize) -> Self {
        self.rule(rule::min_length(min))
    }

    pub fn max_length(self, max: usize) -> Self {
        self.rule(rule::max_length(max))
    }

    pub fn length(self, len: usize) -> Self {
        self.rule(rule::exact_length(len))
    }

    pub fn non_empty(self) -> Self {
        self.rule(rule::non_empty())
    }

    pub fn email(self) -> Self {
        self.rule(rule::email())
    }

    pub fn url(self) -> Self {
        self.rule(rule::url())
    }

    pub fn pattern(self, pattern: Regex) -> Self {
        self.rule(rule::pattern(pattern))
    }

    pub fn starts_with(self, prefix: impl Into<String>) -> Self {
        self.rule(rule::starts_with(prefix))
    }

    pub fn ends_with(self, suffix: impl Into<String>) -> Self {
        self.rule(rule::ends_with(suffix))
    }

    pub fn includes(self, needle: impl Into<String>) -> Self {
        self.rule(rule::includes(needle))
    }

    /// Inclusive lower bound. Also seeds [`SchemaNode::default_value`].
    pub fn min(mut self, min: f64) -> Self {
        self.raise_lower_bound(min);
        self.rule(rule::min(min))
    }

    pub fn max(self, max: f64) -> Self {
        self.rule(rule::max(max))
    }

    /// Exclusive lower bound. The default value becomes the first integer
    /// above `bound`.
    pub fn gt(mut self, bound: f64) -> Self {
        self.raise_lower_bound(bound.floor() + 1.0);
        self.rule(rule::greater_than(bound))
    }

    fn raise_lower_bound(&mut self, seed: f64) {
        self.lower_bound = Some(self.lower_bound.map_or(seed, |b| b.max(seed)));
    }

    pub fn lt(self, bound: f64) -> Self {
        self.rule(rule::less_than(bound))
    }

    pub fn int(self) -> Self {
        self.rule(rule::integer())
    }

    pub fn positive(self) -> Self {
        self.gt(0.0)
    }

    pub fn nonnegative(self) -> Self {
        self.min(0.0)
    }

    /// Custom rule over the coerced value.
    pub fn refine<F>(self, predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.rule(Rule::new("custom", message.into(), predicate))
    }

    /// Custom rule over a string value. Applied to a non-string it is a
    /// schema defect.
    pub fn refine_str<F>(self, predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.rule(Rule::fallible("custom", message.into(), move |value| {
            value
                .as_str()
                .map(&predicate)
                .ok_or_else(|| format!("expected a string, received {}", rule::type_name(Some(value))))
        }))
    }

    /// Custom rule whose predicate may fail; failure is a schema defect.
    pub fn try_refine<F>(self, predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Value) -> Result<bool, String> + Send + Sync + 'static,
    {
        self.rule(Rule::fallible("custom", message.into(), predicate))
    }

    /// Appends a transform.
    pub fn transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Appends a string-to-string transform.
    pub fn map_str<F>(self, name: &'static str, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.transform(Transform::map_str(name, f))
    }

    pub fn trim(self) -> Self {
        self.transform(rule::trim())
    }

    pub fn to_lowercase(self) -> Self {
        self.transform(rule::to_lowercase())
    }

    pub fn to_uppercase(self) -> Self {
        self.transform(rule::to_uppercase())
    }

    pub fn capitalize_words(self) -> Self {
        self.transform(rule::capitalize_words())
    }

    /// Value used to seed forms and new list rows.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Accepts absent and `null` input.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    #[must_use]
    pub fn coercion(&self) -> Option<Coercion> {
        self.coercion
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    fn default_value(&self) -> Value {
        if let Some(value) = &self.default {
            return value.clone();
        }
        if self.optional {
            return Value::Null;
        }
        match self.kind {
            PrimitiveKind::String => Value::String(String::new()),
            PrimitiveKind::Number => rule::number_to_value(self.lower_bound.unwrap_or(0.0)),
            PrimitiveKind::Boolean => Value::Bool(false),
            PrimitiveKind::Any => Value::Null,
        }
    }
}

// ============================================================================
// OBJECT
// ============================================================================

/// What an object does with keys it does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnknownKeys {
    /// Drop them from the normalized output.
    #[default]
    Strip,
    /// Copy them to the normalized output unchanged.
    Passthrough,
    /// Report them as an error on the object.
    Strict,
}

/// A cross-field rule over a fully valid, normalized object.
#[derive(Debug, Clone)]
pub struct Refinement {
    /// Where the message is recorded, relative to the object.
    pub target: FieldPath,
    pub rule: Rule,
}

/// A composite node mapping field names to child nodes.
#[derive(Debug, Clone, Default)]
pub struct ObjectNode {
    pub(crate) fields: IndexMap<String, SchemaNode>,
    pub(crate) refinements: Vec<Refinement>,
    pub(crate) unknown_keys: UnknownKeys,
    pub(crate) optional: bool,
}

/// An object with no fields yet.
#[must_use]
pub fn object() -> ObjectNode {
    ObjectNode::default()
}

impl ObjectNode {
    /// Declares a field. Declaring the same name twice replaces the node.
    pub fn field(mut self, name: impl Into<String>, node: impl Into<SchemaNode>) -> Self {
        self.fields.insert(name.into(), node.into());
        self
    }

    /// Cross-field rule reported on the object itself.
    pub fn refine<F>(self, predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.refine_at(FieldPath::root(), predicate, message)
    }

    /// Cross-field rule reported at `target` (relative to the object),
    /// e.g. a password confirmation reported on `confirm`.
    pub fn refine_at<F>(
        mut self,
        target: impl Into<FieldPath>,
        predicate: F,
        message: impl Into<String>,
    ) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.refinements.push(Refinement {
            target: target.into(),
            rule: Rule::new("custom", message.into(), predicate),
        });
        self
    }

    /// Replaces the message of the most recently added refinement.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        if let Some(last) = self.refinements.last_mut() {
            last.rule = last.rule.clone().with_message(message.into());
        }
        self
    }

    /// Rejects undeclared keys.
    pub fn strict(mut self) -> Self {
        self.unknown_keys = UnknownKeys::Strict;
        self
    }

    /// Keeps undeclared keys in the output.
    pub fn passthrough(mut self) -> Self {
        self.unknown_keys = UnknownKeys::Passthrough;
        self
    }

    /// Accepts absent and `null` input.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn fields(&self) -> &IndexMap<String, SchemaNode> {
        &self.fields
    }

    #[must_use]
    pub fn field_node(&self, name: &str) -> Option<&SchemaNode> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn refinements(&self) -> &[Refinement] {
        &self.refinements
    }

    #[must_use]
    pub fn unknown_keys(&self) -> UnknownKeys {
        self.unknown_keys
    }

    fn default_value(&self) -> Value {
        if self.optional {
            return Value::Null;
        }
        let map: Map<String, Value> = self
            .fields
            .iter()
            .filter(|(_, node)| !node.is_optional())
            .map(|(name, node)| (name.clone(), node.default_value()))
            .collect();
        Value::Object(map)
    }
}

// ============================================================================
// LIST
// ============================================================================

/// A composite node for a variable-length list of same-shaped items.
#[derive(Debug, Clone)]
pub struct ListNode {
    pub(crate) item: Box<SchemaNode>,
    pub(crate) min_items: Option<usize>,
    pub(crate) max_items: Option<usize>,
    pub(crate) rules: Vec<Rule>,
    pub(crate) default: Option<Value>,
    pub(crate) optional: bool,
}

/// A list whose items follow `item`.
#[must_use]
pub fn list(item: impl Into<SchemaNode>) -> ListNode {
    ListNode {
        item: Box::new(item.into()),
        min_items: None,
        max_items: None,
        rules: Vec::new(),
        default: None,
        optional: false,
    }
}

impl ListNode {
    /// At least `min` items.
    pub fn min_items(mut self, min: usize) -> Self {
        self.min_items = Some(min);
        self.rule(rule::min_items(min))
    }

    /// At most `max` items.
    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self.rule(rule::max_items(max))
    }

    /// Appends a list-level rule, evaluated against the raw array.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Custom list-level rule over the raw array.
    pub fn refine<F>(self, predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        self.rule(Rule::fallible("custom", message.into(), move |value| {
            value
                .as_array()
                .map(|items| predicate(items))
                .ok_or_else(|| "expected an array".to_owned())
        }))
    }

    /// Replaces the message of the most recently added list-level rule.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        if let Some(last) = self.rules.pop() {
            self.rules.push(last.with_message(message.into()));
        }
        self
    }

    /// Initial rows for a fresh form.
    pub fn default(mut self, rows: Vec<Value>) -> Self {
        self.default = Some(Value::Array(rows));
        self
    }

    /// Accepts absent and `null` input.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// The schema every item follows.
    #[must_use]
    pub fn item(&self) -> &SchemaNode {
        &self.item
    }

    #[must_use]
    pub fn min(&self) -> Option<usize> {
        self.min_items
    }

    #[must_use]
    pub fn max(&self) -> Option<usize> {
        self.max_items
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Value for a newly appended row.
    #[must_use]
    pub fn item_default(&self) -> Value {
        self.item.default_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn techs() -> SchemaNode {
        object()
            .field(
                "techs",
                list(
                    object()
                        .field("title", string().min_length(1))
                        .field("knowledge", number().coerce().min(1.0).max(100.0)),
                )
                .min_items(2),
            )
            .into()
    }

    #[test]
    fn message_replaces_last_rule_only() {
        let node = string().min_length(1).email().message("bad email");
        assert_eq!(node.rules()[0].message(), "String must contain at least 1 character(s)");
        assert_eq!(node.rules()[1].message(), "bad email");
    }

    #[test]
    fn message_without_rules_is_noop() {
        let node = string().message("ignored");
        assert!(node.rules().is_empty());
    }

    #[test]
    fn coerce_picks_kind_coercion() {
        assert_eq!(number().coerce().coercion(), Some(Coercion::ToNumber));
        assert_eq!(string().coercion(), None);
        assert_eq!(any().coerce().coercion(), None);
    }

    #[test]
    fn node_at_descends_objects_and_lists() {
        let schema = techs();
        let knowledge = schema.node_at(&FieldPath::from("techs.3.knowledge")).unwrap();
        assert_eq!(knowledge.type_name(), "number");
        assert!(schema.node_at(&FieldPath::from("techs")).unwrap().as_list().is_some());
        assert!(schema.node_at(&FieldPath::from("techs.title")).is_none());
        assert!(schema.node_at(&FieldPath::from("missing")).is_none());
    }

    #[test]
    fn default_values_follow_declared_bounds() {
        let schema = techs();
        assert_eq!(schema.default_value(), json!({ "techs": [] }));
        let list = schema.node_at(&FieldPath::from("techs")).unwrap().as_list().unwrap();
        assert_eq!(list.item_default(), json!({ "title": "", "knowledge": 1 }));
    }

    #[test]
    fn exclusive_bounds_seed_defaults_that_pass() {
        let schema: SchemaNode = object()
            .field("count", number().positive().int())
            .field("score", number().gt(2.5))
            .field("level", number().min(4.0).gt(1.0))
            .into();
        let defaults = schema.default_value();
        assert_eq!(defaults, json!({ "count": 1, "score": 3, "level": 4 }));
        assert!(schema.validate(&defaults).unwrap().is_success());
    }

    #[test]
    fn declared_default_wins_and_optional_fields_are_skipped() {
        let schema: SchemaNode = object()
            .field("role", string().default("member"))
            .field("nickname", string().optional())
            .field("active", boolean())
            .into();
        assert_eq!(schema.default_value(), json!({ "role": "member", "active": false }));
    }

    #[test]
    fn list_bounds_are_recorded() {
        let node = list(string()).min_items(2).max_items(4);
        assert_eq!(node.min(), Some(2));
        assert_eq!(node.max(), Some(4));
        assert_eq!(node.rules().len(), 2);
    }
}
