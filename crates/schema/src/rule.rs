//! Rules, coercions and transforms
//!
//! These are the leaves of a schema: a [`Rule`] answers pass/fail for one
//! value and carries the message to show on failure, a [`Coercion`] converts
//! a raw value to a node's primitive type before any rule runs, and a
//! [`Transform`] normalizes a value after every rule has passed.
//!
//! Rules and transforms are ordered data attached to a node, so evaluation
//! order is visible in the schema rather than hidden in a call chain.

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::{Number, Value};

use crate::error::{ErrorKind, FieldError};

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z0-9_'+\-.]*[A-Z0-9_+\-]@([A-Z0-9][A-Z0-9\-]*\.)+[A-Z]{2,}$")
        .expect("email pattern is valid")
});

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*://[^\s/?#]+[^\s]*$").expect("url pattern is valid"));

/// A rule predicate. `Err` means the predicate could not answer, which is a
/// schema defect rather than a validation failure.
pub type Predicate = Arc<dyn Fn(&Value) -> Result<bool, String> + Send + Sync>;

/// A transform function. `Err` is a schema defect.
pub type TransformFn = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

// ============================================================================
// RULE
// ============================================================================

/// A single pass/fail constraint with the message reported on failure.
#[derive(Clone)]
pub struct Rule {
    code: Cow<'static, str>,
    message: Cow<'static, str>,
    kind: ErrorKind,
    predicate: Predicate,
}

impl Rule {
    /// Creates a rule from an infallible predicate.
    pub fn new<F>(
        code: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
        predicate: F,
    ) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::fallible(code, message, move |value| Ok(predicate(value)))
    }

    /// Creates a rule whose predicate may itself fail.
    pub fn fallible<F>(
        code: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
        predicate: F,
    ) -> Self
    where
        F: Fn(&Value) -> Result<bool, String> + Send + Sync + 'static,
    {
        Self {
            code: code.into(),
            message: message.into(),
            kind: ErrorKind::RuleViolation,
            predicate: Arc::new(predicate),
        }
    }

    /// Replaces the failure message.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.message = message.into();
        self
    }

    /// Overrides the error kind reported on failure.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    /// The rule code (`"min_length"`, `"email"`, `"custom"`, ...).
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The error kind reported on failure.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Evaluates the predicate.
    pub fn check(&self, value: &Value) -> Result<bool, String> {
        (self.predicate)(value)
    }

    /// The error recorded when this rule fails.
    #[must_use]
    pub fn to_error(&self) -> FieldError {
        FieldError::new(self.kind, self.code.clone(), self.message.to_string())
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("code", &self.code)
            .field("message", &self.message)
            .field("kind", &self.kind)
            .field("predicate", &"<function>")
            .finish()
    }
}

fn string_rule<F>(code: &'static str, message: String, check: F) -> Rule
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    Rule::fallible(code, message, move |value| match value {
        Value::String(s) => Ok(check(s)),
        other => Err(format!("expected a string, received {}", type_name(Some(other)))),
    })
}

fn number_rule<F>(code: &'static str, message: String, check: F) -> Rule
where
    F: Fn(f64) -> bool + Send + Sync + 'static,
{
    Rule::fallible(code, message, move |value| match value.as_f64() {
        Some(n) => Ok(check(n)),
        None => Err(format!("expected a number, received {}", type_name(Some(value)))),
    })
}

fn list_rule<F>(code: &'static str, message: String, check: F) -> Rule
where
    F: Fn(&[Value]) -> bool + Send + Sync + 'static,
{
    Rule::fallible(code, message, move |value| match value {
        Value::Array(items) => Ok(check(items)),
        other => Err(format!("expected an array, received {}", type_name(Some(other)))),
    })
    .with_kind(ErrorKind::CollectionSize)
}

/// String has at least `min` characters.
#[must_use]
pub fn min_length(min: usize) -> Rule {
    string_rule(
        "min_length",
        format!("String must contain at least {min} character(s)"),
        move |s| s.chars().count() >= min,
    )
}

/// String has at most `max` characters.
#[must_use]
pub fn max_length(max: usize) -> Rule {
    string_rule(
        "max_length",
        format!("String must contain at most {max} character(s)"),
        move |s| s.chars().count() <= max,
    )
}

/// String has exactly `len` characters.
#[must_use]
pub fn exact_length(len: usize) -> Rule {
    string_rule(
        "exact_length",
        format!("String must contain exactly {len} character(s)"),
        move |s| s.chars().count() == len,
    )
}

/// String is not empty. Whitespace counts as content.
#[must_use]
pub fn non_empty() -> Rule {
    string_rule("non_empty", "String must not be empty".to_owned(), |s| {
        !s.is_empty()
    })
}

/// String is an email address.
#[must_use]
pub fn email() -> Rule {
    string_rule("email", "Invalid email".to_owned(), |s| {
        !s.starts_with('.') && !s.contains("..") && EMAIL_REGEX.is_match(s)
    })
}

/// String is an absolute URL.
#[must_use]
pub fn url() -> Rule {
    string_rule("url", "Invalid url".to_owned(), |s| URL_REGEX.is_match(s))
}

/// String matches `pattern`.
#[must_use]
pub fn pattern(pattern: Regex) -> Rule {
    string_rule("pattern", "Invalid".to_owned(), move |s| pattern.is_match(s))
}

/// String starts with `prefix`.
#[must_use]
pub fn starts_with(prefix: impl Into<String>) -> Rule {
    let prefix = prefix.into();
    string_rule(
        "starts_with",
        format!("Invalid input: must start with \"{prefix}\""),
        move |s| s.starts_with(prefix.as_str()),
    )
}

/// String ends with `suffix`.
#[must_use]
pub fn ends_with(suffix: impl Into<String>) -> Rule {
    let suffix = suffix.into();
    string_rule(
        "ends_with",
        format!("Invalid input: must end with \"{suffix}\""),
        move |s| s.ends_with(suffix.as_str()),
    )
}

/// String contains `needle`.
#[must_use]
pub fn includes(needle: impl Into<String>) -> Rule {
    let needle = needle.into();
    string_rule(
        "includes",
        format!("Invalid input: must include \"{needle}\""),
        move |s| s.contains(needle.as_str()),
    )
}

/// Number is `>= min`.
#[must_use]
pub fn min(min: f64) -> Rule {
    number_rule(
        "min",
        format!(
            "Number must be greater than or equal to {}",
            format_number(min)
        ),
        move |n| n >= min,
    )
}

/// Number is `<= max`.
#[must_use]
pub fn max(max: f64) -> Rule {
    number_rule(
        "max",
        format!("Number must be less than or equal to {}", format_number(max)),
        move |n| n <= max,
    )
}

/// Number is `> bound`.
#[must_use]
pub fn greater_than(bound: f64) -> Rule {
    number_rule(
        "gt",
        format!("Number must be greater than {}", format_number(bound)),
        move |n| n > bound,
    )
}

/// Number is `< bound`.
#[must_use]
pub fn less_than(bound: f64) -> Rule {
    number_rule(
        "lt",
        format!("Number must be less than {}", format_number(bound)),
        move |n| n < bound,
    )
}

/// Number has no fractional part.
#[must_use]
pub fn integer() -> Rule {
    number_rule(
        "int",
        "Expected integer, received float".to_owned(),
        |n| n.fract() == 0.0,
    )
}

/// List has at least `min` items.
#[must_use]
pub fn min_items(min: usize) -> Rule {
    list_rule(
        "too_small",
        format!("Array must contain at least {min} element(s)"),
        move |items| items.len() >= min,
    )
}

/// List has at most `max` items.
#[must_use]
pub fn max_items(max: usize) -> Rule {
    list_rule(
        "too_big",
        format!("Array must contain at most {max} element(s)"),
        move |items| items.len() <= max,
    )
}

// ============================================================================
// COERCION
// ============================================================================

/// Conversion of a raw value to a primitive type, applied before rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coercion {
    /// Text, booleans and `null` to a finite number.
    ToNumber,
    /// Numbers, booleans and `null` to text.
    ToString,
    /// Any scalar to its truthiness.
    ToBoolean,
}

impl Coercion {
    /// Converts `raw`, or reports why it cannot be converted.
    pub fn apply(self, raw: &Value) -> Result<Value, FieldError> {
        match self {
            Self::ToNumber => {
                let n = match raw {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => {
                        let trimmed = s.trim();
                        if trimmed.is_empty() {
                            Some(0.0)
                        } else {
                            trimmed.parse::<f64>().ok()
                        }
                    }
                    Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                    Value::Null => Some(0.0),
                    Value::Array(_) | Value::Object(_) => None,
                };
                n.filter(|n| n.is_finite())
                    .map(number_to_value)
                    .ok_or_else(|| FieldError::invalid_type("number", "nan"))
            }
            Self::ToString => match raw {
                Value::String(_) => Ok(raw.clone()),
                Value::Number(_) | Value::Bool(_) | Value::Null => {
                    Ok(Value::String(raw.to_string()))
                }
                other => Err(FieldError::invalid_type("string", type_name(Some(other)))),
            },
            Self::ToBoolean => Ok(Value::Bool(match raw {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
                Value::String(s) => !s.is_empty(),
                Value::Array(_) | Value::Object(_) => true,
            })),
        }
    }
}

// ============================================================================
// TRANSFORM
// ============================================================================

/// A named value-to-value normalization, applied after all rules pass.
#[derive(Clone)]
pub struct Transform {
    name: Cow<'static, str>,
    apply: TransformFn,
}

impl Transform {
    /// Creates a transform from an infallible function.
    pub fn new<F>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self::fallible(name, move |value| Ok(f(value)))
    }

    /// Creates a transform that may fail.
    pub fn fallible<F>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            apply: Arc::new(f),
        }
    }

    /// Creates a string-to-string transform. Non-string input is an error.
    pub fn map_str<F>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self::fallible(name, move |value| match value {
            Value::String(s) => Ok(Value::String(f(&s))),
            other => Err(format!("expected a string, received {}", type_name(Some(&other)))),
        })
    }

    /// The transform name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the transform.
    pub fn apply(&self, value: Value) -> Result<Value, String> {
        (self.apply)(value)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("name", &self.name)
            .field("apply", &"<function>")
            .finish()
    }
}

/// Trims leading and trailing whitespace.
#[must_use]
pub fn trim() -> Transform {
    Transform::map_str("trim", |s| s.trim().to_owned())
}

/// Lowercases the whole string.
#[must_use]
pub fn to_lowercase() -> Transform {
    Transform::map_str("to_lowercase", str::to_lowercase)
}

/// Uppercases the whole string.
#[must_use]
pub fn to_uppercase() -> Transform {
    Transform::map_str("to_uppercase", str::to_uppercase)
}

/// Trims, then uppercases the first letter of every space-separated word.
/// The rest of each word is left as is, so the transform is idempotent.
///
/// An empty word (blank input or a run of inner spaces) has no first letter
/// and fails the transform.
#[must_use]
pub fn capitalize_words() -> Transform {
    Transform::fallible("capitalize_words", |value| match value {
        Value::String(s) => s
            .trim()
            .split(' ')
            .map(capitalize_first)
            .collect::<Result<Vec<_>, _>>()
            .map(|words| Value::String(words.join(" "))),
        other => Err(format!("expected a string, received {}", type_name(Some(&other)))),
    })
}

fn capitalize_first(word: &str) -> Result<String, String> {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => Ok(first.to_uppercase().chain(chars).collect()),
        None => Err("cannot capitalize an empty word".to_owned()),
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Name of a raw value's type as shown in type errors. `None` is an absent
/// key.
#[must_use]
pub fn type_name(value: Option<&Value>) -> &'static str {
    match value {
        None => "undefined",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

/// Integral values become JSON integers so `80` stays `80`, not `80.0`.
pub(crate) fn number_to_value(n: f64) -> Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

fn format_number(n: f64) -> String {
    match number_to_value(n) {
        Value::Number(num) => num.to_string(),
        _ => n.to_string(),
    }
}
