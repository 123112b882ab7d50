//! Prelude module for convenient imports.
//!
//! `use formwork_schema::prelude::*;` brings in the node constructors, the
//! node and error types and the engine entry points.

// ============================================================================
// BUILDERS
// ============================================================================

pub use crate::node::{any, boolean, list, number, object, string};

// ============================================================================
// TYPES
// ============================================================================

pub use crate::engine::{Validation, parse, validate};
pub use crate::error::{ErrorKind, ErrorTree, FieldError, ParseError, SchemaDefect};
pub use crate::node::{ListNode, ObjectNode, PrimitiveNode, SchemaNode, UnknownKeys};
pub use crate::path::{FieldPath, PathSegment};
pub use crate::rule::{Coercion, Rule, Transform};
