//! # formwork-schema
//!
//! Declarative schemas for untyped form input: coercion, ordered rules,
//! ordered transforms, nested objects and variable-length lists.
//!
//! ## Quick Start
//!
//! ```rust
//! use formwork_schema::prelude::*;
//! use serde_json::json;
//!
//! let schema: SchemaNode = object()
//!     .field("email", string().email())
//!     .field("age", number().coerce().min(18.0))
//!     .into();
//!
//! match validate(&schema, &json!({ "email": "nope", "age": "17" }))? {
//!     Validation::Success(_) => unreachable!(),
//!     Validation::Failure(errors) => {
//!         assert_eq!(errors.message(&"email".into()), Some("Invalid email"));
//!         assert_eq!(
//!             errors.message(&"age".into()),
//!             Some("Number must be greater than or equal to 18")
//!         );
//!     }
//! }
//! # Ok::<(), SchemaDefect>(())
//! ```
//!
//! ## Failure model
//!
//! Invalid input is data: [`Validation::Failure`] carries an [`ErrorTree`]
//! keyed by [`FieldPath`]. A rule or transform that cannot run at all is a
//! [`SchemaDefect`] and comes back as `Err`.

pub mod engine;
pub mod error;
pub mod node;
pub mod path;
pub mod prelude;
pub mod rule;

pub use engine::{Validation, parse, validate};
pub use error::{ErrorKind, ErrorTree, FieldError, ParseError, SchemaDefect};
pub use node::{
    ListNode, ObjectNode, PrimitiveKind, PrimitiveNode, Refinement, SchemaNode, UnknownKeys,
};
pub use path::{FieldPath, PathSegment};
pub use rule::{Coercion, Rule, Transform};
