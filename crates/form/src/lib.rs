//! # formwork-form
//!
//! Form state driven by a [`formwork_schema`] schema: raw values, per-field
//! touched/dirty flags, submit handling with a path-addressed error tree and
//! field arrays whose rows keep a stable identity across edits.
//!
//! ```rust
//! use formwork_form::prelude::*;
//! use formwork_schema::prelude::*;
//!
//! let schema: SchemaNode = object()
//!     .field("techs", list(object().field("title", string().min_length(1))).min_items(1))
//!     .into();
//! let mut form = Form::new(schema);
//! let techs = FieldPath::from("techs");
//!
//! let id = form.append_item(&techs)?;
//! let title = form.register_item("techs", id, "title")?;
//! title.set_value(&mut form, "Rust")?;
//!
//! assert!(form.handle_submit()?.is_submitted());
//! # Ok::<(), FormError>(())
//! ```

pub mod binding;
pub mod config;
pub mod error;
pub mod field_array;
pub mod form;
pub mod remap;
pub mod state;
pub mod values;

pub use binding::FieldBinding;
pub use config::{FormConfig, RevalidateMode, ValidationMode};
pub use error::FormError;
pub use field_array::{FieldArray, FieldItem, IdSource, StableId};
pub use form::{Form, SubmitOutcome};
pub use remap::IndexRemap;
pub use state::{FieldFlags, FieldStates, FormPhase, FormStatus};

pub mod prelude {
    pub use crate::binding::FieldBinding;
    pub use crate::config::{FormConfig, RevalidateMode, ValidationMode};
    pub use crate::error::FormError;
    pub use crate::field_array::{FieldItem, StableId};
    pub use crate::form::{Form, SubmitOutcome};
}
