use formwork_schema::{FieldPath, SchemaDefect};

use crate::field_array::StableId;

/// Error type for form operations.
///
/// Invalid input never shows up here; it is recorded in the form's error
/// tree. These are misuse of the form API and schema defects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    /// The path does not address any node of the schema.
    #[error("unknown field: `{path}`")]
    UnknownField { path: FieldPath },

    /// A field-array operation targeted a path that is not a list.
    #[error("field `{path}` is not a list")]
    NotAList { path: FieldPath },

    /// No row of the list carries this id.
    #[error("no item {id} in `{list}`")]
    UnknownItem { list: FieldPath, id: StableId },

    /// A position past the end of the list.
    #[error("position {position} out of range for `{list}` with {len} item(s)")]
    PositionOutOfRange {
        list: FieldPath,
        position: usize,
        len: usize,
    },

    /// A binding anchored to a row that has been removed.
    #[error("binding to removed item {id} in `{list}`")]
    StaleBinding { list: FieldPath, id: StableId },

    /// The schema failed while validating.
    #[error(transparent)]
    Defect(#[from] SchemaDefect),
}

impl FormError {
    /// Broad error category for grouping in logs.
    #[must_use]
    pub fn category(&self) -> &str {
        match self {
            Self::UnknownField { .. } | Self::NotAList { .. } => "lookup",
            Self::UnknownItem { .. } | Self::PositionOutOfRange { .. } => "field_array",
            Self::StaleBinding { .. } => "binding",
            Self::Defect(_) => "schema",
        }
    }

    /// Machine-readable error code for programmatic handling.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::UnknownField { .. } => "FORM_UNKNOWN_FIELD",
            Self::NotAList { .. } => "FORM_NOT_A_LIST",
            Self::UnknownItem { .. } => "FORM_UNKNOWN_ITEM",
            Self::PositionOutOfRange { .. } => "FORM_POSITION_OUT_OF_RANGE",
            Self::StaleBinding { .. } => "FORM_STALE_BINDING",
            Self::Defect(_) => "FORM_SCHEMA_DEFECT",
        }
    }
}
