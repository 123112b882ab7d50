//! Form configuration

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// When a form validates before its first submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Only on submit.
    #[default]
    OnSubmit,
    /// On every value change.
    OnChange,
    /// When a field is marked touched.
    OnBlur,
    /// On blur, then on every change of a touched field.
    OnTouched,
    /// On change and on blur.
    All,
}

/// When a form re-validates after its first submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevalidateMode {
    #[default]
    OnChange,
    OnBlur,
    /// Only on the next submit.
    OnSubmit,
}

/// Behaviour of a [`Form`](crate::Form).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub mode: ValidationMode,
    pub revalidate_mode: RevalidateMode,
    /// Initial values. When absent the schema's defaults are used.
    pub default_values: Option<Value>,
}

impl FormConfig {
    /// Validate on submit only, before and after the first submit.
    #[must_use]
    pub fn submit_only() -> Self {
        Self {
            mode: ValidationMode::OnSubmit,
            revalidate_mode: RevalidateMode::OnSubmit,
            default_values: None,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_revalidate_mode(mut self, mode: RevalidateMode) -> Self {
        self.revalidate_mode = mode;
        self
    }

    #[must_use]
    pub fn with_default_values(mut self, values: Value) -> Self {
        self.default_values = Some(values);
        self
    }

    /// Whether a value change at a field should validate it now.
    pub(crate) fn validates_on_change(&self, submitted: bool, touched: bool) -> bool {
        if submitted {
            return self.revalidate_mode == RevalidateMode::OnChange;
        }
        match self.mode {
            ValidationMode::OnChange | ValidationMode::All => true,
            ValidationMode::OnTouched => touched,
            ValidationMode::OnSubmit | ValidationMode::OnBlur => false,
        }
    }

    /// Whether marking a field touched should validate it now.
    pub(crate) fn validates_on_blur(&self, submitted: bool) -> bool {
        if submitted {
            return self.revalidate_mode == RevalidateMode::OnBlur;
        }
        matches!(
            self.mode,
            ValidationMode::OnBlur | ValidationMode::OnTouched | ValidationMode::All
        )
    }
}
