//! Field bindings
//!
//! A [`FieldBinding`] is what a renderer holds for one input. It does not
//! borrow the form; every access takes the form explicitly and resolves the
//! binding's target path at that moment. Bindings created with
//! [`Form::register_item`] are anchored to a row's [`StableId`] and keep
//! pointing at that row as its position changes.

use formwork_schema::{FieldError, FieldPath};
use serde_json::Value;

use crate::error::FormError;
use crate::field_array::StableId;
use crate::form::Form;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Target {
    Path(FieldPath),
    Item {
        list: FieldPath,
        id: StableId,
        sub_path: FieldPath,
    },
}

/// Handle connecting one renderer input to one form field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldBinding {
    target: Target,
}

impl FieldBinding {
    pub(crate) fn path(path: FieldPath) -> Self {
        Self {
            target: Target::Path(path),
        }
    }

    pub(crate) fn item(list: FieldPath, id: StableId, sub_path: FieldPath) -> Self {
        Self {
            target: Target::Item { list, id, sub_path },
        }
    }

    /// The row this binding is anchored to, if any.
    #[must_use]
    pub fn anchor(&self) -> Option<(&FieldPath, StableId)> {
        match &self.target {
            Target::Path(_) => None,
            Target::Item { list, id, .. } => Some((list, *id)),
        }
    }

    /// The path this binding addresses right now.
    pub fn resolve(&self, form: &Form) -> Result<FieldPath, FormError> {
        match &self.target {
            Target::Path(path) => Ok(path.clone()),
            Target::Item { list, id, sub_path } => form
                .index_of(list, *id)
                .map(|index| list.index(index).join(sub_path))
                .ok_or_else(|| FormError::StaleBinding {
                    list: list.clone(),
                    id: *id,
                }),
        }
    }

    /// Input name for the renderer (the dotted current path).
    pub fn name(&self, form: &Form) -> Result<String, FormError> {
        self.resolve(form).map(|path| path.to_string())
    }

    /// The field's current raw value.
    pub fn value<'f>(&self, form: &'f Form) -> Result<Option<&'f Value>, FormError> {
        let path = self.resolve(form)?;
        Ok(form.value(&path))
    }

    /// Writes a raw value, as an input's change event would.
    pub fn set_value(&self, form: &mut Form, raw: impl Into<Value>) -> Result<(), FormError> {
        let path = self.resolve(form)?;
        form.set_value(&path, raw.into())
    }

    /// Marks the field touched, as an input's blur event would.
    pub fn mark_touched(&self, form: &mut Form) -> Result<(), FormError> {
        let path = self.resolve(form)?;
        form.mark_touched(&path)
    }

    /// The error recorded for the field.
    pub fn error<'f>(&self, form: &'f Form) -> Result<Option<&'f FieldError>, FormError> {
        let path = self.resolve(form)?;
        Ok(form.error(&path))
    }

    pub fn is_touched(&self, form: &Form) -> Result<bool, FormError> {
        self.resolve(form).map(|path| form.is_touched(&path))
    }

    pub fn is_dirty(&self, form: &Form) -> Result<bool, FormError> {
        self.resolve(form).map(|path| form.is_field_dirty(&path))
    }
}
