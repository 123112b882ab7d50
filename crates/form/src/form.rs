//! The form state manager
//!
//! A [`Form`] owns the raw values of one form instance and everything
//! derived from them: the error tree, per-field flags, field-array ids and
//! submission status. All edits go through `&mut self`, so the derived
//! state can never drift from the values.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

use formwork_schema::{
    ErrorTree, FieldError, FieldPath, ListNode, SchemaNode, Validation, validate,
};
use serde_json::Value;
use tracing::{debug, trace};

use crate::binding::FieldBinding;
use crate::config::FormConfig;
use crate::error::FormError;
use crate::field_array::{FieldArray, FieldItem, IdSource, StableId};
use crate::remap::IndexRemap;
use crate::state::{FieldFlags, FieldStates, FormPhase, FormStatus};
use crate::values;

type SubmitHandler = Box<dyn FnMut(&Value)>;

/// Result of [`Form::handle_submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Validation passed; holds the normalized data given to the handler.
    Submitted(Value),
    /// Validation failed; the errors are in [`Form::errors`].
    Rejected,
}

impl SubmitOutcome {
    #[must_use]
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted(_))
    }
}

/// State of one form instance bound to a schema.
pub struct Form {
    schema: Arc<SchemaNode>,
    config: FormConfig,
    defaults: Value,
    values: Value,
    errors: ErrorTree,
    fields: FieldStates,
    arrays: HashMap<FieldPath, FieldArray>,
    ids: IdSource,
    status: FormStatus,
    handler: Option<SubmitHandler>,
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("config", &self.config)
            .field("values", &self.values)
            .field("errors", &self.errors)
            .field("status", &self.status)
            .field("arrays", &self.arrays.len())
            .field("handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

impl Form {
    /// Creates a form with the default configuration.
    ///
    /// After the first submit the default re-validates a field on every
    /// change, so a fixed field loses its error before the next submit. Use
    /// [`FormConfig::submit_only`] to keep errors until the next submit.
    pub fn new(schema: impl Into<Arc<SchemaNode>>) -> Self {
        Self::with_config(schema, FormConfig::default())
    }

    /// Creates a form. Initial values come from the configuration, falling
    /// back to the schema's defaults.
    pub fn with_config(schema: impl Into<Arc<SchemaNode>>, config: FormConfig) -> Self {
        let schema = schema.into();
        let defaults = config
            .default_values
            .clone()
            .unwrap_or_else(|| schema.default_value());
        Self {
            schema,
            config,
            values: defaults.clone(),
            defaults,
            errors: ErrorTree::new(),
            fields: FieldStates::new(),
            arrays: HashMap::new(),
            ids: IdSource::new(),
            status: FormStatus::default(),
            handler: None,
        }
    }

    /// Replaces the default values and resets the form to them.
    #[must_use]
    pub fn with_defaults(mut self, defaults: Value) -> Self {
        self.reset_to(defaults);
        self
    }

    /// Sets the handler invoked with normalized data on every successful
    /// submit.
    pub fn on_submit(&mut self, handler: impl FnMut(&Value) + 'static) -> &mut Self {
        self.handler = Some(Box::new(handler));
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub fn schema(&self) -> &SchemaNode {
        &self.schema
    }

    #[must_use]
    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    /// The current raw values.
    #[must_use]
    pub fn values(&self) -> &Value {
        &self.values
    }

    /// The raw value at `path`.
    #[must_use]
    pub fn value(&self, path: &FieldPath) -> Option<&Value> {
        values::get(&self.values, path)
    }

    #[must_use]
    pub fn default_values(&self) -> &Value {
        &self.defaults
    }

    #[must_use]
    pub fn errors(&self) -> &ErrorTree {
        &self.errors
    }

    /// The error recorded at exactly `path`.
    #[must_use]
    pub fn error(&self, path: &FieldPath) -> Option<&FieldError> {
        self.errors.get(path)
    }

    #[must_use]
    pub fn status(&self) -> FormStatus {
        self.status
    }

    #[must_use]
    pub fn submit_count(&self) -> u32 {
        self.status.submit_count
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.status.is_submitted
    }

    #[must_use]
    pub fn is_submit_successful(&self) -> bool {
        self.status.is_submit_successful
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.status.phase == FormPhase::Submitting
    }

    #[must_use]
    pub fn is_touched(&self, path: &FieldPath) -> bool {
        self.fields.has(path, FieldFlags::TOUCHED)
    }

    /// Whether the field's value differs from its default.
    #[must_use]
    pub fn is_field_dirty(&self, path: &FieldPath) -> bool {
        self.fields.has(path, FieldFlags::DIRTY)
    }

    /// Whether any value differs from the defaults.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.values != self.defaults
    }

    #[must_use]
    pub fn touched_fields(&self) -> Vec<FieldPath> {
        self.fields.paths_with(FieldFlags::TOUCHED)
    }

    #[must_use]
    pub fn dirty_fields(&self) -> Vec<FieldPath> {
        self.fields.paths_with(FieldFlags::DIRTY)
    }

    // ------------------------------------------------------------------
    // Values and field state
    // ------------------------------------------------------------------

    /// Writes a raw value at `path`. Dirty flags below `path` are dropped;
    /// the written value decides the flag of `path` itself.
    pub fn set_value(&mut self, path: &FieldPath, raw: Value) -> Result<(), FormError> {
        self.require_field(path)?;
        values::set(&mut self.values, path, raw)?;
        trace!(path = %path, "value changed");
        self.sync_arrays_under(path);
        self.fields.clear_subtree(path, FieldFlags::DIRTY);
        self.refresh_dirty(path);
        if self
            .config
            .validates_on_change(self.status.is_submitted, self.is_touched(path))
        {
            self.validate_field(path)?;
        }
        Ok(())
    }

    /// Records that the user left the field.
    pub fn mark_touched(&mut self, path: &FieldPath) -> Result<(), FormError> {
        self.require_field(path)?;
        self.fields.set(path, FieldFlags::TOUCHED, true);
        if self.config.validates_on_blur(self.status.is_submitted) {
            self.validate_field(path)?;
        }
        Ok(())
    }

    /// Restores the defaults and clears errors, flags and status.
    pub fn reset(&mut self) {
        self.values = self.defaults.clone();
        self.errors = ErrorTree::new();
        self.fields.clear();
        self.arrays.clear();
        self.status = FormStatus::default();
        debug!("form reset");
    }

    /// Makes `defaults` the new defaults and resets to them.
    pub fn reset_to(&mut self, defaults: Value) {
        self.defaults = defaults;
        self.reset();
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Validates the current values and, on success, hands the normalized
    /// data to the submit handler.
    pub fn handle_submit(&mut self) -> Result<SubmitOutcome, FormError> {
        self.status.phase = FormPhase::Submitting;
        self.status.submit_count += 1;

        let validation = match validate(&self.schema, &self.values) {
            Ok(validation) => validation,
            Err(defect) => {
                self.status.phase = FormPhase::Editing;
                return Err(defect.into());
            }
        };

        self.status.is_submitted = true;
        let outcome = match validation {
            Validation::Success(data) => {
                self.errors = ErrorTree::new();
                self.status.is_submit_successful = true;
                if let Some(handler) = self.handler.as_mut() {
                    handler(&data);
                }
                SubmitOutcome::Submitted(data)
            }
            Validation::Failure(errors) => {
                self.errors = errors;
                self.status.is_submit_successful = false;
                SubmitOutcome::Rejected
            }
        };
        self.status.phase = FormPhase::Editing;
        debug!(
            submit_count = self.status.submit_count,
            submitted = outcome.is_submitted(),
            errors = self.errors.len(),
            "submit handled"
        );
        Ok(outcome)
    }

    /// Validates the whole form now without submitting. Returns whether it
    /// is valid.
    pub fn trigger(&mut self) -> Result<bool, FormError> {
        let validation = validate(&self.schema, &self.values)?;
        self.errors = validation.errors().cloned().unwrap_or_default();
        Ok(validation.is_success())
    }

    /// Validates now and refreshes only the errors at or below `path`.
    /// Returns whether that part of the form is valid.
    pub fn trigger_field(&mut self, path: &FieldPath) -> Result<bool, FormError> {
        self.require_field(path)?;
        self.validate_field(path)
    }

    pub fn clear_errors(&mut self) {
        self.errors = ErrorTree::new();
    }

    /// Clears the error at `path` and below.
    pub fn clear_error(&mut self, path: &FieldPath) {
        self.errors.remove_subtree(path);
    }

    /// Records a caller-supplied error, e.g. from a server response.
    pub fn set_error(&mut self, path: &FieldPath, message: impl Into<String>) -> Result<(), FormError> {
        self.require_field(path)?;
        self.errors.insert(path.clone(), FieldError::manual(message));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Bindings
    // ------------------------------------------------------------------

    /// Binds a renderer input to the field at `path`.
    pub fn register(&mut self, path: impl Into<FieldPath>) -> Result<FieldBinding, FormError> {
        let path = path.into();
        self.require_field(&path)?;
        Ok(FieldBinding::path(path))
    }

    /// Binds to `sub_path` inside the row `id` of the list at `list`. The
    /// binding follows the row when other rows are added, removed or moved.
    pub fn register_item(
        &mut self,
        list: impl Into<FieldPath>,
        id: StableId,
        sub_path: impl Into<FieldPath>,
    ) -> Result<FieldBinding, FormError> {
        let list = list.into();
        let sub_path = sub_path.into();
        let index = self.item_index(&list, id)?;
        self.require_field(&list.index(index).join(&sub_path))?;
        Ok(FieldBinding::item(list, id, sub_path))
    }

    /// Current position of row `id`, or `None` if it is gone.
    #[must_use]
    pub fn index_of(&self, list: &FieldPath, id: StableId) -> Option<usize> {
        self.arrays.get(list).and_then(|array| array.index_of(id))
    }

    // ------------------------------------------------------------------
    // Field arrays
    // ------------------------------------------------------------------

    /// The field array for `list`, if it has been used.
    #[must_use]
    pub fn field_array(&self, list: &FieldPath) -> Option<&FieldArray> {
        self.arrays.get(list)
    }

    /// Rows of the list at `list`, in order.
    pub fn list_items(&mut self, list: &FieldPath) -> Result<Vec<FieldItem>, FormError> {
        self.with_array(list, |array, entries| {
            Ok((array.items(), IndexRemap::identity(entries.len())))
        })
    }

    /// Errors inside row `id`, with paths relative to the row.
    pub fn item_errors(&mut self, list: &FieldPath, id: StableId) -> Result<ErrorTree, FormError> {
        let index = self.item_index(list, id)?;
        Ok(self.errors.subtree(&list.index(index)))
    }

    /// Appends a row seeded with the item schema's default value.
    pub fn append_item(&mut self, list: &FieldPath) -> Result<StableId, FormError> {
        let value = self.list_node(list)?.item_default();
        self.append_item_with(list, value)
    }

    pub fn append_item_with(&mut self, list: &FieldPath, value: Value) -> Result<StableId, FormError> {
        let id = self.with_array(list, |array, entries| Ok(array.append(entries, value)))?;
        self.after_list_edit(list)?;
        Ok(id)
    }

    pub fn prepend_item(&mut self, list: &FieldPath, value: Value) -> Result<StableId, FormError> {
        let id = self.with_array(list, |array, entries| Ok(array.prepend(entries, value)))?;
        self.after_list_edit(list)?;
        Ok(id)
    }

    pub fn insert_item(
        &mut self,
        list: &FieldPath,
        position: usize,
        value: Value,
    ) -> Result<StableId, FormError> {
        let id = self.with_array(list, |array, entries| array.insert(entries, position, value))?;
        self.after_list_edit(list)?;
        Ok(id)
    }

    /// Removes row `id` and everything recorded for it.
    pub fn remove_item(&mut self, list: &FieldPath, id: StableId) -> Result<Value, FormError> {
        let removed = self.with_array(list, |array, entries| array.remove(entries, id))?;
        self.after_list_edit(list)?;
        Ok(removed)
    }

    pub fn move_item(&mut self, list: &FieldPath, id: StableId, position: usize) -> Result<(), FormError> {
        self.with_array(list, |array, entries| {
            array.move_to(entries, id, position).map(|remap| ((), remap))
        })?;
        self.after_list_edit(list)
    }

    pub fn swap_items(&mut self, list: &FieldPath, a: StableId, b: StableId) -> Result<(), FormError> {
        self.with_array(list, |array, entries| array.swap(entries, a, b).map(|remap| ((), remap)))?;
        self.after_list_edit(list)
    }

    /// Replaces every row; all rows get new ids.
    pub fn replace_items(&mut self, list: &FieldPath, rows: Vec<Value>) -> Result<(), FormError> {
        self.with_array(list, |array, entries| Ok(((), array.replace(entries, rows))))?;
        self.after_list_edit(list)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn require_field(&self, path: &FieldPath) -> Result<(), FormError> {
        self.schema
            .node_at(path)
            .map(|_| ())
            .ok_or_else(|| FormError::UnknownField { path: path.clone() })
    }

    fn list_node(&self, list: &FieldPath) -> Result<&ListNode, FormError> {
        self.schema
            .node_at(list)
            .ok_or_else(|| FormError::UnknownField { path: list.clone() })?
            .as_list()
            .ok_or_else(|| FormError::NotAList { path: list.clone() })
    }

    fn item_index(&mut self, list: &FieldPath, id: StableId) -> Result<usize, FormError> {
        self.with_array(list, |array, entries| {
            let index = array.index_of(id).ok_or_else(|| FormError::UnknownItem {
                list: list.clone(),
                id,
            })?;
            Ok((index, IndexRemap::identity(entries.len())))
        })
    }

    /// Runs `op` on the list's id bookkeeping and rows, then re-keys
    /// per-row state through the remap it returns.
    fn with_array<R>(
        &mut self,
        list: &FieldPath,
        op: impl FnOnce(&mut FieldArray, &mut Vec<Value>) -> Result<(R, IndexRemap), FormError>,
    ) -> Result<R, FormError> {
        self.list_node(list)?;
        let missing = match values::get(&self.values, list) {
            Some(Value::Array(_)) => false,
            None | Some(Value::Null) => true,
            Some(_) => return Err(FormError::NotAList { path: list.clone() }),
        };
        if missing {
            values::set(&mut self.values, list, Value::Array(Vec::new()))?;
        }
        let Some(Value::Array(entries)) = values::get_mut(&mut self.values, list) else {
            return Err(FormError::NotAList { path: list.clone() });
        };

        let array = match self.arrays.entry(list.clone()) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => slot.insert(FieldArray::new(list.clone(), self.ids.clone(), entries)),
        };
        debug_assert_eq!(array.len(), entries.len(), "field array out of sync with its rows");

        let (result, remap) = op(array, entries)?;
        if !remap.is_identity() {
            self.apply_remap(list, &remap);
        }
        Ok(result)
    }

    /// Re-keys errors, flags and nested arrays so they follow their rows.
    fn apply_remap(&mut self, list: &FieldPath, remap: &IndexRemap) {
        self.errors.rewrite_paths(|path| remap.apply(list, path));
        self.fields.rewrite_paths(|path| remap.apply(list, path));
        self.arrays = std::mem::take(&mut self.arrays)
            .into_iter()
            .filter_map(|(path, mut array)| {
                let path = remap.apply(list, &path)?;
                array.set_path(path.clone());
                Some((path, array))
            })
            .collect();
    }

    fn after_list_edit(&mut self, list: &FieldPath) -> Result<(), FormError> {
        self.refresh_dirty(list);
        if self
            .config
            .validates_on_change(self.status.is_submitted, self.is_touched(list))
        {
            self.validate_field(list)?;
        }
        Ok(())
    }

    /// Brings field arrays at or below `path` back in line with their rows
    /// after a direct write.
    fn sync_arrays_under(&mut self, path: &FieldPath) {
        let mut affected: Vec<FieldPath> = self
            .arrays
            .keys()
            .filter(|list| list.starts_with(path))
            .cloned()
            .collect();
        affected.sort_by_key(FieldPath::len);

        for list in affected {
            let remap = match values::get(&self.values, &list) {
                Some(Value::Array(entries)) => match self.arrays.get_mut(&list) {
                    Some(array) => array.sync(entries),
                    None => continue,
                },
                _ => {
                    self.arrays.remove(&list);
                    continue;
                }
            };
            if !remap.is_identity() {
                self.apply_remap(&list, &remap);
            }
        }
    }

    fn refresh_dirty(&mut self, path: &FieldPath) {
        let dirty = values::get(&self.values, path) != values::get(&self.defaults, path);
        self.fields.set(path, FieldFlags::DIRTY, dirty);
    }

    fn validate_field(&mut self, path: &FieldPath) -> Result<bool, FormError> {
        let validation = validate(&self.schema, &self.values)?;
        self.errors.remove_subtree(path);
        let Validation::Failure(errors) = validation else {
            return Ok(true);
        };
        let mut valid = true;
        for (error_path, error) in &errors {
            if error_path.starts_with(path) {
                self.errors.insert(error_path.clone(), error.clone());
                valid = false;
            }
        }
        trace!(path = %path, valid, "field validated");
        Ok(valid)
    }
}
