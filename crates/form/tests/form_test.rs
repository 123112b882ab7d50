use std::cell::RefCell;
use std::rc::Rc;

use formwork_form::prelude::*;
use formwork_schema::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn signup_schema() -> SchemaNode {
    object()
        .field(
            "name",
            string().min_length(1).message("Name is required").capitalize_words(),
        )
        .field(
            "email",
            string()
                .min_length(1)
                .message("Email is required")
                .email()
                .refine_str(|s| s.ends_with("@fixeddomain.com"), "Use your company email"),
        )
        .field("password", string().min_length(6).message("At least 6 characters"))
        .field(
            "techs",
            list(
                object()
                    .field("title", string().min_length(1).message("Title is required"))
                    .field("knowledge", number().coerce().min(1.0).max(100.0)),
            )
            .min_items(2)
            .message("Add at least two technologies"),
        )
        .into()
}

fn submit_only_form() -> Form {
    Form::with_config(signup_schema(), FormConfig::submit_only())
}

fn techs() -> FieldPath {
    FieldPath::from("techs")
}

fn error_paths(form: &Form) -> Vec<String> {
    form.errors().paths().map(ToString::to_string).collect()
}

fn fill_valid(form: &mut Form) -> (StableId, StableId) {
    form.set_value(&"name".into(), json!("john smith")).unwrap();
    form.set_value(&"email".into(), json!("john@fixeddomain.com")).unwrap();
    form.set_value(&"password".into(), json!("secret1")).unwrap();
    let rust = form.append_item_with(&techs(), json!({ "title": "Rust", "knowledge": "80" })).unwrap();
    let sql = form.append_item_with(&techs(), json!({ "title": "SQL", "knowledge": "40" })).unwrap();
    (rust, sql)
}

// ---------------------------------------------------------------------------
// 1. Defaults and values
// ---------------------------------------------------------------------------

#[test]
fn defaults_come_from_the_schema() {
    let form = submit_only_form();
    assert_eq!(
        form.values(),
        &json!({ "name": "", "email": "", "password": "", "techs": [] })
    );
    assert!(!form.is_dirty());
}

#[test]
fn configured_defaults_win() {
    let config = FormConfig::submit_only().with_default_values(json!({ "name": "Ada" }));
    let form = Form::with_config(signup_schema(), config);
    assert_eq!(form.value(&"name".into()), Some(&json!("Ada")));
}

#[test]
fn dirty_and_touched_flags() {
    let mut form = submit_only_form();
    let name = FieldPath::from("name");

    form.set_value(&name, json!("Ada")).unwrap();
    form.mark_touched(&name).unwrap();
    assert!(form.is_field_dirty(&name));
    assert!(form.is_touched(&name));
    assert!(form.is_dirty());

    form.set_value(&name, json!("")).unwrap();
    assert!(!form.is_field_dirty(&name));
    assert!(!form.is_dirty());
    assert_eq!(form.touched_fields(), vec![name]);
}

#[test]
fn writing_a_parent_value_recomputes_child_dirty_flags() {
    let schema: SchemaNode = object()
        .field("address", object().field("city", string()))
        .into();
    let mut form = Form::with_config(schema, FormConfig::submit_only());
    let city = FieldPath::from("address.city");

    form.set_value(&city, json!("Paris")).unwrap();
    assert_eq!(form.dirty_fields(), vec![city.clone()]);

    form.set_value(&"address".into(), json!({ "city": "" })).unwrap();
    assert!(!form.is_field_dirty(&city));
    assert!(form.dirty_fields().is_empty());
    assert!(!form.is_dirty());
}

#[test]
fn reset_restores_defaults_and_status() {
    let mut form = submit_only_form();
    form.set_value(&"name".into(), json!("Ada")).unwrap();
    form.handle_submit().unwrap();

    form.reset();
    assert_eq!(form.value(&"name".into()), Some(&json!("")));
    assert_eq!(form.submit_count(), 0);
    assert!(form.errors().is_empty());
    assert!(form.dirty_fields().is_empty());
}

#[test]
fn unknown_fields_are_rejected() {
    let mut form = submit_only_form();
    let err = form.set_value(&"nickname".into(), json!("x")).unwrap_err();
    assert_eq!(err, FormError::UnknownField { path: "nickname".into() });
    assert_eq!(form.register("techs.0.color").unwrap_err().code(), "FORM_UNKNOWN_FIELD");
    assert_eq!(form.append_item(&"name".into()).unwrap_err().code(), "FORM_NOT_A_LIST");
}

// ---------------------------------------------------------------------------
// 2. Submitting
// ---------------------------------------------------------------------------

#[test]
fn valid_submit_hands_normalized_data_to_handler() {
    let received = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&received);

    let mut form = submit_only_form();
    form.on_submit(move |data| sink.borrow_mut().push(data.clone()));
    fill_valid(&mut form);

    let outcome = form.handle_submit().unwrap();
    let expected = json!({
        "name": "John Smith",
        "email": "john@fixeddomain.com",
        "password": "secret1",
        "techs": [
            { "title": "Rust", "knowledge": 80 },
            { "title": "SQL", "knowledge": 40 },
        ],
    });

    assert_eq!(outcome, SubmitOutcome::Submitted(expected.clone()));
    assert_eq!(*received.borrow(), vec![expected]);
    assert!(form.is_submit_successful());
    assert!(!form.is_submitting());
    assert_eq!(form.submit_count(), 1);
}

#[test]
fn invalid_submit_records_errors_and_skips_handler() {
    let calls = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&calls);

    let mut form = submit_only_form();
    form.on_submit(move |_| *counter.borrow_mut() += 1);
    form.set_value(&"email".into(), json!("john@other.com")).unwrap();
    form.set_value(&"password".into(), json!("123")).unwrap();
    form.append_item_with(&techs(), json!({ "title": "", "knowledge": "0" })).unwrap();

    assert_eq!(form.handle_submit().unwrap(), SubmitOutcome::Rejected);
    assert_eq!(*calls.borrow(), 0);
    assert!(form.is_submitted());
    assert!(!form.is_submit_successful());
    assert_eq!(
        error_paths(&form),
        vec!["name", "email", "password", "techs", "techs.0.title", "techs.0.knowledge"]
    );
    assert_eq!(form.error(&"techs".into()).unwrap().message, "Add at least two technologies");
    assert_eq!(
        form.errors().to_nested_json()["techs"]["0"]["title"]["message"],
        json!("Title is required")
    );
}

#[test]
fn fixing_one_field_clears_only_its_error() {
    let mut form = submit_only_form();
    form.set_value(&"name".into(), json!("Ada")).unwrap();
    form.handle_submit().unwrap();
    assert_eq!(error_paths(&form), vec!["email", "password", "techs"]);

    form.set_value(&"password".into(), json!("secret1")).unwrap();
    assert_eq!(error_paths(&form), vec!["email", "password", "techs"]);

    form.handle_submit().unwrap();
    assert_eq!(error_paths(&form), vec!["email", "techs"]);
    assert_eq!(form.submit_count(), 2);
}

#[test]
fn schema_defect_propagates_from_submit() {
    let schema: SchemaNode = object()
        .field("code", string().try_refine(|_| Err("registry offline".into()), "unknown code"))
        .into();
    let mut form = Form::new(schema);

    let err = form.handle_submit().unwrap_err();
    assert!(matches!(err, FormError::Defect(SchemaDefect::RuleFailed { .. })));
    assert!(!form.is_submitting());
    assert!(!form.is_submitted());
}

// ---------------------------------------------------------------------------
// 3. Validation modes
// ---------------------------------------------------------------------------

#[test]
fn on_change_mode_validates_the_edited_field_only() {
    let config = FormConfig::default().with_mode(ValidationMode::OnChange);
    let mut form = Form::with_config(signup_schema(), config);

    form.set_value(&"password".into(), json!("123")).unwrap();
    assert_eq!(error_paths(&form), vec!["password"]);

    form.set_value(&"password".into(), json!("123456")).unwrap();
    assert!(form.errors().is_empty());
}

#[test]
fn on_blur_mode_waits_for_touch() {
    let config = FormConfig::default().with_mode(ValidationMode::OnBlur);
    let mut form = Form::with_config(signup_schema(), config);

    form.set_value(&"email".into(), json!("nope")).unwrap();
    assert!(form.errors().is_empty());
    form.mark_touched(&"email".into()).unwrap();
    assert_eq!(form.error(&"email".into()).unwrap().message, "Invalid email");
}

#[test]
fn default_revalidation_clears_fixed_field_after_submit() {
    let mut form = Form::new(signup_schema());
    form.handle_submit().unwrap();
    assert!(form.errors().contains(&"name".into()));

    form.set_value(&"name".into(), json!("Ada")).unwrap();
    assert!(!form.errors().contains(&"name".into()));
    assert!(form.errors().contains(&"email".into()));
}

#[test]
fn submit_only_keeps_errors_until_next_submit() {
    let mut form = submit_only_form();
    form.handle_submit().unwrap();
    assert!(form.errors().contains(&"name".into()));

    form.set_value(&"name".into(), json!("Ada")).unwrap();
    form.mark_touched(&"name".into()).unwrap();
    assert!(form.errors().contains(&"name".into()));

    form.handle_submit().unwrap();
    assert!(!form.errors().contains(&"name".into()));
}

#[test]
fn trigger_and_manual_errors() {
    let mut form = submit_only_form();
    assert!(!form.trigger().unwrap());
    assert!(form.errors().contains(&"name".into()));
    assert_eq!(form.submit_count(), 0);

    form.clear_errors();
    form.set_error(&"email".into(), "Already registered").unwrap();
    let error = form.error(&"email".into()).unwrap();
    assert_eq!(error.kind, ErrorKind::Manual);
    assert_eq!(error.message, "Already registered");

    assert!(!form.trigger_field(&"password".into()).unwrap());
    assert_eq!(error_paths(&form), vec!["email", "password"]);
    form.clear_error(&"email".into());
    assert_eq!(error_paths(&form), vec!["password"]);
}

// ---------------------------------------------------------------------------
// 4. Field arrays inside the form
// ---------------------------------------------------------------------------

#[test]
fn append_uses_item_defaults() {
    let mut form = submit_only_form();
    let id = form.append_item(&techs()).unwrap();
    assert_eq!(form.value(&"techs".into()), Some(&json!([{ "title": "", "knowledge": 1 }])));
    assert_eq!(form.list_items(&techs()).unwrap()[0].id, id);
    assert!(form.is_field_dirty(&techs()));
}

#[test]
fn row_errors_follow_their_row_on_remove() {
    let mut form = submit_only_form();
    let first = form.append_item_with(&techs(), json!({ "title": "Rust", "knowledge": 50 })).unwrap();
    let broken = form.append_item_with(&techs(), json!({ "title": "", "knowledge": 50 })).unwrap();
    form.append_item_with(&techs(), json!({ "title": "SQL", "knowledge": 50 })).unwrap();
    form.handle_submit().unwrap();
    assert!(form.errors().contains(&"techs.1.title".into()));

    form.remove_item(&techs(), first).unwrap();

    assert!(form.errors().contains(&"techs.0.title".into()));
    assert!(!form.errors().contains(&"techs.1.title".into()));
    let row_errors = form.item_errors(&techs(), broken).unwrap();
    assert_eq!(row_errors.message(&"title".into()), Some("Title is required"));
}

#[test]
fn removing_a_row_drops_its_errors_and_flags() {
    let mut form = submit_only_form();
    let broken = form.append_item_with(&techs(), json!({ "title": "", "knowledge": 50 })).unwrap();
    form.append_item_with(&techs(), json!({ "title": "Go", "knowledge": 50 })).unwrap();
    form.mark_touched(&"techs.0.title".into()).unwrap();
    form.handle_submit().unwrap();

    form.remove_item(&techs(), broken).unwrap();

    assert!(!form.errors().has_errors_under(&"techs.0".into()));
    assert!(!form.is_touched(&"techs.0.title".into()));
}

#[test]
fn row_errors_follow_their_row_on_move_and_swap() {
    let mut form = submit_only_form();
    let broken = form.append_item_with(&techs(), json!({ "title": "", "knowledge": 50 })).unwrap();
    let ok = form.append_item_with(&techs(), json!({ "title": "Go", "knowledge": 50 })).unwrap();
    form.handle_submit().unwrap();

    form.move_item(&techs(), broken, 1).unwrap();
    assert_eq!(error_paths(&form), vec!["techs.1.title"]);

    form.swap_items(&techs(), broken, ok).unwrap();
    assert_eq!(error_paths(&form), vec!["techs.0.title"]);
}

#[test]
fn list_errors_revalidate_after_submit() {
    let mut form = Form::new(signup_schema());
    fill_valid(&mut form);
    let items = form.list_items(&techs()).unwrap();

    form.remove_item(&techs(), items[1].id).unwrap();
    assert!(form.errors().is_empty(), "no validation before the first submit");

    form.handle_submit().unwrap();
    assert!(form.errors().contains(&techs()));
    form.append_item_with(&techs(), json!({ "title": "Go", "knowledge": 10 })).unwrap();
    assert!(!form.errors().contains(&techs()));
}

#[test]
fn replacing_the_list_value_resyncs_rows() {
    let mut form = submit_only_form();
    let (rust, _) = fill_valid(&mut form);
    form.set_value(&techs(), json!([{ "title": "Zig", "knowledge": 5 }])).unwrap();

    let items = form.list_items(&techs()).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, rust);

    let fresh = form.prepend_item(&techs(), json!({ "title": "C", "knowledge": 9 })).unwrap();
    assert_eq!(form.index_of(&techs(), fresh), Some(0));
    form.replace_items(&techs(), vec![json!({ "title": "Ada", "knowledge": 1 })]).unwrap();
    assert_eq!(form.index_of(&techs(), fresh), None);
}

// ---------------------------------------------------------------------------
// 5. Bindings
// ---------------------------------------------------------------------------

#[test]
fn binding_reads_and_writes_its_field() {
    let mut form = submit_only_form();
    let name = form.register("name").unwrap();

    name.set_value(&mut form, "ada lovelace").unwrap();
    name.mark_touched(&mut form).unwrap();

    assert_eq!(name.value(&form).unwrap(), Some(&json!("ada lovelace")));
    assert!(name.is_touched(&form).unwrap());
    assert!(name.is_dirty(&form).unwrap());
    assert_eq!(name.name(&form).unwrap(), "name");
}

#[test]
fn item_binding_follows_its_row() {
    let mut form = submit_only_form();
    let (rust, sql) = fill_valid(&mut form);
    let title = form.register_item("techs", sql, "title").unwrap();
    assert_eq!(title.name(&form).unwrap(), "techs.1.title");

    form.remove_item(&techs(), rust).unwrap();
    assert_eq!(title.name(&form).unwrap(), "techs.0.title");
    assert_eq!(title.value(&form).unwrap(), Some(&json!("SQL")));

    form.prepend_item(&techs(), json!({ "title": "C", "knowledge": 3 })).unwrap();
    title.set_value(&mut form, "Postgres").unwrap();
    assert_eq!(form.value(&"techs.1.title".into()), Some(&json!("Postgres")));
    assert_eq!(title.anchor(), Some((&techs(), sql)));
}

#[test]
fn binding_to_removed_row_is_stale() {
    let mut form = submit_only_form();
    let (rust, _) = fill_valid(&mut form);
    let title = form.register_item("techs", rust, "title").unwrap();

    form.remove_item(&techs(), rust).unwrap();

    let err = title.value(&form).unwrap_err();
    assert_eq!(err, FormError::StaleBinding { list: techs(), id: rust });
    assert_eq!(
        title.set_value(&mut form, "x").unwrap_err().code(),
        "FORM_STALE_BINDING"
    );
    assert_eq!(form.register_item("techs", rust, "title").unwrap_err().code(), "FORM_UNKNOWN_ITEM");
}

#[test]
fn nested_row_state_moves_with_outer_row() {
    let schema: SchemaNode = object()
        .field(
            "groups",
            list(object().field("tags", list(string().min_length(2)))),
        )
        .into();
    let mut form = Form::with_config(schema, FormConfig::submit_only());
    let groups = FieldPath::from("groups");
    let first = form.append_item_with(&groups, json!({ "tags": [] })).unwrap();
    form.append_item_with(&groups, json!({ "tags": [] })).unwrap();

    let inner = FieldPath::from("groups.1.tags");
    let tag = form.append_item_with(&inner, Value::from("x")).unwrap();
    form.handle_submit().unwrap();
    assert!(form.errors().contains(&"groups.1.tags.0".into()));

    form.remove_item(&groups, first).unwrap();

    let moved = FieldPath::from("groups.0.tags");
    assert_eq!(form.index_of(&moved, tag), Some(0));
    assert!(form.errors().contains(&"groups.0.tags.0".into()));
    assert!(form.field_array(&inner).is_none());
}
