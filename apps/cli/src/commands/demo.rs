//! `formwork demo`: a scripted sign-up session exercising field arrays.
//!
//! Fills the form, adds three technologies (the middle one blank), submits
//! and gets rejected, removes the blank row by id and submits again.

use std::process::ExitCode;

use formwork_form::{FieldItem, Form, SubmitOutcome};
use formwork_schema::FieldPath;
use serde_json::json;
use tracing::info;

use crate::commands::print_json;
use crate::config::{CliConfig, OutputFormat};
use crate::signup;

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Name typed into the form
    #[arg(long, default_value = "ada lovelace")]
    pub name: String,
}

pub fn run(args: Args, config: &CliConfig) -> anyhow::Result<ExitCode> {
    let domain = config.email_domain.trim_start_matches('@');
    let mut form = Form::with_config(signup::schema(domain), config.form.clone());
    form.on_submit(|data| info!(%data, "sign-up submitted"));

    let text = config.output == OutputFormat::Text;
    let say = |line: String| {
        if text {
            println!("{line}");
        }
    };

    form.register("name")?.set_value(&mut form, args.name.as_str())?;
    form.register("email")?
        .set_value(&mut form, format!("ada@{domain}"))?;
    form.register("password")?.set_value(&mut form, "analytical")?;

    let techs = FieldPath::from("techs");
    let rust = form.append_item_with(&techs, json!({ "title": "Rust", "knowledge": "80" }))?;
    let blank = form.append_item_with(&techs, json!({ "title": "", "knowledge": 50 }))?;
    let sql = form.append_item_with(&techs, json!({ "title": "SQL", "knowledge": 60 }))?;
    say(format!("rows: {}", describe(&form.list_items(&techs)?)));

    if let SubmitOutcome::Submitted(_) = form.handle_submit()? {
        anyhow::bail!("submit with a blank technology was accepted");
    }
    say(format!("submit #{} rejected: {}", form.submit_count(), form.errors()));
    for (path, error) in &form.item_errors(&techs, blank)? {
        say(format!("row {blank}: {path}: {error}"));
    }

    form.remove_item(&techs, blank)?;
    say(format!("removed {blank}"));
    say(format!("rows: {}", describe(&form.list_items(&techs)?)));
    info!(rust = ?form.index_of(&techs, rust), sql = ?form.index_of(&techs, sql), "rows after removal");

    match form.handle_submit()? {
        SubmitOutcome::Submitted(data) => {
            if text {
                println!("submit #{} accepted", form.submit_count());
                print_json(&data)?;
            } else {
                print_json(&json!({ "submit_count": form.submit_count(), "data": data }))?;
            }
            Ok(ExitCode::SUCCESS)
        }
        SubmitOutcome::Rejected => {
            if text {
                println!("submit #{} rejected: {}", form.submit_count(), form.errors());
            } else {
                print_json(&json!({
                    "submit_count": form.submit_count(),
                    "errors": form.errors().to_nested_json(),
                }))?;
            }
            Ok(ExitCode::from(1))
        }
    }
}

fn describe(items: &[FieldItem]) -> String {
    items
        .iter()
        .map(|item| format!("{} at {}", item.id, item.index))
        .collect::<Vec<_>>()
        .join(", ")
}
