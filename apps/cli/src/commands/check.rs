//! `formwork check`: validate a JSON document against the sign-up schema.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use formwork_schema::{Validation, validate};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::commands::print_json;
use crate::config::{CliConfig, OutputFormat};
use crate::signup;

#[derive(clap::Args, Debug)]
pub struct Args {
    /// JSON document to validate (`-` reads stdin)
    pub file: PathBuf,
}

pub fn run(args: Args, config: &CliConfig) -> anyhow::Result<ExitCode> {
    let text = read_input(&args.file)?;
    let raw: Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", args.file.display()))?;

    let schema = signup::schema(&config.email_domain);
    debug!(domain = %config.email_domain, "validating against sign-up schema");

    match validate(&schema, &raw)? {
        Validation::Success(data) => {
            info!(file = %args.file.display(), "document is valid");
            match config.output {
                OutputFormat::Text => print_json(&data)?,
                OutputFormat::Json => print_json(&json!({ "valid": true, "data": data }))?,
            }
            Ok(ExitCode::SUCCESS)
        }
        Validation::Failure(errors) => {
            info!(file = %args.file.display(), errors = errors.len(), "document is invalid");
            match config.output {
                OutputFormat::Text => println!("{errors}"),
                OutputFormat::Json => print_json(&json!({
                    "valid": false,
                    "errors": errors.to_nested_json(),
                }))?,
            }
            Ok(ExitCode::from(1))
        }
    }
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
