//! Layered configuration: defaults → `formwork.toml` → `FORMWORK_*` env →
//! command-line flags.

use std::path::Path;

use anyhow::Context;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use formwork_form::{FormConfig, ValidationMode};
use serde::{Deserialize, Serialize};

/// Configuration file read from the working directory by default.
pub const CONFIG_FILE: &str = "formwork.toml";

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Domain every sign-up email must belong to.
    pub email_domain: String,
    pub output: OutputFormat,
    pub form: FormConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            email_domain: "fixeddomain.com".to_owned(),
            output: OutputFormat::default(),
            form: FormConfig::default(),
        }
    }
}

/// Values given on the command line. Unset flags leave lower layers alone.
#[derive(Debug, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputFormat>,
    #[serde(skip_serializing_if = "FormOverrides::is_empty")]
    pub form: FormOverrides,
}

#[derive(Debug, Default, Serialize)]
pub struct FormOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ValidationMode>,
}

impl FormOverrides {
    fn is_empty(&self) -> bool {
        self.mode.is_none()
    }
}

/// Builds the layered configuration. A missing file is not an error.
pub fn load(file: &Path, overrides: &Overrides) -> anyhow::Result<CliConfig> {
    Figment::from(Serialized::defaults(CliConfig::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed("FORMWORK_").split("__"))
        .merge(Serialized::defaults(overrides))
        .extract()
        .with_context(|| format!("invalid configuration (file: {})", file.display()))
}
