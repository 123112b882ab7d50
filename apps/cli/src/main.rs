//! `formwork`: validate sign-up documents and run a scripted form session.

mod commands;
mod config;
mod logging;
mod signup;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use formwork_form::ValidationMode;
use tracing::debug;

use crate::config::{FormOverrides, OutputFormat, Overrides};

#[derive(Parser, Debug)]
#[command(name = "formwork", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(long, global = true, env = "FORMWORK_CONFIG", default_value = config::CONFIG_FILE)]
    config: PathBuf,

    /// Domain sign-up emails must belong to
    #[arg(long, global = true)]
    email_domain: Option<String>,

    /// When the form validates while editing
    #[arg(long, global = true, value_enum)]
    mode: Option<ModeArg>,

    /// Output format
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a JSON document against the sign-up schema
    Check(commands::check::Args),
    /// Run a scripted sign-up session with a field array
    Demo(commands::demo::Args),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "snake_case")]
enum ModeArg {
    OnSubmit,
    OnChange,
    OnBlur,
    OnTouched,
    All,
}

impl From<ModeArg> for ValidationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::OnSubmit => Self::OnSubmit,
            ModeArg::OnChange => Self::OnChange,
            ModeArg::OnBlur => Self::OnBlur,
            ModeArg::OnTouched => Self::OnTouched,
            ModeArg::All => Self::All,
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let overrides = Overrides {
        email_domain: cli.email_domain,
        output: cli.format,
        form: FormOverrides {
            mode: cli.mode.map(Into::into),
        },
    };
    let config = config::load(&cli.config, &overrides)?;
    debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Check(args) => commands::check::run(args, &config),
        Commands::Demo(args) => commands::demo::run(args, &config),
    }
}
