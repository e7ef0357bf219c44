/*
 * main.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! batch-template - expand batch pool and job templates from the command line

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use batch_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder};
use batch_template::{BodySection, TemplateError};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "batch-template")]
#[command(version)]
#[command(about = "Expand parameterized batch pool and job templates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// How to print errors
    #[arg(long, value_enum, default_value_t = ErrorFormat::Text, global = true)]
    error_format: ErrorFormat,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand a template and print the resolved body section
    Expand {
        #[command(flatten)]
        input: InputArgs,

        /// Body section to expand (pool or job)
        #[arg(long, default_value = "pool")]
        section: BodySection,
    },

    /// Expand a pool template and print the pool ready for submission,
    /// with package references folded into the start task
    Prepare {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Template JSON file
    #[arg(short, long)]
    template: PathBuf,

    /// Parameter values JSON file
    #[arg(short, long)]
    parameters: Option<PathBuf>,

    /// Write output to FILE instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print compact JSON instead of pretty-printed JSON
    #[arg(long)]
    compact: bool,
}

impl From<InputArgs> for commands::InputOptions {
    fn from(args: InputArgs) -> Self {
        commands::InputOptions {
            template: args.template,
            parameters: args.parameters,
            output: args.output,
            compact: args.compact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ErrorFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so they never mix with JSON on stdout
    let default_filter = if cli.verbose {
        "batch_template=debug,batch_template_cli=debug"
    } else {
        "batch_template=info,batch_template_cli=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let error_format = cli.error_format;
    if let Err(err) = run(cli.command) {
        display_error(&err, error_format);
        process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Expand { input, section } => commands::expand::execute(input.into(), section),
        Commands::Prepare { input } => commands::prepare::execute(input.into()),
    }
}

/// Print an error as a diagnostic on stderr.
fn display_error(err: &anyhow::Error, format: ErrorFormat) {
    let diagnostic = to_diagnostic(err);
    match format {
        ErrorFormat::Text => eprintln!("{}", diagnostic.to_text()),
        ErrorFormat::Json => eprintln!("{}", diagnostic.to_json()),
    }
}

fn to_diagnostic(err: &anyhow::Error) -> DiagnosticMessage {
    match err.downcast_ref::<TemplateError>() {
        Some(template_err) => template_err.to_diagnostic(),
        None => DiagnosticMessageBuilder::from_code("BT-0-1")
            .problem(format!("{:#}", err))
            .build(),
    }
}
