/*
 * mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Command implementations for the batch-template CLI
//!
//! Each command loads its inputs, delegates to batch-template, and writes
//! the resulting JSON document.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

pub mod expand;
pub mod prepare;

/// Input and output options shared by all commands
#[derive(Debug)]
pub struct InputOptions {
    /// Template JSON file
    pub template: PathBuf,
    /// Parameter values JSON file
    pub parameters: Option<PathBuf>,
    /// Output file (stdout when absent)
    pub output: Option<PathBuf>,
    /// Print compact JSON
    pub compact: bool,
}

/// Write a JSON document to `output`, or to stdout.
pub fn write_json(value: &Value, output: Option<&Path>, compact: bool) -> Result<()> {
    let mut text = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    text.push('\n');

    match output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write output file {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}
