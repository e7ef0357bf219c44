/*
 * prepare.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Prepare command implementation
 */

//! Prepare command implementation.
//!
//! Expands a pool template, decodes the pool, folds package references into
//! the start task, and prints the pool as it would be submitted.

use anyhow::{Context, Result};
use tracing::debug;

use batch_template::{Expander, PoolSpec, TemplateSource, prepare_pool};

use super::{InputOptions, write_json};

/// Execute the prepare command
pub fn execute(args: InputOptions) -> Result<()> {
    let expanded = Expander::new()
        .expand_pool(
            TemplateSource::Path(args.template.clone()),
            args.parameters.clone().map(TemplateSource::Path),
        )
        .with_context(|| format!("Failed to expand template {}", args.template.display()))?;

    let spec = PoolSpec::from_json(expanded)?;
    if matches!(spec, PoolSpec::Template(_)) {
        debug!("unwrapping pool template properties");
    }
    let pool = prepare_pool(spec)?;

    let value = serde_json::to_value(&pool).context("Failed to serialize pool")?;
    write_json(&value, args.output.as_deref(), args.compact)
}
