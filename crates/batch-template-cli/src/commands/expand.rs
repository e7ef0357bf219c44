/*
 * expand.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Expand command implementation
 */

//! Expand command implementation.
//!
//! Loads a template and an optional parameter-values file, expands the
//! requested body section, and prints it.

use anyhow::{Context, Result};
use tracing::debug;

use batch_template::{BodySection, ExpandOptions, Expander, TemplateSource};

use super::{InputOptions, write_json};

/// Execute the expand command
pub fn execute(args: InputOptions, section: BodySection) -> Result<()> {
    debug!(
        template = %args.template.display(),
        section = %section,
        "expand"
    );

    let expanded = Expander::new()
        .expand(
            TemplateSource::Path(args.template.clone()),
            args.parameters.clone().map(TemplateSource::Path),
            &ExpandOptions::new(section),
        )
        .with_context(|| format!("Failed to expand template {}", args.template.display()))?;

    write_json(&expanded, args.output.as_deref(), args.compact)
}
