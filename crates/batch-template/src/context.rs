/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Evaluation context for one expansion.
//!
//! The context holds what expressions may reference: the resolved parameter
//! table and the template's `variables` section. Variables are expanded on
//! first use and memoized, so a variable referenced many times is rewritten
//! once. Each expansion owns its own context; nothing is shared between
//! expansions.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::ast::Span;
use crate::error::{TemplateError, TemplateResult};
use crate::parameters::ResolvedParameters;
use crate::rewriter::rewrite_value;

/// Variable bindings and parameter values for evaluating expressions.
#[derive(Debug)]
pub struct EvalContext<'a> {
    parameters: &'a ResolvedParameters,
    variables: &'a Map<String, Value>,
    expanded_variables: HashMap<String, Value>,
    /// Variables currently being expanded, outermost first.
    in_progress: Vec<String>,
}

impl<'a> EvalContext<'a> {
    pub fn new(parameters: &'a ResolvedParameters, variables: &'a Map<String, Value>) -> Self {
        Self {
            parameters,
            variables,
            expanded_variables: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    pub fn parameters(&self) -> &'a ResolvedParameters {
        self.parameters
    }

    /// The expanded value of a template variable.
    ///
    /// `expression` and `span` identify the referencing call for errors.
    pub fn variable(&mut self, name: &str, expression: &str, span: Span) -> TemplateResult<Value> {
        if let Some(value) = self.expanded_variables.get(name) {
            return Ok(value.clone());
        }

        if let Some(start) = self.in_progress.iter().position(|v| v == name) {
            let mut chain = self.in_progress[start..].to_vec();
            chain.push(name.to_string());
            return Err(TemplateError::CircularVariable {
                name: name.to_string(),
                chain,
            });
        }

        let variables = self.variables;
        let raw = variables
            .get(name)
            .ok_or_else(|| TemplateError::UndefinedVariable {
                name: name.to_string(),
                expression: expression.to_string(),
                span,
            })?;

        self.in_progress.push(name.to_string());
        let expanded = rewrite_value(raw, self);
        self.in_progress.pop();

        let expanded = expanded?;
        self.expanded_variables
            .insert(name.to_string(), expanded.clone());
        Ok(expanded)
    }
}
