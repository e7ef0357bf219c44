/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template loading, expansion and pool preparation.
//!
//! Every failure is a [`TemplateError`]: callers see one "invalid template"
//! category whose variants say precisely what went wrong. Errors carry the
//! offending identifier and, for expression failures, the string value and
//! byte position involved.

use batch_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder, SourceSnippet};
use thiserror::Error;

use crate::ast::Span;

/// Errors that can occur during template operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template or parameter document is unreadable, malformed, or lacks a
    /// required section.
    #[error("Invalid template: {message}")]
    InvalidTemplate { message: String },

    /// A supplied value does not satisfy its parameter declaration.
    #[error("Invalid value {value} for parameter '{name}': {reason}")]
    InvalidParameterValue {
        name: String,
        value: String,
        reason: String,
    },

    /// The body references a parameter that is not declared.
    #[error("Template parameter '{name}' is not defined")]
    UndefinedParameter {
        name: String,
        expression: String,
        span: Span,
    },

    /// The body references a declared parameter that has neither a supplied
    /// value nor a default.
    #[error("No value supplied for template parameter '{name}', and it has no default")]
    MissingParameterValue {
        name: String,
        expression: String,
        span: Span,
    },

    /// The body references a variable that is not defined.
    #[error("Template variable '{name}' is not defined")]
    UndefinedVariable {
        name: String,
        expression: String,
        span: Span,
    },

    /// A variable's value refers back to itself.
    #[error("Circular reference in template variable '{name}': {}", .chain.join(" -> "))]
    CircularVariable { name: String, chain: Vec<String> },

    /// Malformed expression syntax.
    #[error("Syntax error in expression \"{expression}\" at position {position}: {message}")]
    ExpressionSyntax {
        message: String,
        expression: String,
        position: usize,
    },

    /// Call to a function that does not exist.
    #[error("Unknown template function '{name}' in expression \"{expression}\"")]
    UnknownFunction {
        name: String,
        expression: String,
        span: Span,
    },

    /// A function was called with the wrong number or type of arguments.
    #[error("Invalid arguments for template function '{function}': {message}")]
    InvalidFunctionArguments {
        function: String,
        message: String,
        expression: String,
        span: Span,
    },

    /// A pool package reference that cannot be installed.
    #[error("Invalid package reference '{package}': {message}")]
    InvalidPackageReference { package: String, message: String },
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

impl TemplateError {
    pub(crate) fn invalid_template(message: impl Into<String>) -> Self {
        TemplateError::InvalidTemplate {
            message: message.into(),
        }
    }

    /// The error catalog code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            TemplateError::InvalidTemplate { .. } => "BT-1-1",
            TemplateError::InvalidParameterValue { .. } => "BT-2-1",
            TemplateError::UndefinedParameter { .. } => "BT-2-2",
            TemplateError::MissingParameterValue { .. } => "BT-2-3",
            TemplateError::UndefinedVariable { .. } => "BT-2-4",
            TemplateError::CircularVariable { .. } => "BT-2-5",
            TemplateError::ExpressionSyntax { .. } => "BT-3-1",
            TemplateError::UnknownFunction { .. } => "BT-3-2",
            TemplateError::InvalidFunctionArguments { .. } => "BT-3-3",
            TemplateError::InvalidPackageReference { .. } => "BT-4-1",
        }
    }

    /// Convert this error to a user-facing diagnostic.
    pub fn to_diagnostic(&self) -> DiagnosticMessage {
        let builder = DiagnosticMessageBuilder::from_code(self.code());

        match self {
            TemplateError::InvalidTemplate { message } => builder
                .problem(message.clone())
                .add_hint("Check that the file is valid JSON with a `parameters` section and a `pool` or `job` section?")
                .build(),

            TemplateError::InvalidParameterValue {
                name,
                value,
                reason,
            } => builder
                .problem(format!("Parameter `{}` can't take the value {}", name, value))
                .add_detail(reason.clone())
                .build(),

            TemplateError::UndefinedParameter {
                name,
                expression,
                span,
            } => builder
                .problem(format!("Parameter `{}` is not declared in the template", name))
                .add_hint(format!("Declare `{}` under `parameters`?", name))
                .with_snippet(snippet(expression, *span))
                .build(),

            TemplateError::MissingParameterValue {
                name,
                expression,
                span,
            } => builder
                .problem(format!("Parameter `{}` has no value", name))
                .add_info("The parameter is declared without a `defaultValue`")
                .add_hint(format!(
                    "Supply `{}` in the parameters file, or give it a `defaultValue`?",
                    name
                ))
                .with_snippet(snippet(expression, *span))
                .build(),

            TemplateError::UndefinedVariable {
                name,
                expression,
                span,
            } => builder
                .problem(format!("Variable `{}` is not defined in the template", name))
                .add_hint(format!("Define `{}` under `variables`?", name))
                .with_snippet(snippet(expression, *span))
                .build(),

            TemplateError::CircularVariable { name, chain } => builder
                .problem(format!("Variable `{}` depends on itself", name))
                .add_detail(format!("Reference chain: {}", chain.join(" -> ")))
                .build(),

            TemplateError::ExpressionSyntax {
                message,
                expression,
                position,
            } => builder
                .problem(message.clone())
                .add_info(format!("At position {} of `{}`", position, expression))
                .add_hint("Strings in expressions use single quotes; write `''` for a literal quote?")
                .with_snippet(snippet(expression, Span::new(*position, *position + 1)))
                .build(),

            TemplateError::UnknownFunction {
                name,
                expression,
                span,
            } => builder
                .problem(format!("`{}` is not a template function", name))
                .add_info(
                    "Available functions: parameters, variables, concat, toLower, toUpper",
                )
                .with_snippet(snippet(expression, *span))
                .build(),

            TemplateError::InvalidFunctionArguments {
                function,
                message,
                expression,
                span,
            } => builder
                .problem(format!("Call to `{}` is invalid", function))
                .add_detail(message.clone())
                .with_snippet(snippet(expression, *span))
                .build(),

            TemplateError::InvalidPackageReference { package, message } => builder
                .problem(format!("Package `{}` can't be installed", package))
                .add_detail(message.clone())
                .build(),
        }
    }
}

fn snippet(expression: &str, span: Span) -> SourceSnippet {
    SourceSnippet::new("expression", expression, span.range())
}

impl From<serde_json::Error> for TemplateError {
    fn from(err: serde_json::Error) -> Self {
        TemplateError::invalid_template(format!("Invalid JSON file: {}", err))
    }
}
