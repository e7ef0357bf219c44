/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Expression AST types.
//!
//! Expressions are the bracketed function calls embedded in template string
//! values, e.g. `[concat('vm-', parameters('suffix'))]`. Every node records
//! the byte range it was parsed from so that errors can point back into the
//! original string.

use std::ops::Range;

/// Byte range of a node within the string value it was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// A node in an expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Function call: `name(arg, ...)`
    Call(Call),

    /// Single-quoted string literal, with `''` already unescaped.
    String { value: String, span: Span },

    /// Integer literal.
    Integer { value: i64, span: Span },
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Call(call) => call.span,
            Expression::String { span, .. } | Expression::Integer { span, .. } => *span,
        }
    }
}

/// Function call node.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Function name as written in the template.
    pub name: String,
    /// Arguments, in source order.
    pub args: Vec<Expression>,
    /// Span from the first character of the name to the closing `)`.
    pub span: Span,
}

/// A template string value after scanning for expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateString {
    /// No expressions: the value is used verbatim (escapes already applied).
    Literal(String),

    /// The whole value is a single `[...]` expression. The result replaces
    /// the node with whatever type the expression produces.
    Whole(Expression),

    /// Literal text interleaved with one or more expressions. Every result
    /// is converted to a string and spliced in order.
    Mixed(Vec<Segment>),
}

/// One piece of a [`TemplateString::Mixed`] value.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Expression(Expression),
}
