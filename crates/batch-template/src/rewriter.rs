/*
 * rewriter.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Deep rewrite of a template body.
//!
//! Every string in the body is scanned for expressions and replaced by its
//! evaluated form. Objects keep their keys and key order, arrays keep their
//! length, and non-string scalars pass through untouched.

use serde_json::{Map, Value};

use crate::ast::{Segment, TemplateString};
use crate::context::EvalContext;
use crate::error::TemplateResult;
use crate::evaluator::{evaluate, to_template_string};
use crate::parser::parse_template_string;

/// Rewrite a value and everything beneath it.
pub fn rewrite_value(value: &Value, ctx: &mut EvalContext<'_>) -> TemplateResult<Value> {
    match value {
        Value::Object(map) => {
            let mut rewritten = Map::with_capacity(map.len());
            for (key, child) in map {
                rewritten.insert(key.clone(), rewrite_value(child, ctx)?);
            }
            Ok(Value::Object(rewritten))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| rewrite_value(item, ctx))
            .collect::<TemplateResult<Vec<_>>>()
            .map(Value::Array),
        Value::String(s) => rewrite_string(s, ctx),
        Value::Null | Value::Bool(_) | Value::Number(_) => Ok(value.clone()),
    }
}

/// Rewrite one string value.
///
/// A whole-value expression yields the evaluated value with its own type;
/// text with embedded expressions always yields a string.
pub fn rewrite_string(source: &str, ctx: &mut EvalContext<'_>) -> TemplateResult<Value> {
    match parse_template_string(source)? {
        TemplateString::Literal(text) => Ok(Value::String(text)),
        TemplateString::Whole(expression) => evaluate(&expression, source, ctx),
        TemplateString::Mixed(segments) => {
            let mut out = String::with_capacity(source.len());
            for segment in &segments {
                match segment {
                    Segment::Literal(text) => out.push_str(text),
                    Segment::Expression(expression) => {
                        let value = evaluate(expression, source, ctx)?;
                        out.push_str(&to_template_string(&value));
                    }
                }
            }
            Ok(Value::String(out))
        }
    }
}
