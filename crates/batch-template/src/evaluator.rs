/*
 * evaluator.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Expression evaluation.
//!
//! Evaluation is strictly bottom-up: the arguments of a call are evaluated
//! left to right before the call itself. All built-in functions are pure.
//!
//! | Function | Result |
//! |---|---|
//! | `parameters(name)` | resolved parameter value, type preserved |
//! | `variables(name)` | expanded template variable, type preserved |
//! | `concat(a, ...)` | arguments coerced to text and joined in order |
//! | `toLower(s)` / `toUpper(s)` | case conversion |

use serde_json::Value;
use tracing::trace;

use crate::ast::{Call, Expression, Span};
use crate::context::EvalContext;
use crate::error::{TemplateError, TemplateResult};
use crate::parameters::{ParameterLookup, json_type_name};

/// Built-in template functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Parameters,
    Variables,
    Concat,
    ToLower,
    ToUpper,
}

impl Function {
    /// Find a function by name. Names match case-insensitively.
    pub fn lookup(name: &str) -> Option<Self> {
        const FUNCTIONS: [(&str, Function); 5] = [
            ("parameters", Function::Parameters),
            ("variables", Function::Variables),
            ("concat", Function::Concat),
            ("toLower", Function::ToLower),
            ("toUpper", Function::ToUpper),
        ];
        FUNCTIONS
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, function)| *function)
    }
}

/// The call being evaluated, for error reporting.
struct CallSite<'s> {
    name: &'s str,
    expression: &'s str,
    span: Span,
}

impl CallSite<'_> {
    fn invalid_arguments(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::InvalidFunctionArguments {
            function: self.name.to_string(),
            message: message.into(),
            expression: self.expression.to_string(),
            span: self.span,
        }
    }

    fn expect_arity(&self, args: &[Value], count: usize) -> TemplateResult<()> {
        if args.len() == count {
            Ok(())
        } else {
            Err(self.invalid_arguments(format!(
                "expected {} argument{}, found {}",
                count,
                if count == 1 { "" } else { "s" },
                args.len()
            )))
        }
    }

    fn name_argument<'v>(&self, args: &'v [Value]) -> TemplateResult<&'v str> {
        self.expect_arity(args, 1)?;
        args[0].as_str().ok_or_else(|| {
            self.invalid_arguments(format!(
                "the name argument must be a string, found {}",
                json_type_name(&args[0])
            ))
        })
    }
}

/// Evaluate an expression parsed from `source`.
pub fn evaluate(
    expression: &Expression,
    source: &str,
    ctx: &mut EvalContext<'_>,
) -> TemplateResult<Value> {
    match expression {
        Expression::String { value, .. } => Ok(Value::String(value.clone())),
        Expression::Integer { value, .. } => Ok(Value::from(*value)),
        Expression::Call(call) => evaluate_call(call, source, ctx),
    }
}

fn evaluate_call(call: &Call, source: &str, ctx: &mut EvalContext<'_>) -> TemplateResult<Value> {
    let args = call
        .args
        .iter()
        .map(|arg| evaluate(arg, source, ctx))
        .collect::<TemplateResult<Vec<_>>>()?;

    let function = Function::lookup(&call.name).ok_or_else(|| TemplateError::UnknownFunction {
        name: call.name.clone(),
        expression: source.to_string(),
        span: call.span,
    })?;

    let site = CallSite {
        name: &call.name,
        expression: source,
        span: call.span,
    };
    trace!(function = %call.name, expression = %source, "evaluating template function");

    match function {
        Function::Parameters => {
            let name = site.name_argument(&args)?;
            match ctx.parameters().lookup(name) {
                ParameterLookup::Resolved(value) => Ok(value.clone()),
                ParameterLookup::Unresolved => Err(TemplateError::MissingParameterValue {
                    name: name.to_string(),
                    expression: source.to_string(),
                    span: call.span,
                }),
                ParameterLookup::Undeclared => Err(TemplateError::UndefinedParameter {
                    name: name.to_string(),
                    expression: source.to_string(),
                    span: call.span,
                }),
            }
        }
        Function::Variables => {
            let name = site.name_argument(&args)?;
            ctx.variable(name, source, call.span)
        }
        Function::Concat => {
            if args.is_empty() {
                return Err(site.invalid_arguments("expected at least 1 argument, found 0"));
            }
            Ok(Value::String(args.iter().map(to_template_string).collect()))
        }
        Function::ToLower => {
            site.expect_arity(&args, 1)?;
            Ok(Value::String(to_template_string(&args[0]).to_lowercase()))
        }
        Function::ToUpper => {
            site.expect_arity(&args, 1)?;
            Ok(Value::String(to_template_string(&args[0]).to_uppercase()))
        }
    }
}

/// The string form of a value when spliced into text.
///
/// Strings are used verbatim, `null` becomes the empty string, and
/// everything else uses its compact JSON text.
pub fn to_template_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::{ParameterDeclarations, ResolvedParameters};
    use crate::parser::parse_expression;
    use pretty_assertions::assert_eq;
    use serde_json::{Map, json};

    fn resolved(declarations: Value, supplied: Value) -> ResolvedParameters {
        let template = json!({ "parameters": declarations });
        let decls = ParameterDeclarations::from_template(template.as_object().unwrap()).unwrap();
        decls.resolve(supplied.as_object().unwrap()).unwrap()
    }

    fn eval_with(source: &str, parameters: &ResolvedParameters) -> TemplateResult<Value> {
        let variables = Map::new();
        let mut ctx = EvalContext::new(parameters, &variables);
        let expression = parse_expression(source)?;
        evaluate(&expression, source, &mut ctx)
    }

    fn eval(source: &str) -> TemplateResult<Value> {
        eval_with(source, &ResolvedParameters::default())
    }

    #[test]
    fn test_function_lookup() {
        assert_eq!(Function::lookup("concat"), Some(Function::Concat));
        assert_eq!(Function::lookup("CONCAT"), Some(Function::Concat));
        assert_eq!(Function::lookup("tolower"), Some(Function::ToLower));
        assert_eq!(Function::lookup("format"), None);
    }

    #[test]
    fn test_parameters_preserves_type() {
        let params = resolved(
            json!({
                "obj": { "type": "object" },
                "count": { "type": "int" },
                "flag": { "type": "bool", "defaultValue": false }
            }),
            json!({ "obj": { "a": 1 }, "count": 3 }),
        );
        assert_eq!(eval_with("parameters('obj')", &params).unwrap(), json!({ "a": 1 }));
        assert_eq!(eval_with("parameters('count')", &params).unwrap(), json!(3));
        assert_eq!(eval_with("parameters('flag')", &params).unwrap(), json!(false));
    }

    #[test]
    fn test_parameters_errors() {
        let params = resolved(json!({ "unset": { "type": "string" } }), json!({}));

        let err = eval_with("parameters('unset')", &params).unwrap_err();
        assert!(matches!(err, TemplateError::MissingParameterValue { ref name, .. } if name == "unset"));

        let err = eval_with("parameters('missing')", &params).unwrap_err();
        match err {
            TemplateError::UndefinedParameter {
                name,
                expression,
                span,
            } => {
                assert_eq!(name, "missing");
                assert_eq!(expression, "parameters('missing')");
                assert_eq!(span, Span::new(0, 21));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_parameter_name_must_be_string() {
        let err = eval("parameters(1)").unwrap_err();
        assert!(matches!(err, TemplateError::InvalidFunctionArguments { .. }));

        let err = eval("parameters('a', 'b')").unwrap_err();
        assert!(err.to_string().contains("expected 1 argument, found 2"));
    }

    #[test]
    fn test_concat_strings() {
        assert_eq!(eval("concat('a', 'b', 'c')").unwrap(), json!("abc"));
        assert_eq!(eval("concat('node-', 7)").unwrap(), json!("node-7"));
        assert!(eval("concat()").is_err());
    }

    #[test]
    fn test_concat_coerces_non_strings() {
        let params = resolved(
            json!({
                "obj": { "type": "object" },
                "flag": { "type": "bool" }
            }),
            json!({ "obj": { "a": [1, 2] }, "flag": true }),
        );
        assert_eq!(
            eval_with("concat(parameters('obj'), '/', parameters('flag'))", &params).unwrap(),
            json!("{\"a\":[1,2]}/true")
        );
    }

    #[test]
    fn test_concat_arrays_are_stringified() {
        let params = resolved(
            json!({
                "a": { "type": "array" },
                "b": { "type": "array" }
            }),
            json!({ "a": [1, 2], "b": ["x"] }),
        );
        assert_eq!(
            eval_with("concat(parameters('a'), parameters('b'))", &params).unwrap(),
            json!("[1,2][\"x\"]")
        );
    }

    #[test]
    fn test_case_functions() {
        assert_eq!(eval("toLower('Standard_D2')").unwrap(), json!("standard_d2"));
        assert_eq!(eval("toUpper(concat('a', 'b'))").unwrap(), json!("AB"));
        assert!(eval("toUpper('a', 'b')").is_err());
    }

    #[test]
    fn test_unknown_function() {
        match eval("concat('a', format('b'))").unwrap_err() {
            TemplateError::UnknownFunction { name, span, .. } => {
                assert_eq!(name, "format");
                assert_eq!(span, Span::new(12, 23));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_innermost_error_wins() {
        // The inner failure surfaces before the outer unknown function.
        let err = eval("nope(parameters('missing'))").unwrap_err();
        assert!(matches!(err, TemplateError::UndefinedParameter { .. }));
    }

    #[test]
    fn test_to_template_string() {
        assert_eq!(to_template_string(&json!("x")), "x");
        assert_eq!(to_template_string(&json!(1.5)), "1.5");
        assert_eq!(to_template_string(&json!(false)), "false");
        assert_eq!(to_template_string(&Value::Null), "");
        assert_eq!(to_template_string(&json!([1, "a"])), "[1,\"a\"]");
    }
}
