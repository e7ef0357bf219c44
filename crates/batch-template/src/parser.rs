/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Expression parser.
//!
//! Template string values may embed bracketed function calls. This module
//! scans a string value into a [`TemplateString`] and parses each embedded
//! expression with `nom` combinators:
//!
//! ```text
//! expr    := IDENT '(' [ arg ( ',' arg )* ] ')'
//! arg     := expr | string | integer
//! string  := "'" ( any char except "'" | "''" )* "'"
//! integer := '-'? DIGIT+
//! IDENT   := [A-Za-z_][A-Za-z0-9_]*
//! ```
//!
//! Positions in errors and spans are byte offsets into the scanned string.
//! Calls may nest at most [`MAX_NESTING_DEPTH`] levels deep.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0},
    combinator::{cut, map, opt, recognize, value},
    error::{ErrorKind, ParseError as NomParseError},
    multi::{fold_many0, many0},
    sequence::{pair, preceded},
};

use crate::ast::{Call, Expression, Segment, Span, TemplateString};
use crate::error::{TemplateError, TemplateResult};

/// How deeply calls may nest inside one another.
pub const MAX_NESTING_DEPTH: usize = 64;

// ============================================================================
// Public API
// ============================================================================

/// Scan a template string value for expressions.
///
/// - A value starting with `[[` is an escape: the first `[` is dropped and
///   the rest is literal.
/// - A value of the form `[...]` whose expression ends at the final `]` is a
///   whole-value expression.
/// - Otherwise every `[` followed by `name(` starts an embedded expression
///   that must be closed by `]`. Any other `[` is literal text.
pub fn parse_template_string(source: &str) -> TemplateResult<TemplateString> {
    if let Some(rest) = source.strip_prefix("[[") {
        return Ok(TemplateString::Literal(format!("[{}", rest)));
    }

    if source.len() >= 2 && source.starts_with('[') && source.ends_with(']') {
        let (expression, close) = bracketed_call(source, 1)?;
        if close == source.len() - 1 {
            return Ok(TemplateString::Whole(expression));
        }
        // `[a(..)]-[b(..)]`: bracketed at both ends, but more than one
        // expression. Anything else after the first `]` is an error.
        let trailing = &source[close + 1..];
        if !opens_call(trailing) {
            return Err(syntax_error(
                source,
                close + 1,
                format!("{} after the closing ']'", unexpected_message(trailing)),
            ));
        }
    }

    scan_mixed(source)
}

/// Parse a single expression (without surrounding brackets).
///
/// The whole input must be consumed.
pub fn parse_expression(source: &str) -> TemplateResult<Expression> {
    let cursor = Cursor::new(source);
    let (rest, expression) = call(source, cursor)
        .and_then(|(rest, expression)| {
            let (rest, _) = multispace0(rest)?;
            Ok((rest, expression))
        })
        .map_err(|err| to_template_error(source, err))?;
    if !rest.is_empty() {
        return Err(syntax_error(
            source,
            cursor.offset(rest),
            unexpected_message(rest),
        ));
    }
    Ok(expression)
}

// ============================================================================
// Scanning
// ============================================================================

fn scan_mixed(source: &str) -> TemplateResult<TemplateString> {
    let bytes = source.as_bytes();
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] == b'[' && starts_call(&bytes[pos + 1..]) {
            if literal_start < pos {
                segments.push(Segment::Literal(source[literal_start..pos].to_string()));
            }
            let (expression, close) = bracketed_call(source, pos + 1)?;
            segments.push(Segment::Expression(expression));
            pos = close + 1;
            literal_start = pos;
        } else {
            pos += 1;
        }
    }

    if segments.is_empty() {
        return Ok(TemplateString::Literal(source.to_string()));
    }
    if literal_start < bytes.len() {
        segments.push(Segment::Literal(source[literal_start..].to_string()));
    }
    Ok(TemplateString::Mixed(segments))
}

/// Parse the call starting at byte `start` and locate its closing `]`.
///
/// Returns the expression and the byte offset of the `]`.
fn bracketed_call(source: &str, start: usize) -> TemplateResult<(Expression, usize)> {
    let cursor = Cursor::new(source);
    let parsed = call(&source[start..], cursor).and_then(|(rest, expression)| {
        let (rest, _) = multispace0(rest)?;
        Ok((rest, expression))
    });
    let (rest, expression) = parsed.map_err(|err| to_template_error(source, err))?;
    let close = cursor.offset(rest);
    if !rest.starts_with(']') {
        return Err(syntax_error(source, close, "expected ']' to close the expression"));
    }
    Ok((expression, close))
}

/// Whether `text` contains a `[` that opens an embedded call.
fn opens_call(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes
        .iter()
        .enumerate()
        .any(|(pos, &b)| b == b'[' && starts_call(&bytes[pos + 1..]))
}

/// Whether `bytes` begins with an identifier followed by `(`.
fn starts_call(bytes: &[u8]) -> bool {
    let mut pos = 0;
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    if pos >= bytes.len() || !is_ident_start(bytes[pos]) {
        return false;
    }
    while pos < bytes.len() && is_ident_continue(bytes[pos]) {
        pos += 1;
    }
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    bytes.get(pos) == Some(&b'(')
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

// ============================================================================
// Errors
// ============================================================================

/// Parse failure at the start of `input`.
///
/// Without a message the failure is reported as an unexpected character.
#[derive(Debug)]
struct SyntaxError<'a> {
    input: &'a str,
    message: Option<String>,
}

impl<'a> NomParseError<&'a str> for SyntaxError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        SyntaxError {
            input,
            message: None,
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

type PResult<'a, O> = IResult<&'a str, O, SyntaxError<'a>>;

/// A committed failure: no alternative is tried after it.
fn fail<'a, O>(input: &'a str, message: impl Into<String>) -> PResult<'a, O> {
    Err(nom::Err::Failure(SyntaxError {
        input,
        message: Some(message.into()),
    }))
}

/// Run `parser`, turning a recoverable error into a committed `message`.
fn expect<'a, O, P>(mut parser: P, message: String) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    P: Parser<&'a str, O, SyntaxError<'a>>,
{
    move |input| match parser.parse(input) {
        Err(nom::Err::Error(_)) => fail(input, message.clone()),
        other => other,
    }
}

fn unexpected_message(input: &str) -> String {
    match input.chars().next() {
        Some(c) => format!("unexpected character '{}'", c),
        None => "unexpected end of expression".to_string(),
    }
}

fn syntax_error(source: &str, position: usize, message: impl Into<String>) -> TemplateError {
    TemplateError::ExpressionSyntax {
        message: message.into(),
        expression: source.to_string(),
        position,
    }
}

fn to_template_error(source: &str, err: nom::Err<SyntaxError<'_>>) -> TemplateError {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let position = source.len() - e.input.len();
            let message = e.message.unwrap_or_else(|| unexpected_message(e.input));
            syntax_error(source, position, message)
        }
        nom::Err::Incomplete(_) => {
            syntax_error(source, source.len(), "unexpected end of expression")
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// Where the parser is: the full scanned string and the current nesting.
///
/// Every input handed to a parser is a suffix of `source`, so offsets are
/// computed from the remaining length.
#[derive(Debug, Clone, Copy)]
struct Cursor<'a> {
    source: &'a str,
    depth: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Cursor { source, depth: 0 }
    }

    fn offset(self, rest: &str) -> usize {
        self.source.len() - rest.len()
    }

    fn nested(self) -> Self {
        Cursor {
            source: self.source,
            depth: self.depth + 1,
        }
    }
}

/// `IDENT '(' [ arg ( ',' arg )* ] ')'`
fn call<'a>(input: &'a str, cursor: Cursor<'a>) -> PResult<'a, Expression> {
    let (input, _) = multispace0(input)?;
    let start = cursor.offset(input);

    if input.is_empty() {
        return fail(input, "expected a function name");
    }
    let (rest, name) = identifier(input)?;
    if cursor.depth >= MAX_NESTING_DEPTH {
        return fail(input, "expression nested too deeply");
    }

    let (rest, _) = multispace0(rest)?;
    let (rest, _) = expect(
        char('('),
        format!("expected '(' after function name '{}'", name),
    )(rest)?;
    let (rest, args) = map(
        opt(pair(
            |i: &'a str| argument(i, cursor),
            many0(preceded(
                preceded(multispace0, char(',')),
                cut(|i: &'a str| argument(i, cursor)),
            )),
        )),
        |args| match args {
            Some((first, mut more)) => {
                more.insert(0, first);
                more
            }
            None => Vec::new(),
        },
    )(rest)?;
    let (rest, _) = closing_paren(rest, name)?;

    Ok((
        rest,
        Expression::Call(Call {
            name: name.to_string(),
            args,
            span: Span::new(start, cursor.offset(rest)),
        }),
    ))
}

fn closing_paren<'a>(input: &'a str, name: &str) -> PResult<'a, char> {
    let (input, _) = multispace0(input)?;
    match char::<_, SyntaxError>(')')(input) {
        Err(nom::Err::Error(_)) if input.is_empty() => fail(
            input,
            format!("unbalanced parentheses: missing ')' to close '{}('", name),
        ),
        Err(nom::Err::Error(e)) => Err(nom::Err::Failure(e)),
        other => other,
    }
}

fn identifier<'a>(input: &'a str) -> PResult<'a, &'a str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn argument<'a>(input: &'a str, cursor: Cursor<'a>) -> PResult<'a, Expression> {
    let (input, _) = multispace0(input)?;
    if input.is_empty() {
        return fail(input, "unexpected end of expression, expected an argument");
    }
    alt((
        |i: &'a str| string_literal(i, cursor),
        |i: &'a str| integer(i, cursor),
        |i: &'a str| call(i, cursor.nested()),
    ))(input)
}

/// A single-quoted literal; `''` inside it is an escaped quote.
fn string_literal<'a>(input: &'a str, cursor: Cursor<'a>) -> PResult<'a, Expression> {
    let start = cursor.offset(input);
    let (rest, _) = char('\'')(input)?;
    let (rest, text) = fold_many0(
        alt((is_not("'"), value("'", tag("''")))),
        String::new,
        |mut text, piece| {
            text.push_str(piece);
            text
        },
    )(rest)?;
    let (rest, _) = match char::<_, SyntaxError>('\'')(rest) {
        Ok(closed) => closed,
        Err(_) => return fail(input, "unterminated string literal"),
    };

    Ok((
        rest,
        Expression::String {
            value: text,
            span: Span::new(start, cursor.offset(rest)),
        },
    ))
}

fn integer<'a>(input: &'a str, cursor: Cursor<'a>) -> PResult<'a, Expression> {
    let start = cursor.offset(input);
    let (rest, text) = alt((
        recognize(preceded(
            char('-'),
            expect(digit1, "expected digits after '-'".to_string()),
        )),
        digit1,
    ))(input)?;
    let Ok(value) = text.parse::<i64>() else {
        return fail(input, format!("integer literal {} is out of range", text));
    };

    Ok((
        rest,
        Expression::Integer {
            value,
            span: Span::new(start, cursor.offset(rest)),
        },
    ))
}
