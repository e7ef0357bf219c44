//! Core diagnostic message types.
//!
//! This module defines the structures for representing diagnostic messages
//! (errors, warnings, info) following tidyverse-style guidelines.

use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::ops::Range;

/// The kind of diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// An error that prevents completion
    Error,
    /// A warning that doesn't prevent completion but indicates a problem
    Warning,
    /// Informational message
    Info,
}

impl DiagnosticKind {
    fn label(self) -> &'static str {
        match self {
            DiagnosticKind::Error => "Error",
            DiagnosticKind::Warning => "Warning",
            DiagnosticKind::Info => "Info",
        }
    }
}

/// How detail items should be presented (tidyverse x/i bullet style).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetailKind {
    /// Error detail (✖ bullet)
    Error,
    /// Info detail (ℹ bullet)
    Info,
    /// Note detail (plain bullet)
    Note,
}

impl DetailKind {
    fn bullet(self) -> &'static str {
        match self {
            DetailKind::Error => "✖",
            DetailKind::Info => "ℹ",
            DetailKind::Note => "•",
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            DetailKind::Error => "error",
            DetailKind::Info => "info",
            DetailKind::Note => "note",
        }
    }
}

/// The content of a message or detail item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageContent {
    /// Plain text content
    Plain(String),
    /// Markdown content (backticks mark identifiers and values)
    Markdown(String),
}

impl MessageContent {
    /// Get the raw string content for display
    pub fn as_str(&self) -> &str {
        match self {
            MessageContent::Plain(s) => s,
            MessageContent::Markdown(s) => s,
        }
    }

    /// Convert to JSON value with type information
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;
        match self {
            MessageContent::Plain(s) => json!({
                "type": "plain",
                "content": s
            }),
            MessageContent::Markdown(s) => json!({
                "type": "markdown",
                "content": s
            }),
        }
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Markdown(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        MessageContent::Markdown(s.to_string())
    }
}

/// A piece of source text a diagnostic points into.
///
/// Template errors usually concern one JSON string value, so the snippet
/// carries that text itself rather than an offset into a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSnippet {
    /// Name shown in the rendered report (e.g. `expression`)
    pub name: String,
    /// The full text the range refers to
    pub content: String,
    /// Byte range of the offending part of `content`
    pub range: Range<usize>,
}

impl SourceSnippet {
    pub fn new(name: impl Into<String>, content: impl Into<String>, range: Range<usize>) -> Self {
        let content = content.into();
        // Clamp so that ariadne never sees a span outside the text.
        let end = range.end.min(content.len());
        let start = range.start.min(end);
        Self {
            name: name.into(),
            content,
            range: start..end,
        }
    }
}

/// A detail item in a diagnostic message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailItem {
    /// The kind of detail (error, info, note)
    pub kind: DetailKind,
    /// The content of the detail
    pub content: MessageContent,
}

/// A diagnostic message following tidyverse-style structure.
///
/// Structure:
/// 1. **Code**: Optional error code (e.g., "BT-2-1") for searchability
/// 2. **Title**: Brief error message
/// 3. **Kind**: Error, Warning, Info
/// 4. **Problem**: What went wrong (the "must" or "can't" statement)
/// 5. **Details**: Specific information (bulleted)
/// 6. **Hints**: Optional guidance for fixing (ends with ?)
/// 7. **Snippet**: Optional source text with the offending range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticMessage {
    /// Optional error code (e.g., "BT-2-1")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Brief title for the error
    pub title: String,

    /// The kind of diagnostic (Error, Warning, Info)
    pub kind: DiagnosticKind,

    /// The problem statement
    pub problem: Option<MessageContent>,

    /// Specific error details
    pub details: Vec<DetailItem>,

    /// Optional hints for fixing (ends with ?)
    pub hints: Vec<MessageContent>,

    /// Source text the diagnostic refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<SourceSnippet>,
}

impl DiagnosticMessage {
    /// Create a new diagnostic message with just a title and kind.
    pub fn new(kind: DiagnosticKind, title: impl Into<String>) -> Self {
        Self {
            code: None,
            title: title.into(),
            kind,
            problem: None,
            details: Vec::new(),
            hints: Vec::new(),
            snippet: None,
        }
    }

    /// Create an error diagnostic.
    pub fn error(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Error, title)
    }

    /// Create a warning diagnostic.
    pub fn warning(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Warning, title)
    }

    /// Set the error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Render this diagnostic message as text following tidyverse style.
    ///
    /// Format:
    /// ```text
    /// Error [BT-2-1]: title
    /// Problem statement here
    /// ✖ Error detail
    /// ℹ Info detail
    /// ? Hint
    /// ```
    ///
    /// When a snippet is attached, an ariadne report of the snippet follows
    /// the title block.
    pub fn to_text(&self) -> String {
        let mut result = String::new();

        match &self.code {
            Some(code) => writeln!(result, "{} [{}]: {}", self.kind.label(), code, self.title),
            None => writeln!(result, "{}: {}", self.kind.label(), self.title),
        }
        .expect("writing to a String cannot fail");

        if let Some(problem) = &self.problem {
            result.push_str(problem.as_str());
            result.push('\n');
        }

        for detail in &self.details {
            result.push_str(detail.kind.bullet());
            result.push(' ');
            result.push_str(detail.content.as_str());
            result.push('\n');
        }

        for hint in &self.hints {
            result.push_str("? ");
            result.push_str(hint.as_str());
            result.push('\n');
        }

        if let Some(snippet) = &self.snippet {
            if let Some(rendered) = self.render_snippet(snippet) {
                result.push('\n');
                result.push_str(&rendered);
            }
        }

        // Drop the trailing newline so single-line messages compare cleanly.
        while result.ends_with('\n') {
            result.pop();
        }
        result
    }

    /// Render this diagnostic message as a JSON value.
    ///
    /// ```
    /// use batch_error_reporting::DiagnosticMessage;
    ///
    /// let msg = DiagnosticMessage::error("Something went wrong");
    /// let json = msg.to_json();
    /// assert_eq!(json["kind"], "error");
    /// assert_eq!(json["title"], "Something went wrong");
    /// ```
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;

        let kind_str = match self.kind {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Info => "info",
        };

        let mut obj = json!({
            "kind": kind_str,
            "title": self.title,
        });

        if let Some(code) = &self.code {
            obj["code"] = json!(code);
        }

        if let Some(problem) = &self.problem {
            obj["problem"] = problem.to_json();
        }

        if !self.details.is_empty() {
            let details: Vec<_> = self
                .details
                .iter()
                .map(|d| {
                    json!({
                        "kind": d.kind.as_str(),
                        "content": d.content.to_json()
                    })
                })
                .collect();
            obj["details"] = json!(details);
        }

        if !self.hints.is_empty() {
            let hints: Vec<_> = self.hints.iter().map(|h| h.to_json()).collect();
            obj["hints"] = json!(hints);
        }

        if let Some(snippet) = &self.snippet {
            obj["location"] = json!({
                "name": snippet.name,
                "text": snippet.content,
                "start": snippet.range.start,
                "end": snippet.range.end,
            });
        }

        obj
    }

    /// Render the snippet with ariadne (no colors, so output is stable).
    fn render_snippet(&self, snippet: &SourceSnippet) -> Option<String> {
        use ariadne::{Color, Config, Label, Report, ReportKind, Source};

        let report_kind = match self.kind {
            DiagnosticKind::Error => ReportKind::Error,
            DiagnosticKind::Warning => ReportKind::Warning,
            DiagnosticKind::Info => ReportKind::Advice,
        };

        let label_message = match &self.problem {
            Some(problem) => problem.as_str(),
            None => &self.title,
        };

        // ariadne counts characters, snippet ranges are in bytes.
        let char_offset = |byte: usize| {
            snippet
                .content
                .char_indices()
                .take_while(|(i, _)| *i < byte)
                .count()
        };
        let span = char_offset(snippet.range.start)..char_offset(snippet.range.end);

        let report = Report::build(report_kind, snippet.name.clone(), span.start)
            .with_config(Config::default().with_color(false))
            .with_message(&self.title)
            .with_label(
                Label::new((snippet.name.clone(), span))
                    .with_message(label_message)
                    .with_color(Color::Red),
            )
            .finish();

        let mut output = Vec::new();
        report
            .write(
                (snippet.name.clone(), Source::from(snippet.content.as_str())),
                &mut output,
            )
            .ok()?;

        String::from_utf8(output).ok()
    }
}
