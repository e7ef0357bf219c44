//! Builder API for diagnostic messages.
//!
//! The builder encodes the tidyverse message structure: a title, one problem
//! statement, bulleted details and hints.

use crate::catalog::get_error_info;
use crate::diagnostic::{
    DetailItem, DetailKind, DiagnosticKind, DiagnosticMessage, MessageContent, SourceSnippet,
};

/// Builder for [`DiagnosticMessage`].
///
/// # Example
///
/// ```
/// use batch_error_reporting::DiagnosticMessageBuilder;
///
/// let error = DiagnosticMessageBuilder::error("Incompatible types")
///     .with_code("BT-2-1")
///     .problem("Parameter `count` must be an integer")
///     .add_detail("Got `\"many\"`")
///     .add_hint("Pass a number?")
///     .build();
/// assert_eq!(error.details.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct DiagnosticMessageBuilder {
    message: DiagnosticMessage,
}

impl DiagnosticMessageBuilder {
    fn new(kind: DiagnosticKind, title: impl Into<String>) -> Self {
        Self {
            message: DiagnosticMessage::new(kind, title),
        }
    }

    /// Start an error diagnostic.
    pub fn error(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Error, title)
    }

    /// Start a warning diagnostic.
    pub fn warning(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Warning, title)
    }

    /// Start an error diagnostic whose title comes from the error catalog.
    ///
    /// Codes missing from the catalog fall back to using the code itself as
    /// the title.
    pub fn from_code(code: &str) -> Self {
        let title = get_error_info(code)
            .map(|info| info.title.clone())
            .unwrap_or_else(|| code.to_string());
        Self::error(title).with_code(code)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.message.code = Some(code.into());
        self
    }

    /// Set the problem statement (the "what went wrong").
    pub fn problem(mut self, problem: impl Into<MessageContent>) -> Self {
        self.message.problem = Some(problem.into());
        self
    }

    /// Add an error detail (✖ bullet).
    pub fn add_detail(self, detail: impl Into<MessageContent>) -> Self {
        self.add_item(DetailKind::Error, detail)
    }

    /// Add an informational detail (ℹ bullet).
    pub fn add_info(self, info: impl Into<MessageContent>) -> Self {
        self.add_item(DetailKind::Info, info)
    }

    /// Add a note (plain bullet).
    pub fn add_note(self, note: impl Into<MessageContent>) -> Self {
        self.add_item(DetailKind::Note, note)
    }

    fn add_item(mut self, kind: DetailKind, content: impl Into<MessageContent>) -> Self {
        self.message.details.push(DetailItem {
            kind,
            content: content.into(),
        });
        self
    }

    /// Add a hint. Hints are phrased as questions.
    pub fn add_hint(mut self, hint: impl Into<MessageContent>) -> Self {
        self.message.hints.push(hint.into());
        self
    }

    /// Attach the source text the diagnostic refers to.
    pub fn with_snippet(mut self, snippet: SourceSnippet) -> Self {
        self.message.snippet = Some(snippet);
        self
    }

    /// Finish building.
    ///
    /// A catalogued diagnostic without a problem statement gets the
    /// catalog's default message.
    pub fn build(mut self) -> DiagnosticMessage {
        if self.message.problem.is_none() {
            if let Some(info) = self.message.code.as_deref().and_then(get_error_info) {
                self.message.problem = Some(MessageContent::Plain(info.message_template.clone()));
            }
        }
        self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_code_uses_catalog_title() {
        let msg = DiagnosticMessageBuilder::from_code("BT-2-3").build();
        assert_eq!(msg.title, "Missing Parameter Value");
        assert_eq!(msg.code.as_deref(), Some("BT-2-3"));
    }

    #[test]
    fn test_from_unknown_code() {
        let msg = DiagnosticMessageBuilder::from_code("BT-9-9").build();
        assert_eq!(msg.title, "BT-9-9");
        assert!(msg.problem.is_none());
    }

    #[test]
    fn test_build_fills_default_problem() {
        let msg = DiagnosticMessageBuilder::from_code("BT-3-1").build();
        assert_eq!(
            msg.problem,
            Some(MessageContent::Plain(
                "A template expression could not be parsed.".to_string()
            ))
        );
    }

    #[test]
    fn test_explicit_problem_wins() {
        let msg = DiagnosticMessageBuilder::from_code("BT-3-1")
            .problem("Missing `)`")
            .build();
        assert_eq!(msg.problem.unwrap().as_str(), "Missing `)`");
    }

    #[test]
    fn test_detail_kinds() {
        let msg = DiagnosticMessageBuilder::warning("Careful")
            .add_detail("bad")
            .add_info("context")
            .add_note("aside")
            .build();
        let kinds: Vec<_> = msg.details.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![DetailKind::Error, DetailKind::Info, DetailKind::Note]
        );
        assert_eq!(msg.kind, DiagnosticKind::Warning);
    }
}
