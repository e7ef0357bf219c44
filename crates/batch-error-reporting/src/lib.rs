/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error reporting and diagnostic messages for batch template tooling.
//!
//! Errors raised while loading and expanding templates are converted into
//! [`DiagnosticMessage`]s before they reach a user. A diagnostic has:
//!
//! - an error code (`BT-<subsystem>-<number>`) looked up in the embedded
//!   [catalog](catalog), which supplies the title
//! - a problem statement
//! - bulleted details and hints
//! - an optional [`SourceSnippet`] pointing into the text that failed
//!   (usually a single template expression), rendered with ariadne
//!
//! # Example
//!
//! ```
//! use batch_error_reporting::DiagnosticMessageBuilder;
//!
//! let msg = DiagnosticMessageBuilder::from_code("BT-2-2")
//!     .problem("Parameter `vmSize` is not declared in the template")
//!     .add_hint("Declare it under `parameters`?")
//!     .build();
//!
//! let text = msg.to_text();
//! assert!(text.contains("BT-2-2"));
//! ```

pub mod builder;
pub mod catalog;
pub mod diagnostic;

pub use builder::DiagnosticMessageBuilder;
pub use catalog::{ERROR_CATALOG, ErrorCodeInfo, get_error_info, get_subsystem};
pub use diagnostic::{
    DetailItem, DetailKind, DiagnosticKind, DiagnosticMessage, MessageContent, SourceSnippet,
};
