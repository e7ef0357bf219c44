/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Parameterized JSON templates for batch pool and job specifications.
//!
//! A template is a JSON document with a `parameters` section, an optional
//! `variables` section, and one body section (`pool` or `job`). Strings in
//! the body may embed bracketed expressions:
//!
//! - `[parameters('name')]` and `[variables('name')]` for lookups
//! - `[concat(a, b, ...)]`, `[toLower(s)]`, `[toUpper(s)]` for string work
//! - `[[...` for a literal leading bracket
//!
//! A string that is one whole expression is replaced by the expression's
//! value with its own type (object, number, array, ...); text mixing literal
//! characters and expressions stays a string.
//!
//! After expansion, a pool can be decoded into [`models::PoolSpec`] and
//! passed through [`packages::prepare_pool`], which folds any package
//! references into the pool's start task.
//!
//! # Example
//!
//! ```
//! use batch_template::{ExpandOptions, expand_template};
//! use serde_json::json;
//!
//! let template = json!({
//!     "parameters": {
//!         "suffix": { "type": "string" },
//!         "vmSize": { "type": "string", "defaultValue": "STANDARD_D1_V2" }
//!     },
//!     "pool": {
//!         "id": "vm-[parameters('suffix')]",
//!         "vmSize": "[parameters('vmSize')]"
//!     }
//! });
//! let parameters = json!({ "suffix": { "value": "01" } });
//!
//! let pool = expand_template(&template, &parameters, &ExpandOptions::default()).unwrap();
//! assert_eq!(pool, json!({ "id": "vm-01", "vmSize": "STANDARD_D1_V2" }));
//! ```

pub mod ast;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod loader;
pub mod models;
pub mod packages;
pub mod parameters;
pub mod parser;
pub mod rewriter;
pub mod template;

// Re-export main types at crate root
pub use context::EvalContext;
pub use error::{TemplateError, TemplateResult};
pub use loader::{DocumentLoader, FileSystemLoader, MemoryLoader, TemplateSource};
pub use models::{ExtendedPoolParameter, JobManagerTask, PackageReference, PoolSpec, PoolTemplate};
pub use packages::{OsFlavor, prepare_pool};
pub use parameters::{ParameterDeclaration, ParameterDeclarations, ParameterType, ResolvedParameters};
pub use template::{BodySection, ExpandOptions, Expander, expand_template};
