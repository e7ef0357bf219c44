/*
 * template.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template expansion entry points.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::context::EvalContext;
use crate::error::{TemplateError, TemplateResult};
use crate::loader::{
    DocumentLoader, FileSystemLoader, TemplateSource, load_document, load_parameter_values,
};
use crate::parameters::{ParameterDeclarations, json_type_name, supplied_values};
use crate::rewriter::rewrite_value;

/// The body sections a template may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodySection {
    #[default]
    Pool,
    Job,
}

impl BodySection {
    pub const ALL: [BodySection; 2] = [BodySection::Pool, BodySection::Job];

    /// The key of this section in a template document.
    pub fn key(self) -> &'static str {
        match self {
            BodySection::Pool => "pool",
            BodySection::Job => "job",
        }
    }
}

impl fmt::Display for BodySection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for BodySection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BodySection::ALL
            .into_iter()
            .find(|section| section.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown template section '{}'", s))
    }
}

/// Options controlling an expansion.
#[derive(Debug, Clone, Default)]
pub struct ExpandOptions {
    /// Which body section to expand and return.
    pub section: BodySection,
}

impl ExpandOptions {
    pub fn new(section: BodySection) -> Self {
        Self { section }
    }
}

/// Expand an in-memory template against in-memory parameter values.
///
/// `parameters` may use either `{ "name": { "value": v } }` or bare
/// `{ "name": v }` entries; `null` means no values. Returns the expanded
/// body of the requested section.
pub fn expand_template(
    template: &Value,
    parameters: &Value,
    options: &ExpandOptions,
) -> TemplateResult<Value> {
    let Value::Object(template) = template else {
        return Err(TemplateError::invalid_template(format!(
            "Template must be a JSON object, found {}",
            json_type_name(template)
        )));
    };
    let supplied = supplied_values(parameters)?;
    expand_document(template, &supplied, options)
}

fn expand_document(
    template: &Map<String, Value>,
    supplied: &Map<String, Value>,
    options: &ExpandOptions,
) -> TemplateResult<Value> {
    let body = body_section(template, options.section)?;

    let declarations = ParameterDeclarations::from_template(template)?;
    let parameters = declarations.resolve(supplied)?;
    let unresolved: Vec<&str> = parameters.unresolved().collect();
    debug!(
        declared = declarations.len(),
        supplied = supplied.len(),
        ?unresolved,
        "resolved template parameters"
    );

    let empty = Map::new();
    let variables = match template.get("variables") {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(variables)) => variables,
        Some(other) => {
            return Err(TemplateError::invalid_template(format!(
                "'variables' must be an object, found {}",
                json_type_name(other)
            )));
        }
    };

    let mut ctx = EvalContext::new(&parameters, variables);
    rewrite_value(body, &mut ctx)
}

/// The requested body section, checking that no other one is present.
fn body_section(template: &Map<String, Value>, section: BodySection) -> TemplateResult<&Value> {
    let present: Vec<&str> = BodySection::ALL
        .iter()
        .map(|s| s.key())
        .filter(|key| template.contains_key(*key))
        .collect();
    if present.len() > 1 {
        return Err(TemplateError::invalid_template(format!(
            "Template must contain exactly one body section, found '{}'",
            present.join("', '")
        )));
    }
    template.get(section.key()).ok_or_else(|| {
        TemplateError::invalid_template(format!(
            "Template missing required '{}' element",
            section.key()
        ))
    })
}

/// Loads templates and parameter files and expands them.
///
/// The loader decides how [`TemplateSource::Path`] sources are read.
#[derive(Debug, Clone, Default)]
pub struct Expander<L = FileSystemLoader> {
    loader: L,
}

impl Expander<FileSystemLoader> {
    /// An expander that reads paths from the filesystem.
    pub fn new() -> Self {
        Self {
            loader: FileSystemLoader,
        }
    }
}

impl<L: DocumentLoader> Expander<L> {
    /// An expander that reads paths through `loader`.
    pub fn with_loader(loader: L) -> Self {
        Self { loader }
    }

    /// Load both documents and expand the section named in `options`.
    pub fn expand(
        &self,
        template: TemplateSource<'_>,
        parameters: Option<TemplateSource<'_>>,
        options: &ExpandOptions,
    ) -> TemplateResult<Value> {
        let template = load_document(template, &self.loader)?;
        let supplied = load_parameter_values(parameters, &self.loader)?;
        info!(section = %options.section, "expanding template");
        expand_document(&template, &supplied, options)
    }

    /// Expand the `pool` section.
    pub fn expand_pool(
        &self,
        template: TemplateSource<'_>,
        parameters: Option<TemplateSource<'_>>,
    ) -> TemplateResult<Value> {
        self.expand(template, parameters, &ExpandOptions::new(BodySection::Pool))
    }

    /// Expand the `job` section.
    pub fn expand_job(
        &self,
        template: TemplateSource<'_>,
        parameters: Option<TemplateSource<'_>>,
    ) -> TemplateResult<Value> {
        self.expand(template, parameters, &ExpandOptions::new(BodySection::Job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn pool_template() -> Value {
        json!({
            "parameters": {
                "vmSize": { "type": "string", "defaultValue": "STANDARD_D1_V2" },
                "nodeCount": { "type": "int" }
            },
            "pool": {
                "id": "pool-[parameters('nodeCount')]",
                "vmSize": "[parameters('vmSize')]",
                "targetDedicatedNodes": "[parameters('nodeCount')]"
            }
        })
    }

    #[test]
    fn test_body_section_parse() {
        assert_eq!("pool".parse::<BodySection>(), Ok(BodySection::Pool));
        assert_eq!("JOB".parse::<BodySection>(), Ok(BodySection::Job));
        assert!("task".parse::<BodySection>().is_err());
        assert_eq!(BodySection::default(), BodySection::Pool);
    }

    #[test]
    fn test_expand_template() {
        let expanded = expand_template(
            &pool_template(),
            &json!({ "nodeCount": { "value": 2 } }),
            &ExpandOptions::default(),
        )
        .unwrap();
        assert_eq!(
            expanded,
            json!({
                "id": "pool-2",
                "vmSize": "STANDARD_D1_V2",
                "targetDedicatedNodes": 2
            })
        );
    }

    #[test]
    fn test_missing_section() {
        let err = expand_template(&pool_template(), &Value::Null, &ExpandOptions::new(BodySection::Job))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid template: Template missing required 'job' element"
        );
    }

    #[test]
    fn test_two_sections_rejected() {
        let template = json!({ "pool": {}, "job": {} });
        let err = expand_template(&template, &Value::Null, &ExpandOptions::default()).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidTemplate { .. }));
    }

    #[test]
    fn test_template_must_be_object() {
        let err = expand_template(&json!("pool"), &Value::Null, &ExpandOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("found string"));
    }

    #[test]
    fn test_variables_must_be_object() {
        let template = json!({ "variables": [1], "pool": {} });
        let err = expand_template(&template, &Value::Null, &ExpandOptions::default()).unwrap_err();
        assert!(err.to_string().contains("'variables' must be an object"));
    }

    #[test]
    fn test_unreferenced_parameter_may_stay_unresolved() {
        let template = json!({
            "parameters": {
                "poolId": { "type": "string" },
                "unused": { "type": "int" }
            },
            "pool": { "id": "[parameters('poolId')]" }
        });
        let expanded = expand_template(
            &template,
            &json!({ "poolId": "p1" }),
            &ExpandOptions::default(),
        )
        .unwrap();
        assert_eq!(expanded, json!({ "id": "p1" }));
    }

    #[test]
    fn test_expander_with_memory_loader() {
        let mut loader = MemoryLoader::new();
        loader.add("pool.json", pool_template().to_string());
        loader.add("params.json", r#"{ "nodeCount": { "value": 5 } }"#);

        let expander = Expander::with_loader(loader);
        let expanded = expander
            .expand_pool(
                TemplateSource::Path("pool.json".into()),
                Some(TemplateSource::Path("params.json".into())),
            )
            .unwrap();
        assert_eq!(expanded["targetDedicatedNodes"], json!(5));
    }

    #[test]
    fn test_expand_job() {
        let template = json!({
            "parameters": { "jobId": { "type": "string" } },
            "job": { "id": "[parameters('jobId')]", "priority": 10 }
        });
        let expanded = Expander::new()
            .expand_job(
                TemplateSource::Value(template),
                Some(TemplateSource::Value(json!({ "jobId": "render" }))),
            )
            .unwrap();
        assert_eq!(expanded, json!({ "id": "render", "priority": 10 }));
    }
}
