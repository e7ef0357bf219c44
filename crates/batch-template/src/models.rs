/*
 * models.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Typed models for the pool and job documents a template expands to.
//!
//! Wire names are camelCase. Optional fields are omitted when unset, and
//! fields this crate does not model are kept on the pool (and on the VM
//! configuration) through a flattened map, so decoding and re-encoding an
//! expanded pool loses nothing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{TemplateError, TemplateResult};

/// A pool specification extended with package references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedPoolParameter {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub vm_size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_service_configuration: Option<CloudServiceConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_machine_configuration: Option<VirtualMachineConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_task: Option<StartTask>,
    /// Packages to install on every node before the start task runs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub package_references: Vec<PackageReference>,
    /// Remaining pool properties, passed through untouched.
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

/// A pool wrapped in a `properties` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolTemplate {
    pub properties: ExtendedPoolParameter,
}

/// A decoded pool document, in whichever shape it arrived.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolSpec {
    Template(PoolTemplate),
    Parameter(ExtendedPoolParameter),
}

impl PoolSpec {
    /// Decode a pool document.
    ///
    /// A document with a non-null `properties` field is a [`PoolTemplate`];
    /// anything else is decoded as an [`ExtendedPoolParameter`].
    pub fn from_json(value: Value) -> TemplateResult<Self> {
        let is_template = value.get("properties").is_some_and(|p| !p.is_null());
        if is_template {
            decode::<PoolTemplate>("PoolTemplate", value).map(PoolSpec::Template)
        } else {
            decode::<ExtendedPoolParameter>("ExtendedPoolParameter", value).map(PoolSpec::Parameter)
        }
    }

    /// The pool itself, unwrapping a template envelope.
    pub fn into_pool(self) -> ExtendedPoolParameter {
        match self {
            PoolSpec::Template(template) => template.properties,
            PoolSpec::Parameter(pool) => pool,
        }
    }
}

fn decode<T: DeserializeOwned>(type_name: &str, value: Value) -> TemplateResult<T> {
    let unable = |reason: String| {
        TemplateError::invalid_template(format!("Unable to deserialize to {}: {}", type_name, reason))
    };
    if value.is_null() {
        return Err(unable("JSON data is not in correct format.".to_string()));
    }
    serde_json::from_value(value).map_err(|e| unable(e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudServiceConfiguration {
    pub os_family: String,
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineConfiguration {
    pub image_reference: ImageReference,
    #[serde(rename = "nodeAgentSKUId")]
    pub node_agent_sku_id: String,
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

/// A marketplace or custom VM image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_machine_image_id: Option<String>,
}

/// Task run on each node as it joins the pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTask {
    pub command_line: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_files: Vec<ExtendedResourceFile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment_settings: Vec<EnvironmentSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_identity: Option<UserIdentity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_task_retry_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_success: Option<bool>,
}

/// A file to download to a node, either directly or from a file source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedResourceFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_mode: Option<String>,
    /// Resolved to concrete blob sources by the file-upload pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<FileSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSetting {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskConstraints {
    /// ISO 8601 duration, e.g. `PT1H`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_wall_clock_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_task_retry_count: Option<i32>,
}

/// The identity a task runs under: a named user or an auto-user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_user: Option<AutoUserSpecification>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoUserSpecification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<AutoUserScope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_level: Option<ElevationLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AutoUserScope {
    Task,
    Pool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElevationLevel {
    NonAdmin,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationPackageReference {
    pub application_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthenticationTokenSettings {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access: Vec<String>,
}

/// A file uploaded from the node when the task finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputFile {
    pub file_pattern: String,
    pub destination: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_options: Option<Value>,
}

/// The Job Manager task of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobManagerTask {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub command_line: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_files: Vec<ExtendedResourceFile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_files: Vec<OutputFile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment_settings: Vec<EnvironmentSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<TaskConstraints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kill_job_on_completion: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_identity: Option<UserIdentity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_exclusive: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub application_package_references: Vec<ApplicationPackageReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication_token_settings: Option<AuthenticationTokenSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_low_priority_node: Option<bool>,
}

impl JobManagerTask {
    pub fn from_json(value: Value) -> TemplateResult<Self> {
        decode("JobManagerTask", value)
    }
}

/// A package to install on pool nodes, keyed by its package manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PackageReference {
    #[serde(rename_all = "camelCase")]
    AptPackage {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ChocolateyPackage {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        allow_empty_checksums: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    YumPackage {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },
}

impl PackageReference {
    pub fn id(&self) -> &str {
        match self {
            PackageReference::AptPackage { id, .. }
            | PackageReference::ChocolateyPackage { id, .. }
            | PackageReference::YumPackage { id, .. } => id,
        }
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            PackageReference::AptPackage { version, .. }
            | PackageReference::ChocolateyPackage { version, .. }
            | PackageReference::YumPackage { version, .. } => version.as_deref(),
        }
    }

    /// The wire name of this package's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            PackageReference::AptPackage { .. } => "aptPackage",
            PackageReference::ChocolateyPackage { .. } => "chocolateyPackage",
            PackageReference::YumPackage { .. } => "yumPackage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ubuntu_pool() -> Value {
        json!({
            "id": "ubuntu",
            "vmSize": "STANDARD_D1_V2",
            "virtualMachineConfiguration": {
                "imageReference": {
                    "publisher": "Canonical",
                    "offer": "UbuntuServer",
                    "sku": "18.04-LTS"
                },
                "nodeAgentSKUId": "batch.node.ubuntu 18.04"
            },
            "targetDedicatedNodes": 2,
            "packageReferences": [
                { "type": "aptPackage", "id": "ffmpeg", "version": "7:3.4" }
            ]
        })
    }

    #[test]
    fn test_pool_parameter_decode() {
        let spec = PoolSpec::from_json(ubuntu_pool()).unwrap();
        let PoolSpec::Parameter(pool) = spec else {
            panic!("expected an ExtendedPoolParameter");
        };
        assert_eq!(pool.id, "ubuntu");
        let vm = pool.virtual_machine_configuration.as_ref().unwrap();
        assert_eq!(vm.node_agent_sku_id, "batch.node.ubuntu 18.04");
        assert_eq!(vm.image_reference.publisher.as_deref(), Some("Canonical"));
        assert_eq!(
            pool.package_references,
            vec![PackageReference::AptPackage {
                id: "ffmpeg".to_string(),
                version: Some("7:3.4".to_string()),
            }]
        );
        assert_eq!(pool.additional["targetDedicatedNodes"], json!(2));
    }

    #[test]
    fn test_pool_template_decode() {
        let spec = PoolSpec::from_json(json!({ "properties": ubuntu_pool() })).unwrap();
        assert!(matches!(spec, PoolSpec::Template(_)));
        assert_eq!(spec.into_pool().vm_size, "STANDARD_D1_V2");
    }

    #[test]
    fn test_null_properties_is_not_a_template() {
        let mut pool = ubuntu_pool();
        pool["properties"] = Value::Null;
        let spec = PoolSpec::from_json(pool).unwrap();
        assert!(matches!(spec, PoolSpec::Parameter(_)));
    }

    #[test]
    fn test_decode_failure_names_variant() {
        let err = PoolSpec::from_json(json!({ "vmSize": "small" })).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Unable to deserialize to ExtendedPoolParameter:"), "{}", message);
        assert!(message.contains("id"), "{}", message);

        let err = PoolSpec::from_json(json!({ "properties": { "id": 1 } })).unwrap_err();
        assert!(err.to_string().contains("Unable to deserialize to PoolTemplate:"));
    }

    #[test]
    fn test_null_document() {
        let err = PoolSpec::from_json(Value::Null).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid template: Unable to deserialize to ExtendedPoolParameter: JSON data is not in correct format."
        );
    }

    #[test]
    fn test_pool_reencodes_unknown_fields() {
        let pool = PoolSpec::from_json(ubuntu_pool()).unwrap().into_pool();
        let encoded = serde_json::to_value(&pool).unwrap();
        assert_eq!(encoded, ubuntu_pool());
    }

    #[test]
    fn test_package_reference_variants() {
        let packages: Vec<PackageReference> = serde_json::from_value(json!([
            { "type": "chocolateyPackage", "id": "git", "allowEmptyChecksums": true },
            { "type": "yumPackage", "id": "gcc", "version": "4.8.5" }
        ]))
        .unwrap();
        assert_eq!(packages[0].type_name(), "chocolateyPackage");
        assert_eq!(packages[0].id(), "git");
        assert_eq!(packages[0].version(), None);
        assert_eq!(packages[1].version(), Some("4.8.5"));

        let bad = serde_json::from_value::<PackageReference>(json!({ "type": "pipPackage", "id": "x" }));
        assert!(bad.is_err());
    }

    #[test]
    fn test_job_manager_task_requires_id_and_command_line() {
        let task = JobManagerTask::from_json(json!({
            "id": "manager",
            "commandLine": "python run.py",
            "constraints": { "maxWallClockTime": "PT1H" },
            "userIdentity": { "autoUser": { "scope": "task", "elevationLevel": "admin" } },
            "killJobOnCompletion": false
        }))
        .unwrap();
        assert_eq!(task.command_line, "python run.py");
        assert_eq!(
            task.user_identity.unwrap().auto_user.unwrap().elevation_level,
            Some(ElevationLevel::Admin)
        );

        let err = JobManagerTask::from_json(json!({ "id": "manager" })).unwrap_err();
        assert!(err.to_string().contains("Unable to deserialize to JobManagerTask:"));
        assert!(err.to_string().contains("commandLine"));
    }
}
