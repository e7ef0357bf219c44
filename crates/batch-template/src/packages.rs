/*
 * packages.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Package-reference processing.
//!
//! A pool may list `packageReferences` to install on every node. Before the
//! pool is submitted, the install commands are folded into its start task
//! and the references themselves are removed, since the service does not
//! know about them.

use std::fmt;

use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::models::{
    AutoUserScope, AutoUserSpecification, ElevationLevel, ExtendedPoolParameter, PackageReference,
    PoolSpec, StartTask, UserIdentity,
};

const CHOCOLATEY_BOOTSTRAP: &str = "powershell -NoProfile -ExecutionPolicy unrestricted -Command \"(iex ((new-object net.webclient).DownloadString('https://chocolatey.org/install.ps1')))\" && SET PATH=\"%PATH%;%ALLUSERSPROFILE%\\chocolatey\\bin\"";

/// Operating system family of a pool's nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFlavor {
    Linux,
    Windows,
}

impl fmt::Display for OsFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OsFlavor::Linux => "linux",
            OsFlavor::Windows => "windows",
        })
    }
}

impl OsFlavor {
    fn separator(self) -> &'static str {
        match self {
            OsFlavor::Linux => ";",
            OsFlavor::Windows => " && ",
        }
    }
}

/// The operating system a pool's nodes run.
///
/// Pools without a VM image publisher (cloud service pools) are Windows.
/// The node agent SKU match is case-sensitive: Windows SKUs are named
/// `batch.node.windows ...`.
pub fn target_os_flavor(pool: &ExtendedPoolParameter) -> OsFlavor {
    let Some(vm) = &pool.virtual_machine_configuration else {
        return OsFlavor::Windows;
    };
    let Some(publisher) = vm.image_reference.publisher.as_deref() else {
        return OsFlavor::Windows;
    };
    if publisher.contains("MicrosoftWindowsServer")
        || vm.node_agent_sku_id.contains("windows")
    {
        OsFlavor::Windows
    } else {
        OsFlavor::Linux
    }
}

/// Build the command that installs all of a pool's package references.
///
/// Returns `None` when the pool has no package references.
pub fn package_install_command(pool: &ExtendedPoolParameter) -> TemplateResult<Option<String>> {
    if pool.package_references.is_empty() {
        return Ok(None);
    }
    let flavor = target_os_flavor(pool);
    let mut commands = Vec::new();
    let mut apt_updated = false;
    let mut chocolatey_ready = false;

    for package in &pool.package_references {
        let id = package.id();
        if id.trim().is_empty() {
            return Err(invalid_package(package, "package id must not be empty"));
        }
        let required = match package {
            PackageReference::ChocolateyPackage { .. } => OsFlavor::Windows,
            PackageReference::AptPackage { .. } | PackageReference::YumPackage { .. } => {
                OsFlavor::Linux
            }
        };
        if required != flavor {
            return Err(invalid_package(
                package,
                &format!(
                    "{} packages can only be installed on {} pools, but this pool runs {}",
                    package.type_name(),
                    required,
                    flavor
                ),
            ));
        }

        match package {
            PackageReference::AptPackage { version, .. } => {
                if !apt_updated {
                    commands.push("apt-get update".to_string());
                    apt_updated = true;
                }
                match version {
                    Some(version) => commands.push(format!("apt-get install -y {}={}", id, version)),
                    None => commands.push(format!("apt-get install -y {}", id)),
                }
            }
            PackageReference::YumPackage { version, .. } => match version {
                Some(version) => commands.push(format!("yum -y install {}-{}", id, version)),
                None => commands.push(format!("yum -y install {}", id)),
            },
            PackageReference::ChocolateyPackage {
                version,
                allow_empty_checksums,
                ..
            } => {
                if !chocolatey_ready {
                    commands.push(CHOCOLATEY_BOOTSTRAP.to_string());
                    chocolatey_ready = true;
                }
                let mut command = format!("choco install {}", id);
                if let Some(version) = version {
                    command.push_str(&format!(" --version {}", version));
                }
                if allow_empty_checksums.unwrap_or(false) {
                    command.push_str(" --allow-empty-checksums");
                }
                command.push_str(" -y");
                commands.push(command);
            }
        }
    }

    debug!(
        pool = %pool.id,
        os = %flavor,
        packages = pool.package_references.len(),
        "built package install command"
    );
    Ok(Some(commands.join(flavor.separator())))
}

fn invalid_package(package: &PackageReference, message: &str) -> TemplateError {
    TemplateError::InvalidPackageReference {
        package: format!("{}:{}", package.type_name(), package.id()),
        message: message.to_string(),
    }
}

/// Build a start task that runs `commands` before the existing start task.
///
/// The task runs as the pool-wide admin auto-user and must succeed before
/// the node accepts work. Resource files, environment settings and the
/// retry count of `existing` are kept.
pub fn construct_setup_task(
    existing: Option<&StartTask>,
    commands: &[String],
    flavor: OsFlavor,
) -> StartTask {
    let mut all: Vec<&str> = commands.iter().map(String::as_str).collect();
    if let Some(existing) = existing {
        if !existing.command_line.is_empty() {
            all.push(&existing.command_line);
        }
    }
    let joined = all.join(flavor.separator());
    let command_line = match flavor {
        OsFlavor::Linux => format!("/bin/bash -c 'set -e; set -o pipefail; {}; wait'", joined),
        OsFlavor::Windows => format!("cmd.exe /c \"{}\"", joined),
    };

    StartTask {
        command_line,
        resource_files: existing.map(|t| t.resource_files.clone()).unwrap_or_default(),
        environment_settings: existing
            .map(|t| t.environment_settings.clone())
            .unwrap_or_default(),
        user_identity: Some(UserIdentity {
            user_name: None,
            auto_user: Some(AutoUserSpecification {
                scope: Some(AutoUserScope::Pool),
                elevation_level: Some(ElevationLevel::Admin),
            }),
        }),
        max_task_retry_count: existing.and_then(|t| t.max_task_retry_count),
        wait_for_success: Some(true),
    }
}

/// Turn a decoded pool document into the pool to submit.
///
/// Unwraps a template envelope, folds package installs into the start
/// task, and drops `packageReferences`.
pub fn prepare_pool(spec: PoolSpec) -> TemplateResult<ExtendedPoolParameter> {
    let mut pool = spec.into_pool();
    if let Some(command) = package_install_command(&pool)? {
        let flavor = target_os_flavor(&pool);
        pool.start_task = Some(construct_setup_task(
            pool.start_task.as_ref(),
            &[command],
            flavor,
        ));
    }
    pool.package_references.clear();
    Ok(pool)
}
