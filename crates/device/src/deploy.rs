//! Deployment and uninstall
//!
//! Pushes a built artifact to the project-type-specific path on the one
//! connected device and (re)starts the right activity. Uninstall is the
//! inverse: remove the remote file, restart the host.

use crate::adb::Adb;
use plugkit_core::config::{Config, ProjectType};
use plugkit_core::error::{Error, Result};
use std::path::Path;

/// Outcome of a deploy or uninstall, for status output
#[derive(Debug, Clone)]
pub struct Deployment {
    pub serial: String,
    pub remote_path: String,
}

/// Push the artifact and relaunch the target app.
pub fn deploy(
    adb: &Adb,
    config: &Config,
    artifact: &Path,
    wait_for_debugger: bool,
) -> Result<Deployment> {
    if !artifact.is_file() {
        return Err(Error::file_not_found(artifact).with_context("Build the project first"));
    }

    let device = adb.single_device()?;
    let remote = remote_path(config, artifact)?;

    adb.push(&device.serial, artifact, &remote)?;
    adb.launch_activity(
        &device.serial,
        launch_component(config),
        wait_for_debugger,
    )?;

    tracing::info!(serial = %device.serial, remote = %remote, "deployed");
    Ok(Deployment {
        serial: device.serial,
        remote_path: remote,
    })
}

/// Remove the artifact from the device; restart the host except for
/// injector projects, whose dex the manager consumes on its own.
pub fn uninstall(adb: &Adb, config: &Config, artifact: &Path) -> Result<Deployment> {
    let device = adb.single_device()?;
    let remote = remote_path(config, artifact)?;

    adb.rm(&device.serial, &remote)?;

    if config.schema.plugin.project_type != ProjectType::Injector {
        adb.launch_activity(&device.serial, &config.schema.device.launch_component, false)?;
    }

    tracing::info!(serial = %device.serial, remote = %remote, "uninstalled");
    Ok(Deployment {
        serial: device.serial,
        remote_path: remote,
    })
}

/// Where an artifact lives on the device
pub fn remote_path(config: &Config, artifact: &Path) -> Result<String> {
    let device = &config.schema.device;

    let file_name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| Error::device(format!("Artifact has no file name: {}", artifact.display())))?;

    Ok(match config.schema.plugin.project_type {
        ProjectType::Plugin => format!("{}/{}", device.plugin_dir.trim_end_matches('/'), file_name),
        ProjectType::Core => device.core_path.clone(),
        ProjectType::Injector => {
            let version = match config.schema.plugin.version.trim() {
                "" => "dev",
                v => v,
            };
            format!(
                "{}/{}.custom.dex",
                device.injector_dir.trim_end_matches('/'),
                version
            )
        }
    })
}

fn launch_component(config: &Config) -> &str {
    match config.schema.plugin.project_type {
        ProjectType::Injector => &config.schema.device.manager_component,
        _ => &config.schema.device.launch_component,
    }
}
