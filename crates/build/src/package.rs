//! Package assembly
//!
//! Stitches the build outputs into the distributable artifact: a zip of
//! `manifest.json` + `classes.dex` + linked resources for plugins, the
//! same minus the manifest for the core package, and a bare renamed dex
//! for injector projects. Every artifact gets a SHA-256 sidecar.

use crate::dex::ENTRY_POINT_FILE;
use plugkit_core::config::{Author, Config, ProjectType};
use plugkit_core::digest::sha256_file;
use plugkit_core::error::{Error, ErrorCode, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// File name of the raw dex an injector project produces
pub const INJECTOR_DEX: &str = "Injector.dex";

/// The descriptor embedded in every plugin package
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    pub plugin_class_name: String,
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub authors: Vec<Author>,
    pub links: ManifestLinks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changelog_media: Option<String>,
}

/// Project links as they appear in the manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A finished artifact and its digest
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub sha256: String,
}

/// Assemble the artifact for the project type.
///
/// `entry_point` is the class the dex scan found; when `None`, the name
/// persisted by an earlier dex run is used.
pub fn assemble(
    config: &Config,
    dex_file: &Path,
    entry_point: Option<&str>,
    res_apk: Option<&Path>,
) -> Result<Artifact> {
    let output_dir = config.output_dir();
    fs::create_dir_all(&output_dir)?;

    if !dex_file.is_file() {
        return Err(Error::file_not_found(dex_file).with_context("Run the dex step first"));
    }

    let path = match config.schema.plugin.project_type {
        ProjectType::Injector => {
            let dest = output_dir.join(INJECTOR_DEX);
            fs::copy(dex_file, &dest)?;
            tracing::info!(dest = %dest.display(), "copied injector dex");
            dest
        }
        ProjectType::Core => {
            let dest = output_dir.join(format!("{}.zip", config.schema.plugin.name));
            write_package(&dest, None, dex_file, res_apk)?;
            dest
        }
        ProjectType::Plugin => {
            require_version(config)?;
            let entry = resolve_entry_point(config, entry_point)?;

            let manifest = manifest_for(config, &entry);
            let intermediates = config.intermediates_dir();
            fs::create_dir_all(&intermediates)?;
            let manifest_path = intermediates.join("manifest.json");
            fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;

            let dest = output_dir.join(format!("{}.zip", config.schema.plugin.name));
            write_package(&dest, Some(&manifest_path), dex_file, res_apk)?;
            dest
        }
    };

    let sha256 = sha256_file(&path)?;
    write_digest_sidecar(&path, &sha256)?;

    Ok(Artifact { path, sha256 })
}

/// Build the manifest for a plugin project
pub fn manifest_for(config: &Config, entry_point: &str) -> PluginManifest {
    let plugin = &config.schema.plugin;
    let links = &config.schema.links;
    let update = &config.schema.update;

    PluginManifest {
        plugin_class_name: entry_point.to_string(),
        name: plugin.name.clone(),
        version: plugin.version.clone(),
        description: plugin.description.clone(),
        authors: plugin.authors.clone(),
        links: ManifestLinks {
            github: links.github.clone(),
            source: links.effective_source().map(String::from),
        },
        update_url: update.url.clone(),
        changelog: update.changelog.clone(),
        changelog_media: update.changelog_media.clone(),
    }
}

fn require_version(config: &Config) -> Result<()> {
    if config.schema.plugin.version.trim().is_empty() {
        return Err(Error::new(ErrorCode::VersionUnset, "No version is set")
            .with_suggestion("Set plugin.version in plugkit.toml"));
    }
    Ok(())
}

fn resolve_entry_point(config: &Config, from_scan: Option<&str>) -> Result<String> {
    if let Some(name) = from_scan {
        return Ok(name.to_string());
    }

    let persisted = config.intermediates_dir().join(ENTRY_POINT_FILE);
    if let Ok(name) = fs::read_to_string(&persisted) {
        let name = name.trim();
        if !name.is_empty() {
            return Ok(name.to_string());
        }
    }

    Err(Error::new(
        ErrorCode::EntryPointMissing,
        "No plugin entry-point class found",
    )
    .with_suggestion("Annotate your plugin class with @PluginEntry"))
}

/// Write the package zip: optional manifest, the dex, and every linked
/// resource entry except the resource archive's own AndroidManifest.xml.
fn write_package(
    dest: &Path,
    manifest_json: Option<&Path>,
    dex_file: &Path,
    res_apk: Option<&Path>,
) -> Result<()> {
    let file = File::create(dest)?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    if let Some(manifest) = manifest_json {
        zip.start_file("manifest.json", options)?;
        zip.write_all(&fs::read(manifest)?)?;
    }

    zip.start_file("classes.dex", options)?;
    zip.write_all(&fs::read(dex_file)?)?;

    if let Some(res_apk) = res_apk {
        let mut archive = ZipArchive::new(File::open(res_apk)?)?;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            if name == "AndroidManifest.xml" {
                continue;
            }

            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;

            zip.start_file(name, options)?;
            zip.write_all(&data)?;
        }
    }

    zip.finish()?;
    tracing::info!(dest = %dest.display(), "assembled package");
    Ok(())
}

fn write_digest_sidecar(artifact: &Path, sha256: &str) -> Result<()> {
    let file_name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let sidecar = artifact.with_file_name(format!("{}.sha256", file_name));
    fs::write(&sidecar, format!("{}  {}\n", sha256, file_name))?;
    Ok(())
}
