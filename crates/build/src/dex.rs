//! Dex compilation
//!
//! Collects the `.class` files the upstream compile step produced,
//! hands them to the external `d8` backend, and scans them for the
//! entry-point marker annotation.

use crate::classfile;
use plugkit_core::config::Config;
use plugkit_core::error::{Error, ErrorCode, Result};
use plugkit_core::process::run_command_checked;
use plugkit_sdk::AndroidSdk;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Descriptor of the annotation marking a plugin's entry-point class
pub const ENTRY_POINT_DESCRIPTOR: &str = "Lio/plugkit/annotations/PluginEntry;";

/// Intermediate file the found entry-point class name is persisted to
pub const ENTRY_POINT_FILE: &str = "plugin_class";

/// Result of the dex task
#[derive(Debug, Clone)]
pub struct DexOutput {
    /// The produced `classes.dex`
    pub dex_file: PathBuf,
    /// Binary name of the annotated entry-point class, when one exists
    pub entry_point: Option<String>,
}

/// Compile the project's classes to `classes.dex` and locate the
/// entry-point class.
pub fn compile_dex(config: &Config, sdk: &AndroidSdk) -> Result<DexOutput> {
    let classes_dir = config.classes_dir();
    let classes = collect_class_files(&classes_dir);

    if classes.is_empty() {
        return Err(Error::new(
            ErrorCode::NoClassFiles,
            format!("No .class files under {}", classes_dir.display()),
        )
        .with_suggestion("Compile your sources first; [build].classes_dir points at their output"));
    }

    let intermediates = config.intermediates_dir();
    fs::create_dir_all(&intermediates)?;

    let d8 = sdk.d8()?;
    let platform_jar = sdk.platform_jar()?;

    let mut args: Vec<OsString> = vec![
        "--debug".into(),
        "--min-api".into(),
        config.schema.sdk.min_api.to_string().into(),
        "--lib".into(),
        platform_jar.into_os_string(),
        "--output".into(),
        intermediates.clone().into_os_string(),
    ];
    args.extend(classes.iter().map(|c| c.clone().into_os_string()));

    tracing::debug!(classes = classes.len(), "running d8");
    run_command_checked(&d8, &args)?;

    let dex_file = intermediates.join("classes.dex");
    if !dex_file.is_file() {
        return Err(Error::build(format!(
            "d8 finished without producing {}",
            dex_file.display()
        )));
    }

    let entry_point = find_entry_point(&classes)?;
    if let Some(name) = &entry_point {
        fs::write(intermediates.join(ENTRY_POINT_FILE), name)?;
        tracing::info!(entry_point = %name, "found entry-point class");
    }

    Ok(DexOutput {
        dex_file,
        entry_point,
    })
}

/// All `.class` files under a directory, in stable order
pub fn collect_class_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "class"))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Scan class files for the entry-point marker. Zero matches is fine
/// (packaging decides whether that is an error); two or more is not.
pub fn find_entry_point(classes: &[PathBuf]) -> Result<Option<String>> {
    let mut found: Vec<String> = Vec::new();

    for path in classes {
        let bytes = fs::read(path)?;
        let info = classfile::parse_class(&bytes)
            .map_err(|e| e.with_context(format!("While scanning {}", path.display())))?;

        if info.has_annotation_descriptor(ENTRY_POINT_DESCRIPTOR) {
            found.push(info.name);
        }
    }

    match found.len() {
        0 => Ok(None),
        1 => Ok(Some(found.remove(0))),
        _ => Err(Error::new(
            ErrorCode::EntryPointConflict,
            format!(
                "Only one entry-point class per project is supported, found {}: {}",
                found.len(),
                found.join(", ")
            ),
        )),
    }
}
