//! Resource compilation
//!
//! Two aapt2 invocations: `compile` flattens the res tree into an
//! intermediate zip, `link` joins it with the Android platform and the
//! project manifest into `res.apk`. Projects without resources skip the
//! step entirely.

use plugkit_core::config::Config;
use plugkit_core::error::{Error, ErrorCode, Result};
use plugkit_core::process::run_command_checked;
use plugkit_sdk::AndroidSdk;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Compile and link the project's resources into
/// `intermediates/res.apk`. Returns `None` when the project has no
/// resources.
pub fn compile_resources(config: &Config, sdk: &AndroidSdk) -> Result<Option<PathBuf>> {
    let res_dir = config.res_dir();
    if !dir_has_files(&res_dir) {
        tracing::debug!(res_dir = %res_dir.display(), "no resources, skipping aapt2");
        return Ok(None);
    }

    let manifest = config.android_manifest();
    if !manifest.is_file() {
        return Err(Error::new(
            ErrorCode::ConfigValidationError,
            format!(
                "Resource compilation needs an AndroidManifest.xml at {}",
                manifest.display()
            ),
        )
        .with_suggestion("Add the manifest or point [build].manifest at it"));
    }

    let intermediates = config.intermediates_dir();
    fs::create_dir_all(&intermediates)?;

    let aapt2 = sdk.aapt2()?;
    let platform_jar = sdk.platform_jar()?;
    let output = intermediates.join("res.apk");

    let compiled = tempfile::Builder::new()
        .prefix("res")
        .suffix(".zip")
        .tempfile()?;

    let compile_args: Vec<OsString> = vec![
        "compile".into(),
        "--dir".into(),
        res_dir.into_os_string(),
        "-o".into(),
        compiled.path().as_os_str().to_os_string(),
    ];
    run_command_checked(&aapt2, &compile_args)?;

    let link_args: Vec<OsString> = vec![
        "link".into(),
        "-I".into(),
        platform_jar.into_os_string(),
        "-R".into(),
        compiled.path().as_os_str().to_os_string(),
        "--manifest".into(),
        manifest.into_os_string(),
        "-o".into(),
        output.clone().into_os_string(),
        "--auto-add-overlay".into(),
    ];
    run_command_checked(&aapt2, &link_args)?;

    tracing::info!(output = %output.display(), "linked resources");
    Ok(Some(output))
}

/// Whether a directory exists and contains at least one file
fn dir_has_files(dir: &Path) -> bool {
    dir.is_dir()
        && WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .any(|e| e.file_type().is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugkit_core::config::Config;
    use tempfile::TempDir;

    fn project(temp: &TempDir, with_res: bool) -> Config {
        std::fs::write(
            temp.path().join("plugkit.toml"),
            "[plugin]\nname = \"P\"\nversion = \"1.0.0\"\n",
        )
        .unwrap();
        if with_res {
            let values = temp.path().join("src/main/res/values");
            std::fs::create_dir_all(&values).unwrap();
            std::fs::write(values.join("strings.xml"), "<resources/>").unwrap();
        }
        Config::load(Some(&temp.path().join("plugkit.toml"))).unwrap()
    }

    #[test]
    fn test_dir_has_files() {
        let temp = TempDir::new().unwrap();
        assert!(!dir_has_files(&temp.path().join("missing")));

        let nested = temp.path().join("res/values");
        std::fs::create_dir_all(&nested).unwrap();
        assert!(!dir_has_files(&temp.path().join("res")));

        std::fs::write(nested.join("strings.xml"), "<resources/>").unwrap();
        assert!(dir_has_files(&temp.path().join("res")));
    }

    #[test]
    fn test_skips_without_resources() {
        let temp = TempDir::new().unwrap();
        let config = project(&temp, false);
        // SDK lookup would fail later; the resource skip comes first and
        // needs neither the SDK nor aapt2.
        let sdk_dir = temp.path().join("sdk");
        std::fs::create_dir_all(&sdk_dir).unwrap();
        let sdk = AndroidSdk::locate(&plugkit_core::config::SdkSection {
            dir: Some(sdk_dir),
            ..Default::default()
        })
        .unwrap();

        assert!(compile_resources(&config, &sdk).unwrap().is_none());
    }

    #[test]
    fn test_missing_manifest_is_a_config_error() {
        let temp = TempDir::new().unwrap();
        let config = project(&temp, true);
        let sdk_dir = temp.path().join("sdk");
        std::fs::create_dir_all(&sdk_dir).unwrap();
        let sdk = AndroidSdk::locate(&plugkit_core::config::SdkSection {
            dir: Some(sdk_dir),
            ..Default::default()
        })
        .unwrap();

        let err = compile_resources(&config, &sdk).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigValidationError);
    }
}
