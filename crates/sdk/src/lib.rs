//! Android SDK and external tool discovery
//!
//! The pipeline shells out to SDK binaries (d8, aapt2, adb) and a couple
//! of standalone tools (d2j-dex2jar, jadx). This crate finds them and
//! nothing else; invoking them is the build/device crates' job.

use plugkit_core::config::SdkSection;
use plugkit_core::error::{Error, ErrorCode, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Tool the host APK is converted to a compile-time jar with
pub const DEX2JAR: &str = "d2j-dex2jar";

/// Decompiler used for host source generation
pub const JADX: &str = "jadx";

/// A located Android SDK together with the configured pins
#[derive(Debug, Clone)]
pub struct AndroidSdk {
    root: PathBuf,
    build_tools_pin: Option<String>,
    platform_pin: Option<String>,
}

impl AndroidSdk {
    /// Locate the SDK: explicit `[sdk].dir`, then `ANDROID_HOME`,
    /// `ANDROID_SDK_ROOT`, then the platform-default install path.
    pub fn locate(overrides: &SdkSection) -> Result<Self> {
        let root = overrides
            .dir
            .clone()
            .or_else(|| env::var_os("ANDROID_HOME").map(PathBuf::from))
            .or_else(|| env::var_os("ANDROID_SDK_ROOT").map(PathBuf::from))
            .or_else(default_sdk_path)
            .filter(|p| p.is_dir())
            .ok_or_else(|| {
                Error::new(ErrorCode::SdkNotFound, "Android SDK not found")
                    .with_suggestion("Install the SDK and set ANDROID_HOME, or set [sdk].dir in plugkit.toml")
            })?;

        tracing::debug!(root = %root.display(), "located Android SDK");

        Ok(Self {
            root,
            build_tools_pin: overrides.build_tools.clone(),
            platform_pin: overrides.platform.clone(),
        })
    }

    /// SDK root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The pinned build-tools directory, or the newest installed
    pub fn build_tools_dir(&self) -> Result<PathBuf> {
        let base = self.root.join("build-tools");

        if let Some(pin) = &self.build_tools_pin {
            let dir = base.join(pin);
            if !dir.is_dir() {
                return Err(Error::new(
                    ErrorCode::BuildToolsNotFound,
                    format!("build-tools {} is not installed", pin),
                )
                .with_suggestion(format!("Install it with: sdkmanager \"build-tools;{}\"", pin)));
            }
            return Ok(dir);
        }

        newest_subdir(&base, |name| parse_version(name)).ok_or_else(|| {
            Error::new(ErrorCode::BuildToolsNotFound, "No build-tools installed")
                .with_suggestion("Install one with: sdkmanager \"build-tools;34.0.0\"")
        })
    }

    /// `aapt2` from build-tools
    pub fn aapt2(&self) -> Result<PathBuf> {
        self.build_tool(exe_name("aapt2"))
    }

    /// `d8` from build-tools
    pub fn d8(&self) -> Result<PathBuf> {
        self.build_tool(script_name("d8"))
    }

    /// `zipalign` from build-tools
    pub fn zipalign(&self) -> Result<PathBuf> {
        self.build_tool(exe_name("zipalign"))
    }

    fn build_tool(&self, name: String) -> Result<PathBuf> {
        let path = self.build_tools_dir()?.join(&name);
        if !path.is_file() {
            return Err(Error::new(
                ErrorCode::ToolNotFound,
                format!("{} missing from build-tools", name),
            )
            .with_suggestion("Reinstall the build-tools package"));
        }
        Ok(path)
    }

    /// `android.jar` of the pinned platform, or the newest installed
    pub fn platform_jar(&self) -> Result<PathBuf> {
        let base = self.root.join("platforms");

        let platform = if let Some(pin) = &self.platform_pin {
            let dir = base.join(pin);
            if !dir.is_dir() {
                return Err(Error::new(
                    ErrorCode::PlatformNotFound,
                    format!("Platform {} is not installed", pin),
                )
                .with_suggestion(format!("Install it with: sdkmanager \"platforms;{}\"", pin)));
            }
            dir
        } else {
            newest_subdir(&base, |name| {
                name.strip_prefix("android-")
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(|v| vec![v])
            })
            .ok_or_else(|| {
                Error::new(ErrorCode::PlatformNotFound, "No Android platform installed")
                    .with_suggestion("Install one with: sdkmanager \"platforms;android-34\"")
            })?
        };

        let jar = platform.join("android.jar");
        if !jar.is_file() {
            return Err(Error::new(
                ErrorCode::PlatformNotFound,
                format!("android.jar missing from {}", platform.display()),
            ));
        }
        Ok(jar)
    }

    /// `adb`: the SDK copy under platform-tools, falling back to PATH
    pub fn adb(&self) -> Result<PathBuf> {
        let sdk_adb = self.root.join("platform-tools").join(exe_name("adb"));
        if sdk_adb.is_file() {
            return Ok(sdk_adb);
        }
        find_tool("adb")
    }
}

/// Locate a standalone tool on PATH
pub fn find_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool_not_found(name))
}

/// Whether a standalone tool is available on PATH
pub fn has_tool(name: &str) -> bool {
    which::which(name).is_ok()
}

fn default_sdk_path() -> Option<PathBuf> {
    let home = env::var_os("HOME").map(PathBuf::from)?;
    if cfg!(target_os = "macos") {
        Some(home.join("Library/Android/sdk"))
    } else {
        Some(home.join("Android/Sdk"))
    }
}

fn exe_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

/// Build-tools scripts (d8, apksigner) use .bat on Windows
fn script_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.bat", name)
    } else {
        name.to_string()
    }
}

/// Pick the subdirectory with the highest version per the given key
/// function; directories the key rejects are skipped.
fn newest_subdir(base: &Path, key: impl Fn(&str) -> Option<Vec<u64>>) -> Option<PathBuf> {
    let entries = std::fs::read_dir(base).ok()?;

    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            key(&name).map(|version| (version, e.path()))
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, path)| path)
}

/// Parse "34.0.0"-style version names into comparable components
fn parse_version(name: &str) -> Option<Vec<u64>> {
    let parts: Vec<u64> = name
        .split('.')
        .map(|p| p.parse::<u64>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    if parts.is_empty() {
        None
    } else {
        Some(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fake_sdk() -> (TempDir, AndroidSdk) {
        let temp = TempDir::new().unwrap();
        let overrides = SdkSection {
            dir: Some(temp.path().to_path_buf()),
            ..SdkSection::default()
        };
        fs::create_dir_all(temp.path().join("build-tools")).unwrap();
        let sdk = AndroidSdk::locate(&overrides).unwrap();
        (temp, sdk)
    }

    #[test]
    fn test_locate_missing_sdk() {
        let overrides = SdkSection {
            dir: Some(PathBuf::from("/nonexistent/sdk/path")),
            ..SdkSection::default()
        };
        let err = AndroidSdk::locate(&overrides).unwrap_err();
        assert_eq!(err.code, ErrorCode::SdkNotFound);
    }

    #[test]
    fn test_newest_build_tools_wins_numerically() {
        let (temp, sdk) = fake_sdk();
        for v in ["9.0.0", "30.0.3", "34.0.0"] {
            fs::create_dir_all(temp.path().join("build-tools").join(v)).unwrap();
        }

        let dir = sdk.build_tools_dir().unwrap();
        assert!(dir.ends_with("34.0.0"));
    }

    #[test]
    fn test_pinned_build_tools() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("build-tools/30.0.3")).unwrap();
        let overrides = SdkSection {
            dir: Some(temp.path().to_path_buf()),
            build_tools: Some("30.0.3".to_string()),
            ..SdkSection::default()
        };

        let sdk = AndroidSdk::locate(&overrides).unwrap();
        assert!(sdk.build_tools_dir().unwrap().ends_with("30.0.3"));
    }

    #[test]
    fn test_pinned_build_tools_missing() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("build-tools")).unwrap();
        let overrides = SdkSection {
            dir: Some(temp.path().to_path_buf()),
            build_tools: Some("35.0.0".to_string()),
            ..SdkSection::default()
        };

        let sdk = AndroidSdk::locate(&overrides).unwrap();
        let err = sdk.build_tools_dir().unwrap_err();
        assert_eq!(err.code, ErrorCode::BuildToolsNotFound);
    }

    #[test]
    fn test_platform_jar_newest() {
        let (temp, sdk) = fake_sdk();
        for p in ["android-30", "android-34"] {
            let dir = temp.path().join("platforms").join(p);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("android.jar"), b"jar").unwrap();
        }

        let jar = sdk.platform_jar().unwrap();
        assert!(jar.ends_with("android-34/android.jar"));
    }

    #[test]
    fn test_platform_jar_missing_file() {
        let (temp, sdk) = fake_sdk();
        fs::create_dir_all(temp.path().join("platforms/android-34")).unwrap();

        let err = sdk.platform_jar().unwrap_err();
        assert_eq!(err.code, ErrorCode::PlatformNotFound);
    }

    #[test]
    fn test_adb_from_platform_tools() {
        let (temp, sdk) = fake_sdk();
        let adb = temp.path().join("platform-tools").join(exe_name("adb"));
        fs::create_dir_all(adb.parent().unwrap()).unwrap();
        fs::write(&adb, b"").unwrap();

        assert_eq!(sdk.adb().unwrap(), adb);
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("34.0.0"), Some(vec![34, 0, 0]));
        assert_eq!(parse_version("30.0.3"), Some(vec![30, 0, 3]));
        assert_eq!(parse_version("debug"), None);
    }
}
