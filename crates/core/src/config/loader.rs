//! Project manifest loading

use super::schema::ConfigSchema;
use crate::error::{Error, ErrorCode, Result};
use std::path::{Path, PathBuf};

/// Manifest file name looked up in the project root
pub const MANIFEST_FILE: &str = "plugkit.toml";

/// A loaded project manifest together with the directory it governs
#[derive(Debug, Clone)]
pub struct Config {
    pub schema: ConfigSchema,
    /// Path the manifest was loaded from
    pub path: PathBuf,
    /// Project root; build paths resolve against this
    pub root: PathBuf,
}

impl Config {
    /// Load the manifest from an explicit path, or from `plugkit.toml` in
    /// the current directory.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(MANIFEST_FILE),
        };

        if !path.exists() {
            return Err(Error::config_not_found(&path));
        }

        Self::load_file(&path)
    }

    /// Load the manifest that governs `dir`, if there is one.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        Self::load_file(&path).map(Some)
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut schema: ConfigSchema = toml::from_str(&content).map_err(|e| {
            Error::new(
                ErrorCode::ConfigParseError,
                format!("Failed to parse {}: {}", path.display(), e),
            )
        })?;

        schema.apply_link_defaults();
        validate(&schema)?;

        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            schema,
            path: path.to_path_buf(),
            root,
        })
    }

    // Build paths, resolved against the project root

    pub fn classes_dir(&self) -> PathBuf {
        self.root.join(&self.schema.build.classes_dir)
    }

    pub fn res_dir(&self) -> PathBuf {
        self.root.join(&self.schema.build.res_dir)
    }

    pub fn android_manifest(&self) -> PathBuf {
        self.root.join(&self.schema.build.manifest)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.schema.build.output_dir)
    }

    pub fn intermediates_dir(&self) -> PathBuf {
        self.output_dir().join("intermediates")
    }
}

fn validate(schema: &ConfigSchema) -> Result<()> {
    if schema.plugin.name.trim().is_empty() {
        return Err(Error::new(
            ErrorCode::ConfigValidationError,
            "plugin.name must not be empty",
        ));
    }

    if schema.plugin.name.contains(['/', '\\']) {
        return Err(Error::new(
            ErrorCode::ConfigValidationError,
            format!("plugin.name may not contain path separators: {}", schema.plugin.name),
        ));
    }

    let host = &schema.host.version;
    if host != "snapshot" && host.parse::<u32>().is_err() {
        return Err(Error::new(
            ErrorCode::ConfigValidationError,
            format!("host.version must be a build number or \"snapshot\", got {:?}", host),
        )
        .with_suggestion("Use e.g. version = \"212103\" or version = \"snapshot\""));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_manifest(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join(MANIFEST_FILE);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_missing_manifest() {
        let temp = TempDir::new().unwrap();
        let err = Config::load(Some(&temp.path().join(MANIFEST_FILE))).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigNotFound);
    }

    #[test]
    fn test_load_sets_root_to_manifest_parent() {
        let temp = TempDir::new().unwrap();
        let path = write_manifest(
            temp.path(),
            "[plugin]\nname = \"P\"\nversion = \"1.0.0\"\n",
        );

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.root, temp.path());
        assert_eq!(config.classes_dir(), temp.path().join("build/classes"));
        assert_eq!(
            config.intermediates_dir(),
            temp.path().join("build/intermediates")
        );
    }

    #[test]
    fn test_load_from_dir_without_manifest() {
        let temp = TempDir::new().unwrap();
        assert!(Config::load_from_dir(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_rejects_empty_name() {
        let temp = TempDir::new().unwrap();
        let path = write_manifest(temp.path(), "[plugin]\nname = \"  \"\n");
        let err = Config::load(Some(&path)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigValidationError);
    }

    #[test]
    fn test_rejects_bad_host_version() {
        let temp = TempDir::new().unwrap();
        let path = write_manifest(
            temp.path(),
            "[plugin]\nname = \"P\"\n[host]\nversion = \"latest\"\n",
        );
        let err = Config::load(Some(&path)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigValidationError);
    }

    #[test]
    fn test_numeric_host_version_accepted() {
        let temp = TempDir::new().unwrap();
        let path = write_manifest(
            temp.path(),
            "[plugin]\nname = \"P\"\n[host]\nversion = \"212103\"\n",
        );
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.schema.host.version, "212103");
    }
}
