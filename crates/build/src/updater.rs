//! Update-feed generation
//!
//! Sweeps a directory of plugin projects and aggregates their version
//! and download metadata into a single `updater.json` that installed
//! copies poll.

use plugkit_core::config::Config;
use plugkit_core::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One plugin's entry in the feed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfo {
    /// Oldest host build the plugin supports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_host_version: Option<u32>,
    pub version: String,
    /// Direct download URL of the package
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changelog_media: Option<String>,
}

/// Build the feed for the project at `root` and every immediate child
/// project. Excluded projects are skipped.
pub fn collect_feed(root: &Path) -> Result<BTreeMap<String, UpdateInfo>> {
    let mut feed = BTreeMap::new();

    for dir in module_dirs(root)? {
        let Some(config) = Config::load_from_dir(&dir)? else {
            continue;
        };
        if config.schema.update.exclude {
            tracing::debug!(name = %config.schema.plugin.name, "excluded from feed");
            continue;
        }
        feed.insert(config.schema.plugin.name.clone(), entry_for(&config));
    }

    Ok(feed)
}

/// Write the feed to `output`, creating parent directories.
pub fn write_feed(root: &Path, output: &Path) -> Result<PathBuf> {
    let feed = collect_feed(root)?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, serde_json::to_string(&feed)?)?;

    tracing::info!(entries = feed.len(), output = %output.display(), "wrote update feed");
    Ok(output.to_path_buf())
}

/// The feed entry for one loaded project
pub fn entry_for(config: &Config) -> UpdateInfo {
    let schema = &config.schema;

    // An unresolved "snapshot" token has no number to advertise.
    let minimum_host_version = schema
        .host
        .min_version
        .or_else(|| schema.host.version.parse::<u32>().ok());

    UpdateInfo {
        minimum_host_version,
        version: schema.plugin.version.clone(),
        build: schema.update.build_url.clone(),
        changelog: schema.update.changelog.clone(),
        changelog_media: schema.update.changelog_media.clone(),
    }
}

/// The root itself plus its immediate subdirectories
fn module_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = vec![root.to_path_buf()];

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }

    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_module(root: &Path, dir: &str, manifest: &str) {
        let path = root.join(dir);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("plugkit.toml"), manifest).unwrap();
    }

    #[test]
    fn test_collects_child_modules() {
        let temp = TempDir::new().unwrap();
        write_module(
            temp.path(),
            "HideTyping",
            r#"
            [plugin]
            name = "HideTyping"
            version = "1.2.0"

            [host]
            version = "212103"

            [links]
            github = "https://github.com/ada/plugins"
            "#,
        );
        write_module(
            temp.path(),
            "FreeStickers",
            r#"
            [plugin]
            name = "FreeStickers"
            version = "2.0.1"

            [host]
            min_version = 211000
            "#,
        );

        let feed = collect_feed(temp.path()).unwrap();
        assert_eq!(feed.len(), 2);

        let hide = &feed["HideTyping"];
        assert_eq!(hide.version, "1.2.0");
        assert_eq!(hide.minimum_host_version, Some(212103));
        assert!(hide.build.as_deref().unwrap().contains("releases/download"));

        let stickers = &feed["FreeStickers"];
        assert_eq!(stickers.minimum_host_version, Some(211000));
        assert!(stickers.build.is_none());
    }

    #[test]
    fn test_excluded_module_skipped() {
        let temp = TempDir::new().unwrap();
        write_module(
            temp.path(),
            "Secret",
            "[plugin]\nname = \"Secret\"\nversion = \"0.1.0\"\n[update]\nexclude = true\n",
        );

        let feed = collect_feed(temp.path()).unwrap();
        assert!(feed.is_empty());
    }

    #[test]
    fn test_snapshot_without_min_version_omits_field() {
        let temp = TempDir::new().unwrap();
        write_module(
            temp.path(),
            "P",
            "[plugin]\nname = \"P\"\nversion = \"1.0.0\"\n",
        );

        let feed = collect_feed(temp.path()).unwrap();
        assert!(feed["P"].minimum_host_version.is_none());

        let json = serde_json::to_string(&feed).unwrap();
        assert!(!json.contains("minimumHostVersion"));
    }

    #[test]
    fn test_write_feed_round_trip() {
        let temp = TempDir::new().unwrap();
        write_module(
            temp.path(),
            "P",
            "[plugin]\nname = \"P\"\nversion = \"1.0.0\"\n",
        );
        let output = temp.path().join("build/updater.json");

        write_feed(temp.path(), &output).unwrap();

        let parsed: BTreeMap<String, UpdateInfo> =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(parsed["P"].version, "1.0.0");
    }
}
