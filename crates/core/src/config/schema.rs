//! Project manifest schema (`plugkit.toml`)
//!
//! One file describes a plugin project: identity, links, the host
//! dependency, update-feed metadata, and overrides for the SDK, device
//! paths, and build layout.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What kind of artifact a project produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    /// A zip package with a manifest, dex, and resources
    #[default]
    Plugin,
    /// The framework core package (dex + resources, no manifest)
    Core,
    /// A raw dex consumed by the manager app
    Injector,
}

/// A plugin author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    /// Account id shown alongside the name; 0 means unset
    #[serde(default)]
    pub id: u64,
}

/// `[plugin]`: project identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginSection {
    /// Plugin name, also the artifact base name
    pub name: String,

    /// Plugin version; empty until set, required for packaging
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub description: Option<String>,

    /// plugin | core | injector
    #[serde(rename = "type", default)]
    pub project_type: ProjectType,

    #[serde(default)]
    pub authors: Vec<Author>,
}

/// `[links]`: where the project lives
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LinksSection {
    #[serde(default)]
    pub github: Option<String>,

    #[serde(default)]
    pub source: Option<String>,
}

impl LinksSection {
    /// The source link, falling back to the github link
    pub fn effective_source(&self) -> Option<&str> {
        self.source.as_deref().or(self.github.as_deref())
    }
}

/// `[host]`: the host application dependency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSection {
    /// Numeric build version, or the alias `"snapshot"`
    #[serde(default = "default_host_version")]
    pub version: String,

    /// Oldest host build the plugin supports
    #[serde(default)]
    pub min_version: Option<u32>,
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            version: default_host_version(),
            min_version: None,
        }
    }
}

fn default_host_version() -> String {
    "snapshot".to_string()
}

/// `[update]`: update-feed metadata
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateSection {
    /// Where installed copies look for the updater feed
    #[serde(default)]
    pub url: Option<String>,

    /// Direct download URL of the built package
    #[serde(default)]
    pub build_url: Option<String>,

    #[serde(default)]
    pub changelog: Option<String>,

    /// Image or video shown above the changelog
    #[serde(default)]
    pub changelog_media: Option<String>,

    /// Leave this project out of the generated feed
    #[serde(default)]
    pub exclude: bool,
}

/// `[registry]`: where host builds are published
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySection {
    /// JSON feed carrying the current snapshot `versionCode`
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    /// APK download template; `{version}` is substituted
    #[serde(default = "default_apk_url")]
    pub apk_url: String,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            apk_url: default_apk_url(),
        }
    }
}

impl RegistrySection {
    /// Expand the APK URL template for a concrete version
    pub fn apk_url_for(&self, version: u32) -> String {
        self.apk_url.replace("{version}", &version.to_string())
    }
}

fn default_feed_url() -> String {
    "https://builds.plugkit.dev/host/latest.json".to_string()
}

fn default_apk_url() -> String {
    "https://builds.plugkit.dev/host/{version}.apk".to_string()
}

/// `[sdk]`: Android SDK overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkSection {
    /// SDK root; falls back to ANDROID_HOME / ANDROID_SDK_ROOT
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Pinned build-tools version, e.g. "34.0.0"; newest installed otherwise
    #[serde(default)]
    pub build_tools: Option<String>,

    /// Pinned platform, e.g. "android-34"; newest installed otherwise
    #[serde(default)]
    pub platform: Option<String>,

    /// Minimum API level passed to the dex compiler
    #[serde(default = "default_min_api")]
    pub min_api: u32,
}

impl Default for SdkSection {
    fn default() -> Self {
        Self {
            dir: None,
            build_tools: None,
            platform: None,
            min_api: default_min_api(),
        }
    }
}

fn default_min_api() -> u32 {
    24
}

/// `[device]`: on-device paths and launch components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSection {
    /// Directory plugin packages are pushed to
    #[serde(default = "default_plugin_dir")]
    pub plugin_dir: String,

    /// Full remote path of the core package
    #[serde(default = "default_core_path")]
    pub core_path: String,

    /// Directory injector dex files are pushed to
    #[serde(default = "default_injector_dir")]
    pub injector_dir: String,

    /// Activity restarted after plugin/core deploys
    #[serde(default = "default_launch_component")]
    pub launch_component: String,

    /// Activity started after injector deploys
    #[serde(default = "default_manager_component")]
    pub manager_component: String,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            plugin_dir: default_plugin_dir(),
            core_path: default_core_path(),
            injector_dir: default_injector_dir(),
            launch_component: default_launch_component(),
            manager_component: default_manager_component(),
        }
    }
}

fn default_plugin_dir() -> String {
    "/storage/emulated/0/PlugKit/plugins".to_string()
}

fn default_core_path() -> String {
    "/storage/emulated/0/PlugKit/PlugKit.zip".to_string()
}

fn default_injector_dir() -> String {
    "/storage/emulated/0/Android/data/io.plugkit.manager/cache/injector".to_string()
}

fn default_launch_component() -> String {
    "io.plugkit.host/io.plugkit.host.MainActivity".to_string()
}

fn default_manager_component() -> String {
    "io.plugkit.manager/io.plugkit.manager.MainActivity".to_string()
}

/// `[build]`: project layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSection {
    /// Compiled `.class` files produced by the upstream compile step
    #[serde(default = "default_classes_dir")]
    pub classes_dir: PathBuf,

    /// Android resource tree
    #[serde(default = "default_res_dir")]
    pub res_dir: PathBuf,

    /// AndroidManifest.xml used by the resource linker
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,

    /// Where artifacts and intermediates are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            classes_dir: default_classes_dir(),
            res_dir: default_res_dir(),
            manifest: default_manifest(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_classes_dir() -> PathBuf {
    PathBuf::from("build/classes")
}

fn default_res_dir() -> PathBuf {
    PathBuf::from("src/main/res")
}

fn default_manifest() -> PathBuf {
    PathBuf::from("src/main/AndroidManifest.xml")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("build")
}

/// Root manifest schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub plugin: PluginSection,

    #[serde(default)]
    pub links: LinksSection,

    #[serde(default)]
    pub host: HostSection,

    #[serde(default)]
    pub update: UpdateSection,

    #[serde(default)]
    pub registry: RegistrySection,

    #[serde(default)]
    pub sdk: SdkSection,

    #[serde(default)]
    pub device: DeviceSection,

    #[serde(default)]
    pub build: BuildSection,
}

impl ConfigSchema {
    /// Fill update URLs from the github link when they were not set
    /// explicitly.
    pub fn apply_link_defaults(&mut self) {
        let Some(github) = self.links.github.clone() else {
            return;
        };
        let github = github.trim_end_matches('/');

        if self.update.url.is_none() {
            self.update.url = Some(format!(
                "{}/releases/latest/download/updater.json",
                github
            ));
        }
        if self.update.build_url.is_none() {
            self.update.build_url = Some(format!(
                "{}/releases/download/{}/{}.zip",
                github, self.plugin.version, self.plugin.name
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_manifest_parses() {
        let schema: ConfigSchema = toml::from_str(
            r#"
            [plugin]
            name = "HideTyping"
            version = "1.0.0"
            "#,
        )
        .unwrap();

        assert_eq!(schema.plugin.name, "HideTyping");
        assert_eq!(schema.plugin.project_type, ProjectType::Plugin);
        assert_eq!(schema.host.version, "snapshot");
        assert_eq!(schema.sdk.min_api, 24);
        assert!(!schema.update.exclude);
    }

    #[test]
    fn test_project_type_parses_lowercase() {
        let schema: ConfigSchema = toml::from_str(
            r#"
            [plugin]
            name = "Injector"
            type = "injector"
            "#,
        )
        .unwrap();

        assert_eq!(schema.plugin.project_type, ProjectType::Injector);
    }

    #[test]
    fn test_authors_default_id() {
        let schema: ConfigSchema = toml::from_str(
            r#"
            [plugin]
            name = "P"
            authors = [{ name = "ada" }, { name = "lin", id = 42 }]
            "#,
        )
        .unwrap();

        assert_eq!(schema.plugin.authors[0].id, 0);
        assert_eq!(schema.plugin.authors[1].id, 42);
    }

    #[test]
    fn test_link_defaults_derived_from_github() {
        let mut schema: ConfigSchema = toml::from_str(
            r#"
            [plugin]
            name = "HideTyping"
            version = "1.2.0"

            [links]
            github = "https://github.com/ada/HideTyping"
            "#,
        )
        .unwrap();
        schema.apply_link_defaults();

        assert_eq!(
            schema.update.url.as_deref(),
            Some("https://github.com/ada/HideTyping/releases/latest/download/updater.json")
        );
        assert_eq!(
            schema.update.build_url.as_deref(),
            Some("https://github.com/ada/HideTyping/releases/download/1.2.0/HideTyping.zip")
        );
    }

    #[test]
    fn test_link_defaults_keep_explicit_urls() {
        let mut schema: ConfigSchema = toml::from_str(
            r#"
            [plugin]
            name = "P"
            version = "1.0.0"

            [links]
            github = "https://github.com/ada/P"

            [update]
            url = "https://example.com/feed.json"
            "#,
        )
        .unwrap();
        schema.apply_link_defaults();

        assert_eq!(schema.update.url.as_deref(), Some("https://example.com/feed.json"));
        // build_url still derived
        assert!(schema.update.build_url.as_deref().unwrap().contains("releases/download"));
    }

    #[test]
    fn test_effective_source_falls_back_to_github() {
        let links = LinksSection {
            github: Some("https://github.com/ada/P".into()),
            source: None,
        };
        assert_eq!(links.effective_source(), Some("https://github.com/ada/P"));
    }

    #[test]
    fn test_apk_url_template() {
        let registry = RegistrySection::default();
        assert_eq!(
            registry.apk_url_for(212103),
            "https://builds.plugkit.dev/host/212103.apk"
        );
    }
}
