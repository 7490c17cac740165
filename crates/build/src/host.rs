//! The host application dependency
//!
//! Plugins compile against the host app's code. This module resolves
//! the configured version token to a concrete build number, keeps a
//! per-version APK in the artifact cache, and converts it to a jar the
//! upstream compile step can put on its classpath. The dex-to-bytecode
//! conversion itself is the external d2j-dex2jar tool's work.

use plugkit_core::cache::ArtifactCache;
use plugkit_core::config::RegistrySection;
use plugkit_core::download::{download, Progress};
use plugkit_core::error::{Error, Result};
use plugkit_core::process::run_command_checked;
use std::ffi::OsString;
use std::sync::OnceLock;
use std::time::Duration;

/// Version token that resolves through the registry feed
pub const SNAPSHOT: &str = "snapshot";

/// Resolved snapshot build, fetched at most once per process
static SNAPSHOT_VERSION: OnceLock<u32> = OnceLock::new();

/// Cached host artifacts for one build version
#[derive(Debug, Clone)]
pub struct HostArtifacts {
    pub version: u32,
    pub apk: std::path::PathBuf,
    pub jar: std::path::PathBuf,
}

/// Resolve a `[host].version` token to a concrete build number.
pub fn resolve_version(spec: &str, registry: &RegistrySection) -> Result<u32> {
    if spec != SNAPSHOT {
        return spec.parse::<u32>().map_err(|_| {
            Error::version_resolve(format!("Not a host build number: {:?}", spec))
        });
    }

    if let Some(version) = SNAPSHOT_VERSION.get() {
        return Ok(*version);
    }

    tracing::info!(feed = %registry.feed_url, "resolving snapshot host version");
    let body = fetch_feed(&registry.feed_url)?;
    let version = parse_feed(&body)?;
    tracing::info!(version, "resolved snapshot host version");

    Ok(*SNAPSHOT_VERSION.get_or_init(|| version))
}

/// Make sure the APK and jar for a version are cached, downloading and
/// converting as needed. Both steps are idempotent: present files are
/// never re-fetched or re-converted.
pub fn ensure_host(
    version: u32,
    cache: &ArtifactCache,
    registry: &RegistrySection,
    progress: impl Progress,
) -> Result<HostArtifacts> {
    let apk = cache.host_apk(version);
    let jar = cache.host_jar(version);

    if !apk.is_file() {
        let url = registry.apk_url_for(version);
        tracing::info!(%url, "downloading host apk");
        download(&url, &apk, progress)?;
    }

    if !jar.is_file() {
        convert_to_jar(&apk, &jar)?;
    }

    Ok(HostArtifacts { version, apk, jar })
}

fn convert_to_jar(apk: &std::path::Path, jar: &std::path::Path) -> Result<()> {
    let dex2jar = plugkit_sdk::find_tool(plugkit_sdk::DEX2JAR)?;

    tracing::info!(apk = %apk.display(), "converting host apk to jar");
    let args: Vec<OsString> = vec![
        "-f".into(),
        "-o".into(),
        jar.as_os_str().to_os_string(),
        apk.as_os_str().to_os_string(),
    ];
    run_command_checked(&dex2jar, &args)?;

    if !jar.is_file() {
        return Err(Error::build(format!(
            "{} finished without producing {}",
            plugkit_sdk::DEX2JAR,
            jar.display()
        )));
    }
    Ok(())
}

fn fetch_feed(url: &str) -> Result<String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let body = client
        .get(url)
        .send()?
        .error_for_status()
        .map_err(|e| {
            Error::version_resolve(format!("Feed request failed: {}", e)).with_source(e)
        })?
        .text()?;
    Ok(body)
}

/// Extract the build number from the registry feed.
pub fn parse_feed(body: &str) -> Result<u32> {
    #[derive(serde::Deserialize)]
    struct Feed {
        #[serde(rename = "versionCode")]
        version_code: String,
    }

    let feed: Feed = serde_json::from_str(body)
        .map_err(|e| Error::version_resolve(format!("Malformed registry feed: {}", e)))?;

    feed.version_code.parse::<u32>().map_err(|_| {
        Error::version_resolve(format!(
            "Feed versionCode is not a build number: {:?}",
            feed.version_code
        ))
    })
}
