//! Host source generation
//!
//! Decompiles the cached host APK with the external jadx decompiler so
//! plugin authors can read the code they are patching. Output lands in
//! the artifact cache next to the APK and is reused on later runs.

use crate::host::HostArtifacts;
use plugkit_core::cache::ArtifactCache;
use plugkit_core::error::Result;
use plugkit_core::process::run_command_checked;
use std::ffi::OsString;
use std::path::PathBuf;

/// Decompile the host APK into `host-{version}-src/` in the cache.
pub fn generate_sources(host: &HostArtifacts, cache: &ArtifactCache) -> Result<PathBuf> {
    let out_dir = cache.host_sources(host.version);

    if out_dir.is_dir() && out_dir.read_dir()?.next().is_some() {
        tracing::debug!(out = %out_dir.display(), "sources already generated");
        return Ok(out_dir);
    }

    let jadx = plugkit_sdk::find_tool(plugkit_sdk::JADX)?;

    let args: Vec<OsString> = vec![
        "--no-res".into(),
        "--show-bad-code".into(),
        "--no-debug-info".into(),
        "--no-inline-anonymous".into(),
        "--no-inline-methods".into(),
        "--no-replace-consts".into(),
        "--respect-bytecode-access-modifiers".into(),
        "-d".into(),
        out_dir.as_os_str().to_os_string(),
        host.apk.as_os_str().to_os_string(),
    ];

    tracing::info!(apk = %host.apk.display(), "decompiling host apk");
    run_command_checked(&jadx, &args)?;

    Ok(out_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_existing_sources_are_reused() {
        let temp = TempDir::new().unwrap();
        let cache = ArtifactCache::at(temp.path()).unwrap();

        let out = cache.host_sources(212103);
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("Host.java"), "class Host {}").unwrap();

        let host = HostArtifacts {
            version: 212103,
            apk: cache.host_apk(212103),
            jar: cache.host_jar(212103),
        };

        // jadx is not installed in the test environment; reuse must not
        // reach for it.
        let result = generate_sources(&host, &cache).unwrap();
        assert_eq!(result, out);
    }
}
