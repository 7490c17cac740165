//! Host artifact cache
//!
//! Downloaded host APKs and their converted jars live in the user cache
//! directory, keyed by build version, so every project on the machine
//! shares one copy.

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Cache layout rooted in the user cache directory
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    root: PathBuf,
}

impl ArtifactCache {
    /// Cache under the platform user cache dir (`~/.cache/plugkit` on
    /// Linux).
    pub fn new() -> Result<Self> {
        let root = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("plugkit");
        Self::at(root)
    }

    /// Cache rooted at an explicit directory
    pub fn at(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("host"))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn host_dir(&self) -> PathBuf {
        self.root.join("host")
    }

    /// Cached host APK for a build version
    pub fn host_apk(&self, version: u32) -> PathBuf {
        self.host_dir().join(format!("host-{}.apk", version))
    }

    /// Converted compile-time jar for a build version
    pub fn host_jar(&self, version: u32) -> PathBuf {
        self.host_dir().join(format!("host-{}.jar", version))
    }

    /// Decompiled source tree for a build version
    pub fn host_sources(&self, version: u32) -> PathBuf {
        self.host_dir().join(format!("host-{}-src", version))
    }

    /// Remove every cached host artifact
    pub fn clear(&self) -> Result<()> {
        let host = self.host_dir();
        if host.exists() {
            fs::remove_dir_all(&host)?;
        }
        fs::create_dir_all(&host)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_are_version_keyed() {
        let temp = TempDir::new().unwrap();
        let cache = ArtifactCache::at(temp.path()).unwrap();

        assert_eq!(
            cache.host_apk(212103),
            temp.path().join("host/host-212103.apk")
        );
        assert_eq!(
            cache.host_jar(212103),
            temp.path().join("host/host-212103.jar")
        );
        assert_ne!(cache.host_apk(1), cache.host_apk(2));
    }

    #[test]
    fn test_creation_is_idempotent() {
        let temp = TempDir::new().unwrap();
        ArtifactCache::at(temp.path()).unwrap();
        ArtifactCache::at(temp.path()).unwrap();
        assert!(temp.path().join("host").is_dir());
    }

    #[test]
    fn test_clear_removes_cached_files() {
        let temp = TempDir::new().unwrap();
        let cache = ArtifactCache::at(temp.path()).unwrap();
        std::fs::write(cache.host_apk(1), b"apk").unwrap();

        cache.clear().unwrap();

        assert!(!cache.host_apk(1).exists());
        assert!(temp.path().join("host").is_dir());
    }
}
