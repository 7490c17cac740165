//! Idempotent HTTP downloads
//!
//! Files stream to a `.part` sibling and are renamed into place only when
//! complete, so the destination path never holds a truncated file.
//! Callers check for the destination before calling; a finished download
//! is never repeated.

use crate::error::{Error, Result};
use crate::retry::{retry, RetryConfig};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

/// Progress callback: (bytes downloaded so far, total size when known)
pub trait Progress: FnMut(u64, Option<u64>) {}
impl<F: FnMut(u64, Option<u64>)> Progress for F {}

/// Download `url` to `dest`, reporting progress, retrying transient
/// failures.
pub fn download(url: &str, dest: &Path, mut progress: impl Progress) -> Result<()> {
    download_with_config(url, dest, &RetryConfig::default(), &mut progress)
}

/// Download with an explicit retry policy.
pub fn download_with_config(
    url: &str,
    dest: &Path,
    retry_config: &RetryConfig,
    progress: &mut impl Progress,
) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    retry(retry_config, || fetch_once(url, dest, progress))
}

fn fetch_once(url: &str, dest: &Path, progress: &mut impl Progress) -> Result<()> {
    let part = part_path(dest);

    let result = stream_to(url, &part, progress);
    match result {
        Ok(()) => {
            fs::rename(&part, dest)?;
            Ok(())
        }
        Err(err) => {
            let _ = fs::remove_file(&part);
            Err(err)
        }
    }
}

fn stream_to(url: &str, part: &Path, progress: &mut impl Progress) -> Result<()> {
    let client = reqwest::blocking::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .timeout(None)
        .build()?;

    let mut response = client
        .get(url)
        .send()?
        .error_for_status()
        .map_err(|e| Error::download(format!("GET {} failed: {}", url, e)).with_source(e))?;

    let total = response.content_length();
    let mut file = File::create(part)?;
    let mut downloaded: u64 = 0;
    let mut buf = [0u8; 64 * 1024];

    loop {
        let read = response.read(&mut buf)?;
        if read == 0 {
            break;
        }
        file.write_all(&buf[..read])?;
        downloaded += read as u64;
        progress(downloaded, total);
    }

    file.flush()?;
    Ok(())
}

fn part_path(dest: &Path) -> std::path::PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "download".to_string());
    name.push_str(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("/tmp/host-1.apk")),
            PathBuf::from("/tmp/host-1.apk.part")
        );
    }

    #[test]
    fn test_failed_download_leaves_no_partial_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let dest = temp.path().join("host.apk");

        // Nothing listens on this port; the request itself fails.
        let result = download_with_config(
            "http://127.0.0.1:1/host.apk",
            &dest,
            &RetryConfig::no_retry(),
            &mut |_, _| {},
        );

        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }
}
