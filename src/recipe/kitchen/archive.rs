// src/recipe/kitchen/archive.rs

//! Archive and source file utilities for the Kitchen

use crate::compression::open_decoded;
use crate::error::{Error, Result};
use crate::hash::{hash_file, Checksum};
use reqwest::blocking::Client;
use reqwest::Url;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum retry attempts for failed downloads
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

/// HTTP client wrapper with retry support
///
/// `file://` URLs are copied from the local filesystem, which lets a
/// pre-populated directory stand in for a mirror.
pub struct Downloader {
    client: Client,
    max_retries: u32,
}

impl Downloader {
    /// Create a new downloader
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::DownloadError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
        })
    }

    /// Download a URL to the specified path
    ///
    /// HTTP failures are retried; HTTP error statuses are not.
    pub fn download_file(&self, url: &str, dest_path: &Path) -> Result<()> {
        info!("Downloading {} to {}", url, dest_path.display());

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::IoError(format!("Failed to create directory {}: {e}", parent.display()))
            })?;
        }

        let parsed = Url::parse(url).map_err(|e| Error::DownloadError(format!("Invalid URL {url}: {e}")))?;
        if parsed.scheme() == "file" {
            let source = parsed
                .to_file_path()
                .map_err(|_| Error::DownloadError(format!("Invalid file URL: {url}")))?;
            fs::copy(&source, dest_path).map_err(|e| {
                Error::DownloadError(format!("Failed to copy {}: {e}", source.display()))
            })?;
            return Ok(());
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url).send() {
                Ok(mut response) => {
                    if !response.status().is_success() {
                        return Err(Error::DownloadError(format!(
                            "HTTP {} from {}",
                            response.status(),
                            url
                        )));
                    }

                    let mut file = File::create(dest_path).map_err(|e| {
                        Error::IoError(format!("Failed to create file {}: {e}", dest_path.display()))
                    })?;
                    io::copy(&mut response, &mut file).map_err(|e| {
                        Error::IoError(format!("Failed to write downloaded data: {e}"))
                    })?;

                    debug!("Downloaded {}", url);
                    return Ok(());
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(Error::DownloadError(format!(
                            "Failed to download {url} after {attempt} attempts: {e}"
                        )));
                    }
                    warn!("Download attempt {} failed: {}, retrying...", attempt, e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
            }
        }
    }
}

/// Verify a file against its expected checksum
pub fn verify_file_checksum(path: &Path, expected: &Checksum) -> Result<()> {
    let actual = hash_file(expected.algorithm, path)
        .map_err(|e| Error::IoError(format!("Failed to hash {}: {}", path.display(), e)))?;

    if &actual != expected {
        return Err(Error::ChecksumMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// Extract a tarball to a destination directory
///
/// The codec is chosen from the file name, falling back to the magic bytes.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let (codec, decoder) =
        open_decoded(archive).map_err(|e| Error::IoError(e.to_string()))?;
    debug!("Extracting {} ({})", archive.display(), codec);

    let mut tarball = tar::Archive::new(decoder);
    tarball.set_preserve_permissions(true);
    tarball.unpack(dest).map_err(|e| {
        Error::IoError(format!("Failed to extract {}: {}", archive.display(), e))
    })?;

    Ok(())
}

/// Apply a patch to the source directory
pub fn apply_patch(source_dir: &Path, patch_path: &Path, strip: u32) -> Result<()> {
    let output = Command::new("patch")
        .arg(format!("-p{}", strip))
        .arg("-i")
        .arg(patch_path)
        .current_dir(source_dir)
        .output()
        .map_err(|e| Error::IoError(format!("patch failed: {}", e)))?;

    if !output.status.success() {
        return Err(Error::BuildFailed {
            phase: "patch".to_string(),
            message: format!(
                "Failed to apply {}: {}{}",
                patch_path.display(),
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{hash_bytes, HashAlgorithm};
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn write_tarball(path: &Path) {
        let file = File::create(path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let content = b"#!/bin/sh\necho configured\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, "m4-1.4.18/configure", &content[..])
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_verify_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob");
        fs::write(&path, b"hello world").unwrap();

        let good = hash_bytes(HashAlgorithm::Sha256, b"hello world");
        assert!(verify_file_checksum(&path, &good).is_ok());

        let tampered = hash_bytes(HashAlgorithm::Sha256, b"hello world!");
        assert!(matches!(
            verify_file_checksum(&path, &tampered),
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_verify_checksum_missing_file() {
        let sum = hash_bytes(HashAlgorithm::Sha256, b"");
        assert!(verify_file_checksum(Path::new("/nonexistent/blob"), &sum).is_err());
    }

    #[test]
    fn test_extract_tar_gz() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("m4-1.4.18.tar.gz");
        write_tarball(&archive);

        let dest = dir.path().join("src");
        fs::create_dir_all(&dest).unwrap();
        extract_archive(&archive, &dest).unwrap();

        let configure = dest.join("m4-1.4.18/configure");
        assert!(configure.exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&configure).unwrap().permissions().mode();
            assert_ne!(mode & 0o111, 0);
        }
    }

    #[test]
    fn test_extract_sniffs_unnamed_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("sha256_cached");
        write_tarball(&archive);

        let dest = dir.path().join("src");
        fs::create_dir_all(&dest).unwrap();
        extract_archive(&archive, &dest).unwrap();
        assert!(dest.join("m4-1.4.18/configure").exists());
    }

    #[test]
    fn test_extract_rejects_bzip2_release() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("m4-1.4.18.tar.bz2");
        fs::write(&archive, b"BZh91AY&SY").unwrap();

        let err = extract_archive(&archive, dir.path()).unwrap_err();
        assert!(err.to_string().contains("bzip2"));
    }

    #[test]
    fn test_download_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("upstream.tar.gz");
        fs::write(&source, b"tarball").unwrap();
        let url = Url::from_file_path(&source).unwrap();

        let dest = dir.path().join("cache/copy");
        Downloader::new().unwrap().download_file(url.as_str(), &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"tarball");
    }

    #[test]
    fn test_download_invalid_url() {
        let dir = tempfile::tempdir().unwrap();
        let result = Downloader::new()
            .unwrap()
            .download_file("not a url", &dir.path().join("out"));
        assert!(matches!(result, Err(Error::DownloadError(_))));
    }
}
