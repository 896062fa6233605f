//! Saving binary responses to disk.
//!
//! A blob is staged under a transient object URL, saved under a filename,
//! and the URL is revoked straight after. `ObjectUrl` revokes on drop, so
//! a failed save cannot leave a URL behind.

use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

pub trait DownloadHost: Send + Sync {
    fn create_object_url(&self, blob: Bytes) -> String;
    fn save_as(&self, url: &str, filename: &str) -> Result<PathBuf>;
    fn revoke_object_url(&self, url: &str);
}

pub struct ObjectUrl<'a> {
    host: &'a dyn DownloadHost,
    url: String,
}

impl<'a> ObjectUrl<'a> {
    pub fn create(host: &'a dyn DownloadHost, blob: Bytes) -> Self {
        let url = host.create_object_url(blob);
        Self { host, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for ObjectUrl<'_> {
    fn drop(&mut self) {
        self.host.revoke_object_url(&self.url);
    }
}

/// Stage `blob`, save it as `filename`, and release the staged copy.
pub fn save_blob(host: &dyn DownloadHost, blob: Bytes, filename: &str) -> Result<PathBuf> {
    let object_url = ObjectUrl::create(host, blob);
    host.save_as(object_url.url(), filename)
}

/// Writes saved files into a fixed downloads directory.
pub struct DirectoryDownloads {
    dir: PathBuf,
    next_id: AtomicU64,
    staged: Mutex<HashMap<String, Bytes>>,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next_id: AtomicU64::new(1),
            staged: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn live_object_urls(&self) -> usize {
        self.staged
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl DownloadHost for DirectoryDownloads {
    fn create_object_url(&self, blob: Bytes) -> String {
        let url = format!("blob:applytrack/{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.staged
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(url.clone(), blob);
        url
    }

    fn save_as(&self, url: &str, filename: &str) -> Result<PathBuf> {
        let blob = self
            .staged
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("Object URL {} is not live", url))?;

        // Never let a server-chosen name escape the downloads directory
        let name = Path::new(filename)
            .file_name()
            .ok_or_else(|| anyhow!("Invalid download filename: {}", filename))?;

        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let target = self.dir.join(name);
        std::fs::write(&target, &blob)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        Ok(target)
    }

    fn revoke_object_url(&self, url: &str) {
        self.staged
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_blob_writes_and_revokes() {
        let dir = tempfile::tempdir().unwrap();
        let host = DirectoryDownloads::new(dir.path().join("out"));

        let path = save_blob(&host, Bytes::from_static(b"\\documentclass{article}"), "resume-4.tex")
            .unwrap();

        assert_eq!(path, dir.path().join("out").join("resume-4.tex"));
        assert_eq!(std::fs::read(&path).unwrap(), b"\\documentclass{article}");
        assert_eq!(host.live_object_urls(), 0);
    }

    #[test]
    fn test_failed_save_still_revokes() {
        let dir = tempfile::tempdir().unwrap();
        let host = DirectoryDownloads::new(dir.path());

        let result = save_blob(&host, Bytes::from_static(b"x"), "..");
        assert!(result.is_err());
        assert_eq!(host.live_object_urls(), 0);
    }

    #[test]
    fn test_filename_cannot_escape_directory() {
        let dir = tempfile::tempdir().unwrap();
        let host = DirectoryDownloads::new(dir.path().join("dl"));

        let path = save_blob(&host, Bytes::from_static(b"pdf"), "../../etc/resume.pdf").unwrap();
        assert_eq!(path, dir.path().join("dl").join("resume.pdf"));
    }
}
