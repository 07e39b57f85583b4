//! Filesystem-backed object cache
//!
//! Each key maps to one file at `{cache_directory}/{key}.{ext}` where the
//! extension is derived from the entry's MIME type. The file's modification
//! time serves as the entry's last-modified timestamp. Reads discover the
//! actual file by scanning for `{key}.*` since the extension is not known in
//! advance for buffer-typed entries.

use crate::{entry, CacheError, CachedObject, ObjectCache, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

/// An object cache persisting entries as files in a single directory
#[derive(Clone, Debug)]
pub struct FileSystemObjectCache {
    cache_directory: PathBuf,
}

impl FileSystemObjectCache {
    /// Create a cache over an existing directory
    pub fn new(cache_directory: impl Into<PathBuf>) -> Self {
        Self {
            cache_directory: cache_directory.into(),
        }
    }

    /// Create a cache, creating the directory if it does not exist
    pub async fn create(cache_directory: impl Into<PathBuf>) -> Result<Self> {
        let cache_directory = cache_directory.into();
        tokio::fs::create_dir_all(&cache_directory).await?;
        Ok(Self { cache_directory })
    }

    /// The directory entries are stored in
    pub fn cache_directory(&self) -> &Path {
        &self.cache_directory
    }

    fn entry_path(&self, cache_key: &str, extension: &str) -> PathBuf {
        self.cache_directory.join(format!("{}.{}", cache_key, extension))
    }

    /// Find the file backing `cache_key`, whatever its extension
    async fn find_entry_file(&self, cache_key: &str) -> Result<Option<(PathBuf, String)>> {
        let prefix = format!("{}.", cache_key);
        let mut dir = match tokio::fs::read_dir(&self.cache_directory).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::read(cache_key, e)),
        };

        while let Some(dir_entry) = dir
            .next_entry()
            .await
            .map_err(|e| CacheError::read(cache_key, e))?
        {
            let name = dir_entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(extension) = name.strip_prefix(&prefix) else {
                continue;
            };
            // One extension segment only, so key 'a' never matches 'a.b.json'
            // and in-flight '.json.tmp' files are skipped.
            if extension.is_empty() || extension.contains('.') {
                continue;
            }
            return Ok(Some((dir_entry.path(), extension.to_string())));
        }

        Ok(None)
    }

    /// Remove files left behind when a key is rewritten with a new MIME type
    async fn remove_stale_siblings(&self, cache_key: &str, keep_extension: &str) -> Result<()> {
        let prefix = format!("{}.", cache_key);
        let mut dir = tokio::fs::read_dir(&self.cache_directory)
            .await
            .map_err(|e| CacheError::write(cache_key, e))?;

        while let Some(dir_entry) = dir
            .next_entry()
            .await
            .map_err(|e| CacheError::write(cache_key, e))?
        {
            let name = dir_entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(extension) = name.strip_prefix(&prefix) else {
                continue;
            };
            if extension.is_empty() || extension.contains('.') || extension == keep_extension {
                continue;
            }
            tokio::fs::remove_file(dir_entry.path())
                .await
                .map_err(|e| CacheError::write(cache_key, e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectCache for FileSystemObjectCache {
    async fn read(&self, cache_key: &str) -> Result<Option<CachedObject>> {
        let Some((path, extension)) = self.find_entry_file(cache_key).await? else {
            return Ok(None);
        };

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| CacheError::read(cache_key, e))?;
        let last_modified: DateTime<Utc> = metadata
            .modified()
            .map_err(|e| CacheError::read(cache_key, e))?
            .into();

        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| CacheError::read(cache_key, e))?;

        Ok(Some(CachedObject {
            data: Bytes::from(data),
            mime_type: entry::mime_for_extension(&extension),
            last_modified,
        }))
    }

    async fn write(&self, cache_key: &str, data: &[u8], mime_type: &str) -> Result<()> {
        let extension = entry::extension_for_mime(mime_type);
        let path = self.entry_path(cache_key, &extension);

        // Temp-file-then-rename so concurrent readers never observe a
        // partially written entry.
        let tmp_path = self.cache_directory.join(format!(".{}.{}.tmp", cache_key, extension));
        tokio::fs::write(&tmp_path, data)
            .await
            .map_err(|e| CacheError::write(cache_key, e))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| CacheError::write(cache_key, e))?;

        self.remove_stale_siblings(cache_key, &extension).await?;

        debug!(key = cache_key, path = %path.display(), "cache file written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JSON_MIME;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_json_entry_lands_at_key_dot_json() {
        let dir = tempdir().unwrap();
        let cache = FileSystemObjectCache::new(dir.path());

        cache.put("round-1", &serde_json::json!({"title": "Round A"})).await.unwrap();

        assert!(dir.path().join("round-1.json").exists());
        let entry = cache.read("round-1").await.unwrap().unwrap();
        assert_eq!(entry.mime_type, JSON_MIME);
    }

    #[tokio::test]
    async fn test_absent_key_reads_none() {
        let dir = tempdir().unwrap();
        let cache = FileSystemObjectCache::new(dir.path());

        assert!(cache.read("never-written").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_directory_reads_none() {
        let dir = tempdir().unwrap();
        let cache = FileSystemObjectCache::new(dir.path().join("does-not-exist"));

        assert!(cache.read("anything").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_buffer_extension_discovered_on_read() {
        let dir = tempdir().unwrap();
        let cache = FileSystemObjectCache::new(dir.path());

        cache.put_buffer("logo", b"\x89PNG\r\n", "image/png").await.unwrap();

        assert!(dir.path().join("logo.png").exists());
        let entry = cache.read("logo").await.unwrap().unwrap();
        assert_eq!(entry.mime_type, "image/png");
        assert_eq!(entry.data.as_ref(), b"\x89PNG\r\n");
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = tempdir().unwrap();
        let cache = FileSystemObjectCache::new(dir.path());

        cache.put("round-1", &serde_json::json!({"n": 1})).await.unwrap();

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        while let Some(e) = entries.next_entry().await.unwrap() {
            names.push(e.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["round-1.json".to_string()]);
    }

    #[tokio::test]
    async fn test_rewrite_with_new_mime_replaces_old_file() {
        let dir = tempdir().unwrap();
        let cache = FileSystemObjectCache::new(dir.path());

        cache.put("item", &serde_json::json!({"v": 1})).await.unwrap();
        cache.put_buffer("item", b"raw", "image/png").await.unwrap();

        assert!(!dir.path().join("item.json").exists());
        assert!(dir.path().join("item.png").exists());
        let entry = cache.read("item").await.unwrap().unwrap();
        assert_eq!(entry.mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_sibling_key_with_dot_is_not_matched() {
        let dir = tempdir().unwrap();
        let cache = FileSystemObjectCache::new(dir.path());

        cache.put("a.b", &serde_json::json!({"v": 1})).await.unwrap();

        assert!(cache.read("a").await.unwrap().is_none());
        assert!(cache.read("a.b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_makes_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("cache").join("objects");

        let cache = FileSystemObjectCache::create(&nested).await.unwrap();
        cache.put("x", &serde_json::json!(1)).await.unwrap();

        assert!(nested.join("x.json").exists());
    }
}
