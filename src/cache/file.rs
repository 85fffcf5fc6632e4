//! File cache: one file per key inside a cache directory.
//!
//! Writes are write-once. A `set` on a key whose file already exists leaves
//! the file untouched, so refreshing an entry means `remove` then `set`.
//! Expiry is never checked on read; [`FileAdapter::remove_expired`] is an
//! explicit sweep driven by file modification times.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::cache::{AdapterOptions, CacheAdapter, CacheError, CacheItem, FileCacheConfig};

#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// Longest file name common filesystems accept, in bytes.
const MAX_KEY_LENGTH: usize = 255;

/// Directory-backed cache adapter.
pub struct FileAdapter {
    directory: PathBuf,
    options: AdapterOptions,
}

impl FileAdapter {
    pub fn new(config: &FileCacheConfig, options: AdapterOptions) -> Self {
        Self {
            directory: PathBuf::from(&config.directory),
            options,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Map a key to its file. Keys are used verbatim, so anything that is not
    /// a single plain path component is rejected rather than rewritten.
    fn entry_path(&self, key: &str) -> Result<PathBuf, CacheError> {
        validate_key(key)?;
        Ok(self.directory.join(key))
    }
}

fn validate_key(key: &str) -> Result<(), CacheError> {
    if key.is_empty() {
        return Err(CacheError::invalid_key(key, "key must not be empty"));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::invalid_key(
            key,
            format!("key exceeds {} bytes", MAX_KEY_LENGTH),
        ));
    }
    if key == "." || key == ".." {
        return Err(CacheError::invalid_key(key, "key must not be a relative path"));
    }
    if key.contains(['/', '\\', '\0']) {
        return Err(CacheError::invalid_key(
            key,
            "key must be a single path component",
        ));
    }
    Ok(())
}

/// Remove a half-written entry, which would otherwise block every later
/// write-once set of the same key.
async fn discard_partial(path: &Path, key: &str) {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => {
            warn!(key, error = %e, "File cache cleanup failed, entry stays blocked");
        }
        _ => {}
    }
}

#[cfg(unix)]
async fn set_file_mode(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(FILE_MODE)).await
}

#[cfg(not(unix))]
async fn set_file_mode(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[async_trait]
impl CacheAdapter for FileAdapter {
    async fn connect(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.directory).await.map_err(|e| {
            CacheError::Connection(format!(
                "cannot create cache directory {}: {}",
                self.directory.display(),
                e
            ))
        })?;

        let metadata = fs::metadata(&self.directory)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        if !metadata.is_dir() {
            return Err(CacheError::Connection(format!(
                "cache path {} is not a directory",
                self.directory.display()
            )));
        }

        info!(directory = %self.directory.display(), "File cache ready");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<CacheItem, CacheError> {
        if !self.options.is_enabled() {
            return Ok(CacheItem::miss(key));
        }
        let path = self.entry_path(key)?;

        match fs::read(&path).await {
            Ok(bytes) => {
                debug!(key, "File cache hit");
                Ok(CacheItem::hit(key, bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(key, "File cache miss");
                Ok(CacheItem::miss(key))
            }
            Err(e) => {
                warn!(key, error = %e, "File cache read failed");
                Err(CacheError::backend("get", key, e))
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> Result<bool, CacheError> {
        if !self.options.is_enabled() {
            return Ok(false);
        }
        let path = self.entry_path(key)?;

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(key, "File cache entry exists, keeping it");
                return Ok(false);
            }
            Err(e) => {
                warn!(key, error = %e, "File cache create failed");
                return Err(CacheError::backend("set", key, e));
            }
        };

        let written = async {
            file.write_all(&value).await?;
            file.flush().await?;
            set_file_mode(&path).await
        }
        .await;

        if let Err(e) = written {
            warn!(key, error = %e, "File cache write failed");
            discard_partial(&path, key).await;
            return Err(CacheError::backend("set", key, e));
        }

        debug!(key, ttl = self.options.ttl(ttl_seconds), "File cache stored");
        Ok(true)
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(key, error = %e, "File cache remove failed");
                Err(CacheError::backend("remove", key, e))
            }
        }
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let removed = sweep(&self.directory, "clear", |_| true).await?;
        debug!(removed, "File cache cleared");
        Ok(())
    }

    async fn remove_expired(&self) -> Result<usize, CacheError> {
        let window = Duration::from_secs(self.options.default_ttl());
        let Some(cutoff) = SystemTime::now().checked_sub(window) else {
            return Ok(0);
        };

        let removed = sweep(&self.directory, "remove_expired", |modified| {
            modified.is_some_and(|m| m < cutoff)
        })
        .await?;
        debug!(removed, "File cache expired entries removed");
        Ok(removed)
    }

    fn options(&self) -> &AdapterOptions {
        &self.options
    }
}

/// Remove every non-directory entry for which `should_remove(mtime)` holds.
async fn sweep<F>(directory: &Path, operation: &'static str, should_remove: F) -> Result<usize, CacheError>
where
    F: Fn(Option<SystemTime>) -> bool,
{
    let dir_key = directory.display().to_string();
    let mut entries = match fs::read_dir(directory).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(CacheError::backend(operation, &dir_key, e)),
    };

    let mut removed = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CacheError::backend(operation, &dir_key, e))?
    {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(CacheError::backend(operation, &name, e)),
        };
        if metadata.is_dir() || !should_remove(metadata.modified().ok()) {
            continue;
        }

        match fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(key = %name, error = %e, "File cache sweep failed");
                return Err(CacheError::backend(operation, &name, e));
            }
        }
    }

    Ok(removed)
}
