//! Content-addressed disk cache for metadata responses.
//!
//! Each entry is a pair of files named by the SHA-256 of its canonical
//! request fingerprint: `<hex>.body` holds the opaque response bytes,
//! `<hex>.meta` a small JSON sidecar with fetch time and content type.
//! Writes go through a temp file + fsync + rename, so concurrent writers
//! race safely (last rename wins) and readers never observe a partial
//! entry. No lock is held across network I/O.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ScrapeError;

/// Subfolder under the OS cache directory.
const CACHE_SUBDIR: &str = "rom-scout";
const RESPONSES_SUBDIR: &str = "responses";

/// Read/write policy for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Read and write.
    #[default]
    Normal,
    /// Never read (force fresh fetches) but record results.
    NoRead,
    /// Read but never write.
    ReadOnly,
}

/// A cached response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub bytes: Vec<u8>,
    /// Unix seconds at fetch time.
    pub fetched_at: i64,
    pub content_type: String,
}

/// Sidecar metadata stored next to each body file.
#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    fetched_at: i64,
    content_type: String,
}

/// The on-disk response cache.
#[derive(Debug)]
pub struct ResponseCache {
    root: PathBuf,
    mode: CacheMode,
    max_age: Duration,
}

impl ResponseCache {
    /// Open (and create) the cache at the default OS location.
    pub fn open_default(mode: CacheMode, max_age: Duration) -> Result<Self, ScrapeError> {
        let root = Self::default_dir()
            .ok_or_else(|| ScrapeError::config("Could not determine the user cache directory"))?;
        Self::open(root, mode, max_age)
    }

    /// Open (and create) the cache at a specific root directory.
    pub fn open(root: PathBuf, mode: CacheMode, max_age: Duration) -> Result<Self, ScrapeError> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root, mode, max_age })
    }

    /// The per-OS default cache root.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|d| d.join(CACHE_SUBDIR).join(RESPONSES_SUBDIR))
    }

    /// Root directory of this cache.
    pub fn dir_path(&self) -> &Path {
        &self.root
    }

    /// Stable fingerprint of a request: the endpoint id plus the
    /// canonicalized (key-sorted) parameter list, hashed.
    pub fn fingerprint(endpoint: &str, params: &[(String, String)]) -> String {
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort();

        let mut hasher = Sha256::new();
        hasher.update(endpoint.as_bytes());
        for (key, value) in sorted {
            hasher.update(b"\n");
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    /// Fetch a cached response.
    ///
    /// Returns `None` when the entry is absent, stale, unreadable, or the
    /// mode forbids reads. Read failures are logged and treated as misses.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        if self.mode == CacheMode::NoRead {
            return None;
        }

        let meta_path = self.meta_path(key);
        let body_path = self.body_path(key);

        let meta: EntryMeta = match std::fs::read_to_string(&meta_path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(meta) => meta,
                Err(e) => {
                    log::debug!("Corrupt cache meta {}: {}", meta_path.display(), e);
                    return None;
                }
            },
            Err(_) => return None,
        };

        let age = chrono::Utc::now().timestamp().saturating_sub(meta.fetched_at);
        if age < 0 || age as u64 > self.max_age.as_secs() {
            return None;
        }

        match std::fs::read(&body_path) {
            Ok(bytes) => Some(CacheEntry {
                bytes,
                fetched_at: meta.fetched_at,
                content_type: meta.content_type,
            }),
            Err(e) => {
                log::debug!("Cache body read failed {}: {}", body_path.display(), e);
                None
            }
        }
    }

    /// Store a response.
    ///
    /// A no-op in ReadOnly mode. Body and sidecar are each written to a
    /// temp file, fsynced and renamed into place; the body goes first so a
    /// reader that sees the new sidecar also sees the new body.
    pub fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), ScrapeError> {
        if self.mode == CacheMode::ReadOnly {
            return Ok(());
        }

        let meta = EntryMeta {
            fetched_at: chrono::Utc::now().timestamp(),
            content_type: content_type.to_string(),
        };
        let meta_json = serde_json::to_vec(&meta)?;

        write_atomic(&self.body_path(key), bytes)?;
        write_atomic(&self.meta_path(key), &meta_json)?;
        Ok(())
    }

    /// Remove every entry. Returns the number of bytes reclaimed.
    pub fn clear(&self) -> Result<u64, ScrapeError> {
        let mut reclaimed = 0u64;
        if self.root.exists() {
            for entry in std::fs::read_dir(&self.root)?.flatten() {
                let path = entry.path();
                if path.is_file() {
                    if let Ok(meta) = path.metadata() {
                        reclaimed += meta.len();
                    }
                    std::fs::remove_file(&path)?;
                }
            }
        }
        Ok(reclaimed)
    }

    /// Number of complete entries currently stored.
    pub fn entry_count(&self) -> usize {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return 0;
        };
        entries
            .flatten()
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "body")
                    .unwrap_or(false)
            })
            .count()
    }

    fn body_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.body"))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.meta"))
    }
}

/// Temp-write, fsync, rename. The temp file lives in the target directory
/// so the rename never crosses filesystems.
fn write_atomic(dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let file_name = dest.file_name().and_then(|n| n.to_str()).unwrap_or("entry");
    let tmp = dir.join(format!(".{}.tmp-{}", file_name, std::process::id()));

    let result = (|| {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        std::fs::rename(&tmp, dest)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}
