//! Content-addressed attachment storage.
//!
//! Files live in `WORK_DIR/attachments` as `<sha256><ext>`. A JSON map from
//! content hash to stored filename (`image_hashes.json`) lets a re-upload of
//! the same bytes return the existing file.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use mdedit_core::attachments::{attachment_filename, content_hash, HASH_MAP_FILENAME};
use tokio::sync::Mutex;

type HashMapFile = BTreeMap<String, String>;

/// Result of storing an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAttachment {
    pub filename: String,
    /// The same content had been uploaded before.
    pub duplicate: bool,
}

/// Deduplicating attachment store.
///
/// The hash map file is read, modified and rewritten under one async mutex so
/// concurrent uploads never lose entries.
#[derive(Debug)]
pub struct AttachmentStore {
    dir: PathBuf,
    map_lock: Mutex<()>,
}

impl AttachmentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            map_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store `data` uploaded under `original_name`, or return the existing
    /// file when the same bytes are already stored.
    pub async fn store(
        &self,
        original_name: &str,
        data: &[u8],
    ) -> Result<StoredAttachment, std::io::Error> {
        let hash = content_hash(data);
        let _guard = self.map_lock.lock().await;

        let mut map = self.load_map().await?;
        if let Some(existing) = map.get(&hash) {
            if tokio::fs::try_exists(self.dir.join(existing)).await? {
                tracing::debug!(filename = %existing, "Duplicate attachment upload");
                return Ok(StoredAttachment {
                    filename: existing.clone(),
                    duplicate: true,
                });
            }
        }

        let filename = attachment_filename(&hash, original_name);
        let partial = self.dir.join(format!("{filename}.part"));
        tokio::fs::write(&partial, data).await?;
        tokio::fs::rename(&partial, self.dir.join(&filename)).await?;

        map.insert(hash, filename.clone());
        self.save_map(&map).await?;

        tracing::info!(filename = %filename, bytes = data.len(), "Attachment stored");
        Ok(StoredAttachment {
            filename,
            duplicate: false,
        })
    }

    /// Load the hash map, rebuilding it from the files on disk when it is
    /// missing or unreadable.
    async fn load_map(&self) -> Result<HashMapFile, std::io::Error> {
        match tokio::fs::read(self.dir.join(HASH_MAP_FILENAME)).await {
            Ok(raw) => match serde_json::from_slice(&raw) {
                Ok(map) => return Ok(map),
                Err(e) => tracing::warn!(error = %e, "Rebuilding malformed attachment hash map"),
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let map = self.scan_dir().await?;
        self.save_map(&map).await?;
        Ok(map)
    }

    async fn scan_dir(&self) -> Result<HashMapFile, std::io::Error> {
        let mut map = HashMapFile::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".json") || name.ends_with(".part") {
                continue;
            }
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let data = tokio::fs::read(entry.path()).await?;
            map.insert(content_hash(&data), name);
        }
        Ok(map)
    }

    async fn save_map(&self, map: &HashMapFile) -> Result<(), std::io::Error> {
        let raw = serde_json::to_vec_pretty(map).map_err(std::io::Error::from)?;
        tokio::fs::write(self.dir.join(HASH_MAP_FILENAME), raw).await
    }
}
