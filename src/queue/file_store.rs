//! Directory-backed snapshot store.
//!
//! Each queue is stored as `<dir>/<file>.json`. Names made only of ASCII
//! letters, digits, `-` and `_` are used as the file name directly; any other
//! name is stored as `~` followed by the hex of its UTF-8 bytes, so every queue
//! name the manager accepts can be persisted and read back.
//!
//! Writes go to a temporary sibling file that is fsynced and then renamed over
//! the target, so a crash mid-write never leaves a truncated snapshot behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::storage::{SnapshotStore, StorageError};

const SNAPSHOT_SUFFIX: &str = ".json";
const TMP_SUFFIX: &str = ".json.tmp";
const HEX_PREFIX: char = '~';

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a snapshot directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, queue: &str, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{suffix}", encode_queue_name(queue)))
    }

    /// Persist the rename itself by syncing the directory entry.
    #[cfg(unix)]
    async fn sync_dir(&self) -> Result<(), StorageError> {
        tokio::fs::File::open(&self.dir).await?.sync_all().await?;
        Ok(())
    }

    #[cfg(not(unix))]
    async fn sync_dir(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[inline]
fn is_plain_name(queue: &str) -> bool {
    !queue.is_empty()
        && queue
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// File stem for a queue name. Never contains `.` or a path separator.
fn encode_queue_name(queue: &str) -> String {
    if is_plain_name(queue) {
        queue.to_string()
    } else {
        format!("{HEX_PREFIX}{}", hex::encode(queue.as_bytes()))
    }
}

/// Inverse of [`encode_queue_name`]; `None` for files this store did not write.
fn decode_queue_name(stem: &str) -> Option<String> {
    match stem.strip_prefix(HEX_PREFIX) {
        Some(encoded) => {
            let bytes = hex::decode(encoded).ok()?;
            let name = String::from_utf8(bytes).ok()?;
            (!is_plain_name(&name)).then_some(name)
        }
        None => is_plain_name(stem).then(|| stem.to_string()),
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn put(&self, queue: &str, snapshot: &[u8]) -> Result<(), StorageError> {
        let target = self.path_for(queue, SNAPSHOT_SUFFIX);
        let tmp = self.path_for(queue, TMP_SUFFIX);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(snapshot).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &target).await?;
        self.sync_dir().await?;
        debug!(queue = %queue, path = ?target, bytes = snapshot.len(), "Snapshot written");
        Ok(())
    }

    async fn get(&self, queue: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(queue, SNAPSHOT_SUFFIX);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn queue_names(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(stem) = file_name
                .to_str()
                .and_then(|f| f.strip_suffix(SNAPSHOT_SUFFIX))
            else {
                continue;
            };
            match decode_queue_name(stem) {
                Some(name) => names.push(name),
                None => warn!(
                    file = ?entry.path(),
                    "Ignoring unrecognized file in snapshot directory"
                ),
            }
        }
        names.sort();
        Ok(names)
    }
}
