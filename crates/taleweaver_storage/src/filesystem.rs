//! Filesystem story store.
//!
//! Layout of the output directory:
//!
//! ```text
//! output/
//! ├── story_20240309_140507_1a2b3c4d_A_robot_learns_to_paint.txt
//! └── story_20240309_140507_1a2b3c4d_A_robot_learns_to_paint.txt.meta.json
//! ```
//!
//! Every write goes to a temporary file in the same directory and is renamed
//! into place, so readers never observe a partial write. Writes to one story
//! are serialized by a per-file lock. New stories get a fresh name and need
//! no lock.

use crate::naming::{generate_filename, is_valid_filename};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use taleweaver_core::{ContinuationRecord, StoryMetadata, StorySummary};
use taleweaver_error::{StorageError, StorageErrorKind, StorageResult};
use taleweaver_interface::StoryStore;
use uuid::Uuid;

/// Suffix of the metadata sidecar written next to each story.
const SIDECAR_SUFFIX: &str = ".meta.json";

type LockTable = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Story store backed by a directory of text files.
#[derive(Debug)]
pub struct FileSystemStoryStore {
    base_path: PathBuf,
    locks: LockTable,
}

/// Exclusive write access to one story.
///
/// On drop, table entries that no writer holds or waits for are removed.
struct FileLock<'a> {
    locks: &'a LockTable,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .lock()
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

impl FileSystemStoryStore {
    /// Create a store rooted at `base_path`.
    ///
    /// Creates the directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    #[tracing::instrument(skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_path.display(),
                e
            )))
        })?;

        tracing::info!(path = %base_path.display(), "Opened story store");
        Ok(Self {
            base_path,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// The output directory.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a filename inside the output directory without checking existence.
    fn resolve(&self, filename: &str) -> StorageResult<PathBuf> {
        if !is_valid_filename(filename) {
            tracing::warn!(filename, "Rejected story filename");
            return Err(StorageError::new(StorageErrorKind::NotFound(
                filename.to_string(),
            )));
        }
        Ok(self.base_path.join(filename))
    }

    fn sidecar_path(story_path: &Path) -> PathBuf {
        let mut name = story_path.as_os_str().to_owned();
        name.push(SIDECAR_SUFFIX);
        PathBuf::from(name)
    }

    async fn lock_file(&self, filename: &str) -> FileLock<'_> {
        let lock = self
            .locks
            .lock()
            .entry(filename.to_string())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        FileLock {
            locks: &self.locks,
            guard: Some(guard),
        }
    }

    /// Number of stories with a write in progress or waiting.
    pub fn active_locks(&self) -> usize {
        self.locks.lock().len()
    }

    async fn read_story(path: &Path, filename: &str) -> StorageResult<String> {
        tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(filename.to_string()))
            } else {
                StorageError::new(StorageErrorKind::Read(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        })
    }

    /// Write `data` to `path` through a temporary file and a rename.
    async fn write_atomic(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        let temp_path = self
            .base_path
            .join(format!(".{}.tmp", Uuid::new_v4().simple()));

        tokio::fs::write(&temp_path, data).await.map_err(|e| {
            StorageError::new(StorageErrorKind::Write(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;

        if let Err(e) = tokio::fs::rename(&temp_path, path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(StorageError::new(StorageErrorKind::Write(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            ))));
        }
        Ok(())
    }

    async fn read_sidecar(path: &Path) -> StorageResult<Option<StoryMetadata>> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::new(StorageErrorKind::Read(format!(
                    "{}: {}",
                    path.display(),
                    e
                ))));
            }
        };

        serde_json::from_slice(&raw).map(Some).map_err(|e| {
            StorageError::new(StorageErrorKind::Metadata(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })
    }

    async fn write_sidecar(&self, path: &Path, metadata: &StoryMetadata) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(metadata)
            .map_err(|e| StorageError::new(StorageErrorKind::Metadata(e.to_string())))?;
        self.write_atomic(path, &json).await
    }
}

#[async_trait::async_trait]
impl StoryStore for FileSystemStoryStore {
    #[tracing::instrument(skip(self, content, metadata), fields(size = content.len(), model = %metadata.model))]
    async fn save(&self, content: &str, metadata: &StoryMetadata) -> StorageResult<String> {
        let filename = generate_filename(metadata.kind, &metadata.prompt, Utc::now());
        let path = self.resolve(&filename)?;

        self.write_atomic(&path, content.as_bytes()).await?;
        if let Err(e) = self
            .write_sidecar(&Self::sidecar_path(&path), metadata)
            .await
        {
            tracing::warn!(error = %e, filename = %filename, "Story saved without metadata");
        }

        tracing::info!(filename = %filename, size = content.len(), "Saved story");
        Ok(filename)
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self) -> StorageResult<Vec<StorySummary>> {
        let mut entries = match tokio::fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StorageError::new(StorageErrorKind::Read(format!(
                    "{}: {}",
                    self.base_path.display(),
                    e
                ))));
            }
        };

        let mut stories = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    return Err(StorageError::new(StorageErrorKind::Read(format!(
                        "{}: {}",
                        self.base_path.display(),
                        e
                    ))));
                }
            };

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !is_valid_filename(&name) {
                continue;
            }

            // Entries can vanish between read_dir and stat.
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }

            let modified = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_default();
            stories.push(StorySummary {
                name,
                size: meta.len(),
                modified,
            });
        }

        stories.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| b.name.cmp(&a.name))
        });
        tracing::debug!(count = stories.len(), "Listed stories");
        Ok(stories)
    }

    #[tracing::instrument(skip(self))]
    async fn load(&self, filename: &str) -> StorageResult<String> {
        let path = self.resolve(filename)?;
        let content = Self::read_story(&path, filename).await?;
        tracing::debug!(size = content.len(), "Loaded story");
        Ok(content)
    }

    #[tracing::instrument(skip(self, content), fields(added = content.len()))]
    async fn append(&self, filename: &str, content: &str) -> StorageResult<String> {
        let path = self.resolve(filename)?;

        let _lock = self.lock_file(filename).await;

        let mut updated = Self::read_story(&path, filename).await?;
        updated.push_str(content);
        self.write_atomic(&path, updated.as_bytes()).await?;

        tracing::info!(size = updated.len(), "Appended to story");
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    async fn metadata(&self, filename: &str) -> StorageResult<Option<StoryMetadata>> {
        let path = self.resolve(filename)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::new(StorageErrorKind::NotFound(
                filename.to_string(),
            )));
        }
        Self::read_sidecar(&Self::sidecar_path(&path)).await
    }

    #[tracing::instrument(skip(self, record), fields(model = %record.model))]
    async fn record_continuation(
        &self,
        filename: &str,
        record: ContinuationRecord,
    ) -> StorageResult<()> {
        let path = self.resolve(filename)?;

        let _lock = self.lock_file(filename).await;

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::new(StorageErrorKind::NotFound(
                filename.to_string(),
            )));
        }

        let sidecar = Self::sidecar_path(&path);
        let mut metadata = Self::read_sidecar(&sidecar)
            .await?
            .unwrap_or_else(|| StoryMetadata::new(record.model.clone(), ""));
        metadata.continuations.push(record);
        self.write_sidecar(&sidecar, &metadata).await?;

        tracing::debug!(
            continuations = metadata.continuations.len(),
            "Recorded continuation"
        );
        Ok(())
    }

    fn path_of(&self, filename: &str) -> StorageResult<PathBuf> {
        let path = self.resolve(filename)?;
        if path.is_file() {
            Ok(path)
        } else {
            Err(StorageError::new(StorageErrorKind::NotFound(
                filename.to_string(),
            )))
        }
    }
}
