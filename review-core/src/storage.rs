//! External storage and notification collaborators.
//!
//! The editor never talks to a backend directly. Hosts provide a
//! [`BlobStorage`] (object storage) and a [`ReviewNotifier`] (the "review is
//! complete" signal), and tests substitute the in-memory versions here.

use std::cell::RefCell;
use std::collections::HashMap;
#[cfg(feature = "std")]
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{ReviewError, ReviewResult};

/// Content type of persisted annotation documents.
pub const ANNOTATION_CONTENT_TYPE: &str = "application/json";

/// Validate a video identifier for use inside a storage key.
///
/// # Errors
///
/// Returns [`ReviewError::InvalidVideoId`] for empty ids or ids containing
/// path separators.
pub fn validate_video_id(video_id: &str) -> ReviewResult<()> {
    let trimmed = video_id.trim();
    if trimmed.is_empty()
        || trimmed != video_id
        || video_id.contains(['/', '\\'])
        || video_id == "."
        || video_id == ".."
    {
        return Err(ReviewError::InvalidVideoId(video_id.to_string()));
    }
    Ok(())
}

/// Storage key for a video's annotation document.
///
/// # Errors
///
/// Returns an error if the video id is not usable in a key.
pub fn annotation_key(video_id: &str) -> ReviewResult<String> {
    validate_video_id(video_id)?;
    Ok(format!("annotations/{video_id}.json"))
}

/// Storage key for a video's recorded commentary.
///
/// # Errors
///
/// Returns an error if the video id is not usable in a key.
pub fn recording_key(video_id: &str, extension: &str) -> ReviewResult<String> {
    validate_video_id(video_id)?;
    Ok(format!("recordings/{video_id}.{extension}"))
}

/// Object storage for annotation and recording blobs.
#[async_trait(?Send)]
pub trait BlobStorage {
    /// Write a blob, replacing any previous one under `key`.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> ReviewResult<()>;

    /// Read a blob. `Ok(None)` means nothing was stored under `key`.
    async fn get(&self, key: &str) -> ReviewResult<Option<Vec<u8>>>;
}

/// Receives the "review complete" signal after a successful save.
///
/// Delivery is fire-and-forget: implementations start the notification and
/// return at once, handling their own failures. A save never waits on it.
pub trait ReviewNotifier {
    /// Signal that the review of `video_id` is complete.
    fn review_complete(&self, video_id: &str);
}

/// Notifier that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ReviewNotifier for NoopNotifier {
    fn review_complete(&self, _video_id: &str) {}
}

/// A stored blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Blob bytes.
    pub bytes: Vec<u8>,
    /// MIME type recorded at write time.
    pub content_type: String,
}

/// In-memory blob storage for tests and offline hosts.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RefCell<HashMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob directly.
    pub fn insert(&self, key: &str, bytes: impl Into<Vec<u8>>, content_type: &str) {
        self.blobs.borrow_mut().insert(
            key.to_string(),
            StoredBlob {
                bytes: bytes.into(),
                content_type: content_type.to_string(),
            },
        );
    }

    /// Inspect a stored blob.
    #[must_use]
    pub fn blob(&self, key: &str) -> Option<StoredBlob> {
        self.blobs.borrow().get(key).cloned()
    }

    /// Number of stored blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.borrow().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.borrow().is_empty()
    }
}

#[async_trait(?Send)]
impl BlobStorage for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> ReviewResult<()> {
        self.insert(key, bytes, content_type);
        Ok(())
    }

    async fn get(&self, key: &str) -> ReviewResult<Option<Vec<u8>>> {
        Ok(self.blobs.borrow().get(key).map(|blob| blob.bytes.clone()))
    }
}

/// Blob storage backed by a local data directory.
///
/// Keys map to relative paths below the directory; intermediate directories
/// are created on write.
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    data_dir: PathBuf,
}

#[cfg(feature = "std")]
impl FsBlobStore {
    /// Create a store rooted at `data_dir`.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, key: &str) -> ReviewResult<PathBuf> {
        if key.is_empty() || key.split('/').any(|part| part.is_empty() || part == "..") {
            return Err(ReviewError::Storage(format!("invalid key: {key:?}")));
        }
        Ok(self.data_dir.join(key))
    }
}

#[cfg(feature = "std")]
#[async_trait(?Send)]
impl BlobStorage for FsBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> ReviewResult<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write to a sibling temp file first so readers never see half a blob
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, &path)?;
        tracing::debug!(
            "Stored {} bytes ({content_type}) at {}",
            bytes.len(),
            path.display()
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> ReviewResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_derived_from_video_id() {
        assert_eq!(
            annotation_key("vid-123").expect("valid"),
            "annotations/vid-123.json"
        );
        assert_eq!(
            recording_key("vid-123", "webm").expect("valid"),
            "recordings/vid-123.webm"
        );
    }

    #[test]
    fn bad_video_ids_are_rejected() {
        for id in ["", " ", "a/b", "..", "a\\b", " padded"] {
            assert!(
                matches!(annotation_key(id), Err(ReviewError::InvalidVideoId(_))),
                "{id:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn memory_store_put_get() {
        let store = MemoryBlobStore::new();
        assert!(store.get("k").await.expect("get").is_none());

        store
            .put("k", b"hello".to_vec(), "text/plain")
            .await
            .expect("put");
        assert_eq!(store.get("k").await.expect("get"), Some(b"hello".to_vec()));
        assert_eq!(
            store.blob("k").map(|b| b.content_type),
            Some("text/plain".to_string())
        );
    }

    #[tokio::test]
    async fn fs_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path());

        assert!(store
            .get("annotations/v1.json")
            .await
            .expect("get")
            .is_none());

        store
            .put("annotations/v1.json", b"[]".to_vec(), ANNOTATION_CONTENT_TYPE)
            .await
            .expect("put");
        assert_eq!(
            store.get("annotations/v1.json").await.expect("get"),
            Some(b"[]".to_vec())
        );
        assert!(dir.path().join("annotations/v1.json").exists());
        assert!(!dir.path().join("annotations/v1.tmp").exists());
    }

    #[tokio::test]
    async fn fs_store_rejects_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path());
        assert!(store.put("../escape", vec![], "x").await.is_err());
        assert!(store.get("a//b").await.is_err());
    }
}
