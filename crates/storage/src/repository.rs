use async_trait::async_trait;
use course_core::model::{CourseId, Snapshot};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for resume snapshots, one per course.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Fetch the saved snapshot for a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored record is not a
    /// readable snapshot, or other storage errors.
    async fn load_snapshot(&self, course: &CourseId) -> Result<Option<Snapshot>, StorageError>;

    /// Persist or replace the snapshot for `snapshot.course_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), StorageError>;

    /// Delete the saved snapshot. Deleting a missing snapshot is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    async fn clear_snapshot(&self, course: &CourseId) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Snapshots are kept in their encoded form so decoding behaves the same as
/// in the `SQLite` backend.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    snapshots: Arc<Mutex<HashMap<CourseId, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Store an already-encoded record, as a stale or foreign writer would.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn put_raw(&self, course: &CourseId, raw: impl Into<String>) -> Result<(), StorageError> {
        let mut guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(course.clone(), raw.into());
        Ok(())
    }
}

#[async_trait]
impl SnapshotRepository for InMemoryRepository {
    async fn load_snapshot(&self, course: &CourseId) -> Result<Option<Snapshot>, StorageError> {
        let guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .get(course)
            .map(|raw| {
                Snapshot::from_json(raw).map_err(|e| StorageError::Serialization(e.to_string()))
            })
            .transpose()
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let raw = snapshot
            .to_json()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let mut guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(snapshot.course_id.clone(), raw);
        Ok(())
    }

    async fn clear_snapshot(&self, course: &CourseId) -> Result<(), StorageError> {
        let mut guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(course);
        Ok(())
    }
}

/// Aggregated storage facade.
#[derive(Clone)]
pub struct Storage {
    pub snapshots: Arc<dyn SnapshotRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let snapshots: Arc<dyn SnapshotRepository> = Arc::new(repo);
        Self { snapshots }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{ProgressStore, SavedPosition};
    use course_core::time::fixed_now;

    fn snapshot(course: &str, page_index: usize) -> Snapshot {
        Snapshot {
            course_id: CourseId::new(course),
            position: SavedPosition {
                topic_id: None,
                page_id: None,
                topic_index: 0,
                page_index,
            },
            progress: ProgressStore::new(),
            language: Some("en".into()),
            saved_at: fixed_now(),
        }
    }

    #[tokio::test]
    async fn save_load_and_clear() {
        let repo = InMemoryRepository::new();
        let course = CourseId::new("demo");
        assert!(repo.load_snapshot(&course).await.unwrap().is_none());

        repo.save_snapshot(&snapshot("demo", 1)).await.unwrap();
        repo.save_snapshot(&snapshot("demo", 2)).await.unwrap();
        let loaded = repo.load_snapshot(&course).await.unwrap().unwrap();
        assert_eq!(loaded.position.page_index, 2);

        repo.clear_snapshot(&course).await.unwrap();
        assert!(repo.load_snapshot(&course).await.unwrap().is_none());
        repo.clear_snapshot(&course).await.unwrap();
    }

    #[tokio::test]
    async fn snapshots_are_keyed_by_course() {
        let storage = Storage::in_memory();
        storage.snapshots.save_snapshot(&snapshot("a", 1)).await.unwrap();
        assert!(
            storage
                .snapshots
                .load_snapshot(&CourseId::new("b"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn malformed_records_surface_as_serialization_errors() {
        let repo = InMemoryRepository::new();
        let course = CourseId::new("demo");
        repo.put_raw(&course, r#"{"idx": 3}"#).unwrap();
        let err = repo.load_snapshot(&course).await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
