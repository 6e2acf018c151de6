use async_trait::async_trait;
use course_core::model::{CourseId, Snapshot};
use sqlx::Row;

use crate::repository::{SnapshotRepository, StorageError};

use super::SqliteRepository;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl SnapshotRepository for SqliteRepository {
    async fn load_snapshot(&self, course: &CourseId) -> Result<Option<Snapshot>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT snapshot
            FROM course_snapshots
            WHERE course_id = ?1
            ",
        )
        .bind(course.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row.try_get("snapshot").map_err(ser)?;
        let snapshot = Snapshot::from_json(&raw).map_err(ser)?;
        if snapshot.course_id != *course {
            return Err(StorageError::Serialization(format!(
                "snapshot stored under {course} belongs to {}",
                snapshot.course_id
            )));
        }
        Ok(Some(snapshot))
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let raw = snapshot.to_json().map_err(ser)?;
        sqlx::query(
            r"
            INSERT INTO course_snapshots (course_id, snapshot, saved_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(course_id) DO UPDATE SET
                snapshot = excluded.snapshot,
                saved_at = excluded.saved_at
            ",
        )
        .bind(snapshot.course_id.as_str())
        .bind(raw)
        .bind(snapshot.saved_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn clear_snapshot(&self, course: &CourseId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM course_snapshots WHERE course_id = ?1")
            .bind(course.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
