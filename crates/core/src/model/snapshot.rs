use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::document::{CourseDocument, Position};
use crate::model::ids::{CourseId, PageId, TopicId};
use crate::model::progress::ProgressStore;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnapshotError {
    #[error("snapshot could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("snapshot is malformed: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Saved navigation position.
///
/// Ids are stored next to the indices so the position survives a language
/// variant that reorders topics or pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPosition {
    #[serde(default)]
    pub topic_id: Option<TopicId>,
    #[serde(default)]
    pub page_id: Option<PageId>,
    pub topic_index: usize,
    pub page_index: usize,
}

impl SavedPosition {
    /// Captures `position` in `document`, ids included.
    #[must_use]
    pub fn capture(document: &CourseDocument, position: Position) -> Self {
        let found = document.page_at(position);
        Self {
            topic_id: found.map(|f| f.topic.id().clone()),
            page_id: found.map(|f| f.page.id().clone()),
            topic_index: position.topic_index,
            page_index: position.page_index,
        }
    }

    /// Maps the saved position onto `document`: page id first, then topic id
    /// plus page index, then raw indices.
    #[must_use]
    pub fn resolve(&self, document: &CourseDocument) -> Option<Position> {
        if let Some(position) = self.page_id.as_ref().and_then(|id| document.position_of(id)) {
            return Some(position);
        }
        let topic_index = match &self.topic_id {
            Some(id) => document.topic_index(id)?,
            None => self.topic_index,
        };
        let position = Position::new(topic_index, self.page_index);
        document.contains(position).then_some(position)
    }
}

/// Resume state for one course: where the learner was and what they did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub course_id: CourseId,
    pub position: SavedPosition,
    #[serde(default)]
    pub progress: ProgressStore,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub saved_at: DateTime<Utc>,
}

impl Snapshot {
    #[must_use]
    pub fn capture(
        document: &CourseDocument,
        position: Position,
        progress: &ProgressStore,
        saved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            course_id: document.id().clone(),
            position: SavedPosition::capture(document, position),
            progress: progress.clone(),
            language: Some(document.language().to_owned()),
            saved_at,
        }
    }

    /// # Errors
    ///
    /// Returns `SnapshotError::Encode` if serialization fails.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(SnapshotError::Encode)
    }

    /// # Errors
    ///
    /// Returns `SnapshotError::Malformed` for anything that is not a snapshot.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(json).map_err(SnapshotError::Malformed)
    }
}
