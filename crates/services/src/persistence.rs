use std::sync::Arc;

use course_core::Clock;
use course_core::model::Position;
use storage::repository::SnapshotRepository;

use crate::engine::CourseEngine;
use crate::error::PersistenceWriteFailure;

/// Saves the engine's snapshot whenever position, progress or language
/// changed since the last successful write.
///
/// Writes are best-effort: a failure is logged and retried on the next
/// observation.
#[derive(Clone)]
pub struct PersistenceObserver {
    clock: Clock,
    snapshots: Arc<dyn SnapshotRepository>,
    last_saved: Option<SavedState>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SavedState {
    version: u64,
    position: Position,
    language: String,
}

impl SavedState {
    fn of(engine: &CourseEngine) -> Self {
        Self {
            version: engine.progress().version(),
            position: engine.position(),
            language: engine.document().language().to_owned(),
        }
    }
}

impl PersistenceObserver {
    #[must_use]
    pub fn new(clock: Clock, snapshots: Arc<dyn SnapshotRepository>) -> Self {
        Self {
            clock,
            snapshots,
            last_saved: None,
        }
    }

    /// Forget what was last written, so the next observation saves.
    pub fn reset(&mut self) {
        self.last_saved = None;
    }

    /// Persist `engine` if it changed. Returns whether a write happened.
    pub async fn observe(&mut self, engine: &CourseEngine) -> bool {
        let state = SavedState::of(engine);
        if self.last_saved.as_ref() == Some(&state) {
            return false;
        }
        match self.save(engine).await {
            Ok(()) => {
                self.last_saved = Some(state);
                true
            }
            Err(err) => {
                log::warn!("{err}");
                false
            }
        }
    }

    async fn save(&self, engine: &CourseEngine) -> Result<(), PersistenceWriteFailure> {
        let snapshot = engine.snapshot(self.clock.now());
        self.snapshots
            .save_snapshot(&snapshot)
            .await
            .map_err(|source| PersistenceWriteFailure {
                course: snapshot.course_id.clone(),
                source,
            })?;
        log::debug!(
            "saved progress for {} at {:?}",
            snapshot.course_id,
            engine.position()
        );
        Ok(())
    }
}
