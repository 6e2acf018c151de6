//! Orchestrates one learner session: load, resume decision, persistence
//! and reporting around a `CourseEngine`.

use std::sync::Arc;

use course_core::Clock;
use course_core::model::{Answer, PageId, Snapshot, TopicId};
use storage::repository::{SnapshotRepository, Storage};
use storage::source::CourseSource;

use crate::engine::{CourseEngine, SubmissionOutcome, Transition};
use crate::error::PlayerError;
use crate::persistence::PersistenceObserver;
use crate::reporting::{Reporter, ReportingSink};

/// Async shell around the engine.
///
/// While saved progress awaits a resume or restart decision, every learner
/// action is refused with `PlayerError::ResumePending` and nothing is
/// written. After each accepted action the engine's events go to the
/// reporting sink and changed state is persisted.
pub struct CoursePlayer {
    source: Arc<dyn CourseSource>,
    snapshots: Arc<dyn SnapshotRepository>,
    engine: CourseEngine,
    reporter: Reporter,
    persistence: PersistenceObserver,
    pending: Option<Snapshot>,
    shut_down: bool,
}

impl CoursePlayer {
    /// Loads the `language` variant, opens the reporting session and looks
    /// for saved progress.
    ///
    /// An unreadable snapshot is treated as no snapshot.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::Load` if the course cannot be loaded.
    pub async fn load(
        source: Arc<dyn CourseSource>,
        storage: &Storage,
        sink: Box<dyn ReportingSink>,
        language: &str,
        clock: Clock,
    ) -> Result<Self, PlayerError> {
        let document = source.load_document(language).await?;
        let mut reporter = Reporter::new(sink, document.config().lms_status);
        reporter.init();

        let engine = CourseEngine::new(document);
        let snapshots = Arc::clone(&storage.snapshots);
        let pending = match snapshots.load_snapshot(engine.document().id()).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                log::warn!(
                    "ignoring saved progress for {}: {err}",
                    engine.document().id()
                );
                None
            }
        };

        let mut player = Self {
            source,
            persistence: PersistenceObserver::new(clock, Arc::clone(&snapshots)),
            snapshots,
            engine,
            reporter,
            pending,
            shut_down: false,
        };
        if player.pending.is_some() {
            log::info!("saved progress found for {}", player.engine.document().id());
        } else {
            player.settle().await;
        }
        Ok(player)
    }

    #[must_use]
    pub fn engine(&self) -> &CourseEngine {
        &self.engine
    }

    #[must_use]
    pub fn resume_available(&self) -> bool {
        self.pending.is_some()
    }

    /// The saved progress awaiting a decision, if any.
    #[must_use]
    pub fn pending_snapshot(&self) -> Option<&Snapshot> {
        self.pending.as_ref()
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    fn ensure_running(&self) -> Result<(), PlayerError> {
        if self.shut_down {
            return Err(PlayerError::ShutDown);
        }
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), PlayerError> {
        self.ensure_running()?;
        if self.pending.is_some() {
            return Err(PlayerError::ResumePending);
        }
        Ok(())
    }

    /// Reports drained events and persists changed state.
    async fn settle(&mut self) {
        for event in self.engine.take_events() {
            self.reporter.report(&event);
        }
        self.persistence.observe(&self.engine).await;
    }

    //
    // ─── RESUME DECISION ───────────────────────────────────────────────────────
    //

    /// Applies the saved progress.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::NoSavedProgress` when nothing is pending, or
    /// `PlayerError::Engine` if the snapshot belongs to another course (it
    /// is discarded in that case).
    pub async fn resume(&mut self) -> Result<(), PlayerError> {
        self.ensure_running()?;
        let snapshot = self.pending.take().ok_or(PlayerError::NoSavedProgress)?;
        self.engine.apply_snapshot(snapshot)?;
        log::info!(
            "resumed {} at {:?}",
            self.engine.document().id(),
            self.engine.position()
        );
        self.settle().await;
        Ok(())
    }

    /// Discards saved progress and starts over from the first page.
    /// Allowed whether or not a decision is pending.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::ShutDown` after `shutdown`.
    pub async fn restart(&mut self) -> Result<(), PlayerError> {
        self.ensure_running()?;
        self.pending = None;
        let course = self.engine.document().id().clone();
        if let Err(err) = self.snapshots.clear_snapshot(&course).await {
            log::warn!("could not clear saved progress for {course}: {err}");
        }
        self.engine.restart();
        self.persistence.reset();
        log::info!("restarted {course}");
        self.settle().await;
        Ok(())
    }

    //
    // ─── LEARNER ACTIONS ───────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Returns `PlayerError` if the player is not ready or the engine fails.
    pub async fn go_next(&mut self) -> Result<Transition, PlayerError> {
        self.ensure_ready()?;
        let transition = self.engine.go_next()?;
        self.settle().await;
        Ok(transition)
    }

    /// # Errors
    ///
    /// Returns `PlayerError` if the player is not ready or the engine fails.
    pub async fn go_back(&mut self) -> Result<Transition, PlayerError> {
        self.ensure_ready()?;
        let transition = self.engine.go_back()?;
        self.settle().await;
        Ok(transition)
    }

    /// # Errors
    ///
    /// Returns `PlayerError` if the player is not ready or the target is
    /// invalid.
    pub async fn go_to_page(
        &mut self,
        topic: &TopicId,
        page: &PageId,
    ) -> Result<Transition, PlayerError> {
        self.ensure_ready()?;
        let transition = self.engine.go_to_page(topic, page)?;
        self.settle().await;
        Ok(transition)
    }

    /// # Errors
    ///
    /// Returns `PlayerError` if the player is not ready or the submission
    /// is refused.
    pub async fn submit_answer(
        &mut self,
        page: &PageId,
        answer: Answer,
    ) -> Result<SubmissionOutcome, PlayerError> {
        self.ensure_ready()?;
        let outcome = self.engine.submit_answer(page, answer)?;
        self.settle().await;
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns `PlayerError` if the player is not ready or retry is refused.
    pub fn retry(&mut self, page: &PageId) -> Result<(), PlayerError> {
        self.ensure_ready()?;
        self.engine.retry(page)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `PlayerError` if the player is not ready or the page is
    /// unknown.
    pub async fn mark_complete(&mut self, page: &PageId) -> Result<bool, PlayerError> {
        self.ensure_ready()?;
        let changed = self.engine.mark_complete(page)?;
        self.settle().await;
        Ok(changed)
    }

    /// # Errors
    ///
    /// Returns `PlayerError` if the player is not ready or the page is
    /// unknown.
    pub async fn media_finished(&mut self, page: &PageId) -> Result<Option<Transition>, PlayerError> {
        self.ensure_ready()?;
        let transition = self.engine.media_finished(page)?;
        self.settle().await;
        Ok(transition)
    }

    /// # Errors
    ///
    /// Returns `PlayerError` if the player is not ready.
    pub async fn set_audio_enabled(&mut self, enabled: bool) -> Result<(), PlayerError> {
        self.ensure_ready()?;
        self.engine.set_audio_enabled(enabled);
        self.settle().await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `PlayerError` if the player is not ready.
    pub fn toggle_menu(&mut self) -> Result<bool, PlayerError> {
        self.ensure_ready()?;
        Ok(self.engine.toggle_menu())
    }

    /// # Errors
    ///
    /// Returns `PlayerError` if the player is not ready.
    pub fn toggle_transcript(&mut self) -> Result<bool, PlayerError> {
        self.ensure_ready()?;
        Ok(self.engine.toggle_transcript())
    }

    /// Swaps to another language variant of the course, keeping progress.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::UnsupportedLanguage` if the course does not
    /// list `language`, `PlayerError::Load` if the variant cannot be loaded
    /// and `PlayerError::Engine` if it does not fit the current course. The
    /// current variant stays active on error.
    pub async fn set_language(&mut self, language: &str) -> Result<(), PlayerError> {
        self.ensure_ready()?;
        if self.engine.document().language() == language {
            return Ok(());
        }
        if !self.engine.document().settings().offers_language(language) {
            return Err(PlayerError::UnsupportedLanguage(language.to_owned()));
        }
        let document = self.source.load_document(language).await?;
        self.engine.switch_variant(document)?;
        self.settle().await;
        Ok(())
    }

    /// Ends the reporting session. Further actions fail with
    /// `PlayerError::ShutDown`; calling this twice is harmless.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.reporter.terminate();
        log::info!("player for {} shut down", self.engine.document().id());
    }
}
