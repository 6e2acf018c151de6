//! The course engine: one learner walking one course document.
//!
//! Owns the document, the progress store and the current position. Every
//! derived flag (locks, `can_advance`, feedback) is recomputed on demand
//! from those three.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use course_core::evaluation::{self, Grade, GradingContext};
use course_core::locking::LockRules;
use course_core::model::{
    Answer, ChoiceOption, CourseDocument, InteractionKind, PageId, PageRef, Position,
    ProgressEntry, ProgressStore, Snapshot, SubmissionRecord, Topic, TopicId,
};
use course_core::navigation::{self, NavigationError};
use course_core::{RetryError, SubmissionError};

use crate::error::EngineError;

mod view;

pub use view::{Feedback, MenuPage, MenuTopic, PageView};

//
// ─── EVENTS & OUTCOMES ─────────────────────────────────────────────────────────
//

/// Something the reporting adapter needs to hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The learner moved past the final page.
    CourseCompleted,
    /// The learner reached an assessment's result page.
    AssessmentFinished {
        topic: TopicId,
        score: u8,
        passed: bool,
    },
}

/// Result of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Moved { from: Position, to: Position },
    /// Refused by a lock; the position is unchanged.
    Blocked,
    /// Already at a course boundary.
    AtBoundary,
    /// Advanced past the final page.
    CourseCompleted,
}

impl Transition {
    #[must_use]
    pub fn moved(&self) -> bool {
        matches!(self, Transition::Moved { .. })
    }
}

/// What a graded submission did.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub page_id: PageId,
    pub grade: Grade,
    pub entry: ProgressEntry,
    pub feedback: Feedback,
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Navigation, locking and grading for one course.
///
/// The engine never performs I/O. Callers persist `snapshot()` and drain
/// `take_events()` after each action.
#[derive(Debug, Clone)]
pub struct CourseEngine {
    document: CourseDocument,
    progress: ProgressStore,
    position: Position,
    /// Answered pages whose feedback was cleared by `retry`.
    retrying: HashSet<PageId>,
    menu_open: bool,
    transcript_open: bool,
    audio_enabled: bool,
    finished: bool,
    events: Vec<EngineEvent>,
}

impl CourseEngine {
    /// Starts a fresh walk at the first page.
    #[must_use]
    pub fn new(document: CourseDocument) -> Self {
        let audio_enabled =
            document.config().audio_version_enable && document.settings().allow_audio;
        let mut engine = Self {
            document,
            progress: ProgressStore::new(),
            position: Position::START,
            retrying: HashSet::new(),
            menu_open: false,
            transcript_open: false,
            audio_enabled,
            finished: false,
            events: Vec::new(),
        };
        engine.enter(Position::START);
        engine
    }

    #[must_use]
    pub fn document(&self) -> &CourseDocument {
        &self.document
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[must_use]
    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    #[must_use]
    pub fn menu_open(&self) -> bool {
        self.menu_open
    }

    #[must_use]
    pub fn transcript_open(&self) -> bool {
        self.transcript_open
    }

    /// The page at the current position.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::OutOfRange` if the position does not
    /// resolve, which means the engine itself is broken.
    pub fn current_page(&self) -> Result<PageRef<'_>, NavigationError> {
        self.document
            .page_at(self.position)
            .ok_or(NavigationError::OutOfRange(self.position))
    }

    fn rules(&self) -> LockRules<'_> {
        LockRules::new(&self.document, &self.progress)
    }

    fn locate(&self, page: &PageId) -> Result<PageRef<'_>, NavigationError> {
        self.document
            .find_page(page)
            .ok_or_else(|| NavigationError::UnknownPage(page.clone()))
    }

    //
    // ─── LOCKS ─────────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn can_advance(&self) -> bool {
        self.rules().can_advance(self.position)
    }

    /// # Errors
    ///
    /// Returns `NavigationError::UnknownPage` for ids outside the document.
    pub fn is_page_locked(&self, page: &PageId) -> Result<bool, NavigationError> {
        let found = self.locate(page)?;
        Ok(self.rules().is_page_locked(found.position))
    }

    /// # Errors
    ///
    /// Returns `NavigationError::UnknownTopic` for ids outside the document.
    pub fn is_topic_locked(&self, topic: &TopicId) -> Result<bool, NavigationError> {
        let index = self
            .document
            .topic_index(topic)
            .ok_or_else(|| NavigationError::UnknownTopic(topic.clone()))?;
        Ok(self.rules().is_topic_locked(index))
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    /// Moves to the next page in course order.
    ///
    /// Blocked while the current page cannot be left, or when the next page
    /// is locked (an assessment result still waiting for its questions).
    /// Leaving the final page completes the course once; afterwards this is
    /// a boundary no-op.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Navigation` if the current position is invalid.
    pub fn go_next(&mut self) -> Result<Transition, EngineError> {
        if !self.can_advance() {
            log::debug!("next blocked on {:?}", self.position);
            return Ok(Transition::Blocked);
        }
        match navigation::next_position(&self.document, self.position)? {
            Some(to) if self.rules().is_page_locked(to) => {
                log::debug!("next page {to:?} is locked");
                Ok(Transition::Blocked)
            }
            Some(to) => Ok(self.move_to(to)),
            None if self.finished => Ok(Transition::AtBoundary),
            None => {
                self.finished = true;
                log::info!("course {} completed", self.document.id());
                self.events.push(EngineEvent::CourseCompleted);
                Ok(Transition::CourseCompleted)
            }
        }
    }

    /// Moves to the previous page. Locked pages on the way (an assessment
    /// result still waiting for its questions) are stepped over.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Navigation` if the current position is invalid.
    pub fn go_back(&mut self) -> Result<Transition, EngineError> {
        match self.open_position_before(self.position)? {
            Some(to) => Ok(self.move_to(to)),
            None => Ok(Transition::AtBoundary),
        }
    }

    /// Nearest unlocked page before `from`, if any.
    fn open_position_before(&self, from: Position) -> Result<Option<Position>, NavigationError> {
        let rules = self.rules();
        let mut candidate = navigation::previous_position(&self.document, from)?;
        while let Some(at) = candidate {
            if !rules.is_page_locked(at) {
                return Ok(Some(at));
            }
            log::debug!("skipping locked page {at:?}");
            candidate = navigation::previous_position(&self.document, at)?;
        }
        Ok(None)
    }

    /// Jumps to a page, closing the menu. Locked targets are refused.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Navigation` if the ids do not name a page of
    /// that topic.
    pub fn go_to_page(&mut self, topic: &TopicId, page: &PageId) -> Result<Transition, EngineError> {
        let to = navigation::resolve_target(&self.document, topic, page)?;
        if self.rules().is_page_locked(to) {
            log::debug!("jump to {page} blocked");
            return Ok(Transition::Blocked);
        }
        self.menu_open = false;
        Ok(self.move_to(to))
    }

    fn move_to(&mut self, to: Position) -> Transition {
        let from = self.position;
        self.enter(to);
        log::debug!("moved {from:?} -> {to:?}");
        Transition::Moved { from, to }
    }

    /// Arrival side effects: visit, auto-complete, assessment result.
    fn enter(&mut self, position: Position) {
        self.position = position;
        let Some(found) = self.document.page_at(position) else {
            return;
        };
        let page_id = found.page.id().clone();
        let kind = found.page.kind();
        let has_audio = found.page.content().has_audio();
        let result_ready = self.rules().assessment_result_ready(found.topic);

        self.progress.mark_visited(&page_id);
        if kind == InteractionKind::AssessmentResult {
            if result_ready && self.progress.mark_complete(&page_id) {
                self.finish_assessment(position.topic_index);
            }
        } else if !kind.is_question() && (!has_audio || !self.audio_enabled) {
            self.progress.mark_complete(&page_id);
        }
    }

    fn finish_assessment(&mut self, topic_index: usize) {
        let Some(topic) = self.document.topic(topic_index) else {
            return;
        };
        let score = self.score_topic(topic);
        let passed = score >= self.document.settings().pass_score;
        let topic = topic.id().clone();
        log::info!("assessment {topic} finished with {score}% (passed: {passed})");
        self.events.push(EngineEvent::AssessmentFinished {
            topic,
            score,
            passed,
        });
    }

    //
    // ─── ANSWERS ───────────────────────────────────────────────────────────────
    //

    /// Grades and records an answer.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError` (wrapped) when the page is unknown, locked,
    /// already completed, or the answer is incomplete or the wrong shape.
    /// Progress is untouched on error.
    pub fn submit_answer(
        &mut self,
        page_id: &PageId,
        answer: Answer,
    ) -> Result<SubmissionOutcome, EngineError> {
        let found = self
            .document
            .find_page(page_id)
            .ok_or_else(|| SubmissionError::UnknownPage(page_id.clone()))?;
        if self.rules().is_page_locked(found.position) {
            return Err(SubmissionError::Locked(page_id.clone()).into());
        }
        if self.progress.is_completed(page_id) {
            return Err(SubmissionError::AlreadyCompleted(page_id.clone()).into());
        }

        let is_correct =
            evaluation::evaluate(found.page.interaction(), &answer).map_err(SubmissionError::from)?;
        let attempts_allowed = found.page.settings().attempts_allowed();
        let is_assessment = found.topic.is_assessment();
        let context = GradingContext {
            attempts_allowed,
            is_assessment,
            awards_stars: self.document.settings().gamification && found.topic.awards_stars(),
        };
        let grade = evaluation::grade(context, self.progress.attempts(page_id), is_correct);

        let entry = self
            .progress
            .record_submission(
                page_id,
                SubmissionRecord {
                    answer,
                    completed: grade.is_complete,
                    score: grade.stars,
                },
            )
            .clone();
        self.retrying.remove(page_id);
        log::debug!(
            "submitted {page_id}: attempt {} correct={} complete={}",
            grade.attempt,
            grade.is_correct,
            grade.is_complete
        );

        Ok(SubmissionOutcome {
            page_id: page_id.clone(),
            grade,
            entry,
            feedback: Feedback::from_grade(&grade, is_assessment, attempts_allowed),
        })
    }

    /// Clears the feedback of a wrong answer so the learner can try again.
    /// Recorded attempts are kept.
    ///
    /// # Errors
    ///
    /// Returns `RetryError` (wrapped) when the page is unknown, unanswered,
    /// out of attempts or already completed.
    pub fn retry(&mut self, page_id: &PageId) -> Result<(), EngineError> {
        let found = self
            .document
            .find_page(page_id)
            .ok_or_else(|| RetryError::UnknownPage(page_id.clone()))?;
        let entry = self
            .progress
            .get(page_id)
            .filter(|e| e.answer.is_some())
            .ok_or_else(|| RetryError::NotAnswered(page_id.clone()))?;

        if entry.completed {
            let allowed = found.page.settings().attempts_allowed();
            let was_correct = entry
                .answer
                .as_ref()
                .is_some_and(|a| evaluation::evaluate(found.page.interaction(), a).unwrap_or(false));
            if !found.topic.is_assessment() && !was_correct && entry.attempts >= allowed {
                return Err(RetryError::AttemptsExhausted {
                    page: page_id.clone(),
                    allowed,
                }
                .into());
            }
            return Err(RetryError::AlreadyCompleted(page_id.clone()).into());
        }

        self.retrying.insert(page_id.clone());
        Ok(())
    }

    /// Marks a page complete. Returns `false` if it already was.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::UnknownPage` (wrapped) for unknown ids.
    pub fn mark_complete(&mut self, page_id: &PageId) -> Result<bool, EngineError> {
        self.locate(page_id)?;
        Ok(self.progress.mark_complete(page_id))
    }

    /// Audio or video playback on `page_id` reached its end.
    ///
    /// Only the current page counts; playback reported for any other page
    /// is ignored. Non-interactive pages complete, and media flagged
    /// `autoAdvance` then moves on.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` for unknown ids or a broken position.
    pub fn media_finished(&mut self, page_id: &PageId) -> Result<Option<Transition>, EngineError> {
        let found = self.locate(page_id)?;
        if found.position != self.position {
            log::debug!("ignoring media end on {page_id}; current page is {:?}", self.position);
            return Ok(None);
        }
        let auto_advance = found
            .page
            .content()
            .media
            .as_ref()
            .is_some_and(|m| m.auto_advance);

        if !found.page.kind().is_question() {
            self.progress.mark_complete(page_id);
        }
        if auto_advance {
            return self.go_next().map(Some);
        }
        Ok(None)
    }

    /// Turns narration on or off. Turning it off completes the current
    /// non-interactive page, since there is nothing left to wait for.
    pub fn set_audio_enabled(&mut self, enabled: bool) {
        self.audio_enabled = enabled && self.document.settings().allow_audio;
        if self.audio_enabled {
            return;
        }
        let Some(found) = self.document.page_at(self.position) else {
            return;
        };
        if !found.page.kind().is_question() {
            let page_id = found.page.id().clone();
            self.progress.mark_complete(&page_id);
        }
    }

    pub fn toggle_menu(&mut self) -> bool {
        self.menu_open = !self.menu_open;
        self.menu_open
    }

    pub fn toggle_transcript(&mut self) -> bool {
        self.transcript_open = !self.transcript_open;
        self.transcript_open
    }

    //
    // ─── VARIANTS & SNAPSHOTS ──────────────────────────────────────────────────
    //

    /// Replaces the document with another language variant of the same
    /// course. The position is re-resolved by page id; progress is kept.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::VariantMismatch` for a different course and
    /// `EngineError::MissingPage` if the current page does not exist in the
    /// new variant. The old document stays in place on error.
    pub fn switch_variant(&mut self, document: CourseDocument) -> Result<(), EngineError> {
        if document.id() != self.document.id() {
            return Err(EngineError::VariantMismatch {
                expected: self.document.id().clone(),
                found: document.id().clone(),
            });
        }
        let current = self.current_page()?.page.id().clone();
        let position = document
            .position_of(&current)
            .ok_or_else(|| EngineError::MissingPage(current.clone()))?;

        log::info!(
            "switched course {} from {} to {}",
            document.id(),
            self.document.language(),
            document.language()
        );
        self.document = document;
        self.position = position;
        self.menu_open = false;
        self.transcript_open = false;
        Ok(())
    }

    /// Captures position and progress for persistence.
    #[must_use]
    pub fn snapshot(&self, saved_at: DateTime<Utc>) -> Snapshot {
        Snapshot::capture(&self.document, self.position, &self.progress, saved_at)
    }

    /// Restores a saved walk. A position that no longer resolves falls back
    /// to the first page; a locked one to the nearest open page before it.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::VariantMismatch` if the snapshot belongs to
    /// another course.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) -> Result<(), EngineError> {
        if snapshot.course_id != *self.document.id() {
            return Err(EngineError::VariantMismatch {
                expected: self.document.id().clone(),
                found: snapshot.course_id,
            });
        }
        let position = snapshot.position.resolve(&self.document).unwrap_or_else(|| {
            log::warn!(
                "saved position for {} no longer resolves; starting over",
                self.document.id()
            );
            Position::START
        });

        self.progress.replace(snapshot.progress);
        let position = if self.rules().is_page_locked(position) {
            self.open_position_before(position)
                .ok()
                .flatten()
                .unwrap_or(Position::START)
        } else {
            position
        };
        self.retrying.clear();
        self.finished = false;
        self.menu_open = false;
        self.enter(position);
        Ok(())
    }

    /// Forgets all progress and returns to the first page.
    pub fn restart(&mut self) {
        self.progress.clear();
        self.retrying.clear();
        self.finished = false;
        self.menu_open = false;
        self.transcript_open = false;
        self.enter(Position::START);
    }

    /// Drains events raised since the last call.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    //
    // ─── SCORES ────────────────────────────────────────────────────────────────
    //

    fn star_pages(&self) -> impl Iterator<Item = PageRef<'_>> {
        let gamification = self.document.settings().gamification;
        self.document
            .pages()
            .filter(move |p| gamification && p.topic.awards_stars() && p.page.kind().is_question())
    }

    #[must_use]
    pub fn total_stars(&self) -> u32 {
        self.star_pages()
            .filter_map(|p| self.progress.get(p.page.id()))
            .map(|e| u32::from(e.score))
            .sum()
    }

    #[must_use]
    pub fn max_stars(&self) -> u32 {
        let pages = u32::try_from(self.star_pages().count()).unwrap_or(u32::MAX);
        pages.saturating_mul(u32::from(evaluation::star_award(1, true)))
    }

    /// Percentage of the topic's questions answered correctly, rounded down.
    /// A topic without questions scores 100.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::UnknownTopic` for unknown ids.
    pub fn assessment_score(&self, topic: &TopicId) -> Result<u8, NavigationError> {
        let index = self
            .document
            .topic_index(topic)
            .ok_or_else(|| NavigationError::UnknownTopic(topic.clone()))?;
        let topic = self
            .document
            .topic(index)
            .ok_or_else(|| NavigationError::UnknownTopic(topic.clone()))?;
        Ok(self.score_topic(topic))
    }

    fn score_topic(&self, topic: &Topic) -> u8 {
        let mut total = 0u32;
        let mut correct = 0u32;
        for page in topic.question_pages() {
            total += 1;
            let is_correct = self
                .progress
                .get(page.id())
                .and_then(|e| e.answer.as_ref())
                .is_some_and(|a| evaluation::evaluate(page.interaction(), a).unwrap_or(false));
            if is_correct {
                correct += 1;
            }
        }
        if total == 0 {
            return 100;
        }
        u8::try_from(correct * 100 / total).unwrap_or(100)
    }

    /// Choice options in presentation order. Assessment options are
    /// shuffled with `seed` when the course asks for it; grading never
    /// depends on this order.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::UnknownPage` for unknown ids.
    pub fn shuffled_options(
        &self,
        page_id: &PageId,
        seed: u64,
    ) -> Result<Vec<&ChoiceOption>, NavigationError> {
        let found = self.locate(page_id)?;
        let mut options: Vec<&ChoiceOption> = found.page.interaction().options().iter().collect();
        if self.document.settings().shuffle_assessment && found.topic.is_assessment() {
            let mut rng = StdRng::seed_from_u64(seed);
            options.shuffle(&mut rng);
        }
        Ok(options)
    }

    //
    // ─── VIEWS ─────────────────────────────────────────────────────────────────
    //

    fn feedback_for(&self, found: &PageRef<'_>) -> Option<Feedback> {
        let id = found.page.id();
        if self.retrying.contains(id) {
            return None;
        }
        let entry = self.progress.get(id)?;
        let answer = entry.answer.as_ref()?;
        if found.topic.is_assessment() {
            return Some(Feedback::Recorded);
        }
        let is_correct = evaluation::evaluate(found.page.interaction(), answer).unwrap_or(false);
        Some(if is_correct {
            Feedback::Correct { stars: entry.score }
        } else if entry.completed {
            Feedback::Exhausted
        } else {
            Feedback::Incorrect {
                attempts_remaining: found
                    .page
                    .settings()
                    .attempts_allowed()
                    .saturating_sub(entry.attempts),
            }
        })
    }

    /// Read-only view of the current page.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::OutOfRange` if the position is broken.
    pub fn view(&self) -> Result<PageView<'_>, NavigationError> {
        let found = self.current_page()?;
        let rules = self.rules();
        Ok(PageView {
            topic: found.topic,
            page: found.page,
            position: self.position,
            progress: self.progress.get(found.page.id()).cloned().unwrap_or_default(),
            is_locked: rules.is_page_locked(self.position),
            can_advance: rules.can_advance(self.position),
            is_first: self.position == Position::START,
            is_last: self.position == self.document.last_position(),
            page_number: self.document.ordinal(self.position).unwrap_or(1),
            total_pages: self.document.page_count(),
            feedback: self.feedback_for(&found),
            menu_open: self.menu_open,
            transcript_open: self.transcript_open,
            audio_enabled: self.audio_enabled,
            finished: self.finished,
        })
    }

    /// Topics and pages with their lock and completion state.
    #[must_use]
    pub fn menu(&self) -> Vec<MenuTopic<'_>> {
        let rules = self.rules();
        self.document
            .topics()
            .iter()
            .enumerate()
            .map(|(topic_index, topic)| MenuTopic {
                topic,
                is_locked: rules.is_topic_locked(topic_index),
                is_completed: self.progress.is_completed(topic.last_page().id()),
                pages: topic
                    .pages()
                    .iter()
                    .enumerate()
                    .map(|(page_index, page)| {
                        let position = Position::new(topic_index, page_index);
                        MenuPage {
                            page,
                            position,
                            is_locked: rules.is_page_locked(position),
                            is_completed: self.progress.is_completed(page.id()),
                            is_current: position == self.position,
                        }
                    })
                    .collect(),
            })
            .collect()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::evaluation::IncompleteSubmission;
    use course_core::model::SavedPosition;
    use course_core::time::fixed_now;
    use std::collections::BTreeSet;

    const TEMPLATE: &str = r#"{ "CourseName": "Engine Test", "AudioVersionEnable": true }"#;

    const TOC: &str = r#"{
        "id": "engine-test",
        "title": "Engine Test",
        "globalSettings": {
            "passScore": 50,
            "lockModules": true,
            "lockPages": true,
            "gamification": true,
            "shuffleAssessment": true
        },
        "topics": [
            { "id": "t1", "title": "Basics", "pages": [
                { "id": "p_land", "title": "Welcome", "template": "landing" },
                { "id": "p_info", "title": "Narrated", "template": "text_only",
                  "content": { "body": "Hello", "audio": "audio/info.mp3" } },
                { "id": "p_q", "title": "Pick one", "template": "samc",
                  "settings": { "attemptsAllowed": 3 },
                  "content": { "options": [
                      { "id": "a", "text": "A" },
                      { "id": "b", "text": "B", "isCorrect": true }
                  ] } },
                { "id": "p_vid", "title": "Watch", "template": "video",
                  "content": { "media": { "type": "video", "src": "v.mp4", "autoAdvance": true } } }
            ]},
            { "id": "t2", "title": "Practice", "pages": [
                { "id": "p_m", "title": "Pick many", "template": "mamc",
                  "settings": { "attemptsAllowed": 2 },
                  "content": { "options": [
                      { "id": "a", "text": "A", "isCorrect": true },
                      { "id": "b", "text": "B" },
                      { "id": "c", "text": "C", "isCorrect": true }
                  ] } },
                { "id": "p_s", "title": "Sort", "template": "sorting",
                  "content": { "sortingItems": [
                      { "id": "s1", "text": "One" },
                      { "id": "s2", "text": "Two" },
                      { "id": "s3", "text": "Three" }
                  ] } }
            ]},
            { "id": "t3", "title": "Assessment", "isAssessment": true, "pages": [
                { "id": "p_intro", "title": "Start", "template": "assessment_intro" },
                { "id": "q1", "title": "Q1", "template": "samc",
                  "content": { "options": [
                      { "id": "a", "text": "A", "isCorrect": true },
                      { "id": "b", "text": "B" },
                      { "id": "c", "text": "C" },
                      { "id": "d", "text": "D" }
                  ] } },
                { "id": "q2", "title": "Q2", "template": "samc",
                  "content": { "options": [
                      { "id": "a", "text": "A" },
                      { "id": "b", "text": "B", "isCorrect": true }
                  ] } },
                { "id": "p_res", "title": "Result", "template": "assessment_result" }
            ]}
        ]
    }"#;

    /// An assessment topic followed by an ordinary one, no locking.
    const ASSESSMENT_FIRST_TOC: &str = r#"{
        "id": "engine-test",
        "title": "Engine Test",
        "globalSettings": { "passScore": 50 },
        "topics": [
            { "id": "t1", "title": "Check", "isAssessment": true, "pages": [
                { "id": "p_intro", "title": "Start", "template": "assessment_intro" },
                { "id": "q1", "title": "Q1", "template": "samc",
                  "content": { "options": [
                      { "id": "a", "text": "A", "isCorrect": true },
                      { "id": "b", "text": "B" }
                  ] } },
                { "id": "p_res", "title": "Result", "template": "assessment_result" }
            ]},
            { "id": "t2", "title": "After", "pages": [
                { "id": "p_after", "title": "After", "template": "text_only" }
            ]}
        ]
    }"#;

    fn document(toc: &str) -> CourseDocument {
        CourseDocument::from_json("en", TEMPLATE, toc).unwrap()
    }

    fn engine() -> CourseEngine {
        CourseEngine::new(document(TOC))
    }

    fn unlocked_engine() -> CourseEngine {
        let toc = TOC
            .replace(r#""lockModules": true"#, r#""lockModules": false"#)
            .replace(r#""lockPages": true"#, r#""lockPages": false"#);
        CourseEngine::new(document(&toc))
    }

    fn pid(id: &str) -> PageId {
        PageId::new(id)
    }

    fn single(id: &str) -> Answer {
        Answer::Single(id.into())
    }

    /// Walks a locked engine onto `p_q` with narration off.
    fn at_question(engine: &mut CourseEngine) {
        engine.set_audio_enabled(false);
        engine.go_next().unwrap();
        assert_eq!(engine.go_next().unwrap(), Transition::Moved {
            from: Position::new(0, 1),
            to: Position::new(0, 2),
        });
    }

    #[test]
    fn starts_on_a_completed_landing_page() {
        let engine = engine();
        assert_eq!(engine.position(), Position::START);
        assert!(engine.audio_enabled());
        assert!(engine.progress().is_completed(&pid("p_land")));
        assert!(engine.can_advance());

        let view = engine.view().unwrap();
        assert!(view.is_first);
        assert_eq!(view.page_number, 1);
        assert_eq!(view.total_pages, 10);
    }

    #[test]
    fn narrated_page_blocks_until_audio_finishes() {
        let mut engine = engine();
        assert!(engine.go_next().unwrap().moved());
        assert!(!engine.can_advance());
        assert_eq!(engine.go_next().unwrap(), Transition::Blocked);
        assert_eq!(engine.position(), Position::new(0, 1));

        assert_eq!(engine.media_finished(&pid("p_info")).unwrap(), None);
        assert!(engine.can_advance());
        assert!(engine.go_next().unwrap().moved());
    }

    #[test]
    fn turning_audio_off_completes_the_current_page() {
        let mut engine = engine();
        engine.go_next().unwrap();
        assert!(!engine.progress().is_completed(&pid("p_info")));

        engine.set_audio_enabled(false);
        assert!(engine.progress().is_completed(&pid("p_info")));
        assert!(!engine.audio_enabled());
    }

    #[test]
    fn go_back_stops_at_the_start() {
        let mut engine = engine();
        assert_eq!(engine.go_back().unwrap(), Transition::AtBoundary);
        engine.go_next().unwrap();
        assert!(engine.go_back().unwrap().moved());
        assert_eq!(engine.position(), Position::START);
    }

    #[test]
    fn go_back_steps_over_an_unready_result_page() {
        let mut engine = CourseEngine::new(document(ASSESSMENT_FIRST_TOC));
        assert!(
            engine
                .go_to_page(&TopicId::new("t2"), &pid("p_after"))
                .unwrap()
                .moved()
        );

        assert_eq!(engine.go_back().unwrap(), Transition::Moved {
            from: Position::new(1, 0),
            to: Position::new(0, 1),
        });
        assert!(!engine.progress().is_completed(&pid("p_res")));
        assert!(engine.take_events().is_empty());

        engine.submit_answer(&pid("q1"), single("a")).unwrap();
        assert!(engine.go_next().unwrap().moved());
        assert_eq!(engine.take_events(), vec![EngineEvent::AssessmentFinished {
            topic: TopicId::new("t1"),
            score: 100,
            passed: true,
        }]);
    }

    #[test]
    fn media_end_on_another_page_is_ignored() {
        let mut engine = engine();
        assert_eq!(engine.media_finished(&pid("p_info")).unwrap(), None);
        assert!(!engine.progress().is_completed(&pid("p_info")));
        assert_eq!(engine.position(), Position::START);

        at_question(&mut engine);
        engine.submit_answer(&pid("p_q"), single("b")).unwrap();
        assert_eq!(engine.media_finished(&pid("p_vid")).unwrap(), None);
        assert!(engine.is_topic_locked(&TopicId::new("t2")).unwrap());
        assert_eq!(
            engine.go_to_page(&TopicId::new("t2"), &pid("p_m")).unwrap(),
            Transition::Blocked
        );
    }

    #[test]
    fn second_attempt_correct_earns_two_stars() {
        let mut engine = engine();
        at_question(&mut engine);

        let first = engine.submit_answer(&pid("p_q"), single("a")).unwrap();
        assert_eq!(first.feedback, Feedback::Incorrect {
            attempts_remaining: 2
        });
        assert!(!first.entry.completed);
        assert_eq!(first.entry.attempts, 1);
        assert!(!engine.can_advance());

        engine.retry(&pid("p_q")).unwrap();
        assert_eq!(engine.view().unwrap().feedback, None);
        assert_eq!(engine.progress().attempts(&pid("p_q")), 1);

        let second = engine.submit_answer(&pid("p_q"), single("b")).unwrap();
        assert_eq!(second.feedback, Feedback::Correct { stars: 2 });
        assert!(second.entry.completed);
        assert_eq!(second.entry.score, 2);
        assert_eq!(engine.view().unwrap().feedback, Some(Feedback::Correct { stars: 2 }));
        assert_eq!(engine.total_stars(), 2);
        assert_eq!(engine.max_stars(), 9);
    }

    #[test]
    fn completed_pages_refuse_further_answers() {
        let mut engine = engine();
        at_question(&mut engine);
        engine.submit_answer(&pid("p_q"), single("b")).unwrap();

        let err = engine.submit_answer(&pid("p_q"), single("a")).unwrap_err();
        assert_eq!(
            err,
            EngineError::Submission(SubmissionError::AlreadyCompleted(pid("p_q")))
        );
        assert_eq!(engine.progress().get(&pid("p_q")).unwrap().score, 3);
        assert!(matches!(
            engine.retry(&pid("p_q")),
            Err(EngineError::Retry(RetryError::AlreadyCompleted(_)))
        ));
    }

    #[test]
    fn three_wrong_answers_exhaust_the_page() {
        let mut engine = engine();
        at_question(&mut engine);
        for _ in 0..2 {
            engine.submit_answer(&pid("p_q"), single("a")).unwrap();
            engine.retry(&pid("p_q")).unwrap();
        }
        let last = engine.submit_answer(&pid("p_q"), single("a")).unwrap();
        assert_eq!(last.feedback, Feedback::Exhausted);
        assert!(last.entry.completed);
        assert_eq!(last.entry.score, 0);

        assert_eq!(
            engine.retry(&pid("p_q")).unwrap_err(),
            EngineError::Retry(RetryError::AttemptsExhausted {
                page: pid("p_q"),
                allowed: 3,
            })
        );
        assert!(engine.can_advance());
    }

    #[test]
    fn rejected_submissions_leave_progress_alone() {
        let mut engine = engine();
        at_question(&mut engine);
        let version = engine.progress().version();

        let err = engine.submit_answer(&pid("p_q"), single(" ")).unwrap_err();
        let EngineError::Submission(reason) = err else {
            panic!("expected a submission error");
        };
        assert_eq!(reason.incomplete(), Some(&IncompleteSubmission::NothingSelected));

        let locked = engine
            .submit_answer(&pid("p_m"), Answer::Multiple(BTreeSet::from(["a".to_owned()])))
            .unwrap_err();
        assert_eq!(locked, EngineError::Submission(SubmissionError::Locked(pid("p_m"))));

        assert!(matches!(
            engine.retry(&pid("p_q")),
            Err(EngineError::Retry(RetryError::NotAnswered(_)))
        ));
        assert_eq!(engine.progress().version(), version);
        assert_eq!(engine.progress().attempts(&pid("p_q")), 0);
    }

    #[test]
    fn jumps_respect_locks_and_close_the_menu() {
        let mut engine = engine();
        assert!(engine.toggle_menu());
        assert_eq!(
            engine.go_to_page(&TopicId::new("t2"), &pid("p_m")).unwrap(),
            Transition::Blocked
        );
        assert!(engine.menu_open());
        assert!(engine.is_topic_locked(&TopicId::new("t2")).unwrap());

        let moved = engine.go_to_page(&TopicId::new("t1"), &pid("p_info")).unwrap();
        assert!(moved.moved());
        assert!(!engine.menu_open());

        let err = engine
            .go_to_page(&TopicId::new("t2"), &pid("p_info"))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Navigation(NavigationError::PageNotInTopic { .. })
        ));
    }

    #[test]
    fn finished_video_advances_into_the_next_topic() {
        let mut engine = engine();
        at_question(&mut engine);
        engine.submit_answer(&pid("p_q"), single("b")).unwrap();
        engine.go_next().unwrap();
        assert_eq!(engine.position(), Position::new(0, 3));
        assert!(engine.progress().is_completed(&pid("p_vid")));

        let moved = engine.media_finished(&pid("p_vid")).unwrap();
        assert_eq!(moved, Some(Transition::Moved {
            from: Position::new(0, 3),
            to: Position::new(1, 0),
        }));
        assert!(!engine.is_topic_locked(&TopicId::new("t2")).unwrap());
    }

    #[test]
    fn assessment_result_waits_for_every_question() {
        let mut engine = unlocked_engine();
        engine
            .go_to_page(&TopicId::new("t3"), &pid("q2"))
            .unwrap();
        assert!(engine.is_page_locked(&pid("p_res")).unwrap());
        assert_eq!(engine.go_next().unwrap(), Transition::Blocked);
        assert_eq!(
            engine.go_to_page(&TopicId::new("t3"), &pid("p_res")).unwrap(),
            Transition::Blocked
        );

        let q1 = engine.submit_answer(&pid("q1"), single("a")).unwrap();
        assert_eq!(q1.feedback, Feedback::Recorded);
        let q2 = engine.submit_answer(&pid("q2"), single("a")).unwrap();
        assert!(q2.entry.completed);
        assert_eq!(q2.entry.score, 0);
        assert!(matches!(
            engine.retry(&pid("q2")),
            Err(EngineError::Retry(RetryError::AlreadyCompleted(_)))
        ));
        assert!(!engine.is_page_locked(&pid("p_res")).unwrap());

        assert!(engine.go_next().unwrap().moved());
        assert_eq!(engine.take_events(), vec![EngineEvent::AssessmentFinished {
            topic: TopicId::new("t3"),
            score: 50,
            passed: true,
        }]);
        assert_eq!(engine.assessment_score(&TopicId::new("t3")).unwrap(), 50);
    }

    #[test]
    fn leaving_the_last_page_completes_the_course_once() {
        let mut engine = unlocked_engine();
        engine.submit_answer(&pid("q1"), single("a")).unwrap();
        engine.submit_answer(&pid("q2"), single("b")).unwrap();
        engine
            .go_to_page(&TopicId::new("t3"), &pid("p_res"))
            .unwrap();
        assert!(engine.view().unwrap().is_last);

        assert_eq!(engine.go_next().unwrap(), Transition::CourseCompleted);
        assert_eq!(engine.go_next().unwrap(), Transition::AtBoundary);
        assert!(engine.is_finished());

        let events = engine.take_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], EngineEvent::CourseCompleted);
        assert!(engine.take_events().is_empty());
    }

    #[test]
    fn variant_swap_keeps_progress_and_page() {
        let mut engine = engine();
        engine.go_next().unwrap();
        engine.toggle_transcript();
        let before = engine.progress().clone();

        let spanish = CourseDocument::from_json(
            "es",
            TEMPLATE,
            &TOC.replace(r#""title": "Narrated""#, r#""title": "Narrado""#),
        )
        .unwrap();
        engine.switch_variant(spanish).unwrap();

        assert_eq!(engine.document().language(), "es");
        assert_eq!(engine.position(), Position::new(0, 1));
        assert_eq!(engine.current_page().unwrap().page.title(), "Narrado");
        assert_eq!(engine.progress(), &before);
        assert!(!engine.transcript_open());
    }

    #[test]
    fn foreign_or_incompatible_variants_are_rejected() {
        let mut engine = engine();
        engine.go_next().unwrap();

        let other = document(&TOC.replace(r#""id": "engine-test""#, r#""id": "other""#));
        assert!(matches!(
            engine.switch_variant(other),
            Err(EngineError::VariantMismatch { .. })
        ));

        let renamed = document(&TOC.replace(r#""id": "p_info""#, r#""id": "p_info_2""#));
        assert_eq!(
            engine.switch_variant(renamed).unwrap_err(),
            EngineError::MissingPage(pid("p_info"))
        );
        assert_eq!(engine.document().language(), "en");
    }

    #[test]
    fn snapshot_restores_position_and_progress() {
        let mut engine = engine();
        at_question(&mut engine);
        engine.submit_answer(&pid("p_q"), single("a")).unwrap();
        let snapshot = engine.snapshot(fixed_now());

        let mut restored = CourseEngine::new(document(TOC));
        restored.apply_snapshot(snapshot).unwrap();
        assert_eq!(restored.position(), Position::new(0, 2));
        assert_eq!(restored.progress().attempts(&pid("p_q")), 1);
        assert_eq!(
            restored.view().unwrap().feedback,
            Some(Feedback::Incorrect {
                attempts_remaining: 2
            })
        );
    }

    #[test]
    fn unresolvable_snapshot_position_falls_back_to_start() {
        let mut engine = engine();
        let mut snapshot = engine.snapshot(fixed_now());
        snapshot.position.page_id = Some(pid("gone"));
        snapshot.position.topic_id = None;
        snapshot.position.topic_index = 42;

        engine.apply_snapshot(snapshot).unwrap();
        assert_eq!(engine.position(), Position::START);
    }

    #[test]
    fn snapshot_on_an_unready_result_page_resumes_before_it() {
        let mut engine = CourseEngine::new(document(ASSESSMENT_FIRST_TOC));
        let mut snapshot = engine.snapshot(fixed_now());
        snapshot.position = SavedPosition::capture(engine.document(), Position::new(0, 2));

        engine.apply_snapshot(snapshot).unwrap();
        assert_eq!(engine.position(), Position::new(0, 1));
        assert!(!engine.progress().is_completed(&pid("p_res")));
        assert!(engine.take_events().is_empty());
    }

    #[test]
    fn restart_forgets_everything() {
        let mut engine = engine();
        at_question(&mut engine);
        engine.submit_answer(&pid("p_q"), single("b")).unwrap();

        engine.restart();
        assert_eq!(engine.position(), Position::START);
        assert_eq!(engine.progress().len(), 1);
        assert_eq!(engine.total_stars(), 0);
    }

    #[test]
    fn assessment_options_shuffle_deterministically() {
        let engine = engine();
        let first: Vec<&str> = engine
            .shuffled_options(&pid("q1"), 7)
            .unwrap()
            .iter()
            .map(|o| o.id.as_str())
            .collect();
        let again: Vec<&str> = engine
            .shuffled_options(&pid("q1"), 7)
            .unwrap()
            .iter()
            .map(|o| o.id.as_str())
            .collect();
        assert_eq!(first, again);
        let mut sorted = first.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec!["a", "b", "c", "d"]);

        let practice: Vec<&str> = engine
            .shuffled_options(&pid("p_q"), 7)
            .unwrap()
            .iter()
            .map(|o| o.id.as_str())
            .collect();
        assert_eq!(practice, vec!["a", "b"]);
    }

    #[test]
    fn menu_reports_locks_and_current_page() {
        let mut engine = engine();
        engine.go_next().unwrap();
        let menu = engine.menu();

        assert_eq!(menu.len(), 3);
        assert!(!menu[0].is_locked);
        assert!(menu[1].is_locked);
        assert!(menu[0].pages[1].is_current);
        assert!(menu[0].pages[0].is_completed);
        assert!(menu[0].pages[2].is_locked);
        assert!(menu[2].pages[3].is_locked);
    }
}
