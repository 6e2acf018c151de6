//! Reachability rules. Everything here is a pure function of the document,
//! the progress store and (for `can_advance`) the current position.

use crate::model::{CourseDocument, InteractionKind, Position, ProgressStore, Topic};

/// Lock queries over one document and one progress snapshot.
#[derive(Debug, Clone, Copy)]
pub struct LockRules<'a> {
    document: &'a CourseDocument,
    progress: &'a ProgressStore,
}

impl<'a> LockRules<'a> {
    #[must_use]
    pub fn new(document: &'a CourseDocument, progress: &'a ProgressStore) -> Self {
        Self { document, progress }
    }

    /// A topic is open when module locking is off, when it is the first
    /// topic, or when the previous topic's last page is completed.
    ///
    /// Unknown indices are reported as locked.
    #[must_use]
    pub fn is_topic_locked(&self, topic_index: usize) -> bool {
        if topic_index >= self.document.topics().len() {
            return true;
        }
        if !self.document.settings().lock_modules || topic_index == 0 {
            return false;
        }
        let previous = &self.document.topics()[topic_index - 1];
        !self.progress.is_completed(previous.last_page().id())
    }

    /// Page lock, checked in priority order:
    ///
    /// 1. assessment result pages wait for every question in their topic,
    ///    whatever the global page-lock setting says;
    /// 2. page locking off: open;
    /// 3. the course's first page: open;
    /// 4. a topic's first page follows the topic lock;
    /// 5. anything else waits for the previous page in its topic.
    #[must_use]
    pub fn is_page_locked(&self, position: Position) -> bool {
        let Some(found) = self.document.page_at(position) else {
            return true;
        };

        if found.page.kind() == InteractionKind::AssessmentResult {
            return !self.assessment_result_ready(found.topic);
        }
        if !self.document.settings().lock_pages {
            return false;
        }
        if position == Position::START {
            return false;
        }
        if position.page_index == 0 {
            return self.is_topic_locked(position.topic_index);
        }
        let previous = &found.topic.pages()[position.page_index - 1];
        !self.progress.is_completed(previous.id())
    }

    /// True when every question page of `topic` is completed.
    #[must_use]
    pub fn assessment_result_ready(&self, topic: &Topic) -> bool {
        topic
            .question_pages()
            .all(|page| self.progress.is_completed(page.id()))
    }

    /// Whether the learner may move forward from `position`.
    #[must_use]
    pub fn can_advance(&self, position: Position) -> bool {
        if !self.document.settings().lock_pages {
            return true;
        }
        let Some(found) = self.document.page_at(position) else {
            return false;
        };
        found.page.kind().is_always_passable() || self.progress.is_completed(found.page.id())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
