use course_core::evaluation::Grade;
use course_core::model::{Page, Position, ProgressEntry, Topic};

/// Feedback shown under an answered question.
///
/// Presentation-agnostic: no strings, the UI picks its own labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Correct { stars: u8 },
    /// Wrong, with attempts left to retry.
    Incorrect { attempts_remaining: u32 },
    /// Wrong, and no attempts are left.
    Exhausted,
    /// Assessment answers are recorded without revealing correctness.
    Recorded,
}

impl Feedback {
    #[must_use]
    pub fn from_grade(grade: &Grade, is_assessment: bool, attempts_allowed: u32) -> Self {
        if is_assessment {
            Feedback::Recorded
        } else if grade.is_correct {
            Feedback::Correct { stars: grade.stars }
        } else if grade.is_complete {
            Feedback::Exhausted
        } else {
            Feedback::Incorrect {
                attempts_remaining: grade.attempts_remaining(attempts_allowed),
            }
        }
    }

    #[must_use]
    pub fn can_retry(&self) -> bool {
        matches!(self, Feedback::Incorrect { .. })
    }
}

/// Read-only view of the current page.
#[derive(Debug, Clone)]
pub struct PageView<'a> {
    pub topic: &'a Topic,
    pub page: &'a Page,
    pub position: Position,
    pub progress: ProgressEntry,
    pub is_locked: bool,
    pub can_advance: bool,
    pub is_first: bool,
    pub is_last: bool,
    /// 1-based number of the page across the whole course.
    pub page_number: usize,
    pub total_pages: usize,
    pub feedback: Option<Feedback>,
    pub menu_open: bool,
    pub transcript_open: bool,
    pub audio_enabled: bool,
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub struct MenuTopic<'a> {
    pub topic: &'a Topic,
    pub is_locked: bool,
    /// The topic's last page is completed.
    pub is_completed: bool,
    pub pages: Vec<MenuPage<'a>>,
}

#[derive(Debug, Clone)]
pub struct MenuPage<'a> {
    pub page: &'a Page,
    pub position: Position,
    pub is_locked: bool,
    pub is_completed: bool,
    pub is_current: bool,
}
