use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::ids::PageId;

//
// ─── ANSWER ────────────────────────────────────────────────────────────────────
//

/// A learner's submitted answer, shaped by the page's interaction kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    /// One option id.
    Single(String),
    /// A set of option ids.
    Multiple(BTreeSet<String>),
    /// Left item id to right item id.
    Matching(BTreeMap<String, String>),
    Slider(f64),
    /// Item ids in the submitted order.
    Ordering(Vec<String>),
}

impl Answer {
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Answer::Single(_) => "single",
            Answer::Multiple(_) => "multiple",
            Answer::Matching(_) => "matching",
            Answer::Slider(_) => "slider",
            Answer::Ordering(_) => "ordering",
        }
    }
}

//
// ─── PROGRESS ENTRY ────────────────────────────────────────────────────────────
//

/// Learner state for one page.
///
/// Invariant: `completed` implies `visited`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressEntry {
    pub visited: bool,
    pub completed: bool,
    pub attempts: u32,
    /// Stars awarded (0-3). Written once, when the page completes by submission.
    pub score: u8,
    pub answer: Option<Answer>,
}

/// Result of a graded submission, applied to a page's entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRecord {
    pub answer: Answer,
    pub completed: bool,
    pub score: u8,
}

//
// ─── PROGRESS STORE ────────────────────────────────────────────────────────────
//

/// Page id → learner state. Entries are created lazily and never removed
/// individually; `clear` wipes everything on restart.
///
/// Every mutation bumps `version`, which observers use to detect change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<PageId, ProgressEntry>", into = "BTreeMap<PageId, ProgressEntry>")]
pub struct ProgressStore {
    entries: BTreeMap<PageId, ProgressEntry>,
    version: u64,
}

impl ProgressStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &PageId) -> Option<&ProgressEntry> {
        self.entries.get(id)
    }

    #[must_use]
    pub fn is_completed(&self, id: &PageId) -> bool {
        self.entries.get(id).is_some_and(|e| e.completed)
    }

    #[must_use]
    pub fn attempts(&self, id: &PageId) -> u32 {
        self.entries.get(id).map_or(0, |e| e.attempts)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PageId, &ProgressEntry)> {
        self.entries.iter()
    }

    /// Monotonic mutation counter. Not persisted.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Marks a page visited. Returns `true` if anything changed.
    pub fn mark_visited(&mut self, id: &PageId) -> bool {
        let entry = self.entries.entry(id.clone()).or_default();
        if entry.visited {
            return false;
        }
        entry.visited = true;
        self.version += 1;
        true
    }

    /// Marks a page visited and completed. Returns `true` if anything changed.
    ///
    /// Never touches `attempts` or `score`.
    pub fn mark_complete(&mut self, id: &PageId) -> bool {
        let entry = self.entries.entry(id.clone()).or_default();
        if entry.completed {
            return false;
        }
        entry.visited = true;
        entry.completed = true;
        self.version += 1;
        true
    }

    /// Applies a graded submission and returns the updated entry.
    ///
    /// Attempts only grow. A completed page stays completed, and its score is
    /// written only on the transition into completed.
    pub fn record_submission(&mut self, id: &PageId, record: SubmissionRecord) -> &ProgressEntry {
        let entry = self.entries.entry(id.clone()).or_default();
        let was_completed = entry.completed;

        entry.visited = true;
        entry.attempts = entry.attempts.saturating_add(1);
        entry.answer = Some(record.answer);
        if !was_completed && record.completed {
            entry.completed = true;
            entry.score = record.score;
        }
        self.version += 1;
        entry
    }

    /// Drops every entry (course restart).
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.version += 1;
        }
    }

    /// Replaces all entries with restored ones.
    pub fn replace(&mut self, restored: ProgressStore) {
        self.entries = restored.entries;
        self.version += 1;
    }
}

impl PartialEq for ProgressStore {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl From<BTreeMap<PageId, ProgressEntry>> for ProgressStore {
    fn from(entries: BTreeMap<PageId, ProgressEntry>) -> Self {
        Self {
            entries,
            version: 0,
        }
    }
}

impl From<ProgressStore> for BTreeMap<PageId, ProgressEntry> {
    fn from(store: ProgressStore) -> Self {
        store.entries
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn record(answer: Answer, completed: bool, score: u8) -> SubmissionRecord {
        SubmissionRecord {
            answer,
            completed,
            score,
        }
    }

    #[test]
    fn entries_are_created_lazily() {
        let mut store = ProgressStore::new();
        let id = PageId::new("p1");
        assert!(store.get(&id).is_none());
        assert!(!store.is_completed(&id));

        assert!(store.mark_visited(&id));
        assert!(!store.mark_visited(&id));
        let entry = store.get(&id).unwrap();
        assert!(entry.visited);
        assert!(!entry.completed);
        assert_eq!(entry.attempts, 0);
    }

    #[test]
    fn mark_complete_is_idempotent() {
        let mut store = ProgressStore::new();
        let id = PageId::new("q1");
        store.record_submission(&id, record(Answer::Single("b".into()), true, 3));

        let before = store.get(&id).cloned().unwrap();
        let version = store.version();
        assert!(!store.mark_complete(&id));
        assert!(!store.mark_complete(&id));
        assert_eq!(store.get(&id), Some(&before));
        assert_eq!(store.version(), version);
    }

    #[test]
    fn completed_implies_visited() {
        let mut store = ProgressStore::new();
        let id = PageId::new("p1");
        store.mark_complete(&id);
        let entry = store.get(&id).unwrap();
        assert!(entry.completed && entry.visited);
    }

    #[test]
    fn score_is_written_once_on_completion() {
        let mut store = ProgressStore::new();
        let id = PageId::new("q1");

        let entry = store.record_submission(&id, record(Answer::Single("a".into()), false, 0));
        assert_eq!(entry.attempts, 1);
        assert!(!entry.completed);
        assert_eq!(entry.score, 0);

        let entry = store.record_submission(&id, record(Answer::Single("b".into()), true, 2));
        assert_eq!(entry.attempts, 2);
        assert!(entry.completed);
        assert_eq!(entry.score, 2);

        let entry = store.record_submission(&id, record(Answer::Single("b".into()), true, 3));
        assert_eq!(entry.attempts, 3);
        assert_eq!(entry.score, 2);
    }

    #[test]
    fn clear_wipes_entries_and_bumps_version() {
        let mut store = ProgressStore::new();
        store.mark_complete(&PageId::new("a"));
        let version = store.version();
        store.clear();
        assert!(store.is_empty());
        assert!(store.version() > version);
    }

    #[test]
    fn serializes_as_a_plain_map() {
        let mut store = ProgressStore::new();
        store.record_submission(
            &PageId::new("m1"),
            record(
                Answer::Matching(BTreeMap::from([("m1".into(), "m1".into())])),
                true,
                3,
            ),
        );
        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json["m1"]["attempts"], 1);
        assert_eq!(json["m1"]["answer"]["kind"], "matching");

        let back: ProgressStore = serde_json::from_value(json).unwrap();
        assert_eq!(back, store);
    }

    #[test]
    fn partial_entries_fill_defaults() {
        let store: ProgressStore =
            serde_json::from_str(r#"{ "p1": { "visited": true } }"#).unwrap();
        let entry = store.get(&PageId::new("p1")).unwrap();
        assert!(entry.visited);
        assert!(!entry.completed);
        assert_eq!(entry.attempts, 0);
        assert!(entry.answer.is_none());
    }
}
