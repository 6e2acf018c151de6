mod index;
mod page;
mod wire;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::ids::{CourseId, PageId, TopicId};

pub use index::{PageRef, Position};
pub use page::{
    ChoiceOption, ContentItem, Interaction, InteractionKind, MatchingPair, Media, MediaKind, Page,
    PageContent, PageSettings, SliderSpec, SortingItem, Template,
};

use index::DocumentIndex;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Authoring errors found while validating a course document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DocumentError {
    #[error("identifiers cannot be blank")]
    BlankId,

    #[error("course has no topics")]
    NoTopics,

    #[error("topic {0} has no pages")]
    EmptyTopic(TopicId),

    #[error("duplicate topic id: {0}")]
    DuplicateTopicId(TopicId),

    #[error("duplicate page id: {0}")]
    DuplicatePageId(PageId),

    #[error("page {page} is missing {field}")]
    MissingField { page: PageId, field: &'static str },

    #[error("page {page}: template {template:?} does not match its content")]
    TemplateMismatch { page: PageId, template: Template },

    #[error("page {page}: single-choice needs exactly one correct option, found {found}")]
    CorrectOptionCount { page: PageId, found: usize },

    #[error("page {0}: multi-choice needs at least one correct option")]
    NoCorrectOption(PageId),

    #[error("page {page}: duplicate item id {item}")]
    DuplicateItemId { page: PageId, item: String },

    #[error("page {0}: needs at least two items")]
    TooFewItems(PageId),

    #[error("page {0}: slider needs step > 0 and min <= correct value <= max")]
    InvalidSlider(PageId),

    #[error("page {0}: attempts allowed must be >= 1")]
    InvalidAttemptsAllowed(PageId),

    #[error("page {0}: assessment result page outside an assessment topic")]
    StrayAssessmentResult(PageId),

    #[error("pass score must be between 0 and 100, got {0}")]
    InvalidPassScore(u8),
}

/// Fatal failure to produce a `CourseDocument`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DocumentLoadError {
    #[error("course resource unreachable: {0}")]
    Unreachable(String),

    #[error("course resource malformed: {0}")]
    Malformed(String),

    #[error(transparent)]
    Invalid(#[from] DocumentError),
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageOption {
    pub code: String,
    pub label: String,
}

/// Course-wide behaviour switches from `toc.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct GlobalSettings {
    /// Percentage needed to pass an assessment topic.
    pub pass_score: u8,
    pub allow_audio: bool,
    pub shuffle_assessment: bool,
    /// A topic stays locked until the previous topic's last page is completed.
    pub lock_modules: bool,
    /// A page stays locked until the previous page is completed.
    pub lock_pages: bool,
    pub gamification: bool,
    pub multi_language: bool,
    pub supported_languages: Vec<LanguageOption>,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            pass_score: 80,
            allow_audio: true,
            shuffle_assessment: false,
            lock_modules: false,
            lock_pages: false,
            gamification: true,
            multi_language: false,
            supported_languages: Vec::new(),
        }
    }
}

impl GlobalSettings {
    /// Whether learners may switch to `code`. Single-language courses offer
    /// none; an empty `supportedLanguages` list leaves the choice to
    /// whichever variants exist.
    #[must_use]
    pub fn offers_language(&self, code: &str) -> bool {
        self.multi_language
            && (self.supported_languages.is_empty()
                || self.supported_languages.iter().any(|l| l.code == code))
    }
}

/// How completion is reported to the learning-management host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LmsStatusMode {
    #[serde(rename = "Passed/Failed")]
    PassedFailed,
    #[default]
    #[serde(rename = "Completed/Incomplete")]
    CompletedIncomplete,
}

/// UI configuration from `template.json`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(rename = "CourseName")]
    pub course_name: String,
    #[serde(rename = "lmsStatus", default)]
    pub lms_status: LmsStatusMode,
    #[serde(rename = "AudioVersionEnable", default)]
    pub audio_version_enable: bool,
    /// Remaining keys: button captions, dialog text and the like.
    #[serde(flatten)]
    pub labels: BTreeMap<String, serde_json::Value>,
}

impl TemplateConfig {
    /// Looks up a string label such as `NextTitle` or `ResumeHeader`.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).and_then(serde_json::Value::as_str)
    }
}

//
// ─── TOPIC ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    id: TopicId,
    title: String,
    description: Option<String>,
    duration: Option<String>,
    is_assessment: bool,
    hide_stars: bool,
    pages: Vec<Page>,
}

impl Topic {
    /// # Errors
    ///
    /// Returns `DocumentError::EmptyTopic` if `pages` is empty, or
    /// `DocumentError::StrayAssessmentResult` if a result page sits outside
    /// an assessment topic.
    pub fn new(
        id: TopicId,
        title: impl Into<String>,
        is_assessment: bool,
        hide_stars: bool,
        pages: Vec<Page>,
    ) -> Result<Self, DocumentError> {
        if id.as_str().trim().is_empty() {
            return Err(DocumentError::BlankId);
        }
        if pages.is_empty() {
            return Err(DocumentError::EmptyTopic(id));
        }
        if !is_assessment {
            if let Some(stray) = pages
                .iter()
                .find(|p| p.kind() == InteractionKind::AssessmentResult)
            {
                return Err(DocumentError::StrayAssessmentResult(stray.id().clone()));
            }
        }

        Ok(Self {
            id,
            title: title.into(),
            description: None,
            duration: None,
            is_assessment,
            hide_stars,
            pages,
        })
    }

    #[must_use]
    pub fn with_details(mut self, description: Option<String>, duration: Option<String>) -> Self {
        self.description = description;
        self.duration = duration;
        self
    }

    #[must_use]
    pub fn id(&self) -> &TopicId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    #[must_use]
    pub fn is_assessment(&self) -> bool {
        self.is_assessment
    }

    #[must_use]
    pub fn hide_stars(&self) -> bool {
        self.hide_stars
    }

    /// Non-empty by construction.
    #[must_use]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    #[must_use]
    pub fn last_page(&self) -> &Page {
        &self.pages[self.pages.len() - 1]
    }

    /// Graded pages, i.e. everything but intro, result and informational pages.
    pub fn question_pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter().filter(|p| p.kind().is_question())
    }

    /// Gamification applies to questions outside assessments, unless hidden.
    #[must_use]
    pub fn awards_stars(&self) -> bool {
        !self.is_assessment && !self.hide_stars
    }
}

//
// ─── COURSE DOCUMENT ───────────────────────────────────────────────────────────
//

/// One language variant of a course. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseDocument {
    id: CourseId,
    title: String,
    language: String,
    config: TemplateConfig,
    settings: GlobalSettings,
    topics: Vec<Topic>,
    index: DocumentIndex,
}

impl CourseDocument {
    /// Builds a validated document and its lookup index.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` for empty topic lists, duplicate ids or an
    /// out-of-range pass score.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        language: impl Into<String>,
        config: TemplateConfig,
        settings: GlobalSettings,
        topics: Vec<Topic>,
    ) -> Result<Self, DocumentError> {
        if id.as_str().trim().is_empty() {
            return Err(DocumentError::BlankId);
        }
        if topics.is_empty() {
            return Err(DocumentError::NoTopics);
        }
        if settings.pass_score > 100 {
            return Err(DocumentError::InvalidPassScore(settings.pass_score));
        }
        let index = DocumentIndex::build(&topics)?;

        Ok(Self {
            id,
            title: title.into(),
            language: language.into(),
            config,
            settings,
            topics,
            index,
        })
    }

    /// Parses the two course resources of one language variant.
    ///
    /// # Errors
    ///
    /// Returns `DocumentLoadError::Malformed` for JSON that does not match the
    /// expected shape and `DocumentLoadError::Invalid` for content errors.
    pub fn from_json(
        language: &str,
        template_json: &str,
        toc_json: &str,
    ) -> Result<Self, DocumentLoadError> {
        let config: TemplateConfig = serde_json::from_str(template_json)
            .map_err(|e| DocumentLoadError::Malformed(format!("template: {e}")))?;
        let toc: wire::CourseWire = serde_json::from_str(toc_json)
            .map_err(|e| DocumentLoadError::Malformed(format!("toc: {e}")))?;
        Ok(toc.into_document(language, config)?)
    }

    #[must_use]
    pub fn id(&self) -> &CourseId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    #[must_use]
    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    #[must_use]
    pub fn settings(&self) -> &GlobalSettings {
        &self.settings
    }

    #[must_use]
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    #[must_use]
    pub fn topic(&self, index: usize) -> Option<&Topic> {
        self.topics.get(index)
    }

    #[must_use]
    pub fn topic_index(&self, id: &TopicId) -> Option<usize> {
        self.index.topic(id)
    }

    #[must_use]
    pub fn position_of(&self, id: &PageId) -> Option<Position> {
        self.index.page(id)
    }

    /// Resolves a page id to its topic, page and coordinates.
    #[must_use]
    pub fn find_page(&self, id: &PageId) -> Option<PageRef<'_>> {
        self.index.page(id).and_then(|pos| self.page_at(pos))
    }

    #[must_use]
    pub fn page_at(&self, position: Position) -> Option<PageRef<'_>> {
        let topic = self.topics.get(position.topic_index)?;
        let page = topic.pages.get(position.page_index)?;
        Some(PageRef {
            topic,
            page,
            position,
        })
    }

    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        self.page_at(position).is_some()
    }

    /// Every page in course order.
    pub fn pages(&self) -> impl Iterator<Item = PageRef<'_>> {
        self.topics.iter().enumerate().flat_map(|(ti, topic)| {
            topic.pages.iter().enumerate().map(move |(pi, page)| PageRef {
                topic,
                page,
                position: Position::new(ti, pi),
            })
        })
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.index.page_count()
    }

    /// Position of the final page of the final topic.
    #[must_use]
    pub fn last_position(&self) -> Position {
        let topic_index = self.topics.len() - 1;
        Position::new(topic_index, self.topics[topic_index].pages.len() - 1)
    }

    /// 1-based ordinal of a position across the whole course.
    #[must_use]
    pub fn ordinal(&self, position: Position) -> Option<usize> {
        if !self.contains(position) {
            return None;
        }
        let before: usize = self.topics[..position.topic_index]
            .iter()
            .map(|t| t.pages.len())
            .sum();
        Some(before + position.page_index + 1)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
