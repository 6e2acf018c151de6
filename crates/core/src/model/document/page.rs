use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::DocumentError;
use crate::model::ids::PageId;

//
// ─── TEMPLATES ─────────────────────────────────────────────────────────────────
//

/// Presentation template named by the course document.
///
/// Many templates are purely presentational; `interaction_kind` folds them
/// down to the handful of kinds the engine actually cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    Landing,
    TopicMenu,
    TextOnly,
    TextImage,
    Tabs,
    Accordion,
    FlipCards,
    Narrative,
    Chat,
    Video,
    Samc,
    Mamc,
    Matching,
    Slider,
    Sorting,
    AssessmentIntro,
    AssessmentResult,
}

impl Template {
    #[must_use]
    pub fn interaction_kind(self) -> InteractionKind {
        match self {
            Template::Landing => InteractionKind::Landing,
            Template::TopicMenu => InteractionKind::TopicMenu,
            Template::Samc => InteractionKind::SingleChoice,
            Template::Mamc => InteractionKind::MultiChoice,
            Template::Matching => InteractionKind::Matching,
            Template::Slider => InteractionKind::Slider,
            Template::Sorting => InteractionKind::Ordering,
            Template::AssessmentIntro => InteractionKind::AssessmentIntro,
            Template::AssessmentResult => InteractionKind::AssessmentResult,
            Template::TextOnly
            | Template::TextImage
            | Template::Tabs
            | Template::Accordion
            | Template::FlipCards
            | Template::Narrative
            | Template::Chat
            | Template::Video => InteractionKind::Informational,
        }
    }
}

/// What a page asks of the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    Informational,
    SingleChoice,
    MultiChoice,
    Matching,
    Slider,
    Ordering,
    AssessmentIntro,
    AssessmentResult,
    TopicMenu,
    Landing,
}

impl InteractionKind {
    /// Graded kinds that accept a submitted answer.
    #[must_use]
    pub fn is_question(self) -> bool {
        matches!(
            self,
            InteractionKind::SingleChoice
                | InteractionKind::MultiChoice
                | InteractionKind::Matching
                | InteractionKind::Slider
                | InteractionKind::Ordering
        )
    }

    /// Kinds the learner may always move past, regardless of page locking.
    #[must_use]
    pub fn is_always_passable(self) -> bool {
        matches!(self, InteractionKind::Landing | InteractionKind::TopicMenu)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            InteractionKind::Informational => "informational",
            InteractionKind::SingleChoice => "single-choice",
            InteractionKind::MultiChoice => "multi-choice",
            InteractionKind::Matching => "matching",
            InteractionKind::Slider => "slider",
            InteractionKind::Ordering => "ordering",
            InteractionKind::AssessmentIntro => "assessment-intro",
            InteractionKind::AssessmentResult => "assessment-result",
            InteractionKind::TopicMenu => "topic-menu",
            InteractionKind::Landing => "landing",
        }
    }
}

//
// ─── INTERACTION PAYLOADS ──────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// One row of a matching exercise.
///
/// The correct right-hand side for a left item is the pair's own id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingPair {
    pub id: String,
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliderSpec {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub correct_value: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortingItem {
    pub id: String,
    pub text: String,
}

/// Interaction kind together with the data needed to grade it.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    Informational,
    SingleChoice { options: Vec<ChoiceOption> },
    MultiChoice { options: Vec<ChoiceOption> },
    Matching { pairs: Vec<MatchingPair> },
    Slider(SliderSpec),
    /// Items listed in their canonical (correct) order.
    Ordering { items: Vec<SortingItem> },
    AssessmentIntro,
    AssessmentResult,
    TopicMenu,
    Landing,
}

impl Interaction {
    #[must_use]
    pub fn kind(&self) -> InteractionKind {
        match self {
            Interaction::Informational => InteractionKind::Informational,
            Interaction::SingleChoice { .. } => InteractionKind::SingleChoice,
            Interaction::MultiChoice { .. } => InteractionKind::MultiChoice,
            Interaction::Matching { .. } => InteractionKind::Matching,
            Interaction::Slider(_) => InteractionKind::Slider,
            Interaction::Ordering { .. } => InteractionKind::Ordering,
            Interaction::AssessmentIntro => InteractionKind::AssessmentIntro,
            Interaction::AssessmentResult => InteractionKind::AssessmentResult,
            Interaction::TopicMenu => InteractionKind::TopicMenu,
            Interaction::Landing => InteractionKind::Landing,
        }
    }

    /// Choice options, if this is a choice page.
    #[must_use]
    pub fn options(&self) -> &[ChoiceOption] {
        match self {
            Interaction::SingleChoice { options } | Interaction::MultiChoice { options } => {
                options
            }
            _ => &[],
        }
    }

    /// Rejects payloads that cannot be graded.
    ///
    /// A choice page with no correct option is an authoring error, so it is
    /// caught here at load time rather than guessed at during evaluation.
    fn validate(&self, page: &PageId) -> Result<(), DocumentError> {
        match self {
            Interaction::SingleChoice { options } => {
                ensure_unique(page, options.iter().map(|o| o.id.as_str()))?;
                let found = options.iter().filter(|o| o.is_correct).count();
                if found != 1 {
                    return Err(DocumentError::CorrectOptionCount {
                        page: page.clone(),
                        found,
                    });
                }
            }
            Interaction::MultiChoice { options } => {
                ensure_unique(page, options.iter().map(|o| o.id.as_str()))?;
                if !options.iter().any(|o| o.is_correct) {
                    return Err(DocumentError::NoCorrectOption(page.clone()));
                }
            }
            Interaction::Matching { pairs } => {
                ensure_min_items(page, pairs.len())?;
                ensure_unique(page, pairs.iter().map(|p| p.id.as_str()))?;
            }
            Interaction::Ordering { items } => {
                ensure_min_items(page, items.len())?;
                ensure_unique(page, items.iter().map(|i| i.id.as_str()))?;
            }
            Interaction::Slider(spec) => {
                let finite = [spec.min, spec.max, spec.step, spec.correct_value]
                    .iter()
                    .all(|v| v.is_finite());
                if !finite
                    || spec.step <= 0.0
                    || spec.min >= spec.max
                    || spec.correct_value < spec.min
                    || spec.correct_value > spec.max
                {
                    return Err(DocumentError::InvalidSlider(page.clone()));
                }
            }
            Interaction::Informational
            | Interaction::AssessmentIntro
            | Interaction::AssessmentResult
            | Interaction::TopicMenu
            | Interaction::Landing => {}
        }
        Ok(())
    }
}

fn ensure_min_items(page: &PageId, len: usize) -> Result<(), DocumentError> {
    if len < 2 {
        return Err(DocumentError::TooFewItems(page.clone()));
    }
    Ok(())
}

fn ensure_unique<'a>(
    page: &PageId,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), DocumentError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(DocumentError::DuplicateItemId {
                page: page.clone(),
                item: id.to_owned(),
            });
        }
    }
    Ok(())
}

//
// ─── CONTENT ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub src: String,
    /// Move to the next page when playback ends.
    #[serde(default)]
    pub auto_advance: bool,
}

/// Tab, accordion or card entry shown by informational templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub title: String,
    pub content: String,
}

/// Display payload of a page. Rendering is not the engine's concern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContent {
    pub heading: Option<String>,
    pub body: Option<String>,
    pub instruction: Option<String>,
    pub transcript: Option<String>,
    pub media: Option<Media>,
    pub audio: Option<String>,
    pub items: Vec<ContentItem>,
}

impl PageContent {
    #[must_use]
    pub fn has_audio(&self) -> bool {
        self.audio.as_deref().is_some_and(|src| !src.trim().is_empty())
    }

    /// True when the transcript has something besides whitespace.
    #[must_use]
    pub fn has_transcript(&self) -> bool {
        self.transcript
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty() && t != "<p>&nbsp</p>")
    }
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSettings {
    attempts_allowed: u32,
    required_to_proceed: bool,
}

impl PageSettings {
    /// # Errors
    ///
    /// Returns `DocumentError::InvalidAttemptsAllowed` if `attempts_allowed` is zero.
    pub fn new(
        page: &PageId,
        attempts_allowed: u32,
        required_to_proceed: bool,
    ) -> Result<Self, DocumentError> {
        if attempts_allowed == 0 {
            return Err(DocumentError::InvalidAttemptsAllowed(page.clone()));
        }
        Ok(Self {
            attempts_allowed,
            required_to_proceed,
        })
    }

    #[must_use]
    pub fn attempts_allowed(&self) -> u32 {
        self.attempts_allowed
    }

    #[must_use]
    pub fn required_to_proceed(&self) -> bool {
        self.required_to_proceed
    }
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            attempts_allowed: 1,
            required_to_proceed: false,
        }
    }
}

//
// ─── PAGE ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    id: PageId,
    title: String,
    template: Template,
    interaction: Interaction,
    content: PageContent,
    settings: PageSettings,
}

impl Page {
    /// Builds a validated page.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` if the id is blank, the template and interaction
    /// disagree, or the interaction payload cannot be graded.
    pub fn new(
        id: PageId,
        title: impl Into<String>,
        template: Template,
        interaction: Interaction,
        content: PageContent,
        settings: PageSettings,
    ) -> Result<Self, DocumentError> {
        if id.as_str().trim().is_empty() {
            return Err(DocumentError::BlankId);
        }
        if template.interaction_kind() != interaction.kind() {
            return Err(DocumentError::TemplateMismatch {
                page: id,
                template,
            });
        }
        interaction.validate(&id)?;

        Ok(Self {
            id,
            title: title.into(),
            template,
            interaction,
            content,
            settings,
        })
    }

    #[must_use]
    pub fn id(&self) -> &PageId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn template(&self) -> Template {
        self.template
    }

    #[must_use]
    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    #[must_use]
    pub fn kind(&self) -> InteractionKind {
        self.interaction.kind()
    }

    #[must_use]
    pub fn content(&self) -> &PageContent {
        &self.content
    }

    #[must_use]
    pub fn settings(&self) -> &PageSettings {
        &self.settings
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn option(id: &str, is_correct: bool) -> ChoiceOption {
        ChoiceOption {
            id: id.into(),
            text: id.to_uppercase(),
            is_correct,
        }
    }

    fn page(template: Template, interaction: Interaction) -> Result<Page, DocumentError> {
        Page::new(
            PageId::new("p1"),
            "Page",
            template,
            interaction,
            PageContent::default(),
            PageSettings::default(),
        )
    }

    #[test]
    fn presentational_templates_are_informational() {
        for template in [Template::Tabs, Template::Chat, Template::Video, Template::FlipCards] {
            assert_eq!(template.interaction_kind(), InteractionKind::Informational);
        }
        assert_eq!(Template::Sorting.interaction_kind(), InteractionKind::Ordering);
    }

    #[test]
    fn single_choice_needs_exactly_one_correct_option() {
        let err = page(
            Template::Samc,
            Interaction::SingleChoice {
                options: vec![option("a", false), option("b", false)],
            },
        )
        .unwrap_err();
        assert!(matches!(err, DocumentError::CorrectOptionCount { found: 0, .. }));

        let err = page(
            Template::Samc,
            Interaction::SingleChoice {
                options: vec![option("a", true), option("b", true)],
            },
        )
        .unwrap_err();
        assert!(matches!(err, DocumentError::CorrectOptionCount { found: 2, .. }));
    }

    #[test]
    fn multi_choice_without_correct_option_is_rejected() {
        let err = page(
            Template::Mamc,
            Interaction::MultiChoice {
                options: vec![option("a", false), option("b", false)],
            },
        )
        .unwrap_err();
        assert_eq!(err, DocumentError::NoCorrectOption(PageId::new("p1")));
    }

    #[test]
    fn template_must_agree_with_interaction() {
        let err = page(Template::Slider, Interaction::Informational).unwrap_err();
        assert!(matches!(err, DocumentError::TemplateMismatch { .. }));
    }

    #[test]
    fn slider_range_is_validated() {
        let spec = SliderSpec {
            min: 0.0,
            max: 1.0,
            step: 0.0,
            correct_value: 0.9,
            unit: String::new(),
        };
        let err = page(Template::Slider, Interaction::Slider(spec)).unwrap_err();
        assert_eq!(err, DocumentError::InvalidSlider(PageId::new("p1")));

        let spec = SliderSpec {
            min: 0.0,
            max: 1.0,
            step: 0.1,
            correct_value: 1.5,
            unit: String::new(),
        };
        assert!(page(Template::Slider, Interaction::Slider(spec)).is_err());
    }

    #[test]
    fn duplicate_item_ids_are_rejected() {
        let items = vec![
            SortingItem {
                id: "s1".into(),
                text: "one".into(),
            },
            SortingItem {
                id: "s1".into(),
                text: "again".into(),
            },
        ];
        let err = page(Template::Sorting, Interaction::Ordering { items }).unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateItemId { .. }));
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let err = PageSettings::new(&PageId::new("p1"), 0, true).unwrap_err();
        assert_eq!(err, DocumentError::InvalidAttemptsAllowed(PageId::new("p1")));
    }

    #[test]
    fn blank_transcript_placeholder_is_not_a_transcript() {
        let content = PageContent {
            transcript: Some("<p>&nbsp</p>".into()),
            ..PageContent::default()
        };
        assert!(!content.has_transcript());
    }
}
