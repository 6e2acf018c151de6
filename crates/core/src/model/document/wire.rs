//! Serde shape of `toc.json`, converted into validated domain types.

use serde::Deserialize;

use super::{
    ChoiceOption, ContentItem, CourseDocument, DocumentError, GlobalSettings, Interaction,
    MatchingPair, Media, Page, PageContent, PageSettings, SliderSpec, SortingItem, Template,
    TemplateConfig, Topic,
};
use crate::model::ids::{CourseId, PageId, TopicId};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CourseWire {
    id: String,
    title: String,
    #[serde(default)]
    global_settings: GlobalSettings,
    topics: Vec<TopicWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopicWire {
    id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    is_assessment: bool,
    #[serde(default)]
    hide_stars: bool,
    pages: Vec<PageWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageWire {
    id: String,
    title: String,
    template: Template,
    #[serde(default)]
    content: ContentWire,
    #[serde(default)]
    settings: Option<SettingsWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsWire {
    #[serde(default = "default_attempts")]
    attempts_allowed: u32,
    #[serde(default)]
    required_to_proceed: bool,
}

fn default_attempts() -> u32 {
    1
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ContentWire {
    heading: Option<String>,
    body: Option<String>,
    instruction: Option<String>,
    transcript: Option<String>,
    media: Option<Media>,
    audio: Option<String>,
    items: Vec<ContentItem>,
    options: Option<Vec<ChoiceOption>>,
    matching_pairs: Option<Vec<MatchingPair>>,
    slider: Option<SliderSpec>,
    sorting_items: Option<Vec<SortingItem>>,
}

impl CourseWire {
    pub(super) fn into_document(
        self,
        language: &str,
        config: TemplateConfig,
    ) -> Result<CourseDocument, DocumentError> {
        let topics = self
            .topics
            .into_iter()
            .map(TopicWire::into_topic)
            .collect::<Result<Vec<_>, _>>()?;

        CourseDocument::new(
            CourseId::new(self.id),
            self.title,
            language,
            config,
            self.global_settings,
            topics,
        )
    }
}

impl TopicWire {
    fn into_topic(self) -> Result<Topic, DocumentError> {
        let pages = self
            .pages
            .into_iter()
            .map(PageWire::into_page)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Topic::new(
            TopicId::new(self.id),
            self.title,
            self.is_assessment,
            self.hide_stars,
            pages,
        )?
        .with_details(self.description, self.duration))
    }
}

impl PageWire {
    fn into_page(self) -> Result<Page, DocumentError> {
        let id = PageId::new(self.id);
        let settings = match self.settings {
            Some(s) => PageSettings::new(&id, s.attempts_allowed, s.required_to_proceed)?,
            None => PageSettings::default(),
        };

        let mut wire = self.content;
        let interaction = match self.template {
            Template::Samc => Interaction::SingleChoice {
                options: required(&id, "options", wire.options.take())?,
            },
            Template::Mamc => Interaction::MultiChoice {
                options: required(&id, "options", wire.options.take())?,
            },
            Template::Matching => Interaction::Matching {
                pairs: required(&id, "matchingPairs", wire.matching_pairs.take())?,
            },
            Template::Slider => {
                Interaction::Slider(required(&id, "slider", wire.slider.take())?)
            }
            Template::Sorting => Interaction::Ordering {
                items: required(&id, "sortingItems", wire.sorting_items.take())?,
            },
            Template::Landing => Interaction::Landing,
            Template::TopicMenu => Interaction::TopicMenu,
            Template::AssessmentIntro => Interaction::AssessmentIntro,
            Template::AssessmentResult => Interaction::AssessmentResult,
            Template::TextOnly
            | Template::TextImage
            | Template::Tabs
            | Template::Accordion
            | Template::FlipCards
            | Template::Narrative
            | Template::Chat
            | Template::Video => Interaction::Informational,
        };

        let content = PageContent {
            heading: wire.heading,
            body: wire.body,
            instruction: wire.instruction,
            transcript: wire.transcript,
            media: wire.media,
            audio: wire.audio,
            items: wire.items,
        };

        Page::new(id, self.title, self.template, interaction, content, settings)
    }
}

fn required<T>(page: &PageId, field: &'static str, value: Option<T>) -> Result<T, DocumentError> {
    value.ok_or_else(|| DocumentError::MissingField {
        page: page.clone(),
        field,
    })
}
