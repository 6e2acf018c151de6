mod document;
mod ids;
mod progress;
mod snapshot;

pub use document::{
    ChoiceOption, ContentItem, CourseDocument, DocumentError, DocumentLoadError, GlobalSettings,
    Interaction, InteractionKind, LanguageOption, LmsStatusMode, MatchingPair, Media, MediaKind,
    Page, PageContent, PageRef, PageSettings, Position, SliderSpec, SortingItem, Template,
    TemplateConfig, Topic,
};
pub use ids::{CourseId, PageId, ParseIdError, TopicId};
pub use progress::{Answer, ProgressEntry, ProgressStore, SubmissionRecord};
pub use snapshot::{SavedPosition, Snapshot, SnapshotError};
