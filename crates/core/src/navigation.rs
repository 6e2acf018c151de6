use thiserror::Error;

use crate::model::{CourseDocument, PageId, Position, TopicId};

/// A navigation target that does not exist in the current document.
///
/// These indicate a caller or document bug and are never clamped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NavigationError {
    #[error("unknown topic: {0}")]
    UnknownTopic(TopicId),

    #[error("unknown page: {0}")]
    UnknownPage(PageId),

    #[error("page {page} is not part of topic {topic}")]
    PageNotInTopic { topic: TopicId, page: PageId },

    #[error("position {}/{} is outside the course", .0.topic_index, .0.page_index)]
    OutOfRange(Position),
}

/// Position after `from` in course order, or `None` on the last page.
///
/// # Errors
///
/// Returns `NavigationError::OutOfRange` if `from` does not resolve.
pub fn next_position(
    document: &CourseDocument,
    from: Position,
) -> Result<Option<Position>, NavigationError> {
    let found = document
        .page_at(from)
        .ok_or(NavigationError::OutOfRange(from))?;

    if from.page_index + 1 < found.topic.pages().len() {
        return Ok(Some(Position::new(from.topic_index, from.page_index + 1)));
    }
    if from.topic_index + 1 < document.topics().len() {
        return Ok(Some(Position::new(from.topic_index + 1, 0)));
    }
    Ok(None)
}

/// Position before `from` in course order, or `None` on the first page.
///
/// # Errors
///
/// Returns `NavigationError::OutOfRange` if `from` does not resolve.
pub fn previous_position(
    document: &CourseDocument,
    from: Position,
) -> Result<Option<Position>, NavigationError> {
    if !document.contains(from) {
        return Err(NavigationError::OutOfRange(from));
    }
    if from.page_index > 0 {
        return Ok(Some(Position::new(from.topic_index, from.page_index - 1)));
    }
    if from.topic_index == 0 {
        return Ok(None);
    }
    let topic_index = from.topic_index - 1;
    let last = document.topics()[topic_index].pages().len() - 1;
    Ok(Some(Position::new(topic_index, last)))
}

/// Resolves a `(topic, page)` jump target.
///
/// # Errors
///
/// Returns `NavigationError` if either id is unknown or the page belongs to
/// a different topic.
pub fn resolve_target(
    document: &CourseDocument,
    topic_id: &TopicId,
    page_id: &PageId,
) -> Result<Position, NavigationError> {
    let topic_index = document
        .topic_index(topic_id)
        .ok_or_else(|| NavigationError::UnknownTopic(topic_id.clone()))?;
    let position = document
        .position_of(page_id)
        .ok_or_else(|| NavigationError::UnknownPage(page_id.clone()))?;

    if position.topic_index != topic_index {
        return Err(NavigationError::PageNotInTopic {
            topic: topic_id.clone(),
            page: page_id.clone(),
        });
    }
    Ok(position)
}
