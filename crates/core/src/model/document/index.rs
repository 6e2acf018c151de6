use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{DocumentError, Page, Topic};
use crate::model::ids::{PageId, TopicId};

/// Coordinate of a page inside a course document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub topic_index: usize,
    pub page_index: usize,
}

impl Position {
    pub const START: Position = Position {
        topic_index: 0,
        page_index: 0,
    };

    #[must_use]
    pub fn new(topic_index: usize, page_index: usize) -> Self {
        Self {
            topic_index,
            page_index,
        }
    }
}

/// A page resolved through the document index.
#[derive(Debug, Clone, Copy)]
pub struct PageRef<'a> {
    pub topic: &'a Topic,
    pub page: &'a Page,
    pub position: Position,
}

/// Id lookups built once per load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DocumentIndex {
    pages: HashMap<PageId, Position>,
    topics: HashMap<TopicId, usize>,
}

impl DocumentIndex {
    pub(crate) fn build(topics: &[Topic]) -> Result<Self, DocumentError> {
        let mut index = Self::default();
        for (topic_index, topic) in topics.iter().enumerate() {
            if index.topics.insert(topic.id().clone(), topic_index).is_some() {
                return Err(DocumentError::DuplicateTopicId(topic.id().clone()));
            }
            for (page_index, page) in topic.pages().iter().enumerate() {
                let position = Position::new(topic_index, page_index);
                if index.pages.insert(page.id().clone(), position).is_some() {
                    return Err(DocumentError::DuplicatePageId(page.id().clone()));
                }
            }
        }
        Ok(index)
    }

    pub(crate) fn page(&self, id: &PageId) -> Option<Position> {
        self.pages.get(id).copied()
    }

    pub(crate) fn topic(&self, id: &TopicId) -> Option<usize> {
        self.topics.get(id).copied()
    }

    pub(crate) fn page_count(&self) -> usize {
        self.pages.len()
    }
}
