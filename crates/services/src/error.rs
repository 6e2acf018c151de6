//! Shared error types for the services crate.

use thiserror::Error;

use course_core::model::{CourseId, DocumentLoadError, PageId};
use course_core::navigation::NavigationError;
use course_core::{RetryError, SubmissionError};
use storage::repository::StorageError;

/// Errors emitted by `CourseEngine`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EngineError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Retry(#[from] RetryError),
    #[error("variant belongs to course {found}, expected {expected}")]
    VariantMismatch { expected: CourseId, found: CourseId },
    #[error("variant has no page {0}")]
    MissingPage(PageId),
}

/// Errors emitted by `CoursePlayer`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlayerError {
    #[error(transparent)]
    Load(#[from] DocumentLoadError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("saved progress is waiting for a resume or restart decision")]
    ResumePending,
    #[error("there is no saved progress to resume")]
    NoSavedProgress,
    #[error("player has been shut down")]
    ShutDown,
    #[error("course does not offer language {0:?}")]
    UnsupportedLanguage(String),
}

/// A snapshot write that did not reach storage. Logged, never surfaced.
#[derive(Debug, Error)]
#[error("could not persist progress for {course}: {source}")]
pub struct PersistenceWriteFailure {
    pub course: CourseId,
    #[source]
    pub source: StorageError,
}

/// A reporting call the sink refused. Logged, never surfaced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("reporting call {call} failed: {reason}")]
pub struct ReportingError {
    pub call: &'static str,
    pub reason: String,
}
