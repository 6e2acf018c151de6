use thiserror::Error;

use crate::evaluation::{EvaluationError, IncompleteSubmission};
use crate::model::{DocumentError, DocumentLoadError, PageId, SnapshotError};
use crate::navigation::NavigationError;

/// Why a submission was refused. Progress is untouched in every case.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubmissionError {
    #[error("unknown page: {0}")]
    UnknownPage(PageId),

    #[error("page {0} is locked")]
    Locked(PageId),

    #[error("page {0} is already completed")]
    AlreadyCompleted(PageId),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

impl SubmissionError {
    /// The learner-correctable part of the error, if any.
    #[must_use]
    pub fn incomplete(&self) -> Option<&IncompleteSubmission> {
        match self {
            SubmissionError::Evaluation(EvaluationError::Incomplete(reason)) => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RetryError {
    #[error("unknown page: {0}")]
    UnknownPage(PageId),

    #[error("page {0} has no answer to retry")]
    NotAnswered(PageId),

    #[error("page {0} is already completed")]
    AlreadyCompleted(PageId),

    #[error("page {page} has used all {allowed} attempts")]
    AttemptsExhausted { page: PageId, allowed: u32 },
}

/// Any error raised by this crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    DocumentLoad(#[from] DocumentLoadError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Retry(#[from] RetryError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}
