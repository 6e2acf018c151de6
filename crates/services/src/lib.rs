#![forbid(unsafe_code)]

pub mod engine;
pub mod error;
pub mod persistence;
pub mod player;
pub mod reporting;

pub use course_core::Clock;

pub use engine::{
    CourseEngine, EngineEvent, Feedback, MenuPage, MenuTopic, PageView, SubmissionOutcome,
    Transition,
};
pub use error::{EngineError, PersistenceWriteFailure, PlayerError, ReportingError};
pub use persistence::PersistenceObserver;
pub use player::CoursePlayer;
pub use reporting::{CompletionStatus, LogReportingSink, Reporter, ReportingSink};
