//! Completion reporting to a learning-management host.
//!
//! Reporting is fire-and-forget: failures are logged and never interrupt
//! the learner.

use std::fmt;

use course_core::model::LmsStatusMode;

use crate::engine::EngineEvent;
use crate::error::ReportingError;

pub const LESSON_STATUS: &str = "cmi.core.lesson_status";
pub const SCORE_RAW: &str = "cmi.core.score.raw";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Completed,
    Incomplete,
    Passed,
    Failed,
}

impl CompletionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionStatus::Completed => "completed",
            CompletionStatus::Incomplete => "incomplete",
            CompletionStatus::Passed => "passed",
            CompletionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The host's reporting API.
pub trait ReportingSink: Send {
    /// # Errors
    ///
    /// Returns `ReportingError` if the host refuses the session.
    fn init(&mut self) -> Result<(), ReportingError>;

    /// # Errors
    ///
    /// Returns `ReportingError` if the host refuses the value.
    fn set_value(&mut self, key: &str, value: &str) -> Result<(), ReportingError>;

    /// # Errors
    ///
    /// Returns `ReportingError` if pending values cannot be flushed.
    fn commit(&mut self) -> Result<(), ReportingError>;

    /// # Errors
    ///
    /// Returns `ReportingError` if the host refuses to close the session.
    fn terminate(&mut self) -> Result<(), ReportingError>;

    /// Sets lesson status and raw score, then commits.
    ///
    /// # Errors
    ///
    /// Returns the first `ReportingError` raised along the way.
    fn set_completion(&mut self, status: CompletionStatus, score: u8) -> Result<(), ReportingError> {
        self.set_value(LESSON_STATUS, status.as_str())?;
        self.set_value(SCORE_RAW, &score.to_string())?;
        self.commit()
    }
}

/// Sink for running outside an LMS: every call is logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReportingSink;

impl ReportingSink for LogReportingSink {
    fn init(&mut self) -> Result<(), ReportingError> {
        log::info!("[lms] init");
        Ok(())
    }

    fn set_value(&mut self, key: &str, value: &str) -> Result<(), ReportingError> {
        log::info!("[lms] set {key} = {value}");
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ReportingError> {
        log::info!("[lms] commit");
        Ok(())
    }

    fn terminate(&mut self) -> Result<(), ReportingError> {
        log::info!("[lms] terminate");
        Ok(())
    }
}

//
// ─── REPORTER ──────────────────────────────────────────────────────────────────
//

/// Guards a sink: `init` before anything else, `terminate` exactly once,
/// also when dropped.
pub struct Reporter {
    sink: Box<dyn ReportingSink>,
    mode: LmsStatusMode,
    initialized: bool,
    terminated: bool,
}

impl Reporter {
    #[must_use]
    pub fn new(sink: Box<dyn ReportingSink>, mode: LmsStatusMode) -> Self {
        Self {
            sink,
            mode,
            initialized: false,
            terminated: false,
        }
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn init(&mut self) {
        if self.initialized || self.terminated {
            return;
        }
        self.initialized = true;
        swallow(self.sink.init());
    }

    /// Forwards one engine event to the host.
    pub fn report(&mut self, event: &EngineEvent) {
        if self.terminated {
            log::warn!("dropping {event:?}: reporting already terminated");
            return;
        }
        self.init();
        match event {
            EngineEvent::CourseCompleted => {
                swallow(self.sink.set_completion(CompletionStatus::Completed, 100));
            }
            EngineEvent::AssessmentFinished { score, passed, .. } => match self.mode {
                LmsStatusMode::PassedFailed => {
                    let status = if *passed {
                        CompletionStatus::Passed
                    } else {
                        CompletionStatus::Failed
                    };
                    swallow(self.sink.set_completion(status, *score));
                }
                LmsStatusMode::CompletedIncomplete => {
                    swallow(
                        self.sink
                            .set_value(SCORE_RAW, &score.to_string())
                            .and_then(|()| self.sink.commit()),
                    );
                }
            },
        }
    }

    /// Closes the reporting session. Later calls do nothing.
    pub fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        swallow(self.sink.terminate());
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn swallow(result: Result<(), ReportingError>) {
    if let Err(err) = result {
        log::warn!("{err}");
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
