#![forbid(unsafe_code)]

pub mod error;
pub mod evaluation;
pub mod locking;
pub mod model;
pub mod navigation;
pub mod time;

pub use error::{Error, RetryError, SubmissionError};
pub use time::Clock;
