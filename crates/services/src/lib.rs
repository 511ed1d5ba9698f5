#![forbid(unsafe_code)]

pub mod dashboard;
pub mod error;
pub mod progress_tracker;
pub mod quiz;

pub use lms_core::Clock;

pub use dashboard::{CourseProgressItem, DashboardAggregator, DashboardSummary};
pub use error::{DashboardError, ProgressError, QuizSessionError};
pub use progress_tracker::ProgressTracker;
pub use quiz::{
    AttemptHistoryService, AttemptListItem, QuizSession, QuizSessionController, SessionProgress,
    SessionState, SubmissionOutcome, SubmitTrigger, Tick,
};
