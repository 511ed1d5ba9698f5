//! The quiz session controller: lifecycle state machine, countdown timer,
//! and attempt history queries.

mod controller;
mod session;
mod timer;
mod view;

pub use controller::{QuizSessionController, SubmissionOutcome};
pub use session::{QuizSession, SessionProgress, SessionState, SubmitTrigger, Tick};
pub use view::{AttemptHistoryService, AttemptListItem};
