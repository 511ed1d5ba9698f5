//! Shared error types for the services crate.

use thiserror::Error;

use lms_core::model::{AttemptError, CourseId, LessonId, QuestionId, QuizId};
use storage::repository::StorageError;

use crate::quiz::SessionState;

/// Errors emitted by `ProgressTracker`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error("lesson {lesson} does not belong to course {course}")]
    LessonNotFound { course: CourseId, lesson: LessonId },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the quiz session controller and its state machine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizSessionError {
    #[error("operation requires state {expected}, session is {actual}")]
    InvalidState {
        expected: SessionState,
        actual: SessionState,
    },
    #[error("quiz {0} not found")]
    QuizNotFound(QuizId),
    #[error("question {0} is not part of this quiz")]
    UnknownQuestion(QuestionId),
    #[error("question {question} has no option at index {option}")]
    UnknownOption { question: QuestionId, option: usize },
    #[error("question index {index} is out of range for {total} questions")]
    IndexOutOfRange { index: usize, total: usize },
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DashboardAggregator`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DashboardError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}
