use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::ids::{CourseId, QuestionId, QuizId};
use crate::scoring::ScoreReport;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("correct count ({correct}) exceeds question total ({total})")]
    CountMismatch { correct: u32, total: u32 },

    #[error("percentage must be 0-100, got {0}")]
    InvalidPercentage(u8),
}

/// One finished run of a quiz, as persisted.
///
/// Attempts are append-only history: a retake produces a new record and
/// never touches earlier ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAttempt {
    quiz_id: QuizId,
    course_id: CourseId,
    answers: BTreeMap<QuestionId, usize>,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    correct: u32,
    total: u32,
    percentage: u8,
    passed: bool,
}

impl QuizAttempt {
    /// Builds the record produced at submission time from a score report.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::InvalidTimeRange` when `completed_at` precedes
    /// `started_at`.
    pub fn from_score(
        quiz_id: QuizId,
        course_id: CourseId,
        answers: BTreeMap<QuestionId, usize>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        report: &ScoreReport,
    ) -> Result<Self, AttemptError> {
        Self::from_persisted(
            quiz_id,
            course_id,
            answers,
            started_at,
            completed_at,
            report.correct,
            report.total,
            report.percentage,
            report.passed,
        )
    }

    /// Rehydrates an attempt from storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` if the time range, counts, or percentage are
    /// inconsistent.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        quiz_id: QuizId,
        course_id: CourseId,
        answers: BTreeMap<QuestionId, usize>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        correct: u32,
        total: u32,
        percentage: u8,
        passed: bool,
    ) -> Result<Self, AttemptError> {
        if completed_at < started_at {
            return Err(AttemptError::InvalidTimeRange);
        }
        if correct > total {
            return Err(AttemptError::CountMismatch { correct, total });
        }
        if percentage > 100 {
            return Err(AttemptError::InvalidPercentage(percentage));
        }

        Ok(Self {
            quiz_id,
            course_id,
            answers,
            started_at,
            completed_at,
            correct,
            total,
            percentage,
            passed,
        })
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    /// The recorded answers, at most one per question.
    #[must_use]
    pub fn answers(&self) -> &BTreeMap<QuestionId, usize> {
        &self.answers
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// The score fields as a report, for display alongside fresh scores.
    #[must_use]
    pub fn score(&self) -> ScoreReport {
        ScoreReport {
            correct: self.correct,
            total: self.total,
            percentage: self.percentage,
            passed: self.passed,
        }
    }
}
