use chrono::{DateTime, Utc};
use std::sync::Arc;

use lms_core::model::{CourseId, LearnerId, QuizId};
use lms_core::time::elapsed_seconds;
use storage::repository::{AttemptId, AttemptRepository, AttemptRow};

use crate::error::QuizSessionError;

/// Presentation-agnostic list item for a past attempt.
///
/// This is intentionally **not** a UI view-model: no pre-formatted strings,
/// no localization assumptions. The UI may format timestamps and percentages
/// as needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptListItem {
    pub id: AttemptId,
    pub quiz_id: QuizId,
    pub course_id: CourseId,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: u32,

    pub correct: u32,
    pub total: u32,
    pub percentage: u8,
    pub passed: bool,
}

impl AttemptListItem {
    #[must_use]
    pub fn from_row(row: &AttemptRow) -> Self {
        let attempt = &row.attempt;
        Self {
            id: row.id,
            quiz_id: attempt.quiz_id(),
            course_id: attempt.course_id(),
            completed_at: attempt.completed_at(),
            duration_seconds: elapsed_seconds(attempt.started_at(), attempt.completed_at()),
            correct: attempt.correct(),
            total: attempt.total(),
            percentage: attempt.percentage(),
            passed: attempt.passed(),
        }
    }
}

/// Read-only facade over a learner's attempt history.
#[derive(Clone)]
pub struct AttemptHistoryService {
    attempts: Arc<dyn AttemptRepository>,
}

impl AttemptHistoryService {
    #[must_use]
    pub fn new(attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { attempts }
    }

    /// Past attempts against one quiz, newest first.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Storage` on repository failures.
    pub async fn list_for_quiz(
        &self,
        learner: LearnerId,
        quiz: QuizId,
    ) -> Result<Vec<AttemptListItem>, QuizSessionError> {
        let rows = self.attempts.list_attempts(learner, quiz).await?;
        Ok(rows.iter().map(AttemptListItem::from_row).collect())
    }

    /// Every past attempt by a learner, newest first.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Storage` on repository failures.
    pub async fn list_for_learner(
        &self,
        learner: LearnerId,
    ) -> Result<Vec<AttemptListItem>, QuizSessionError> {
        let rows = self.attempts.list_attempts_for_learner(learner).await?;
        Ok(rows.iter().map(AttemptListItem::from_row).collect())
    }

    /// The learner's best percentage on a quiz, `None` before any attempt.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Storage` on repository failures.
    pub async fn best_percentage(
        &self,
        learner: LearnerId,
        quiz: QuizId,
    ) -> Result<Option<u8>, QuizSessionError> {
        let rows = self.attempts.list_attempts(learner, quiz).await?;
        Ok(rows.iter().map(|row| row.attempt.percentage()).max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lms_core::model::QuizAttempt;
    use lms_core::scoring::ScoreReport;
    use lms_core::time::fixed_now;
    use std::collections::BTreeMap;
    use storage::repository::InMemoryRepository;

    fn build_attempt(percentage: u8, offset_secs: i64) -> QuizAttempt {
        let started = fixed_now() + Duration::seconds(offset_secs);
        let report = ScoreReport {
            correct: u32::from(percentage) / 20,
            total: 5,
            percentage,
            passed: percentage >= 60,
        };
        QuizAttempt::from_score(
            QuizId::new(1),
            CourseId::new(1),
            BTreeMap::new(),
            started,
            started + Duration::seconds(45),
            &report,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn lists_history_newest_first() {
        let repo = InMemoryRepository::new();
        let learner = LearnerId::new_random();
        repo.append_attempt(learner, &build_attempt(40, 0)).await.unwrap();
        repo.append_attempt(learner, &build_attempt(80, 300)).await.unwrap();

        let svc = AttemptHistoryService::new(Arc::new(repo));
        let items = svc.list_for_quiz(learner, QuizId::new(1)).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].percentage, 80);
        assert!(items[0].passed);
        assert_eq!(items[0].duration_seconds, 45);
        assert_eq!(items[1].percentage, 40);
        assert!(!items[1].passed);
    }

    #[tokio::test]
    async fn best_percentage_over_history() {
        let repo = InMemoryRepository::new();
        let learner = LearnerId::new_random();
        let svc = AttemptHistoryService::new(Arc::new(repo.clone()));

        assert_eq!(svc.best_percentage(learner, QuizId::new(1)).await.unwrap(), None);

        repo.append_attempt(learner, &build_attempt(40, 0)).await.unwrap();
        repo.append_attempt(learner, &build_attempt(80, 60)).await.unwrap();
        repo.append_attempt(learner, &build_attempt(60, 120)).await.unwrap();

        assert_eq!(
            svc.best_percentage(learner, QuizId::new(1)).await.unwrap(),
            Some(80)
        );
    }
}
