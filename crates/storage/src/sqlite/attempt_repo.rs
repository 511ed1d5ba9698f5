use lms_core::model::{LearnerId, QuizAttempt, QuizId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    answers_from_json, answers_to_json, course_id_from_i64, id_i64, learner_to_string,
    quiz_id_from_i64, ser, u32_from_i64,
};
use crate::repository::{AttemptId, AttemptRepository, AttemptRow, StorageError};

fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<AttemptRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let quiz_id = quiz_id_from_i64(row.try_get::<i64, _>("quiz_id").map_err(ser)?)?;
    let course_id = course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?;
    let answers = answers_from_json(row.try_get::<&str, _>("answers").map_err(ser)?)?;
    let started_at = row.try_get("started_at").map_err(ser)?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;
    let correct = u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?;
    let total = u32_from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?;
    let percentage_raw = row.try_get::<i64, _>("percentage").map_err(ser)?;
    let percentage = u8::try_from(percentage_raw)
        .map_err(|_| StorageError::Serialization(format!("invalid percentage: {percentage_raw}")))?;
    let passed: bool = row.try_get("passed").map_err(ser)?;

    let attempt = QuizAttempt::from_persisted(
        quiz_id,
        course_id,
        answers,
        started_at,
        completed_at,
        correct,
        total,
        percentage,
        passed,
    )
    .map_err(ser)?;

    Ok(AttemptRow::new(id, attempt))
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(
        &self,
        learner: LearnerId,
        attempt: &QuizAttempt,
    ) -> Result<AttemptId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO quiz_attempts (
                    learner_id, quiz_id, course_id, answers,
                    started_at, completed_at, correct, total, percentage, passed
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(learner_to_string(learner))
        .bind(id_i64("quiz_id", attempt.quiz_id().value())?)
        .bind(id_i64("course_id", attempt.course_id().value())?)
        .bind(answers_to_json(attempt.answers())?)
        .bind(attempt.started_at())
        .bind(attempt.completed_at())
        .bind(i64::from(attempt.correct()))
        .bind(i64::from(attempt.total()))
        .bind(i64::from(attempt.percentage()))
        .bind(attempt.passed())
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn list_attempts(
        &self,
        learner: LearnerId,
        quiz: QuizId,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, quiz_id, course_id, answers,
                    started_at, completed_at, correct, total, percentage, passed
                FROM quiz_attempts
                WHERE learner_id = ?1 AND quiz_id = ?2
                ORDER BY completed_at DESC, id DESC
            ",
        )
        .bind(learner_to_string(learner))
        .bind(id_i64("quiz_id", quiz.value())?)
        .fetch_all(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        // An unreadable attempt row is treated as absent, not fatal.
        Ok(rows.iter().filter_map(|row| map_attempt_row(row).ok()).collect())
    }

    async fn list_attempts_for_learner(
        &self,
        learner: LearnerId,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, quiz_id, course_id, answers,
                    started_at, completed_at, correct, total, percentage, passed
                FROM quiz_attempts
                WHERE learner_id = ?1
                ORDER BY completed_at DESC, id DESC
            ",
        )
        .bind(learner_to_string(learner))
        .fetch_all(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(rows.iter().filter_map(|row| map_attempt_row(row).ok()).collect())
    }
}
