use lms_core::model::{CourseId, LearnerId, LessonId, ProgressRecord};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{course_id_from_i64, id_i64, learner_to_string, ser};
use crate::repository::{ProgressRepository, StorageError};

fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    u64::try_from(v)
        .map(LessonId::new)
        .map_err(|_| StorageError::Serialization(format!("invalid lesson_id: {v}")))
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        learner: LearnerId,
        course: CourseId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT lesson_id
                FROM progress_lessons
                WHERE learner_id = ?1 AND course_id = ?2
            ",
        )
        .bind(learner_to_string(learner))
        .bind(id_i64("course_id", course.value())?)
        .fetch_all(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut lessons = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: i64 = row.try_get("lesson_id").map_err(ser)?;
            lessons.push(lesson_id_from_i64(raw)?);
        }

        Ok(Some(ProgressRecord::from_persisted(course, lessons)))
    }

    async fn upsert_progress(
        &self,
        learner: LearnerId,
        record: &ProgressRecord,
    ) -> Result<(), StorageError> {
        let learner = learner_to_string(learner);
        let course = id_i64("course_id", record.course_id().value())?;

        // Replace the stored set wholesale so removals (if a caller ever
        // rebuilds a record) do not leave stale rows behind.
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query(
            r"
                DELETE FROM progress_lessons
                WHERE learner_id = ?1 AND course_id = ?2
            ",
        )
        .bind(&learner)
        .bind(course)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        for lesson in record.completed_lessons() {
            sqlx::query(
                r"
                    INSERT INTO progress_lessons (learner_id, course_id, lesson_id)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT DO NOTHING
                ",
            )
            .bind(&learner)
            .bind(course)
            .bind(id_i64("lesson_id", lesson.value())?)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    async fn list_progress(&self, learner: LearnerId) -> Result<Vec<ProgressRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT course_id, lesson_id
                FROM progress_lessons
                WHERE learner_id = ?1
                ORDER BY course_id ASC, lesson_id ASC
            ",
        )
        .bind(learner_to_string(learner))
        .fetch_all(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut records: Vec<ProgressRecord> = Vec::new();
        for row in rows {
            let course = course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?;
            let lesson = lesson_id_from_i64(row.try_get::<i64, _>("lesson_id").map_err(ser)?)?;

            match records.last_mut() {
                Some(record) if record.course_id() == course => {
                    record.mark_complete(lesson);
                }
                _ => {
                    records.push(ProgressRecord::from_persisted(course, [lesson]));
                }
            }
        }

        Ok(records)
    }
}
