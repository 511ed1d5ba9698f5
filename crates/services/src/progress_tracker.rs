use std::sync::Arc;

use lms_core::model::{CourseId, CourseProgress, LearnerId, Lesson, LessonId, ProgressRecord};
use storage::repository::{ContentRepository, ProgressRepository, Storage};

use crate::error::ProgressError;

/// Tracks which lessons a learner has completed per course.
///
/// Referential integrity is validated against content before any write, and
/// the write is awaited before reporting success, so a dashboard read issued
/// afterwards always observes it.
#[derive(Clone)]
pub struct ProgressTracker {
    content: Arc<dyn ContentRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(content: Arc<dyn ContentRepository>, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { content, progress }
    }

    #[must_use]
    pub fn from_storage(storage: &Storage) -> Self {
        Self::new(Arc::clone(&storage.content), Arc::clone(&storage.progress))
    }

    /// Mark a lesson complete. Idempotent: repeating a completed pair is a
    /// successful no-op and writes nothing. Returns whether the lesson was
    /// newly completed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::CourseNotFound` or `LessonNotFound` when the
    /// pair fails validation against content, and `ProgressError::Storage`
    /// on gateway failures.
    pub async fn mark_complete(
        &self,
        learner: LearnerId,
        course: CourseId,
        lesson: LessonId,
    ) -> Result<bool, ProgressError> {
        let found = self
            .content
            .get_course(course)
            .await?
            .ok_or(ProgressError::CourseNotFound(course))?;
        if !found.contains_lesson(lesson) {
            return Err(ProgressError::LessonNotFound { course, lesson });
        }

        // Created lazily on first completion.
        let mut record = self
            .progress
            .get_progress(learner, course)
            .await?
            .unwrap_or_else(|| ProgressRecord::new(course));

        let newly_completed = record.mark_complete(lesson);
        if newly_completed {
            self.progress.upsert_progress(learner, &record).await?;
        }
        Ok(newly_completed)
    }

    /// Completion counts for one course. A learner with no stored record
    /// gets `0 / total`, not an error. Lesson ids that no longer exist in
    /// the course never inflate the count.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::CourseNotFound` for an unknown course and
    /// `ProgressError::Storage` on gateway failures.
    pub async fn get_progress(
        &self,
        learner: LearnerId,
        course: CourseId,
    ) -> Result<CourseProgress, ProgressError> {
        let found = self
            .content
            .get_course(course)
            .await?
            .ok_or(ProgressError::CourseNotFound(course))?;
        let lesson_ids: Vec<LessonId> = found.lessons().iter().map(Lesson::id).collect();

        let completed = match self.progress.get_progress(learner, course).await? {
            Some(record) => record.completed_among(&lesson_ids),
            None => 0,
        };

        Ok(CourseProgress::new(
            u32::try_from(completed).unwrap_or(u32::MAX),
            u32::try_from(lesson_ids.len()).unwrap_or(u32::MAX),
        ))
    }

    /// True iff every lesson of the course is complete. Zero-lesson courses
    /// are never complete.
    ///
    /// # Errors
    ///
    /// Same as [`get_progress`](Self::get_progress).
    pub async fn is_course_complete(
        &self,
        learner: LearnerId,
        course: CourseId,
    ) -> Result<bool, ProgressError> {
        Ok(self.get_progress(learner, course).await?.is_complete())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use lms_core::model::Course;
    use storage::repository::InMemoryRepository;

    fn build_course(id: u64, lessons: u64) -> Course {
        let lessons = (1..=lessons)
            .map(|n| Lesson::new(LessonId::new(n), format!("Lesson {n}"), 10).unwrap())
            .collect();
        Course::new(CourseId::new(id), format!("Course {id}"), lessons, None).unwrap()
    }

    fn tracker(repo: &InMemoryRepository) -> ProgressTracker {
        ProgressTracker::new(Arc::new(repo.clone()), Arc::new(repo.clone()))
    }

    #[tokio::test]
    async fn mark_complete_is_idempotent() {
        let repo = InMemoryRepository::new();
        repo.insert_course(build_course(1, 4)).unwrap();
        let tracker = tracker(&repo);
        let learner = LearnerId::new_random();

        assert!(
            tracker
                .mark_complete(learner, CourseId::new(1), LessonId::new(2))
                .await
                .unwrap()
        );
        assert!(
            !tracker
                .mark_complete(learner, CourseId::new(1), LessonId::new(2))
                .await
                .unwrap()
        );

        let progress = tracker.get_progress(learner, CourseId::new(1)).await.unwrap();
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.total, 4);
    }

    #[tokio::test]
    async fn mark_complete_validates_against_content() {
        let repo = InMemoryRepository::new();
        repo.insert_course(build_course(1, 2)).unwrap();
        let tracker = tracker(&repo);
        let learner = LearnerId::new_random();

        let err = tracker
            .mark_complete(learner, CourseId::new(9), LessonId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::CourseNotFound(id) if id == CourseId::new(9)));

        let err = tracker
            .mark_complete(learner, CourseId::new(1), LessonId::new(7))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProgressError::LessonNotFound { lesson, .. } if lesson == LessonId::new(7)
        ));

        // Nothing was persisted for either failure.
        assert!(repo.list_progress(learner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_progress_without_record_is_zero() {
        let repo = InMemoryRepository::new();
        repo.insert_course(build_course(1, 4)).unwrap();
        let tracker = tracker(&repo);

        let progress = tracker
            .get_progress(LearnerId::new_random(), CourseId::new(1))
            .await
            .unwrap();
        assert_eq!(progress.completed, 0);
        assert_eq!(progress.total, 4);
        assert!((progress.fraction()).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn halfway_course_reports_fifty_percent() {
        let repo = InMemoryRepository::new();
        repo.insert_course(build_course(1, 4)).unwrap();
        let tracker = tracker(&repo);
        let learner = LearnerId::new_random();

        for n in [1, 2] {
            tracker
                .mark_complete(learner, CourseId::new(1), LessonId::new(n))
                .await
                .unwrap();
        }

        let progress = tracker.get_progress(learner, CourseId::new(1)).await.unwrap();
        assert!((progress.percent() - 50.0).abs() < f64::EPSILON);
        assert!(!tracker.is_course_complete(learner, CourseId::new(1)).await.unwrap());
    }

    #[tokio::test]
    async fn completing_every_lesson_completes_the_course() {
        let repo = InMemoryRepository::new();
        repo.insert_course(build_course(1, 3)).unwrap();
        let tracker = tracker(&repo);
        let learner = LearnerId::new_random();

        for n in 1..=3 {
            tracker
                .mark_complete(learner, CourseId::new(1), LessonId::new(n))
                .await
                .unwrap();
        }

        assert!(tracker.is_course_complete(learner, CourseId::new(1)).await.unwrap());
    }

    #[tokio::test]
    async fn zero_lesson_course_is_never_complete() {
        let repo = InMemoryRepository::new();
        repo.insert_course(build_course(1, 0)).unwrap();
        let tracker = tracker(&repo);
        let learner = LearnerId::new_random();

        let progress = tracker.get_progress(learner, CourseId::new(1)).await.unwrap();
        assert_eq!(progress.total, 0);
        assert!((progress.fraction()).abs() < f64::EPSILON);
        assert!(!tracker.is_course_complete(learner, CourseId::new(1)).await.unwrap());
    }

    #[tokio::test]
    async fn stale_lesson_ids_never_inflate_progress() {
        let repo = InMemoryRepository::new();
        repo.insert_course(build_course(1, 2)).unwrap();
        let tracker = tracker(&repo);
        let learner = LearnerId::new_random();

        // A record persisted against an older version of the course.
        let record = ProgressRecord::from_persisted(
            CourseId::new(1),
            vec![LessonId::new(1), LessonId::new(2), LessonId::new(3)],
        );
        repo.upsert_progress(learner, &record).await.unwrap();

        let progress = tracker.get_progress(learner, CourseId::new(1)).await.unwrap();
        assert_eq!(progress.completed, 2);
        assert_eq!(progress.total, 2);
    }
}
