use std::collections::HashMap;
use std::sync::Arc;

use lms_core::model::{Course, CourseId, CourseProgress, LearnerId, Lesson, LessonId};
use storage::repository::{
    AttemptRepository, ContentRepository, ProgressRepository, Storage,
};

use crate::error::DashboardError;

/// One course row on the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseProgressItem {
    pub course_id: CourseId,
    pub title: String,
    pub progress: CourseProgress,
}

/// Cross-course statistics for one learner.
///
/// `courses_in_progress` counts every course with at least one completed
/// lesson, so fully finished courses are a subset of it rather than a
/// disjoint bucket. `average_completion_percent` averages over those same
/// courses and is 0 when the learner has touched none.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub courses_in_progress: u32,
    pub courses_completed: u32,
    pub lessons_completed: u32,
    pub attempts_passed: u32,
    pub average_completion_percent: f64,
    pub courses: Vec<CourseProgressItem>,
}

/// Read-only aggregation across all courses and the full attempt history.
///
/// Never mutates state and never caches: every call re-reads the backing
/// store, so a completion awaited elsewhere shows up on the next summary.
#[derive(Clone)]
pub struct DashboardAggregator {
    content: Arc<dyn ContentRepository>,
    progress: Arc<dyn ProgressRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl DashboardAggregator {
    #[must_use]
    pub fn new(
        content: Arc<dyn ContentRepository>,
        progress: Arc<dyn ProgressRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            content,
            progress,
            attempts,
        }
    }

    #[must_use]
    pub fn from_storage(storage: &Storage) -> Self {
        Self::new(
            Arc::clone(&storage.content),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.attempts),
        )
    }

    /// Build the learner's dashboard.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Storage` if any backing read fails.
    pub async fn summarize(&self, learner: LearnerId) -> Result<DashboardSummary, DashboardError> {
        let courses = self.content.list_courses().await?;
        let records: HashMap<CourseId, _> = self
            .progress
            .list_progress(learner)
            .await?
            .into_iter()
            .map(|record| (record.course_id(), record))
            .collect();

        let mut items = Vec::with_capacity(courses.len());
        let mut completed_courses = 0_u32;
        let mut lessons_completed = 0_u32;
        let mut touched = 0_u32;
        let mut percent_sum = 0.0_f64;

        for course in &courses {
            let progress = course_progress(course, records.get(&course.id()));
            if progress.completed > 0 {
                touched += 1;
                percent_sum += progress.percent();
                lessons_completed += progress.completed;
                if progress.is_complete() {
                    completed_courses += 1;
                }
            }
            items.push(CourseProgressItem {
                course_id: course.id(),
                title: course.title().to_owned(),
                progress,
            });
        }

        let attempts_passed = self
            .attempts
            .list_attempts_for_learner(learner)
            .await?
            .iter()
            .filter(|row| row.attempt.passed())
            .count();

        Ok(DashboardSummary {
            courses_in_progress: touched,
            courses_completed: completed_courses,
            lessons_completed,
            attempts_passed: u32::try_from(attempts_passed).unwrap_or(u32::MAX),
            average_completion_percent: if touched == 0 {
                0.0
            } else {
                percent_sum / f64::from(touched)
            },
            courses: items,
        })
    }
}

fn course_progress(
    course: &Course,
    record: Option<&lms_core::model::ProgressRecord>,
) -> CourseProgress {
    let lesson_ids: Vec<LessonId> = course.lessons().iter().map(Lesson::id).collect();
    let completed = record.map_or(0, |record| record.completed_among(&lesson_ids));
    CourseProgress::new(
        u32::try_from(completed).unwrap_or(u32::MAX),
        u32::try_from(lesson_ids.len()).unwrap_or(u32::MAX),
    )
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
