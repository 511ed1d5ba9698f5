use std::collections::BTreeSet;

use crate::model::ids::{CourseId, LessonId};

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// The set of lessons a learner has completed in one course.
///
/// Created lazily on the first completion and never deleted by the engine.
/// Insertion is idempotent; ordering is irrelevant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    course_id: CourseId,
    completed: BTreeSet<LessonId>,
}

impl ProgressRecord {
    /// Creates an empty record for a course.
    #[must_use]
    pub fn new(course_id: CourseId) -> Self {
        Self {
            course_id,
            completed: BTreeSet::new(),
        }
    }

    /// Rehydrates a record from persisted lesson ids. Duplicates collapse.
    #[must_use]
    pub fn from_persisted(
        course_id: CourseId,
        lessons: impl IntoIterator<Item = LessonId>,
    ) -> Self {
        Self {
            course_id,
            completed: lessons.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    /// Marks a lesson complete. Returns true if it was newly inserted.
    pub fn mark_complete(&mut self, lesson: LessonId) -> bool {
        self.completed.insert(lesson)
    }

    #[must_use]
    pub fn is_complete(&self, lesson: LessonId) -> bool {
        self.completed.contains(&lesson)
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    #[must_use]
    pub fn completed_lessons(&self) -> impl Iterator<Item = LessonId> + '_ {
        self.completed.iter().copied()
    }

    /// Number of completed lessons among `known`, ignoring any stale ids
    /// that no longer belong to the course.
    #[must_use]
    pub fn completed_among(&self, known: &[LessonId]) -> usize {
        known
            .iter()
            .filter(|lesson| self.completed.contains(lesson))
            .count()
    }
}

//
// ─── COURSE PROGRESS ───────────────────────────────────────────────────────────
//

/// Completion counts for one course, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseProgress {
    pub completed: u32,
    pub total: u32,
}

impl CourseProgress {
    #[must_use]
    pub fn new(completed: u32, total: u32) -> Self {
        // A completed count can never exceed the lesson count.
        Self {
            completed: completed.min(total),
            total,
        }
    }

    /// Completion as a fraction in [0, 1]. Zero-lesson courses report 0.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.completed) / f64::from(self.total)
    }

    /// Completion as a percentage in [0, 100].
    #[must_use]
    pub fn percent(&self) -> f64 {
        self.fraction() * 100.0
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_complete_is_idempotent() {
        let mut record = ProgressRecord::new(CourseId::new(1));
        assert!(record.mark_complete(LessonId::new(1)));
        assert!(!record.mark_complete(LessonId::new(1)));
        assert!(!record.mark_complete(LessonId::new(1)));
        assert_eq!(record.completed_count(), 1);
    }

    #[test]
    fn from_persisted_dedupes() {
        let record = ProgressRecord::from_persisted(
            CourseId::new(1),
            vec![LessonId::new(2), LessonId::new(2), LessonId::new(5)],
        );
        assert_eq!(record.completed_count(), 2);
        assert!(record.is_complete(LessonId::new(5)));
    }

    #[test]
    fn completed_among_ignores_stale_lessons() {
        let record = ProgressRecord::from_persisted(
            CourseId::new(1),
            vec![LessonId::new(1), LessonId::new(99)],
        );
        let known = vec![LessonId::new(1), LessonId::new(2)];
        assert_eq!(record.completed_among(&known), 1);
    }

    #[test]
    fn fraction_half_complete() {
        let progress = CourseProgress::new(2, 4);
        assert!((progress.fraction() - 0.5).abs() < f64::EPSILON);
        assert!((progress.percent() - 50.0).abs() < f64::EPSILON);
        assert!(!progress.is_complete());
    }

    #[test]
    fn fraction_of_empty_course_is_zero() {
        let progress = CourseProgress::new(0, 0);
        assert!((progress.fraction()).abs() < f64::EPSILON);
        assert!(!progress.is_complete());
    }

    #[test]
    fn completed_clamps_to_total() {
        let progress = CourseProgress::new(5, 4);
        assert_eq!(progress.completed, 4);
        assert!(progress.is_complete());
        assert!(progress.fraction() <= 1.0);
    }

    #[test]
    fn all_lessons_done_is_complete() {
        let progress = CourseProgress::new(3, 3);
        assert!(progress.is_complete());
        assert!((progress.percent() - 100.0).abs() < f64::EPSILON);
    }
}
