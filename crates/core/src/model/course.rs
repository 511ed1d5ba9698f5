use thiserror::Error;

use crate::model::ids::{CourseId, LessonId, QuizId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("lesson title cannot be empty")]
    EmptyLessonTitle,

    #[error("duplicate lesson id {0} in course")]
    DuplicateLessonId(LessonId),
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// A single lesson inside a course. Immutable catalog data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    title: String,
    duration_minutes: u32,
}

impl Lesson {
    /// Creates a new lesson.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyLessonTitle` if the title is empty or
    /// whitespace-only.
    pub fn new(
        id: LessonId,
        title: impl Into<String>,
        duration_minutes: u32,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyLessonTitle);
        }

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            duration_minutes,
        })
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A course: an ordered sequence of lessons plus an optional quiz.
///
/// Courses are owned by the content repository and never mutated by the
/// engine. A lesson's ordinal position is its index in `lessons`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    title: String,
    lessons: Vec<Lesson>,
    quiz_id: Option<QuizId>,
}

impl Course {
    /// Creates a new course.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` for a blank title and
    /// `CourseError::DuplicateLessonId` when two lessons share an id.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        lessons: Vec<Lesson>,
        quiz_id: Option<QuizId>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }

        let mut seen = std::collections::HashSet::new();
        for lesson in &lessons {
            if !seen.insert(lesson.id()) {
                return Err(CourseError::DuplicateLessonId(lesson.id()));
            }
        }

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            lessons,
            quiz_id,
        })
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    #[must_use]
    pub fn quiz_id(&self) -> Option<QuizId> {
        self.quiz_id
    }

    /// Total number of lessons in this course.
    #[must_use]
    pub fn lesson_count(&self) -> usize {
        self.lessons.len()
    }

    /// Looks up a lesson by id.
    #[must_use]
    pub fn lesson(&self, id: LessonId) -> Option<&Lesson> {
        self.lessons.iter().find(|lesson| lesson.id() == id)
    }

    /// True if the given lesson id belongs to this course.
    #[must_use]
    pub fn contains_lesson(&self, id: LessonId) -> bool {
        self.lesson(id).is_some()
    }

    /// Ordinal position of a lesson within the course, if present.
    #[must_use]
    pub fn lesson_position(&self, id: LessonId) -> Option<usize> {
        self.lessons.iter().position(|lesson| lesson.id() == id)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
