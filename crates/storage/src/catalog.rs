//! JSON course catalog.
//!
//! Course content ships as a JSON document (one per deployment), parsed once
//! at startup into validated domain structures and then served read-only as
//! a [`ContentRepository`].

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use lms_core::model::{
    Course, CourseError, CourseId, Lesson, LessonId, Question, QuestionId, Quiz, QuizError,
    QuizId, DEFAULT_PASS_THRESHOLD,
};

use crate::repository::{ContentRepository, StorageError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Course(#[from] CourseError),

    #[error(transparent)]
    Quiz(#[from] QuizError),

    #[error("duplicate course id {0} in catalog")]
    DuplicateCourseId(u64),

    #[error("duplicate quiz id {0} in catalog")]
    DuplicateQuizId(u64),
}

//
// ─── DOCUMENT SHAPES ───────────────────────────────────────────────────────────
//

// Serde DTOs are kept apart from the domain types so catalog files can stay
// loose (optional fields, defaults) while the domain stays validated.

#[derive(Debug, Deserialize)]
struct CatalogDoc {
    courses: Vec<CourseDoc>,
}

#[derive(Debug, Deserialize)]
struct CourseDoc {
    id: u64,
    title: String,
    #[serde(default)]
    lessons: Vec<LessonDoc>,
    quiz: Option<QuizDoc>,
}

#[derive(Debug, Deserialize)]
struct LessonDoc {
    id: u64,
    title: String,
    #[serde(default)]
    duration_minutes: u32,
}

#[derive(Debug, Deserialize)]
struct QuizDoc {
    id: u64,
    title: String,
    questions: Vec<QuestionDoc>,
    #[serde(default)]
    time_limit_seconds: u32,
    pass_threshold: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct QuestionDoc {
    id: u64,
    prompt: String,
    options: Vec<String>,
    correct: usize,
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// An immutable, validated course catalog loaded from JSON.
#[derive(Clone, Debug)]
pub struct JsonCatalog {
    courses: Vec<Course>,
    quizzes: HashMap<QuizId, Quiz>,
}

impl JsonCatalog {
    /// Parses and validates a catalog from a JSON string.
    ///
    /// Quizzes without a `pass_threshold` fall back to
    /// [`DEFAULT_PASS_THRESHOLD`]; a missing `time_limit_seconds` means
    /// untimed.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` when the JSON is malformed or any course/quiz
    /// fails domain validation.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDoc = serde_json::from_str(json)?;

        let mut courses = Vec::with_capacity(doc.courses.len());
        let mut quizzes = HashMap::new();

        for course_doc in doc.courses {
            let course_id = CourseId::new(course_doc.id);
            if courses.iter().any(|c: &Course| c.id() == course_id) {
                return Err(CatalogError::DuplicateCourseId(course_doc.id));
            }

            let mut lessons = Vec::with_capacity(course_doc.lessons.len());
            for lesson in course_doc.lessons {
                lessons.push(Lesson::new(
                    LessonId::new(lesson.id),
                    lesson.title,
                    lesson.duration_minutes,
                )?);
            }

            let quiz_id = match course_doc.quiz {
                Some(quiz_doc) => {
                    let quiz_id = QuizId::new(quiz_doc.id);
                    if quizzes.contains_key(&quiz_id) {
                        return Err(CatalogError::DuplicateQuizId(quiz_doc.id));
                    }
                    let mut questions = Vec::with_capacity(quiz_doc.questions.len());
                    for question in quiz_doc.questions {
                        questions.push(Question::new(
                            QuestionId::new(question.id),
                            question.prompt,
                            question.options,
                            question.correct,
                        )?);
                    }
                    let quiz = Quiz::new(
                        quiz_id,
                        course_id,
                        quiz_doc.title,
                        questions,
                        quiz_doc.time_limit_seconds,
                        quiz_doc.pass_threshold.unwrap_or(DEFAULT_PASS_THRESHOLD),
                    )?;
                    quizzes.insert(quiz_id, quiz);
                    Some(quiz_id)
                }
                None => None,
            };

            courses.push(Course::new(course_id, course_doc.title, lessons, quiz_id)?);
        }

        Ok(Self { courses, quizzes })
    }

    /// Loads and validates a catalog from a file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Io` when the file cannot be read, otherwise as
    /// [`JsonCatalog::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    #[must_use]
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    #[must_use]
    pub fn quiz_count(&self) -> usize {
        self.quizzes.len()
    }
}

#[async_trait]
impl ContentRepository for JsonCatalog {
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        Ok(self.courses.iter().find(|course| course.id() == id).cloned())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        Ok(self.quizzes.get(&id).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        Ok(self.courses.clone())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "courses": [
            {
                "id": 1,
                "title": "Rust Basics",
                "lessons": [
                    { "id": 1, "title": "Ownership", "duration_minutes": 12 },
                    { "id": 2, "title": "Borrowing" }
                ],
                "quiz": {
                    "id": 10,
                    "title": "Rust Basics Quiz",
                    "time_limit_seconds": 120,
                    "questions": [
                        {
                            "id": 1,
                            "prompt": "What moves by default?",
                            "options": ["values", "references"],
                            "correct": 0
                        }
                    ]
                }
            },
            { "id": 2, "title": "No Quiz Here" }
        ]
    }"#;

    #[tokio::test]
    async fn parses_sample_catalog() {
        let catalog = JsonCatalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.courses().len(), 2);
        assert_eq!(catalog.quiz_count(), 1);

        let course = catalog.get_course(CourseId::new(1)).await.unwrap().unwrap();
        assert_eq!(course.lesson_count(), 2);
        assert_eq!(course.quiz_id(), Some(QuizId::new(10)));
        // lessons without duration metadata default to zero
        assert_eq!(course.lessons()[1].duration_minutes(), 0);

        let quiz = catalog.get_quiz(QuizId::new(10)).await.unwrap().unwrap();
        assert_eq!(quiz.time_limit_seconds(), 120);
        assert_eq!(quiz.pass_threshold(), DEFAULT_PASS_THRESHOLD);

        let bare = catalog.get_course(CourseId::new(2)).await.unwrap().unwrap();
        assert_eq!(bare.quiz_id(), None);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = JsonCatalog::from_json("{ not json").unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[test]
    fn rejects_duplicate_course_ids() {
        let json = r#"{"courses":[{"id":1,"title":"A"},{"id":1,"title":"B"}]}"#;
        let err = JsonCatalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateCourseId(1)));
    }

    #[test]
    fn rejects_invalid_answer_key() {
        let json = r#"{
            "courses": [{
                "id": 1,
                "title": "A",
                "quiz": {
                    "id": 2,
                    "title": "Q",
                    "questions": [
                        { "id": 1, "prompt": "?", "options": ["x", "y"], "correct": 5 }
                    ]
                }
            }]
        }"#;
        let err = JsonCatalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::Quiz(_)));
    }
}
