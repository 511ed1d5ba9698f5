use async_trait::async_trait;
use lms_core::model::{
    Course, CourseId, LearnerId, ProgressRecord, Quiz, QuizAttempt, QuizId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
///
/// `Clone` so a failed attempt write can travel alongside the computed score
/// instead of discarding it.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Storage identifier for a persisted quiz attempt.
///
/// NOTE: This is currently `i64` to match `SQLite` row IDs.
pub type AttemptId = i64;

/// A persisted attempt together with its storage id.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRow {
    pub id: AttemptId,
    pub attempt: QuizAttempt,
}

impl AttemptRow {
    #[must_use]
    pub fn new(id: AttemptId, attempt: QuizAttempt) -> Self {
        Self { id, attempt }
    }
}

//
// ─── PORTS ─────────────────────────────────────────────────────────────────────
//

/// Read-only provider of course and quiz structure.
///
/// The engine treats content as immutable; authoring lives elsewhere.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Fetch a course by id, `None` when unknown.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// Fetch a quiz by id, `None` when unknown.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError>;

    /// All courses in catalog order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError>;
}

/// Persistence for per-(learner, course) completed-lesson sets.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the stored record, `None` when the learner has none for the
    /// course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failure.
    async fn get_progress(
        &self,
        learner: LearnerId,
        course: CourseId,
    ) -> Result<Option<ProgressRecord>, StorageError>;

    /// Persist or replace the record for its course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on write failure.
    async fn upsert_progress(
        &self,
        learner: LearnerId,
        record: &ProgressRecord,
    ) -> Result<(), StorageError>;

    /// All stored records for a learner, in course-id order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failure.
    async fn list_progress(&self, learner: LearnerId) -> Result<Vec<ProgressRecord>, StorageError>;
}

/// Append-only persistence for quiz attempts.
///
/// Prior attempts are independent history; nothing here overwrites.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append one attempt and return its storage id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on write failure.
    async fn append_attempt(
        &self,
        learner: LearnerId,
        attempt: &QuizAttempt,
    ) -> Result<AttemptId, StorageError>;

    /// Attempts by this learner against one quiz, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failure.
    async fn list_attempts(
        &self,
        learner: LearnerId,
        quiz: QuizId,
    ) -> Result<Vec<AttemptRow>, StorageError>;

    /// Every attempt by this learner, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failure.
    async fn list_attempts_for_learner(
        &self,
        learner: LearnerId,
    ) -> Result<Vec<AttemptRow>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<Vec<Course>>>,
    quizzes: Arc<Mutex<HashMap<QuizId, Quiz>>>,
    progress: Arc<Mutex<HashMap<(LearnerId, CourseId), ProgressRecord>>>,
    attempts: Arc<Mutex<Vec<(LearnerId, AttemptRow)>>>,
    next_attempt_id: Arc<Mutex<AttemptId>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a course in the in-memory catalog.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id is already present.
    pub fn insert_course(&self, course: Course) -> Result<(), StorageError> {
        let mut guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.iter().any(|existing| existing.id() == course.id()) {
            return Err(StorageError::Conflict);
        }
        guard.push(course);
        Ok(())
    }

    /// Register a quiz in the in-memory catalog.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id is already present.
    pub fn insert_quiz(&self, quiz: Quiz) -> Result<(), StorageError> {
        let mut guard = self
            .quizzes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.contains_key(&quiz.id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(quiz.id(), quiz);
        Ok(())
    }
}

#[async_trait]
impl ContentRepository for InMemoryRepository {
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.iter().find(|course| course.id() == id).cloned())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        let guard = self
            .quizzes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        learner: LearnerId,
        course: CourseId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&(learner, course)).cloned())
    }

    async fn upsert_progress(
        &self,
        learner: LearnerId,
        record: &ProgressRecord,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert((learner, record.course_id()), record.clone());
        Ok(())
    }

    async fn list_progress(&self, learner: LearnerId) -> Result<Vec<ProgressRecord>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut records: Vec<_> = guard
            .iter()
            .filter(|((owner, _), _)| *owner == learner)
            .map(|(_, record)| record.clone())
            .collect();
        records.sort_by_key(ProgressRecord::course_id);
        Ok(records)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(
        &self,
        learner: LearnerId,
        attempt: &QuizAttempt,
    ) -> Result<AttemptId, StorageError> {
        let id = {
            let mut counter = self
                .next_attempt_id
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            *counter += 1;
            *counter
        };
        let mut guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push((learner, AttemptRow::new(id, attempt.clone())));
        Ok(id)
    }

    async fn list_attempts(
        &self,
        learner: LearnerId,
        quiz: QuizId,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<_> = guard
            .iter()
            .filter(|(owner, row)| *owner == learner && row.attempt.quiz_id() == quiz)
            .map(|(_, row)| row.clone())
            .collect();
        rows.sort_by_key(|row| std::cmp::Reverse((row.attempt.completed_at(), row.id)));
        Ok(rows)
    }

    async fn list_attempts_for_learner(
        &self,
        learner: LearnerId,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<_> = guard
            .iter()
            .filter(|(owner, _)| *owner == learner)
            .map(|(_, row)| row.clone())
            .collect();
        rows.sort_by_key(|row| std::cmp::Reverse((row.attempt.completed_at(), row.id)));
        Ok(rows)
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates the engine's ports behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub content: Arc<dyn ContentRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let content: Arc<dyn ContentRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self {
            content,
            progress,
            attempts,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
