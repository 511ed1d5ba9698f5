use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a Course
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CourseId(u64);

impl CourseId {
    /// Wraps a raw catalog identifier
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Unwraps to the raw u64
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Unique identifier for a Lesson within a course
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LessonId(u64);

impl LessonId {
    /// Wraps a raw catalog identifier
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Unwraps to the raw u64
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Unique identifier for a Quiz
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuizId(u64);

impl QuizId {
    /// Wraps a raw catalog identifier
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Unwraps to the raw u64
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Unique identifier for a quiz Question
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionId(u64);

impl QuestionId {
    /// Wraps a raw catalog identifier
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Unwraps to the raw u64
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Unique identifier for a learner.
///
/// Learners come from the host application's auth layer, so this wraps a
/// UUID instead of a catalog-assigned integer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LearnerId(Uuid);

impl LearnerId {
    /// Wraps an existing UUID
    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Generates a fresh random learner identifier
    #[must_use]
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Unwraps to the underlying UUID
    #[must_use]
    pub fn value(&self) -> Uuid {
        self.0
    }
}

// ─── Debug / Display Implementations ───────────────────────────────────────────

macro_rules! id_formatting {
    ($($ty:ident),+ $(,)?) => {$(
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($ty), "({})"), self.0)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    )+};
}

id_formatting!(CourseId, LessonId, QuizId, QuestionId, LearnerId);

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for CourseId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.parse().map_err(|_| ParseIdError { kind: "CourseId" })?;
        Ok(Self(raw))
    }
}

impl FromStr for LessonId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.parse().map_err(|_| ParseIdError { kind: "LessonId" })?;
        Ok(Self(raw))
    }
}

impl FromStr for QuizId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.parse().map_err(|_| ParseIdError { kind: "QuizId" })?;
        Ok(Self(raw))
    }
}

impl FromStr for QuestionId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.parse().map_err(|_| ParseIdError { kind: "QuestionId" })?;
        Ok(Self(raw))
    }
}

impl FromStr for LearnerId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .parse::<Uuid>()
            .map_err(|_| ParseIdError { kind: "LearnerId" })?;
        Ok(Self(raw))
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
