use thiserror::Error;

use crate::model::ids::{CourseId, QuestionId, QuizId};

/// Pass threshold applied when a quiz does not declare its own.
///
/// Matches the historical fixed 60% rule; the per-quiz field is canonical.
pub const DEFAULT_PASS_THRESHOLD: u8 = 60;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("question needs at least two options, got {0}")]
    TooFewOptions(usize),

    #[error("answer key index {index} is out of range for {options} options")]
    AnswerKeyOutOfRange { index: usize, options: usize },

    #[error("quiz has no questions")]
    NoQuestions,

    #[error("duplicate question id {0} in quiz")]
    DuplicateQuestionId(QuestionId),

    #[error("pass threshold must be 0-100, got {0}")]
    InvalidPassThreshold(u8),
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question with an ordered option list.
///
/// Options are addressed by position; the answer key is the index of the
/// correct option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct: usize,
}

impl Question {
    /// Creates a new question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptyPrompt` for a blank prompt,
    /// `QuizError::TooFewOptions` for fewer than two options, and
    /// `QuizError::AnswerKeyOutOfRange` when `correct` does not index an
    /// option.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct: usize,
    ) -> Result<Self, QuizError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuizError::EmptyPrompt);
        }
        if options.len() < 2 {
            return Err(QuizError::TooFewOptions(options.len()));
        }
        if correct >= options.len() {
            return Err(QuizError::AnswerKeyOutOfRange {
                index: correct,
                options: options.len(),
            });
        }

        Ok(Self {
            id,
            prompt: prompt.trim().to_owned(),
            options,
            correct,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Index of the correct option.
    #[must_use]
    pub fn correct(&self) -> usize {
        self.correct
    }

    /// True if `option` indexes one of this question's options.
    #[must_use]
    pub fn has_option(&self, option: usize) -> bool {
        option < self.options.len()
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// A quiz: an ordered question set with timing and pass rules.
///
/// `time_limit_seconds == 0` means the attempt is untimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    id: QuizId,
    course_id: CourseId,
    title: String,
    questions: Vec<Question>,
    time_limit_seconds: u32,
    pass_threshold: u8,
}

impl Quiz {
    /// Creates a new quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptyTitle`, `QuizError::NoQuestions`,
    /// `QuizError::DuplicateQuestionId`, or
    /// `QuizError::InvalidPassThreshold` when validation fails.
    pub fn new(
        id: QuizId,
        course_id: CourseId,
        title: impl Into<String>,
        questions: Vec<Question>,
        time_limit_seconds: u32,
        pass_threshold: u8,
    ) -> Result<Self, QuizError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        let mut seen = std::collections::HashSet::new();
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(QuizError::DuplicateQuestionId(question.id()));
            }
        }
        if pass_threshold > 100 {
            return Err(QuizError::InvalidPassThreshold(pass_threshold));
        }

        Ok(Self {
            id,
            course_id,
            title: title.trim().to_owned(),
            questions,
            time_limit_seconds,
            pass_threshold,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Looks up a question by id.
    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|question| question.id() == id)
    }

    /// Seconds allowed for one attempt; 0 means unlimited.
    #[must_use]
    pub fn time_limit_seconds(&self) -> u32 {
        self.time_limit_seconds
    }

    /// True when attempts against this quiz run a countdown.
    #[must_use]
    pub fn is_timed(&self) -> bool {
        self.time_limit_seconds > 0
    }

    /// Minimum score percentage required to pass.
    #[must_use]
    pub fn pass_threshold(&self) -> u8 {
        self.pass_threshold
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
