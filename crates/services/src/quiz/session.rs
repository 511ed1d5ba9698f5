use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

use lms_core::model::{Question, QuestionId, Quiz, QuizAttempt};
use lms_core::scoring::{ScoreReport, score};

use crate::error::QuizSessionError;

//
// ─── STATES ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of one quiz attempt.
///
/// `Submitted` and `Abandoned` are terminal; a retake is a brand-new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    InProgress,
    Submitted,
    Abandoned,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::NotStarted => "not started",
            SessionState::InProgress => "in progress",
            SessionState::Submitted => "submitted",
            SessionState::Abandoned => "abandoned",
        };
        f.write_str(name)
    }
}

/// Which path drove the `InProgress → Submitted` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    TimeExpired,
}

/// Result of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still counting; carries the seconds now remaining.
    Counting(u32),
    /// The countdown just hit zero; the caller must run the auto-submit.
    Expired,
    /// The session is untimed or no longer in progress; stop ticking.
    Inactive,
}

/// Snapshot of where a session stands, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub current: usize,
    pub remaining_seconds: Option<u32>,
    pub state: SessionState,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// The quiz attempt state machine. Pure: no I/O, no tasks, no clocks.
///
/// The controller wraps one of these in a mutex; `finish` is the single
/// guarded transition out of `InProgress`, so whichever caller reaches it
/// first — learner or timer — produces the one and only attempt.
#[derive(Debug, Clone)]
pub struct QuizSession {
    quiz: Quiz,
    state: SessionState,
    answers: BTreeMap<QuestionId, usize>,
    current: usize,
    remaining_seconds: Option<u32>,
    started_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    #[must_use]
    pub fn new(quiz: Quiz) -> Self {
        Self {
            quiz,
            state: SessionState::NotStarted,
            answers: BTreeMap::new(),
            current: 0,
            remaining_seconds: None,
            started_at: None,
        }
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Seconds left on the countdown; `None` for untimed quizzes.
    #[must_use]
    pub fn remaining_seconds(&self) -> Option<u32> {
        self.remaining_seconds
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// The learner's recorded answer for a question, if any.
    #[must_use]
    pub fn answer(&self, question: QuestionId) -> Option<usize> {
        self.answers.get(&question).copied()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.quiz.questions().get(self.current)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.quiz.question_count(),
            answered: self.answered_count(),
            current: self.current,
            remaining_seconds: self.remaining_seconds,
            state: self.state,
        }
    }

    fn require_in_progress(&self) -> Result<(), QuizSessionError> {
        if self.state == SessionState::InProgress {
            Ok(())
        } else {
            Err(QuizSessionError::InvalidState {
                expected: SessionState::InProgress,
                actual: self.state,
            })
        }
    }

    /// Begin the attempt, arming the countdown for timed quizzes.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` unless the session is
    /// `NotStarted`.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), QuizSessionError> {
        if self.state != SessionState::NotStarted {
            return Err(QuizSessionError::InvalidState {
                expected: SessionState::NotStarted,
                actual: self.state,
            });
        }
        self.state = SessionState::InProgress;
        self.started_at = Some(now);
        self.remaining_seconds = self
            .quiz
            .is_timed()
            .then(|| self.quiz.time_limit_seconds());
        Ok(())
    }

    /// Record an answer, replacing any earlier choice for the same question.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` outside `InProgress`,
    /// `UnknownQuestion` for a question not in this quiz, and
    /// `UnknownOption` for an option index past the question's options.
    pub fn select_answer(
        &mut self,
        question: QuestionId,
        option: usize,
    ) -> Result<(), QuizSessionError> {
        self.require_in_progress()?;
        let Some(found) = self.quiz.question(question) else {
            return Err(QuizSessionError::UnknownQuestion(question));
        };
        if !found.has_option(option) {
            return Err(QuizSessionError::UnknownOption { question, option });
        }
        self.answers.insert(question, option);
        Ok(())
    }

    /// Jump to a question by position. Navigation never touches answers.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` outside `InProgress` and
    /// `IndexOutOfRange` for a position past the question list.
    pub fn go_to(&mut self, index: usize) -> Result<(), QuizSessionError> {
        self.require_in_progress()?;
        if index >= self.quiz.question_count() {
            return Err(QuizSessionError::IndexOutOfRange {
                index,
                total: self.quiz.question_count(),
            });
        }
        self.current = index;
        Ok(())
    }

    /// Advance to the next question, stopping at the last one.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` outside `InProgress`.
    pub fn next(&mut self) -> Result<(), QuizSessionError> {
        self.require_in_progress()?;
        if self.current + 1 < self.quiz.question_count() {
            self.current += 1;
        }
        Ok(())
    }

    /// Step back to the previous question, stopping at the first one.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` outside `InProgress`.
    pub fn previous(&mut self) -> Result<(), QuizSessionError> {
        self.require_in_progress()?;
        self.current = self.current.saturating_sub(1);
        Ok(())
    }

    /// Advance the countdown by one second.
    ///
    /// Returns `Tick::Expired` exactly once, on the tick that reaches zero.
    /// Untimed sessions and sessions that have left `InProgress` report
    /// `Tick::Inactive` so a stray tick can never touch a finalized attempt.
    pub fn tick(&mut self) -> Tick {
        if self.state != SessionState::InProgress {
            return Tick::Inactive;
        }
        match self.remaining_seconds {
            None => Tick::Inactive,
            Some(0) => Tick::Expired,
            Some(left) => {
                let left = left - 1;
                self.remaining_seconds = Some(left);
                if left == 0 { Tick::Expired } else { Tick::Counting(left) }
            }
        }
    }

    /// The one guarded transition out of `InProgress`.
    ///
    /// Scores the collected answers (missing ones count as incorrect) and
    /// returns the attempt record. Exactly one caller ever gets `Ok`; a race
    /// between manual submit and timer expiry resolves to whoever reaches
    /// this first, and the loser sees `InvalidState`.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` outside `InProgress`.
    pub fn finish(
        &mut self,
        now: DateTime<Utc>,
        trigger: SubmitTrigger,
    ) -> Result<QuizAttempt, QuizSessionError> {
        self.require_in_progress()?;
        let started_at = self.started_at.ok_or(QuizSessionError::InvalidState {
            expected: SessionState::InProgress,
            actual: self.state,
        })?;
        // Never let a skewed clock produce an attempt that fails validation.
        let completed_at = now.max(started_at);

        let report = self.score_now();
        let attempt = QuizAttempt::from_score(
            self.quiz.id(),
            self.quiz.course_id(),
            self.answers.clone(),
            started_at,
            completed_at,
            &report,
        )?;

        self.state = SessionState::Submitted;
        if trigger == SubmitTrigger::TimeExpired {
            self.remaining_seconds = Some(0);
        }
        Ok(attempt)
    }

    /// Clean cancel: terminal, no scoring, no attempt record.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` outside `InProgress`.
    pub fn abandon(&mut self) -> Result<(), QuizSessionError> {
        self.require_in_progress()?;
        self.state = SessionState::Abandoned;
        Ok(())
    }

    fn score_now(&self) -> ScoreReport {
        score(
            self.quiz.questions(),
            &self.answers,
            self.quiz.pass_threshold(),
        )
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
