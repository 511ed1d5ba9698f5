use std::sync::Arc;

use tokio::sync::Mutex;

use lms_core::Clock;
use lms_core::model::{LearnerId, Question, QuestionId, Quiz, QuizAttempt, QuizId};
use storage::repository::{AttemptId, AttemptRepository, ContentRepository, StorageError};

use super::session::{QuizSession, SessionProgress, SessionState, SubmitTrigger};
use super::timer::CountdownTimer;
use crate::error::QuizSessionError;

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

/// What a submission produced, whether the learner submitted or time ran out.
///
/// A failed persist does not discard the score: the attempt and its verdict
/// are always present, and `save_error` tells the caller their result may not
/// have been saved. `finalize_attempt` retries the write.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub attempt: QuizAttempt,
    pub trigger: SubmitTrigger,
    pub attempt_id: Option<AttemptId>,
    pub save_error: Option<StorageError>,
}

impl SubmissionOutcome {
    #[must_use]
    pub fn is_saved(&self) -> bool {
        self.attempt_id.is_some()
    }
}

//
// ─── SHARED CELL ───────────────────────────────────────────────────────────────
//

/// State shared between the controller handle and the countdown task.
///
/// The session mutex is the transition guard: manual submit and timer expiry
/// both run `QuizSession::finish` while holding it, so exactly one side ever
/// scores and persists.
pub(crate) struct SessionCell {
    pub(crate) session: Mutex<QuizSession>,
    pub(crate) outcome: Mutex<Option<SubmissionOutcome>>,
    pub(crate) attempts: Arc<dyn AttemptRepository>,
    pub(crate) learner: LearnerId,
    pub(crate) clock: Clock,
}

impl SessionCell {
    pub(crate) async fn persist(
        &self,
        attempt: QuizAttempt,
        trigger: SubmitTrigger,
    ) -> SubmissionOutcome {
        let (attempt_id, save_error) = match self.attempts.append_attempt(self.learner, &attempt).await
        {
            Ok(id) => (Some(id), None),
            Err(err) => (None, Some(err)),
        };
        SubmissionOutcome {
            attempt,
            trigger,
            attempt_id,
            save_error,
        }
    }
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Drives one quiz attempt end to end: lifecycle, countdown, scoring,
/// persistence.
///
/// A controller is single-use. `Submitted` and `Abandoned` are terminal; a
/// retake constructs a fresh controller, whose attempt is appended
/// independently of prior history.
pub struct QuizSessionController {
    cell: Arc<SessionCell>,
    timer: Mutex<Option<CountdownTimer>>,
}

impl std::fmt::Debug for QuizSessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuizSessionController").finish_non_exhaustive()
    }
}

impl QuizSessionController {
    /// Build a controller for an already-loaded quiz.
    #[must_use]
    pub fn for_quiz(
        quiz: Quiz,
        learner: LearnerId,
        attempts: Arc<dyn AttemptRepository>,
        clock: Clock,
    ) -> Self {
        Self {
            cell: Arc::new(SessionCell {
                session: Mutex::new(QuizSession::new(quiz)),
                outcome: Mutex::new(None),
                attempts,
                learner,
                clock,
            }),
            timer: Mutex::new(None),
        }
    }

    /// Fetch the quiz from content and build a controller for it.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::QuizNotFound` for an unknown id and
    /// `QuizSessionError::Storage` if the content source fails.
    pub async fn load(
        quiz_id: QuizId,
        content: &dyn ContentRepository,
        learner: LearnerId,
        attempts: Arc<dyn AttemptRepository>,
        clock: Clock,
    ) -> Result<Self, QuizSessionError> {
        let quiz = content
            .get_quiz(quiz_id)
            .await?
            .ok_or(QuizSessionError::QuizNotFound(quiz_id))?;
        Ok(Self::for_quiz(quiz, learner, attempts, clock))
    }

    #[must_use]
    pub fn learner(&self) -> LearnerId {
        self.cell.learner
    }

    /// Begin the attempt. Timed quizzes get a 1-second countdown task that
    /// auto-submits at zero.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` unless the session is
    /// `NotStarted`.
    pub async fn start(&self) -> Result<(), QuizSessionError> {
        let timed = {
            let mut session = self.cell.session.lock().await;
            session.start(self.cell.clock.now())?;
            session.quiz().is_timed()
        };
        if timed {
            let mut timer = self.timer.lock().await;
            *timer = Some(CountdownTimer::spawn(Arc::clone(&self.cell)));
        }
        Ok(())
    }

    /// Record an answer for a question, replacing any earlier choice.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::select_answer`].
    pub async fn select_answer(
        &self,
        question: QuestionId,
        option: usize,
    ) -> Result<(), QuizSessionError> {
        self.cell.session.lock().await.select_answer(question, option)
    }

    /// Jump to a question by position.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::go_to`].
    pub async fn go_to(&self, index: usize) -> Result<(), QuizSessionError> {
        self.cell.session.lock().await.go_to(index)
    }

    /// Advance to the next question.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::next`].
    pub async fn next(&self) -> Result<(), QuizSessionError> {
        self.cell.session.lock().await.next()
    }

    /// Step back to the previous question.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::previous`].
    pub async fn previous(&self) -> Result<(), QuizSessionError> {
        self.cell.session.lock().await.previous()
    }

    pub async fn current_question(&self) -> Option<Question> {
        self.cell.session.lock().await.current_question().cloned()
    }

    pub async fn state(&self) -> SessionState {
        self.cell.session.lock().await.state()
    }

    pub async fn remaining_seconds(&self) -> Option<u32> {
        self.cell.session.lock().await.remaining_seconds()
    }

    pub async fn progress(&self) -> SessionProgress {
        self.cell.session.lock().await.progress()
    }

    /// Submit the attempt: score, persist, and return the outcome.
    ///
    /// If the timer's auto-submit won the race this returns `InvalidState`;
    /// the auto-submit's result is available via [`outcome`](Self::outcome).
    /// A persist failure is reported inside the `Ok` outcome, score intact.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` outside `InProgress`.
    pub async fn submit(&self) -> Result<SubmissionOutcome, QuizSessionError> {
        let mut session = self.cell.session.lock().await;
        let attempt = session.finish(self.cell.clock.now(), SubmitTrigger::Manual)?;
        // Holding the session lock until the outcome is recorded keeps
        // submit-then-outcome observable as one step.
        let outcome = self.cell.persist(attempt, SubmitTrigger::Manual).await;
        *self.cell.outcome.lock().await = Some(outcome.clone());
        drop(session);

        self.cancel_timer().await;
        Ok(outcome)
    }

    /// Abandon the attempt: the timer stops and nothing is persisted.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` outside `InProgress`.
    pub async fn abandon(&self) -> Result<(), QuizSessionError> {
        self.cell.session.lock().await.abandon()?;
        self.cancel_timer().await;
        Ok(())
    }

    /// The submission outcome, if the session has been submitted by either
    /// path. This is how a caller observes a timer auto-submit.
    pub async fn outcome(&self) -> Option<SubmissionOutcome> {
        self.cell.outcome.lock().await.clone()
    }

    /// Retry persisting a submitted attempt whose write failed.
    ///
    /// Returns the existing id without re-writing when the attempt is
    /// already saved.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` if nothing has been
    /// submitted, and `QuizSessionError::Storage` if the retry fails again.
    pub async fn finalize_attempt(&self) -> Result<AttemptId, QuizSessionError> {
        let mut outcome = self.cell.outcome.lock().await;
        let Some(current) = outcome.as_mut() else {
            // Lock order is session before outcome everywhere else; release
            // the outcome guard before reading the session state.
            drop(outcome);
            let actual = self.cell.session.lock().await.state();
            return Err(QuizSessionError::InvalidState {
                expected: SessionState::Submitted,
                actual,
            });
        };
        if let Some(id) = current.attempt_id {
            return Ok(id);
        }

        let id = self
            .cell
            .attempts
            .append_attempt(self.cell.learner, &current.attempt)
            .await?;
        current.attempt_id = Some(id);
        current.save_error = None;
        Ok(id)
    }

    async fn cancel_timer(&self) {
        if let Some(timer) = self.timer.lock().await.take() {
            timer.cancel();
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lms_core::model::{CourseId, LearnerId};
    use lms_core::time::fixed_clock;
    use std::sync::atomic::{AtomicBool, Ordering};
    use storage::repository::{AttemptRow, InMemoryRepository};

    fn build_quiz(time_limit: u32) -> Quiz {
        let questions = (1..=5)
            .map(|n| {
                Question::new(
                    QuestionId::new(n),
                    format!("Question {n}?"),
                    vec!["a".into(), "b".into(), "c".into()],
                    0,
                )
                .unwrap()
            })
            .collect();
        Quiz::new(
            QuizId::new(1),
            CourseId::new(1),
            "Final",
            questions,
            time_limit,
            60,
        )
        .unwrap()
    }

    fn controller(time_limit: u32, repo: &InMemoryRepository) -> QuizSessionController {
        QuizSessionController::for_quiz(
            build_quiz(time_limit),
            LearnerId::new_random(),
            Arc::new(repo.clone()),
            fixed_clock(),
        )
    }

    #[tokio::test]
    async fn load_unknown_quiz_fails() {
        let repo = InMemoryRepository::new();
        let err = QuizSessionController::load(
            QuizId::new(404),
            &repo,
            LearnerId::new_random(),
            Arc::new(repo.clone()),
            fixed_clock(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, QuizSessionError::QuizNotFound(id) if id == QuizId::new(404)));
    }

    #[tokio::test]
    async fn manual_submit_persists_and_reports_score() {
        let repo = InMemoryRepository::new();
        let ctrl = controller(0, &repo);
        ctrl.start().await.unwrap();
        for n in 1..=3 {
            ctrl.select_answer(QuestionId::new(n), 0).await.unwrap();
        }

        let outcome = ctrl.submit().await.unwrap();
        assert_eq!(outcome.attempt.percentage(), 60);
        assert!(outcome.attempt.passed());
        assert_eq!(outcome.trigger, SubmitTrigger::Manual);
        assert!(outcome.is_saved());
        assert!(outcome.save_error.is_none());

        let rows = repo
            .list_attempts(ctrl.learner(), QuizId::new(1))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(Some(rows[0].id), outcome.attempt_id);
        assert_eq!(ctrl.state().await, SessionState::Submitted);
    }

    #[tokio::test]
    async fn second_submit_is_invalid_state() {
        let repo = InMemoryRepository::new();
        let ctrl = controller(0, &repo);
        ctrl.start().await.unwrap();
        ctrl.submit().await.unwrap();

        let err = ctrl.submit().await.unwrap_err();
        assert!(matches!(
            err,
            QuizSessionError::InvalidState {
                actual: SessionState::Submitted,
                ..
            }
        ));
        // Only one attempt was ever persisted.
        let rows = repo.list_attempts_for_learner(ctrl.learner()).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn abandon_persists_nothing_and_blocks_submit() {
        let repo = InMemoryRepository::new();
        let ctrl = controller(60, &repo);
        ctrl.start().await.unwrap();
        ctrl.abandon().await.unwrap();

        assert_eq!(ctrl.state().await, SessionState::Abandoned);
        assert!(ctrl.outcome().await.is_none());
        assert!(ctrl.submit().await.is_err());
        assert!(
            repo.list_attempts_for_learner(ctrl.learner())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_auto_submits_at_zero() {
        let repo = InMemoryRepository::new();
        let ctrl = controller(3, &repo);
        ctrl.start().await.unwrap();
        ctrl.select_answer(QuestionId::new(1), 0).await.unwrap();

        let outcome = wait_for_outcome(&ctrl).await;

        assert_eq!(outcome.trigger, SubmitTrigger::TimeExpired);
        assert_eq!(outcome.attempt.correct(), 1);
        assert!(!outcome.attempt.passed());
        assert_eq!(ctrl.state().await, SessionState::Submitted);
        assert_eq!(ctrl.remaining_seconds().await, Some(0));
        assert_eq!(
            repo.list_attempts_for_learner(ctrl.learner())
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_cancels_countdown() {
        let repo = InMemoryRepository::new();
        let ctrl = controller(2, &repo);
        ctrl.start().await.unwrap();

        let outcome = ctrl.submit().await.unwrap();
        assert_eq!(outcome.trigger, SubmitTrigger::Manual);

        // Let the would-be expiry pass; no second attempt may appear.
        tokio::time::advance(std::time::Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert_eq!(
            repo.list_attempts_for_learner(ctrl.learner())
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_and_manual_submit_race_resolves_to_one_attempt() {
        let repo = InMemoryRepository::new();
        let ctrl = controller(1, &repo);
        ctrl.start().await.unwrap();

        // Let the countdown task run up to (and past) its deadline, then
        // race a manual submit against it.
        tokio::task::yield_now().await;
        tokio::time::advance(std::time::Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        let manual = ctrl.submit().await;
        let recorded = wait_for_outcome(&ctrl).await;

        // Whoever lost the race took no effect.
        if manual.is_ok() {
            assert_eq!(recorded.trigger, SubmitTrigger::Manual);
        } else {
            assert_eq!(recorded.trigger, SubmitTrigger::TimeExpired);
        }
        assert_eq!(
            repo.list_attempts_for_learner(ctrl.learner())
                .await
                .unwrap()
                .len(),
            1
        );
    }

    /// Drives the paused clock forward one second at a time until a
    /// submission outcome appears.
    async fn wait_for_outcome(ctrl: &QuizSessionController) -> SubmissionOutcome {
        for _ in 0..60 {
            for _ in 0..8 {
                if let Some(outcome) = ctrl.outcome().await {
                    return outcome;
                }
                tokio::task::yield_now().await;
            }
            tokio::time::advance(std::time::Duration::from_secs(1)).await;
        }
        panic!("no submission outcome recorded");
    }

    /// Repository that fails writes until released.
    #[derive(Clone)]
    struct FlakyAttemptRepo {
        inner: InMemoryRepository,
        failing: Arc<AtomicBool>,
    }

    #[async_trait]
    impl AttemptRepository for FlakyAttemptRepo {
        async fn append_attempt(
            &self,
            learner: LearnerId,
            attempt: &QuizAttempt,
        ) -> Result<AttemptId, StorageError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StorageError::Connection("disk full".into()));
            }
            self.inner.append_attempt(learner, attempt).await
        }

        async fn list_attempts(
            &self,
            learner: LearnerId,
            quiz: QuizId,
        ) -> Result<Vec<AttemptRow>, StorageError> {
            self.inner.list_attempts(learner, quiz).await
        }

        async fn list_attempts_for_learner(
            &self,
            learner: LearnerId,
        ) -> Result<Vec<AttemptRow>, StorageError> {
            self.inner.list_attempts_for_learner(learner).await
        }
    }

    #[tokio::test]
    async fn failed_persist_still_returns_score() {
        let failing = Arc::new(AtomicBool::new(true));
        let repo = FlakyAttemptRepo {
            inner: InMemoryRepository::new(),
            failing: Arc::clone(&failing),
        };
        let ctrl = QuizSessionController::for_quiz(
            build_quiz(0),
            LearnerId::new_random(),
            Arc::new(repo.clone()),
            fixed_clock(),
        );
        ctrl.start().await.unwrap();
        for n in 1..=5 {
            ctrl.select_answer(QuestionId::new(n), 0).await.unwrap();
        }

        let outcome = ctrl.submit().await.unwrap();
        assert_eq!(outcome.attempt.percentage(), 100);
        assert!(outcome.attempt.passed());
        assert!(!outcome.is_saved());
        assert!(matches!(
            outcome.save_error,
            Some(StorageError::Connection(_))
        ));

        // Retry fails while storage is down, succeeds once it recovers.
        assert!(ctrl.finalize_attempt().await.is_err());
        failing.store(false, Ordering::SeqCst);
        let id = ctrl.finalize_attempt().await.unwrap();
        assert_eq!(ctrl.finalize_attempt().await.unwrap(), id);

        let rows = repo.list_attempts_for_learner(ctrl.learner()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
    }

    #[tokio::test]
    async fn finalize_before_submit_is_invalid_state() {
        let repo = InMemoryRepository::new();
        let ctrl = controller(0, &repo);
        ctrl.start().await.unwrap();
        let err = ctrl.finalize_attempt().await.unwrap_err();
        assert!(matches!(
            err,
            QuizSessionError::InvalidState {
                expected: SessionState::Submitted,
                actual: SessionState::InProgress,
            }
        ));
    }
}
