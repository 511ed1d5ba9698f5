//! Pure scoring for quiz attempts.
//!
//! No I/O and no state: the session controller hands in the question set and
//! whatever answers were collected, and gets back counts, a rounded
//! percentage, and the pass verdict.

use std::collections::BTreeMap;

use crate::model::{Question, QuestionId};

/// Outcome of scoring one set of answers against a question set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreReport {
    pub correct: u32,
    pub total: u32,
    /// Rounded to the nearest integer, half away from zero.
    pub percentage: u8,
    pub passed: bool,
}

/// Scores `answers` against `questions`.
///
/// A missing answer, or an answer indexing past the question's option list,
/// counts as incorrect — never as an error. The percentage is
/// `correct / total * 100` rounded half-up; `passed` holds when the
/// percentage meets or exceeds `pass_threshold`.
#[must_use]
pub fn score(
    questions: &[Question],
    answers: &BTreeMap<QuestionId, usize>,
    pass_threshold: u8,
) -> ScoreReport {
    let mut correct = 0_u32;
    for question in questions {
        if answers.get(&question.id()) == Some(&question.correct()) {
            correct += 1;
        }
    }

    let total = u32::try_from(questions.len()).unwrap_or(u32::MAX);
    let percentage = percentage_round_half_up(correct, total);
    let passed = percentage >= pass_threshold;

    ScoreReport {
        correct,
        total,
        percentage,
        passed,
    }
}

/// `correct / total * 100`, rounded half-up, in integer arithmetic.
///
/// Defined as 0 when `total` is 0.
#[must_use]
pub fn percentage_round_half_up(correct: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = u64::from(correct.min(total));
    let total = u64::from(total);
    let rounded = (correct * 200 + total) / (total * 2);
    // correct <= total, so rounded <= 100.
    u8::try_from(rounded).unwrap_or(100)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
