//! Conversions between SQLite column values and domain types.

use std::collections::BTreeMap;

use lms_core::model::{CourseId, LearnerId, QuestionId, QuizId};

use crate::repository::StorageError;

pub fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    u64::try_from(v)
        .map(CourseId::new)
        .map_err(|_| StorageError::Serialization(format!("invalid course_id: {v}")))
}

pub fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    u64::try_from(v)
        .map(QuizId::new)
        .map_err(|_| StorageError::Serialization(format!("invalid quiz_id: {v}")))
}

pub fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub fn learner_to_string(learner: LearnerId) -> String {
    learner.value().to_string()
}

/// Answers are stored as a JSON object keyed by the question id's decimal
/// form, so rows stay readable and diffable in the database.
pub fn answers_to_json(answers: &BTreeMap<QuestionId, usize>) -> Result<String, StorageError> {
    let doc: BTreeMap<String, usize> = answers
        .iter()
        .map(|(question, option)| (question.value().to_string(), *option))
        .collect();
    serde_json::to_string(&doc).map_err(ser)
}

pub fn answers_from_json(json: &str) -> Result<BTreeMap<QuestionId, usize>, StorageError> {
    let doc: BTreeMap<String, usize> = serde_json::from_str(json).map_err(ser)?;
    let mut answers = BTreeMap::new();
    for (key, option) in doc {
        let id = key
            .parse::<u64>()
            .map_err(|_| StorageError::Serialization(format!("invalid question id key: {key}")))?;
        answers.insert(QuestionId::new(id), option);
    }
    Ok(answers)
}
