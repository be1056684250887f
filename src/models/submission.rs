// src/models/submission.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::types::Json;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::models::question::AnswerValue;

/// The kinds of formative exercise a lesson page can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    MultipleChoice,
    TrueFalse,
    /// Free-form code. Stored for later human review, never auto-graded.
    Code,
}

impl ExerciseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseKind::MultipleChoice => "multiple_choice",
            ExerciseKind::TrueFalse => "true_false",
            ExerciseKind::Code => "code",
        }
    }

    pub fn is_auto_graded(&self) -> bool {
        !matches!(self, ExerciseKind::Code)
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple_choice" => Ok(ExerciseKind::MultipleChoice),
            "true_false" => Ok(ExerciseKind::TrueFalse),
            "code" => Ok(ExerciseKind::Code),
            _ => Err(()),
        }
    }
}

/// Advisory request metadata kept for abuse forensics. Has no bearing on
/// grading or gating.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Represents the 'exercise_submissions' table.
///
/// Unique on (user_id, module_id, exercise_type, exercise_id): a second
/// submission overwrites the first. Formative exercises keep no history by
/// design; they are practice, not grade-of-record.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExerciseSubmission {
    pub user_id: i64,
    pub module_id: String,
    pub exercise_type: String,
    pub exercise_id: String,

    /// The submitted answer, serialized. Opaque to the store.
    pub answer_payload: Json<AnswerValue>,

    /// NULL for exercises that are not auto-graded (code).
    pub is_correct: Option<bool>,
    pub score: Option<f64>,
    pub max_score: Option<f64>,

    pub submitted_at: DateTime<Utc>,

    pub client_ip: Option<String>,
    pub client_agent: Option<String>,
}

/// DTO for recording a formative answer.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordAnswerRequest {
    pub exercise_type: ExerciseKind,
    /// The section this exercise belongs to, used to mirror the draft in
    /// the session cache.
    pub section_id: Option<u32>,
    pub answer: AnswerValue,
}

impl RecordAnswerRequest {
    /// Payload bounds `validator` cannot express on an enum: free-form code
    /// is capped, choice keys must be short.
    pub fn check_payload(&self) -> Result<(), String> {
        match &self.answer {
            AnswerValue::Text(text) if text.len() > 20_000 => {
                Err("Answer text exceeds 20000 bytes".to_string())
            }
            AnswerValue::Choice(key) if key.is_empty() || key.len() > 16 => {
                Err("Choice key must be 1-16 characters".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exercise_kind_round_trips() {
        for kind in [
            ExerciseKind::MultipleChoice,
            ExerciseKind::TrueFalse,
            ExerciseKind::Code,
        ] {
            assert_eq!(kind.as_str().parse::<ExerciseKind>().unwrap(), kind);
        }
    }

    #[test]
    fn only_code_skips_auto_grading() {
        assert!(ExerciseKind::MultipleChoice.is_auto_graded());
        assert!(ExerciseKind::TrueFalse.is_auto_graded());
        assert!(!ExerciseKind::Code.is_auto_graded());
    }

    #[test]
    fn oversized_code_is_rejected() {
        let req = RecordAnswerRequest {
            exercise_type: ExerciseKind::Code,
            section_id: None,
            answer: AnswerValue::Text("x".repeat(20_001)),
        };
        assert!(req.check_payload().is_err());
    }
}
