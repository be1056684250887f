// src/models/question.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::types::Json;

/// Represents the 'questions' table: immutable reference data, one pool
/// per module. Not user-owned.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub module_id: String,

    pub prompt: String,

    /// choice key -> display text (e.g. {"a": "...", "b": "..."}).
    /// Stored as a JSON object in the database.
    pub options: Json<BTreeMap<String, String>>,

    /// The key in `options` that is the correct answer. For true/false
    /// questions this is "true" or "false".
    pub correct_choice: String,

    pub points: i32,

    /// Topic label. Sampling does NOT stratify by this; any combination
    /// of questions can be drawn.
    pub domain_tag: String,

    pub explanation: Option<String>,
}

/// The wire form of a question as shown to the learner for a test.
///
/// The correct choice and point value travel with it and are round-tripped
/// through the client so grading compares against exactly what was
/// presented, even if the bank changes in between. The exposure of the
/// answer key this implies is a recorded open question, not something this
/// layer papers over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentedQuestion {
    pub id: String,
    pub prompt: String,
    pub options: BTreeMap<String, String>,
    pub correct_choice: String,
    pub points: i32,
}

impl From<Question> for PresentedQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            prompt: q.prompt,
            options: q.options.0,
            correct_choice: q.correct_choice,
            points: q.points,
        }
    }
}

/// A learner's answer to a single exercise, strongly typed by exercise
/// shape instead of an untyped form-field bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    /// A choice key for a multiple-choice question.
    Choice(String),
    /// A true/false selection.
    Boolean(bool),
    /// Free-form code or text; stored verbatim, never auto-graded.
    Text(String),
}

impl AnswerValue {
    /// The canonical key form used for deterministic comparison against
    /// a question's `correct_choice`.
    pub fn as_key(&self) -> Option<String> {
        match self {
            AnswerValue::Choice(key) => Some(key.clone()),
            AnswerValue::Boolean(b) => Some(b.to_string()),
            AnswerValue::Text(_) => None,
        }
    }
}
