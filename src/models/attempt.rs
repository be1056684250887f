// src/models/attempt.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::types::Json;
use validator::Validate;

use crate::models::question::PresentedQuestion;

/// The outcome of one question within a graded attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResult {
    /// What the learner picked; None when the question went unanswered.
    pub chosen: Option<String>,
    /// The correct choice from the presented snapshot.
    pub correct: String,
    pub is_correct: bool,
}

/// Represents the 'test_attempts' table. Append-only: every submission,
/// pass or fail, becomes its own row and is never mutated afterwards.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TestAttempt {
    pub user_id: i64,
    pub module_id: String,

    /// Per-(user, module) counter assigned at insert; newest is highest.
    pub attempt_no: i32,

    pub sampled_question_ids: Json<Vec<String>>,
    pub per_question: Json<BTreeMap<String, QuestionResult>>,

    pub total_score_percent: f64,
    pub passed: bool,

    pub submitted_at: DateTime<Utc>,

    pub client_ip: Option<String>,
    pub client_agent: Option<String>,
}

/// Input for appending an attempt; the store assigns `attempt_no` and the
/// timestamp.
#[derive(Debug, Clone)]
pub struct NewTestAttempt {
    pub user_id: i64,
    pub module_id: String,
    pub sampled_question_ids: Vec<String>,
    pub per_question: BTreeMap<String, QuestionResult>,
    pub total_score_percent: f64,
    pub passed: bool,
    pub client: crate::models::submission::ClientMeta,
}

/// DTO for submitting a module test.
///
/// The presented snapshot travels with the submission and is the sole
/// grading reference: a bank edit between sampling and submission cannot
/// change the score of an in-flight attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitTestRequest {
    #[validate(length(min = 1, max = 100))]
    pub presented: Vec<PresentedQuestion>,

    /// question id -> chosen choice key. Ids not in the snapshot earn
    /// zero credit; they never abort grading.
    pub answers: BTreeMap<String, String>,
}

/// DTO returned after grading.
#[derive(Debug, Serialize)]
pub struct TestResultResponse {
    pub attempt_no: i32,
    pub total_score_percent: f64,
    pub correct_count: usize,
    pub total_questions: usize,
    pub passed: bool,
    pub message: String,
}
