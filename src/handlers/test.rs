// src/handlers/test.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    engine::{
        assessment,
        gate::{self, Resource},
    },
    error::AppError,
    handlers::client_meta,
    models::{
        actor::Actor,
        attempt::{NewTestAttempt, SubmitTestRequest, TestResultResponse},
        question::PresentedQuestion,
    },
    state::AppState,
};

/// How many past attempts the history endpoint returns.
const ATTEMPT_HISTORY_LIMIT: i64 = 5;

/// Draws a fresh random sample from the module's question pool and returns
/// it as the presented set. Assessment-gated: the learner needs the
/// module's progress threshold first.
///
/// The presented set, correct keys included, round-trips through the client
/// and is what submission grading compares against.
pub async fn generate_test(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(module_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let module = state.catalog.require(&module_id)?;

    gate::require(
        &actor,
        Resource::Assessment { module },
        state.enrollments.as_ref(),
        state.progress.as_ref(),
    )
    .await?;

    let pool = state.bank.pool(&module.module_id).await?;
    if pool.is_empty() {
        return Err(AppError::NotFound(format!(
            "Module '{}' has no question pool",
            module_id
        )));
    }

    let questions: Vec<PresentedQuestion> = assessment::sample(pool, module.exam.sample_size)
        .into_iter()
        .map(PresentedQuestion::from)
        .collect();

    Ok(Json(json!({
        "module_id": module.module_id,
        "pass_percent": module.exam.pass_percent,
        "questions": questions,
    })))
}

/// Grades a submitted test against the presented snapshot, appends the
/// attempt, and promotes the module to completed on a pass.
///
/// Fail leaves progress untouched; the learner may retry against a fresh
/// sample, unlimited and untimed. Every submission becomes its own attempt
/// row, pass or fail.
pub async fn submit_test(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(module_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SubmitTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    let module = state.catalog.require(&module_id)?;

    gate::require(
        &actor,
        Resource::Assessment { module },
        state.enrollments.as_ref(),
        state.progress.as_ref(),
    )
    .await?;

    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let graded = assessment::grade(&req.presented, &req.answers, module.exam.pass_percent);

    let attempt = state
        .submissions
        .append_attempt(NewTestAttempt {
            user_id: actor.id,
            module_id: module.module_id.clone(),
            sampled_question_ids: graded.sampled_question_ids,
            per_question: graded.per_question,
            total_score_percent: graded.total_score_percent,
            passed: graded.passed,
            client: client_meta(&headers),
        })
        .await?;

    if graded.passed {
        state
            .progress
            .mark_module_complete(actor.id, module)
            .await?;
        tracing::info!(
            user_id = actor.id,
            module_id = %module.module_id,
            attempt_no = attempt.attempt_no,
            score = graded.total_score_percent,
            "module test passed, module completed"
        );
    } else {
        tracing::info!(
            user_id = actor.id,
            module_id = %module.module_id,
            attempt_no = attempt.attempt_no,
            score = graded.total_score_percent,
            "module test failed"
        );
    }

    Ok(Json(TestResultResponse {
        attempt_no: attempt.attempt_no,
        total_score_percent: graded.total_score_percent,
        correct_count: graded.correct_count,
        total_questions: graded.total_questions,
        passed: graded.passed,
        message: if graded.passed {
            "Module test passed.".to_string()
        } else {
            "Score below passing threshold. Try again.".to_string()
        },
    }))
}

/// The learner's most recent attempts for this module, newest first.
pub async fn list_attempts(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(module_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let module = state.catalog.require(&module_id)?;

    gate::require(
        &actor,
        Resource::Content { module },
        state.enrollments.as_ref(),
        state.progress.as_ref(),
    )
    .await?;

    let attempts = state
        .submissions
        .recent_attempts(actor.id, &module.module_id, ATTEMPT_HISTORY_LIMIT)
        .await?;

    Ok(Json(attempts))
}
