// src/handlers/exercise.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use sqlx::types::Json as SqlJson;
use validator::Validate;

use crate::{
    engine::{
        assessment,
        gate::{self, Resource},
        session::SessionDelta,
    },
    error::AppError,
    handlers::client_meta,
    models::{
        actor::Actor,
        question::AnswerValue,
        submission::{ExerciseKind, ExerciseSubmission, RecordAnswerRequest},
    },
    state::AppState,
};

/// Records a formative answer with upsert semantics: the latest answer
/// overwrites any prior one, no history is kept.
///
/// Multiple-choice and true/false answers are graded here, synchronously,
/// by key comparison against the question bank before recording. Code
/// answers are stored verbatim with null grading fields for later human
/// review.
pub async fn record_answer(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((module_id, exercise_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(req): Json<RecordAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let module = state.catalog.require(&module_id)?;

    gate::require(
        &actor,
        Resource::Content { module },
        state.enrollments.as_ref(),
        state.progress.as_ref(),
    )
    .await?;

    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    req.check_payload().map_err(AppError::BadRequest)?;

    // Every kind demands its own answer shape; code exercises take
    // free-form text only.
    let expected_kind = matches!(
        (&req.exercise_type, &req.answer),
        (ExerciseKind::MultipleChoice, AnswerValue::Choice(_))
            | (ExerciseKind::TrueFalse, AnswerValue::Boolean(_))
            | (ExerciseKind::Code, AnswerValue::Text(_))
    );
    if !expected_kind {
        return Err(AppError::BadRequest(format!(
            "Exercise type '{}' does not accept this answer shape",
            req.exercise_type
        )));
    }

    let grading = match req.exercise_type {
        ExerciseKind::MultipleChoice | ExerciseKind::TrueFalse => {
            let question = state
                .bank
                .find(&module.module_id, &exercise_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Unknown exercise '{}'", exercise_id))
                })?;

            assessment::grade_formative(&question, &req.answer)
        }
        ExerciseKind::Code => None,
    };

    let meta = client_meta(&headers);
    let submission = ExerciseSubmission {
        user_id: actor.id,
        module_id: module.module_id.clone(),
        exercise_type: req.exercise_type.as_str().to_string(),
        exercise_id: exercise_id.clone(),
        answer_payload: SqlJson(req.answer.clone()),
        is_correct: grading.map(|(correct, _, _)| correct),
        score: grading.map(|(_, score, _)| score),
        max_score: grading.map(|(_, _, max)| max),
        submitted_at: Utc::now(),
        client_ip: meta.ip.clone(),
        client_agent: meta.user_agent.clone(),
    };

    state.submissions.record_answer(&submission).await?;

    // Mirror the saved answer so a reload re-renders it without another
    // durable read. Only after the upsert acknowledged.
    state
        .sessions
        .commit(
            actor.id,
            &module.module_id,
            SessionDelta {
                section_id: req.section_id,
                exercise_id: Some(exercise_id),
                answer: Some(req.answer),
                completed_section: None,
            },
        )
        .await;

    Ok(Json(json!({
        "recorded": true,
        "is_correct": submission.is_correct,
        "score": submission.score,
        "max_score": submission.max_score,
    })))
}

/// The latest recorded answer for one exercise, or 404 when the learner
/// has not answered it yet.
pub async fn latest_answer(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((module_id, exercise_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let module = state.catalog.require(&module_id)?;

    gate::require(
        &actor,
        Resource::Content { module },
        state.enrollments.as_ref(),
        state.progress.as_ref(),
    )
    .await?;

    // The kind is part of the unique key; check them in a fixed order.
    let kinds = [
        ExerciseKind::MultipleChoice,
        ExerciseKind::TrueFalse,
        ExerciseKind::Code,
    ];
    for kind in kinds {
        if let Some(submission) = state
            .submissions
            .latest_answer(actor.id, &module.module_id, kind.as_str(), &exercise_id)
            .await?
        {
            return Ok(Json(submission));
        }
    }

    Err(AppError::NotFound(format!(
        "No submission for exercise '{}'",
        exercise_id
    )))
}
