// src/handlers/session.rs

use axum::{Extension, Json, extract::Path, extract::State, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    engine::{
        gate::{self, Resource},
        session::SessionDelta,
    },
    error::AppError,
    models::actor::Actor,
    state::AppState,
};

/// Caches an in-flight draft (a selected radio option, typed code) without
/// a durable write, so a multi-step form re-renders consistently across
/// reloads in the same browser session.
///
/// Drafts are advisory; nothing here touches the stores, and the caller
/// may never save them at all.
pub async fn commit_draft(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(module_id): Path<String>,
    Json(delta): Json<SessionDelta>,
) -> Result<impl IntoResponse, AppError> {
    let module = state.catalog.require(&module_id)?;

    gate::require(
        &actor,
        Resource::Content { module },
        state.enrollments.as_ref(),
        state.progress.as_ref(),
    )
    .await?;

    delta
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if delta.exercise_id.is_some() != delta.answer.is_some() {
        return Err(AppError::BadRequest(
            "A draft needs both an exercise_id and an answer".to_string(),
        ));
    }

    // Only durable writes may set completion flags (see progress handlers).
    if delta.completed_section.is_some() {
        return Err(AppError::BadRequest(
            "Completion flags are set by the section-complete endpoint".to_string(),
        ));
    }

    state.sessions.commit(actor.id, &module.module_id, delta).await;

    Ok(Json(json!({ "cached": true })))
}
