// src/handlers/progress.rs

use axum::{Extension, Json, extract::Path, extract::State, response::IntoResponse};

use crate::{
    engine::{
        gate::{self, Resource},
        session::{ClearScope, SessionDelta},
    },
    error::AppError,
    models::actor::Actor,
    state::AppState,
};

/// Marks one section complete and returns the recomputed progress row.
///
/// The session cache's completion flag is only set after the upsert
/// acknowledged: a failed write surfaces as "not saved" and leaves the
/// cache untouched.
pub async fn complete_section(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((module_id, section_id)): Path<(String, u32)>,
) -> Result<impl IntoResponse, AppError> {
    let module = state.catalog.require(&module_id)?;
    if !module.has_section(section_id) {
        return Err(AppError::NotFound(format!(
            "Module '{}' has no section {}",
            module_id, section_id
        )));
    }

    gate::require(
        &actor,
        Resource::Content { module },
        state.enrollments.as_ref(),
        state.progress.as_ref(),
    )
    .await?;

    let progress = state
        .progress
        .mark_section_complete(actor.id, module, section_id)
        .await?;

    state
        .sessions
        .commit(
            actor.id,
            &module.module_id,
            SessionDelta {
                section_id: None,
                exercise_id: None,
                answer: None,
                completed_section: Some(section_id),
            },
        )
        .await;

    tracing::info!(
        user_id = actor.id,
        module_id = %module.module_id,
        section_id,
        overall = progress.overall_progress,
        "section completed"
    );

    Ok(Json(progress))
}

/// Resets one section to zero and clears the matching session scope, so
/// the cache and the store cannot diverge. A no-op on modules already
/// completed by a passing test.
pub async fn reset_section(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((module_id, section_id)): Path<(String, u32)>,
) -> Result<impl IntoResponse, AppError> {
    let module = state.catalog.require(&module_id)?;
    if !module.has_section(section_id) {
        return Err(AppError::NotFound(format!(
            "Module '{}' has no section {}",
            module_id, section_id
        )));
    }

    gate::require(
        &actor,
        Resource::Content { module },
        state.enrollments.as_ref(),
        state.progress.as_ref(),
    )
    .await?;

    let progress = state
        .progress
        .mark_section_reset(actor.id, module, section_id)
        .await?;

    state
        .sessions
        .clear(
            actor.id,
            ClearScope::Section {
                module_id: &module.module_id,
                section: section_id,
            },
        )
        .await;

    tracing::info!(
        user_id = actor.id,
        module_id = %module.module_id,
        section_id,
        overall = progress.overall_progress,
        "section reset"
    );

    Ok(Json(progress))
}
