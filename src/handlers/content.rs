// src/handlers/content.rs

use axum::{Extension, Json, extract::Path, extract::State, response::IntoResponse};
use serde_json::json;

use crate::{
    engine::gate::{self, Resource},
    error::AppError,
    models::actor::Actor,
    state::AppState,
};

/// Renders the state a module page needs: authoritative progress from the
/// store plus the advisory session mirror (unsaved drafts, cached flags).
///
/// The content gate runs first; a denied request stops here with the fixed
/// denial response. Completion percentages always come from the store on
/// every load - the cache never overrides them.
pub async fn module_page(
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

    let progress = state.progress.get(actor.id, &module.module_id).await?;
    let session = state.sessions.mirror(actor.id, &module.module_id).await;

    Ok(Json(json!({
        "module_id": module.module_id,
        "title": module.title,
        "section_count": module.section_count,
        "progress": progress,
        "session": session,
    })))
}
