// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{content, exercise, progress, session, test},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Every module route sits behind the identity middleware: no identity,
///   no engine code.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (stores, catalog, session cache).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let module_routes = Router::new()
        .route("/{module_id}", get(content::module_page))
        .route(
            "/{module_id}/sections/{section_id}/complete",
            post(progress::complete_section),
        )
        .route(
            "/{module_id}/sections/{section_id}/reset",
            post(progress::reset_section),
        )
        .route(
            "/{module_id}/exercises/{exercise_id}",
            post(exercise::record_answer).get(exercise::latest_answer),
        )
        .route("/{module_id}/session", post(session::commit_draft))
        .route(
            "/{module_id}/test",
            get(test::generate_test).post(test::submit_test),
        )
        .route("/{module_id}/test/attempts", get(test::list_attempts))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/modules", module_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
