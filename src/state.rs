// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::catalog::ModuleCatalog;
use crate::config::Config;
use crate::engine::session::SessionCache;
use crate::store::{
    EnrollmentStore, PgEngineStore, ProgressStore, QuestionBank, SubmissionStore,
};

/// Shared application state: configuration, the module catalog, the store
/// seams, and the per-process session cache. Store fields are trait objects
/// so the same router runs on Postgres in production and on the in-memory
/// store in tests.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub catalog: Arc<ModuleCatalog>,
    pub enrollments: Arc<dyn EnrollmentStore>,
    pub progress: Arc<dyn ProgressStore>,
    pub submissions: Arc<dyn SubmissionStore>,
    pub bank: Arc<dyn QuestionBank>,
    pub sessions: Arc<SessionCache>,
}

impl AppState {
    /// Production wiring: every store backed by the same Postgres pool.
    pub fn postgres(pool: PgPool, config: Config, catalog: ModuleCatalog) -> Self {
        let store = Arc::new(PgEngineStore::new(pool));
        Self {
            config,
            catalog: Arc::new(catalog),
            enrollments: store.clone(),
            progress: store.clone(),
            submissions: store.clone(),
            bank: store,
            sessions: Arc::new(SessionCache::new()),
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
