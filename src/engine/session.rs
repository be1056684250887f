// src/engine/session.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use validator::Validate;

use crate::models::question::AnswerValue;

/// One in-flight, not-necessarily-saved answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftAnswer {
    pub module_id: String,
    pub section_id: Option<u32>,
    pub exercise_id: String,
    pub answer: AnswerValue,
    pub updated_at: DateTime<Utc>,
}

/// A change to the cached session state, applied by `commit`.
#[derive(Debug, Deserialize, Validate)]
pub struct SessionDelta {
    pub section_id: Option<u32>,

    #[validate(length(min = 1, max = 64))]
    pub exercise_id: Option<String>,
    pub answer: Option<AnswerValue>,

    /// Cache a section-completed flag. Handlers only set this after the
    /// durable write acknowledged; the cache is never promoted ahead of
    /// the store.
    pub completed_section: Option<u32>,
}

/// What to drop from the cache.
#[derive(Debug, Clone, Copy)]
pub enum ClearScope<'a> {
    Module(&'a str),
    Section { module_id: &'a str, section: u32 },
    Exercise { module_id: &'a str, exercise_id: &'a str },
}

/// The per-module slice of cached state returned to page renders.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModuleSession {
    pub drafts: Vec<DraftAnswer>,
    pub completed_sections: Vec<u32>,
}

#[derive(Debug, Default)]
struct SessionState {
    /// (module_id, exercise_id) -> draft.
    drafts: HashMap<(String, String), DraftAnswer>,
    /// (module_id, section) completion flags mirrored after durable writes.
    completed: HashMap<(String, u32), ()>,
}

/// Ephemeral, per-process mirror of in-flight answers and completion flags.
///
/// Advisory and non-authoritative: page loads re-read completion state from
/// the durable stores and use this cache only to re-display the
/// last-entered-but-possibly-unsaved answer. Keyed by user id, so the state
/// survives page reloads within the same browser session.
#[derive(Debug, Default)]
pub struct SessionCache {
    inner: RwLock<HashMap<i64, SessionState>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached slice for one (user, module), drafts and flags.
    pub async fn mirror(&self, user_id: i64, module_id: &str) -> ModuleSession {
        let inner = self.inner.read().await;
        let Some(state) = inner.get(&user_id) else {
            return ModuleSession::default();
        };

        let mut drafts: Vec<DraftAnswer> = state
            .drafts
            .values()
            .filter(|d| d.module_id == module_id)
            .cloned()
            .collect();
        drafts.sort_by(|a, b| a.exercise_id.cmp(&b.exercise_id));

        let mut completed_sections: Vec<u32> = state
            .completed
            .keys()
            .filter(|(m, _)| m == module_id)
            .map(|(_, s)| *s)
            .collect();
        completed_sections.sort_unstable();

        ModuleSession {
            drafts,
            completed_sections,
        }
    }

    /// Applies a delta for one user and module.
    pub async fn commit(&self, user_id: i64, module_id: &str, delta: SessionDelta) {
        let mut inner = self.inner.write().await;
        let state = inner.entry(user_id).or_default();

        if let (Some(exercise_id), Some(answer)) = (delta.exercise_id, delta.answer) {
            state.drafts.insert(
                (module_id.to_string(), exercise_id.clone()),
                DraftAnswer {
                    module_id: module_id.to_string(),
                    section_id: delta.section_id,
                    exercise_id,
                    answer,
                    updated_at: Utc::now(),
                },
            );
        }

        if let Some(section) = delta.completed_section {
            state.completed.insert((module_id.to_string(), section), ());
        }
    }

    /// Drops cached drafts and flags in `scope`. Callers resetting a
    /// section pair this with the Progress Store's reset so the two layers
    /// cannot diverge.
    pub async fn clear(&self, user_id: i64, scope: ClearScope<'_>) {
        let mut inner = self.inner.write().await;
        let Some(state) = inner.get_mut(&user_id) else {
            return;
        };

        match scope {
            ClearScope::Module(module_id) => {
                state.drafts.retain(|(m, _), _| m != module_id);
                state.completed.retain(|(m, _), _| m != module_id);
            }
            ClearScope::Section { module_id, section } => {
                state
                    .drafts
                    .retain(|(m, _), d| m != module_id || d.section_id != Some(section));
                state
                    .completed
                    .retain(|(m, s), _| m != module_id || *s != section);
            }
            ClearScope::Exercise {
                module_id,
                exercise_id,
            } => {
                state
                    .drafts
                    .remove(&(module_id.to_string(), exercise_id.to_string()));
            }
        }
    }
}
