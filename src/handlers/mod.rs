// src/handlers/mod.rs

pub mod content;
pub mod exercise;
pub mod progress;
pub mod session;
pub mod test;

use axum::http::HeaderMap;

use crate::models::submission::ClientMeta;

/// Extracts advisory client metadata from request headers. Forensics only;
/// never consulted for grading or gating.
pub fn client_meta(headers: &HeaderMap) -> ClientMeta {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };

    ClientMeta {
        ip: header_str("x-forwarded-for"),
        user_agent: header_str("user-agent"),
    }
}
