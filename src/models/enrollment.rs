// src/models/enrollment.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// Represents the 'enrollments' table. Read-only to the engine: the content
/// gate only counts matching rows, it never mutates them.
///
/// Course title and program name are denormalized onto the row so the gate's
/// text-match query does not need further joins.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub class_id: i64,

    /// 'active', 'completed', 'withdrawn', ...
    pub status: String,

    pub course_title: String,
    pub program_name: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Enrollment {
    /// Statuses that satisfy the content gate.
    pub fn counts_for_access(&self) -> bool {
        matches!(self.status.as_str(), "active" | "completed")
    }

    /// Case-insensitive substring match of a course-identifying pattern
    /// against the denormalized course/program text.
    pub fn matches_pattern(&self, pattern: &str) -> bool {
        let needle = pattern.to_lowercase();
        self.course_title.to_lowercase().contains(&needle)
            || self.program_name.to_lowercase().contains(&needle)
    }
}
