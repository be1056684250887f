// src/store/mod.rs

pub mod memory;
pub mod pg;

pub use memory::MemoryStore;
pub use pg::PgEngineStore;

use async_trait::async_trait;

use crate::catalog::ModuleConfig;
use crate::error::AppError;
use crate::models::attempt::{NewTestAttempt, TestAttempt};
use crate::models::progress::ModuleProgress;
use crate::models::question::Question;
use crate::models::submission::ExerciseSubmission;

/// Read-only oracle over the enrollment tables. The engine never writes
/// enrollments; the content gate only needs a matching-row count.
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Counts active-or-completed enrollments for `student_id` whose
    /// course title or program name contains `course_pattern`
    /// (case-insensitive).
    async fn active_enrollment_count(
        &self,
        student_id: i64,
        course_pattern: &str,
    ) -> Result<i64, AppError>;
}

/// Durable per-(user, module) completion record.
///
/// Mutations are read-modify-write of the full current row inside one
/// transaction, so concurrent writers converge: "last write wins" always
/// reflects a self-consistent recomputation, never a stale delta.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Returns the stored row, or the zero-valued state when absent.
    /// Absence is a valid initial state, not a fault.
    async fn get(&self, user_id: i64, module_id: &str) -> Result<ModuleProgress, AppError>;

    async fn mark_section_complete(
        &self,
        user_id: i64,
        module: &ModuleConfig,
        section: u32,
    ) -> Result<ModuleProgress, AppError>;

    async fn mark_section_reset(
        &self,
        user_id: i64,
        module: &ModuleConfig,
        section: u32,
    ) -> Result<ModuleProgress, AppError>;

    /// Terminal transition driven by a passing test attempt: every section
    /// and the overall percentage forced to 100 in one write.
    async fn mark_module_complete(
        &self,
        user_id: i64,
        module: &ModuleConfig,
    ) -> Result<ModuleProgress, AppError>;
}

/// Durable record of formative answers (latest-only upsert) and summative
/// test attempts (append-only).
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Upsert keyed by (user, module, exercise_type, exercise_id): the
    /// latest answer overwrites any prior one. No history by design.
    async fn record_answer(&self, submission: &ExerciseSubmission) -> Result<(), AppError>;

    async fn latest_answer(
        &self,
        user_id: i64,
        module_id: &str,
        exercise_type: &str,
        exercise_id: &str,
    ) -> Result<Option<ExerciseSubmission>, AppError>;

    /// Appends a new attempt row, assigning the next attempt counter for
    /// this (user, module). Attempts are never mutated after insert.
    async fn append_attempt(&self, attempt: NewTestAttempt) -> Result<TestAttempt, AppError>;

    /// The most recent attempts, newest first.
    async fn recent_attempts(
        &self,
        user_id: i64,
        module_id: &str,
        limit: i64,
    ) -> Result<Vec<TestAttempt>, AppError>;
}

/// Immutable per-module question pools.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// The full pool for a module, in stored order.
    async fn pool(&self, module_id: &str) -> Result<Vec<Question>, AppError>;

    /// Looks up a single question; used to grade formative exercises by
    /// deterministic key comparison.
    async fn find(&self, module_id: &str, question_id: &str)
    -> Result<Option<Question>, AppError>;
}
