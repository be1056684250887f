// src/store/pg.rs

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use sqlx::types::Json;

use crate::catalog::ModuleConfig;
use crate::error::AppError;
use crate::models::attempt::{NewTestAttempt, TestAttempt};
use crate::models::progress::ModuleProgress;
use crate::models::question::Question;
use crate::models::submission::ExerciseSubmission;
use crate::store::{EnrollmentStore, ProgressStore, QuestionBank, SubmissionStore};

/// Postgres-backed implementation of every engine store, sharing one pool.
#[derive(Clone)]
pub struct PgEngineStore {
    pool: PgPool,
}

/// Escapes LIKE metacharacters so a course pattern matches literally.
/// Without this, a pattern containing `%` or `_` turns into a wildcard and
/// the gate matches courses the in-memory substring check would not.
fn escape_like(pattern: &str) -> String {
    pattern
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl PgEngineStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Shared read-modify-write for the progress row. Runs inside one
    /// transaction with the row locked so an interleaved writer cannot
    /// tear the recompute and regress `overall_progress`.
    async fn mutate_progress<F>(
        &self,
        user_id: i64,
        module: &ModuleConfig,
        op: &'static str,
        apply: F,
    ) -> Result<ModuleProgress, AppError>
    where
        F: FnOnce(&mut ModuleProgress) + Send,
    {
        let mut tx = self.pool.begin().await.map_err(|e| {
            tracing::error!(user_id, module_id = %module.module_id, op, "begin failed: {:?}", e);
            AppError::PersistenceUnavailable(e.to_string())
        })?;

        let existing = sqlx::query_as::<_, ModuleProgress>(
            r#"
            SELECT user_id, module_id, section_progress, overall_progress,
                   completed_at, last_accessed
            FROM module_progress
            WHERE user_id = $1 AND module_id = $2
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(&module.module_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(user_id, module_id = %module.module_id, op, "read failed: {:?}", e);
            AppError::PersistenceUnavailable(e.to_string())
        })?;

        let mut row = existing.unwrap_or_else(|| ModuleProgress::zero(user_id, &module.module_id));
        apply(&mut row);

        sqlx::query(
            r#"
            INSERT INTO module_progress
                (user_id, module_id, section_progress, overall_progress, completed_at, last_accessed)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, module_id) DO UPDATE SET
                section_progress = EXCLUDED.section_progress,
                overall_progress = EXCLUDED.overall_progress,
                completed_at = EXCLUDED.completed_at,
                last_accessed = EXCLUDED.last_accessed
            "#,
        )
        .bind(row.user_id)
        .bind(&row.module_id)
        .bind(&row.section_progress)
        .bind(row.overall_progress)
        .bind(row.completed_at)
        .bind(row.last_accessed)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(user_id, module_id = %module.module_id, op, "upsert failed: {:?}", e);
            AppError::PersistenceUnavailable(e.to_string())
        })?;

        tx.commit().await.map_err(|e| {
            tracing::error!(user_id, module_id = %module.module_id, op, "commit failed: {:?}", e);
            AppError::PersistenceUnavailable(e.to_string())
        })?;

        Ok(row)
    }

    async fn insert_attempt(&self, attempt: &NewTestAttempt) -> Result<TestAttempt, sqlx::Error> {
        sqlx::query_as::<_, TestAttempt>(
            r#"
            INSERT INTO test_attempts
                (user_id, module_id, attempt_no, sampled_question_ids, per_question,
                 total_score_percent, passed, submitted_at, client_ip, client_agent)
            SELECT $1, $2,
                   COALESCE((SELECT MAX(attempt_no) FROM test_attempts
                             WHERE user_id = $1 AND module_id = $2), 0) + 1,
                   $3, $4, $5, $6, $7, $8, $9
            RETURNING user_id, module_id, attempt_no, sampled_question_ids, per_question,
                      total_score_percent, passed, submitted_at, client_ip, client_agent
            "#,
        )
        .bind(attempt.user_id)
        .bind(&attempt.module_id)
        .bind(Json(&attempt.sampled_question_ids))
        .bind(Json(&attempt.per_question))
        .bind(attempt.total_score_percent)
        .bind(attempt.passed)
        .bind(Utc::now())
        .bind(&attempt.client.ip)
        .bind(&attempt.client.user_agent)
        .fetch_one(&self.pool)
        .await
    }
}

#[async_trait]
impl EnrollmentStore for PgEngineStore {
    async fn active_enrollment_count(
        &self,
        student_id: i64,
        course_pattern: &str,
    ) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM enrollments
            WHERE student_id = $1
              AND status IN ('active', 'completed')
              AND (course_title ILIKE '%' || $2 || '%'
                   OR program_name ILIKE '%' || $2 || '%')
            "#,
        )
        .bind(student_id)
        .bind(escape_like(course_pattern))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(student_id, op = "active_enrollment_count", "query failed: {:?}", e);
            AppError::PersistenceUnavailable(e.to_string())
        })?;

        Ok(count)
    }
}

#[async_trait]
impl ProgressStore for PgEngineStore {
    async fn get(&self, user_id: i64, module_id: &str) -> Result<ModuleProgress, AppError> {
        let row = sqlx::query_as::<_, ModuleProgress>(
            r#"
            SELECT user_id, module_id, section_progress, overall_progress,
                   completed_at, last_accessed
            FROM module_progress
            WHERE user_id = $1 AND module_id = $2
            "#,
        )
        .bind(user_id)
        .bind(module_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(user_id, module_id, op = "progress_get", "query failed: {:?}", e);
            AppError::PersistenceUnavailable(e.to_string())
        })?;

        Ok(row.unwrap_or_else(|| ModuleProgress::zero(user_id, module_id)))
    }

    async fn mark_section_complete(
        &self,
        user_id: i64,
        module: &ModuleConfig,
        section: u32,
    ) -> Result<ModuleProgress, AppError> {
        let total = module.section_count;
        self.mutate_progress(user_id, module, "mark_section_complete", move |row| {
            row.apply_section_complete(section, total)
        })
        .await
    }

    async fn mark_section_reset(
        &self,
        user_id: i64,
        module: &ModuleConfig,
        section: u32,
    ) -> Result<ModuleProgress, AppError> {
        let total = module.section_count;
        self.mutate_progress(user_id, module, "mark_section_reset", move |row| {
            row.apply_section_reset(section, total)
        })
        .await
    }

    async fn mark_module_complete(
        &self,
        user_id: i64,
        module: &ModuleConfig,
    ) -> Result<ModuleProgress, AppError> {
        let total = module.section_count;
        self.mutate_progress(user_id, module, "mark_module_complete", move |row| {
            row.apply_module_complete(total)
        })
        .await
    }
}

#[async_trait]
impl SubmissionStore for PgEngineStore {
    async fn record_answer(&self, submission: &ExerciseSubmission) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO exercise_submissions
                (user_id, module_id, exercise_type, exercise_id, answer_payload,
                 is_correct, score, max_score, submitted_at, client_ip, client_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (user_id, module_id, exercise_type, exercise_id) DO UPDATE SET
                answer_payload = EXCLUDED.answer_payload,
                is_correct = EXCLUDED.is_correct,
                score = EXCLUDED.score,
                max_score = EXCLUDED.max_score,
                submitted_at = EXCLUDED.submitted_at,
                client_ip = EXCLUDED.client_ip,
                client_agent = EXCLUDED.client_agent
            "#,
        )
        .bind(submission.user_id)
        .bind(&submission.module_id)
        .bind(&submission.exercise_type)
        .bind(&submission.exercise_id)
        .bind(&submission.answer_payload)
        .bind(submission.is_correct)
        .bind(submission.score)
        .bind(submission.max_score)
        .bind(submission.submitted_at)
        .bind(&submission.client_ip)
        .bind(&submission.client_agent)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(
                user_id = submission.user_id,
                module_id = %submission.module_id,
                exercise_id = %submission.exercise_id,
                op = "record_answer",
                "upsert failed: {:?}",
                e
            );
            AppError::PersistenceUnavailable(e.to_string())
        })?;

        Ok(())
    }

    async fn latest_answer(
        &self,
        user_id: i64,
        module_id: &str,
        exercise_type: &str,
        exercise_id: &str,
    ) -> Result<Option<ExerciseSubmission>, AppError> {
        let row = sqlx::query_as::<_, ExerciseSubmission>(
            r#"
            SELECT user_id, module_id, exercise_type, exercise_id, answer_payload,
                   is_correct, score, max_score, submitted_at, client_ip, client_agent
            FROM exercise_submissions
            WHERE user_id = $1 AND module_id = $2
              AND exercise_type = $3 AND exercise_id = $4
            "#,
        )
        .bind(user_id)
        .bind(module_id)
        .bind(exercise_type)
        .bind(exercise_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(user_id, module_id, exercise_id, op = "latest_answer", "query failed: {:?}", e);
            AppError::PersistenceUnavailable(e.to_string())
        })?;

        Ok(row)
    }

    async fn append_attempt(&self, attempt: NewTestAttempt) -> Result<TestAttempt, AppError> {
        // Single-statement insert: the next counter is derived in the same
        // statement that appends. Two truly simultaneous submissions can
        // still compute the same counter; the loser hits the primary key
        // and is retried once so each submission lands as its own row.
        let mut retried = false;
        loop {
            match self.insert_attempt(&attempt).await {
                Ok(row) => return Ok(row),
                Err(e) => {
                    let collided = e
                        .as_database_error()
                        .is_some_and(|d| d.is_unique_violation());
                    if collided && !retried {
                        retried = true;
                        continue;
                    }
                    tracing::error!(
                        user_id = attempt.user_id,
                        module_id = %attempt.module_id,
                        op = "append_attempt",
                        "insert failed: {:?}",
                        e
                    );
                    return Err(AppError::PersistenceUnavailable(e.to_string()));
                }
            }
        }
    }

    async fn recent_attempts(
        &self,
        user_id: i64,
        module_id: &str,
        limit: i64,
    ) -> Result<Vec<TestAttempt>, AppError> {
        let rows = sqlx::query_as::<_, TestAttempt>(
            r#"
            SELECT user_id, module_id, attempt_no, sampled_question_ids, per_question,
                   total_score_percent, passed, submitted_at, client_ip, client_agent
            FROM test_attempts
            WHERE user_id = $1 AND module_id = $2
            ORDER BY attempt_no DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(module_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(user_id, module_id, op = "recent_attempts", "query failed: {:?}", e);
            AppError::PersistenceUnavailable(e.to_string())
        })?;

        Ok(rows)
    }
}

#[async_trait]
impl QuestionBank for PgEngineStore {
    async fn pool(&self, module_id: &str) -> Result<Vec<Question>, AppError> {
        let rows = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, module_id, prompt, options, correct_choice, points,
                   domain_tag, explanation
            FROM questions
            WHERE module_id = $1
            ORDER BY id
            "#,
        )
        .bind(module_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(module_id, op = "question_pool", "query failed: {:?}", e);
            AppError::PersistenceUnavailable(e.to_string())
        })?;

        Ok(rows)
    }

    async fn find(
        &self,
        module_id: &str,
        question_id: &str,
    ) -> Result<Option<Question>, AppError> {
        let row = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, module_id, prompt, options, correct_choice, points,
                   domain_tag, explanation
            FROM questions
            WHERE module_id = $1 AND id = $2
            "#,
        )
        .bind(module_id)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(module_id, question_id, op = "question_find", "query failed: {:?}", e);
            AppError::PersistenceUnavailable(e.to_string())
        })?;

        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn escape_like_neutralizes_wildcards() {
        assert_eq!(escape_like("100% Web_Dev"), "100\\% Web\\_Dev");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain text"), "plain text");
    }

    #[test]
    fn escape_like_handles_backslash_before_wildcard() {
        // The backslash must be doubled first, or "\%" would end up
        // re-escaping its own escape.
        assert_eq!(escape_like("\\%"), "\\\\\\%");
    }
}
