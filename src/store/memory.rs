// src/store/memory.rs

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;

use crate::catalog::ModuleConfig;
use crate::error::AppError;
use crate::models::attempt::{NewTestAttempt, TestAttempt};
use crate::models::enrollment::Enrollment;
use crate::models::progress::ModuleProgress;
use crate::models::question::Question;
use crate::models::submission::ExerciseSubmission;
use crate::store::{EnrollmentStore, ProgressStore, QuestionBank, SubmissionStore};

/// In-memory implementation of every engine store.
///
/// Backs the test suite and database-less development. Semantics mirror the
/// Postgres implementation: zero-state reads, full-row recompute on every
/// progress write, latest-only exercise upserts, append-only attempts.
#[derive(Default)]
pub struct MemoryStore {
    enrollments: Mutex<Vec<Enrollment>>,
    progress: Mutex<HashMap<(i64, String), ModuleProgress>>,
    answers: Mutex<HashMap<(i64, String, String, String), ExerciseSubmission>>,
    attempts: Mutex<HashMap<(i64, String), Vec<TestAttempt>>>,
    questions: Mutex<HashMap<String, Vec<Question>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an enrollment row (tests and local fixtures).
    pub fn add_enrollment(&self, enrollment: Enrollment) {
        self.enrollments
            .lock()
            .expect("enrollments lock poisoned")
            .push(enrollment);
    }

    /// Seeds one question into its module's pool.
    pub fn add_question(&self, question: Question) {
        self.questions
            .lock()
            .expect("questions lock poisoned")
            .entry(question.module_id.clone())
            .or_default()
            .push(question);
    }

    fn mutate_progress<F>(
        &self,
        user_id: i64,
        module: &ModuleConfig,
        apply: F,
    ) -> Result<ModuleProgress, AppError>
    where
        F: FnOnce(&mut ModuleProgress),
    {
        let mut progress = self.progress.lock().expect("progress lock poisoned");
        let row = progress
            .entry((user_id, module.module_id.clone()))
            .or_insert_with(|| ModuleProgress::zero(user_id, &module.module_id));
        apply(row);
        Ok(row.clone())
    }
}

#[async_trait]
impl EnrollmentStore for MemoryStore {
    async fn active_enrollment_count(
        &self,
        student_id: i64,
        course_pattern: &str,
    ) -> Result<i64, AppError> {
        let enrollments = self.enrollments.lock().expect("enrollments lock poisoned");
        let count = enrollments
            .iter()
            .filter(|e| {
                e.student_id == student_id
                    && e.counts_for_access()
                    && e.matches_pattern(course_pattern)
            })
            .count();
        Ok(count as i64)
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn get(&self, user_id: i64, module_id: &str) -> Result<ModuleProgress, AppError> {
        let progress = self.progress.lock().expect("progress lock poisoned");
        Ok(progress
            .get(&(user_id, module_id.to_string()))
            .cloned()
            .unwrap_or_else(|| ModuleProgress::zero(user_id, module_id)))
    }

    async fn mark_section_complete(
        &self,
        user_id: i64,
        module: &ModuleConfig,
        section: u32,
    ) -> Result<ModuleProgress, AppError> {
        let total = module.section_count;
        self.mutate_progress(user_id, module, |row| {
            row.apply_section_complete(section, total)
        })
    }

    async fn mark_section_reset(
        &self,
        user_id: i64,
        module: &ModuleConfig,
        section: u32,
    ) -> Result<ModuleProgress, AppError> {
        let total = module.section_count;
        self.mutate_progress(user_id, module, |row| {
            row.apply_section_reset(section, total)
        })
    }

    async fn mark_module_complete(
        &self,
        user_id: i64,
        module: &ModuleConfig,
    ) -> Result<ModuleProgress, AppError> {
        let total = module.section_count;
        self.mutate_progress(user_id, module, |row| row.apply_module_complete(total))
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn record_answer(&self, submission: &ExerciseSubmission) -> Result<(), AppError> {
        let key = (
            submission.user_id,
            submission.module_id.clone(),
            submission.exercise_type.clone(),
            submission.exercise_id.clone(),
        );
        self.answers
            .lock()
            .expect("answers lock poisoned")
            .insert(key, submission.clone());
        Ok(())
    }

    async fn latest_answer(
        &self,
        user_id: i64,
        module_id: &str,
        exercise_type: &str,
        exercise_id: &str,
    ) -> Result<Option<ExerciseSubmission>, AppError> {
        let key = (
            user_id,
            module_id.to_string(),
            exercise_type.to_string(),
            exercise_id.to_string(),
        );
        Ok(self
            .answers
            .lock()
            .expect("answers lock poisoned")
            .get(&key)
            .cloned())
    }

    async fn append_attempt(&self, attempt: NewTestAttempt) -> Result<TestAttempt, AppError> {
        let mut attempts = self.attempts.lock().expect("attempts lock poisoned");
        let rows = attempts
            .entry((attempt.user_id, attempt.module_id.clone()))
            .or_default();
        let attempt_no = rows.last().map(|a| a.attempt_no).unwrap_or(0) + 1;
        let row = TestAttempt {
            user_id: attempt.user_id,
            module_id: attempt.module_id,
            attempt_no,
            sampled_question_ids: Json(attempt.sampled_question_ids),
            per_question: Json(attempt.per_question),
            total_score_percent: attempt.total_score_percent,
            passed: attempt.passed,
            submitted_at: Utc::now(),
            client_ip: attempt.client.ip,
            client_agent: attempt.client.user_agent,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn recent_attempts(
        &self,
        user_id: i64,
        module_id: &str,
        limit: i64,
    ) -> Result<Vec<TestAttempt>, AppError> {
        let attempts = self.attempts.lock().expect("attempts lock poisoned");
        let rows = attempts
            .get(&(user_id, module_id.to_string()))
            .map(|rows| {
                rows.iter()
                    .rev()
                    .take(limit.max(0) as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }
}

#[async_trait]
impl QuestionBank for MemoryStore {
    async fn pool(&self, module_id: &str) -> Result<Vec<Question>, AppError> {
        Ok(self
            .questions
            .lock()
            .expect("questions lock poisoned")
            .get(module_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find(
        &self,
        module_id: &str,
        question_id: &str,
    ) -> Result<Option<Question>, AppError> {
        Ok(self
            .questions
            .lock()
            .expect("questions lock poisoned")
            .get(module_id)
            .and_then(|pool| pool.iter().find(|q| q.id == question_id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::catalog::ModuleCatalog;
    use crate::models::question::AnswerValue;

    fn module() -> ModuleConfig {
        ModuleCatalog::default()
            .get("web-foundations")
            .unwrap()
            .clone()
    }

    fn submission(answer: AnswerValue) -> ExerciseSubmission {
        ExerciseSubmission {
            user_id: 7,
            module_id: "web-foundations".to_string(),
            exercise_type: "multiple_choice".to_string(),
            exercise_id: "ex-1".to_string(),
            answer_payload: Json(answer),
            is_correct: Some(false),
            score: Some(0.0),
            max_score: Some(10.0),
            submitted_at: Utc::now(),
            client_ip: None,
            client_agent: None,
        }
    }

    #[tokio::test]
    async fn progress_read_of_absent_row_is_zero_state() {
        let store = MemoryStore::new();
        let p = store.get(7, "web-foundations").await.unwrap();
        assert_eq!(p.overall_progress, 0.0);
    }

    #[tokio::test]
    async fn second_answer_overwrites_first() {
        let store = MemoryStore::new();
        store
            .record_answer(&submission(AnswerValue::Choice("a".into())))
            .await
            .unwrap();
        store
            .record_answer(&submission(AnswerValue::Choice("b".into())))
            .await
            .unwrap();

        let latest = store
            .latest_answer(7, "web-foundations", "multiple_choice", "ex-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.answer_payload.0, AnswerValue::Choice("b".into()));
    }

    #[tokio::test]
    async fn attempts_append_and_list_newest_first() {
        let store = MemoryStore::new();
        for i in 0..7 {
            let attempt = NewTestAttempt {
                user_id: 7,
                module_id: "web-foundations".to_string(),
                sampled_question_ids: vec![],
                per_question: BTreeMap::new(),
                total_score_percent: 10.0 * i as f64,
                passed: false,
                client: Default::default(),
            };
            let row = store.append_attempt(attempt).await.unwrap();
            assert_eq!(row.attempt_no, i + 1);
        }

        let recent = store.recent_attempts(7, "web-foundations", 5).await.unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].attempt_no, 7);
        assert_eq!(recent[4].attempt_no, 3);
    }

    #[tokio::test]
    async fn concurrent_attempts_each_land_as_their_own_row() {
        let store = std::sync::Arc::new(MemoryStore::new());

        let mut handles = Vec::new();
        for i in 0..4 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let attempt = NewTestAttempt {
                    user_id: 7,
                    module_id: "web-foundations".to_string(),
                    sampled_question_ids: vec![],
                    per_question: BTreeMap::new(),
                    total_score_percent: 10.0 * i as f64,
                    passed: false,
                    client: Default::default(),
                };
                store.append_attempt(attempt).await.unwrap()
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let recent = store.recent_attempts(7, "web-foundations", 10).await.unwrap();
        assert_eq!(recent.len(), 4);
        let mut numbers: Vec<_> = recent.iter().map(|a| a.attempt_no).collect();
        numbers.sort_unstable();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn concurrent_section_marks_converge() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let m = module();

        let mut handles = Vec::new();
        for section in 1..=3u32 {
            let store = store.clone();
            let m = m.clone();
            handles.push(tokio::spawn(async move {
                store.mark_section_complete(7, &m, section).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let p = store.get(7, &m.module_id).await.unwrap();
        assert_eq!(p.overall_progress, 75.0);
    }
}
