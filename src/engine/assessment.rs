// src/engine/assessment.rs

use std::collections::BTreeMap;

use rand::rng;
use rand::seq::SliceRandom;

use crate::models::attempt::QuestionResult;
use crate::models::question::{AnswerValue, PresentedQuestion, Question};

/// Draws `k` distinct questions from `pool`, uniformly and without
/// replacement. No stratification by domain tag: any k-of-n combination is
/// possible. Pools smaller than `k` yield the whole pool, shuffled.
pub fn sample(mut pool: Vec<Question>, k: usize) -> Vec<Question> {
    pool.shuffle(&mut rng());
    pool.truncate(k);
    pool
}

/// The grader's output, before the attempt counter and timestamp are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct GradedTest {
    pub sampled_question_ids: Vec<String>,
    pub per_question: BTreeMap<String, QuestionResult>,
    pub correct_count: usize,
    pub total_questions: usize,
    pub total_score_percent: f64,
    pub passed: bool,
}

/// Grades `answers` strictly against the presented snapshot.
///
/// The snapshot is the sole reference: questions edited or removed from the
/// bank after presentation cannot change the score of an in-flight attempt.
/// Answers referencing ids outside the snapshot earn zero credit but never
/// abort scoring; scoring is total whenever possible. Unanswered questions
/// count as incorrect.
pub fn grade(
    presented: &[PresentedQuestion],
    answers: &BTreeMap<String, String>,
    pass_percent: f64,
) -> GradedTest {
    let mut per_question = BTreeMap::new();
    let mut sampled_question_ids = Vec::new();
    let mut earned: i64 = 0;
    let mut max: i64 = 0;
    let mut correct_count = 0;

    for question in presented {
        // A duplicated id in the snapshot counts once.
        if per_question.contains_key(&question.id) {
            continue;
        }
        sampled_question_ids.push(question.id.clone());

        let chosen = answers.get(&question.id).cloned();
        let is_correct = chosen.as_deref() == Some(question.correct_choice.as_str());

        max += question.points as i64;
        if is_correct {
            earned += question.points as i64;
            correct_count += 1;
        }

        per_question.insert(
            question.id.clone(),
            QuestionResult {
                chosen,
                correct: question.correct_choice.clone(),
                is_correct,
            },
        );
    }

    let total_score_percent = if max > 0 {
        100.0 * earned as f64 / max as f64
    } else {
        0.0
    };
    let passed = total_score_percent >= pass_percent;

    GradedTest {
        total_questions: sampled_question_ids.len(),
        sampled_question_ids,
        per_question,
        correct_count,
        total_score_percent,
        passed,
    }
}

/// Deterministic key comparison for formative multiple-choice and
/// true/false exercises. Returns (is_correct, score, max_score).
/// Free-form answers are not this function's business.
pub fn grade_formative(question: &Question, answer: &AnswerValue) -> Option<(bool, f64, f64)> {
    let key = answer.as_key()?;
    let is_correct = key == question.correct_choice;
    let max = question.points as f64;
    let score = if is_correct { max } else { 0.0 };
    Some((is_correct, score, max))
}
