// src/core/scoring.rs

use serde::Serialize;

use crate::models::attempt::{AttemptResponse, UNANSWERED};
use crate::models::question::QuestionSet;

/// Outcome of grading one attempt. Computed once, at submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub score: i64,
    pub total_questions: i64,
    pub responses: Vec<AttemptResponse>,
}

/// Grades an answer vector against a question set.
///
/// Pure and total: a missing, `-1`, or out-of-range chosen index simply
/// counts as incorrect. Safe to re-run; never fails for any input.
pub fn score_attempt(set: &QuestionSet, answers: &[i64]) -> ScoreResult {
    let mut score = 0;
    let responses = set
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let chosen_index = answers.get(i).copied().unwrap_or(UNANSWERED);
            let is_correct = chosen_index == q.correct_index;
            if is_correct {
                score += 1;
            }
            AttemptResponse {
                question: q.question.clone(),
                options: q.options.clone(),
                chosen_index,
                correct_index: q.correct_index,
                is_correct,
            }
        })
        .collect();

    ScoreResult {
        score,
        total_questions: set.questions.len() as i64,
        responses,
    }
}

/// Fits an answer vector to a new question count: overlapping indices are
/// preserved, new slots become `-1`. Entries beyond `len` are dropped, which
/// is the only place recorded answers can be lost and is bounded to indices
/// past the new length.
pub fn normalize_answers(answers: &[i64], len: usize) -> Vec<i64> {
    let mut normalized = vec![UNANSWERED; len];
    for (slot, value) in normalized.iter_mut().zip(answers.iter()) {
        *slot = *value;
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{SetId, question_set};

    fn correct_answers(set: &QuestionSet) -> Vec<i64> {
        set.questions.iter().map(|q| q.correct_index).collect()
    }

    #[test]
    fn all_correct_scores_full_marks() {
        let set = question_set(SetId::A);
        let answers = correct_answers(set);
        let result = score_attempt(set, &answers);
        assert_eq!(result.score, 10);
        assert_eq!(result.total_questions, 10);
        assert!(result.responses.iter().all(|r| r.is_correct));
    }

    #[test]
    fn score_matches_count_of_correct_indices() {
        let set = question_set(SetId::B);
        let mut answers = correct_answers(set);
        answers[0] = (answers[0] + 1) % set.questions[0].options.len() as i64;
        answers[5] = UNANSWERED;
        let result = score_attempt(set, &answers);

        let expected = answers
            .iter()
            .enumerate()
            .filter(|(i, a)| **a == set.questions[*i].correct_index)
            .count() as i64;
        assert_eq!(result.score, expected);
        assert!(result.score <= result.total_questions);
    }

    #[test]
    fn unanswered_slot_is_incorrect_with_minus_one_recorded() {
        let set = question_set(SetId::A);
        let mut answers = correct_answers(set);
        answers[3] = UNANSWERED;
        let result = score_attempt(set, &answers);
        assert_eq!(result.score, 9);
        assert!(!result.responses[3].is_correct);
        assert_eq!(result.responses[3].chosen_index, UNANSWERED);
    }

    #[test]
    fn short_and_out_of_range_answers_never_panic() {
        let set = question_set(SetId::C);
        let result = score_attempt(set, &[0, 99, -5]);
        assert_eq!(result.responses.len(), 10);
        assert_eq!(result.responses[9].chosen_index, UNANSWERED);
        assert!(result.score <= result.total_questions);
    }

    #[test]
    fn normalize_preserves_overlap_and_pads_with_unanswered() {
        let normalized = normalize_answers(&[2, 0, 1], 5);
        assert_eq!(normalized, vec![2, 0, 1, UNANSWERED, UNANSWERED]);

        let truncated = normalize_answers(&[2, 0, 1, 3], 2);
        assert_eq!(truncated, vec![2, 0]);

        assert_eq!(normalize_answers(&[], 3), vec![UNANSWERED; 3]);
        assert!(normalize_answers(&[1, 2], 0).is_empty());
    }
}
