// src/models/question.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Identifier of one of the four rotating question sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum SetId {
    A,
    B,
    C,
    D,
}

impl SetId {
    /// Allocation order used by the round-robin counter.
    pub const ROTATION: [SetId; 4] = [SetId::A, SetId::B, SetId::C, SetId::D];
}

impl fmt::Display for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SetId::A => "A",
            SetId::B => "B",
            SetId::C => "C",
            SetId::D => "D",
        };
        write!(f, "{}", s)
    }
}

/// A single scored question. The shape (`correctIndex` in particular) is the
/// contract the scoring engine depends on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSet {
    pub set_id: SetId,
    pub questions: Vec<Question>,
}

/// DTO for sending a question to the student (excludes the answer key).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
}

static QUESTION_SETS: LazyLock<Vec<QuestionSet>> = LazyLock::new(|| {
    serde_json::from_str(include_str!("../../data/questions.json"))
        .expect("embedded question bank must be valid JSON")
});

/// Looks up the full (answer-bearing) question set. The bank always carries
/// all four sets.
pub fn question_set(set_id: SetId) -> &'static QuestionSet {
    QUESTION_SETS
        .iter()
        .find(|s| s.set_id == set_id)
        .expect("all four question sets are present in the embedded bank")
}

/// The student-facing view of a set, with answer keys stripped.
pub fn public_questions(set_id: SetId) -> Vec<PublicQuestion> {
    question_set(set_id)
        .questions
        .iter()
        .map(|q| PublicQuestion {
            id: q.id.clone(),
            question: q.question.clone(),
            options: q.options.clone(),
        })
        .collect()
}
