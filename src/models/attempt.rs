// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

use crate::models::question::SetId;

/// Exam length in seconds (10 minutes).
pub const QUIZ_DURATION_SECS: i64 = 600;

/// Sentinel stored in the answer vector for an unanswered question.
pub const UNANSWERED: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
}

/// Per-question result record, written once at submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResponse {
    pub question: String,
    pub options: Vec<String>,
    pub chosen_index: i64,
    pub correct_index: i64,
    pub is_correct: bool,
}

/// Represents the 'attempts' table: one student's quiz session from creation
/// to submission. `student_id` is unique, enforcing one attempt per student.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: String,
    pub name: String,
    pub email: String,
    pub student_id: String,
    pub question_set: SetId,

    /// Per-question outcome records, empty until submission.
    pub responses: Json<Vec<AttemptResponse>>,

    /// One slot per question, `-1` = unanswered.
    pub answers: Json<Vec<i64>>,

    pub score: i64,
    pub total_questions: i64,

    /// Sticky once true; `cheat_count` keeps the running violation tally.
    pub cheated: bool,
    pub cheat_count: i64,

    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub time_remaining: i64,
}

impl Attempt {
    pub fn new(
        name: String,
        email: String,
        student_id: String,
        question_set: SetId,
        total_questions: usize,
    ) -> Self {
        Self {
            id: format!("attempt-{}", Uuid::new_v4()),
            name,
            email,
            student_id,
            question_set,
            responses: Json(Vec::new()),
            answers: Json(vec![UNANSWERED; total_questions]),
            score: 0,
            total_questions: total_questions as i64,
            cheated: false,
            cheat_count: 0,
            status: AttemptStatus::InProgress,
            started_at: Utc::now(),
            ended_at: None,
            time_remaining: QUIZ_DURATION_SECS,
        }
    }
}

/// DTO for the start form.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttemptRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required."))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, max = 50, message = "Student ID is required."))]
    pub student_id: String,
    /// Camera consent, required when proctored mode is on.
    #[serde(default)]
    pub camera_consent: bool,
}

/// DTO for the PUT contract: only progress fields are writable.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAttemptRequest {
    pub answers: Option<Vec<i64>>,
    pub time_remaining: Option<i64>,
}

/// DTO for selecting an option on a single question.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub question_index: usize,
    pub option_index: i64,
}

/// DTO for the student-side unlock of a locked attempt.
#[derive(Debug, Deserialize)]
pub struct UnlockRequest {
    pub code: String,
}
