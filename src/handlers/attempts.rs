// src/handlers/attempts.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    core::{
        allocation,
        anticheat::{DetectedObject, SignalKind},
        session::{AttemptSession, SignalOutcome, SubmitTrigger},
    },
    error::AppError,
    models::{
        attempt::{Attempt, AnswerRequest, CreateAttemptRequest, UnlockRequest, UpdateAttemptRequest},
        exam_config::ExamConfig,
        question,
    },
    state::AppState,
};

async fn fetch_attempt(state: &AppState, id: &str) -> Result<Attempt, AppError> {
    sqlx::query_as::<_, Attempt>("SELECT * FROM attempts WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Attempt {} not found", id)))
}

/// Resolves the live session for an attempt, reviving it from the persisted
/// row if the server restarted mid-attempt.
async fn live_session(state: &AppState, id: &str) -> Result<Arc<AttemptSession>, AppError> {
    if let Some(session) = state.sessions.get(id) {
        return Ok(session);
    }
    let attempt = fetch_attempt(state, id).await?;
    Ok(state.sessions.resume(state.pool.clone(), &attempt))
}

/// Starts a new attempt: validates the form, gates on the exam window and
/// camera consent, allocates a question set round-robin, and spawns the
/// server-side session that owns the countdown from here on.
pub async fn create_attempt(
    State(state): State<AppState>,
    Json(payload): Json<CreateAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let config = ExamConfig::fetch_or_init(&state.pool).await?;
    if !config.exam_open {
        return Err(AppError::Conflict(
            "The exam is currently closed. Please contact your administrator.".to_string(),
        ));
    }
    if config.proctored_mode && !payload.camera_consent {
        return Err(AppError::BadRequest(
            "Camera consent is required for the proctored exam.".to_string(),
        ));
    }

    let set_id = allocation::allocate_set(&state.pool).await?;
    let questions = question::question_set(set_id);
    let attempt = Attempt::new(
        payload.name,
        payload.email,
        payload.student_id,
        set_id,
        questions.questions.len(),
    );

    let insert = sqlx::query(
        "INSERT INTO attempts (id, name, email, student_id, question_set, responses, \
         answers, score, total_questions, cheated, cheat_count, status, started_at, \
         ended_at, time_remaining) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&attempt.id)
    .bind(&attempt.name)
    .bind(&attempt.email)
    .bind(&attempt.student_id)
    .bind(attempt.question_set)
    .bind(&attempt.responses)
    .bind(&attempt.answers)
    .bind(attempt.score)
    .bind(attempt.total_questions)
    .bind(attempt.cheated)
    .bind(attempt.cheat_count)
    .bind(attempt.status)
    .bind(attempt.started_at)
    .bind(attempt.ended_at)
    .bind(attempt.time_remaining)
    .execute(&state.pool)
    .await;

    if let Err(e) = insert {
        // The UNIQUE index on student_id is the authority; a check-then-insert
        // race still lands here.
        if e.as_database_error()
            .is_some_and(|db| db.is_unique_violation())
        {
            return Err(AppError::Conflict(
                "An attempt already exists for this student ID.".to_string(),
            ));
        }
        return Err(e.into());
    }

    state.sessions.resume(state.pool.clone(), &attempt);
    tracing::info!(
        "Attempt {} started for student {} (set {})",
        attempt.id,
        attempt.student_id,
        set_id
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "attempt": attempt,
            "questions": question::public_questions(set_id),
        })),
    ))
}

pub async fn list_attempts(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let attempts =
        sqlx::query_as::<_, Attempt>("SELECT * FROM attempts ORDER BY started_at DESC")
            .fetch_all(&state.pool)
            .await?;
    Ok(Json(attempts))
}

pub async fn get_attempt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = fetch_attempt(&state, &id).await?;
    Ok(Json(attempt))
}

/// Lookup by student id for the "resume after refresh" flow. Absence is not
/// an error: the body is JSON `null` so the client can branch on it.
pub async fn get_attempt_by_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let attempt =
        sqlx::query_as::<_, Attempt>("SELECT * FROM attempts WHERE student_id = ?")
            .bind(&student_id)
            .fetch_optional(&state.pool)
            .await?;
    Ok(Json(attempt))
}

/// Bulk progress update (answers and/or remaining time). Routed through the
/// live session so the state machine's phase rules apply, then written
/// through so the response reflects the new values.
pub async fn update_attempt(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = live_session(&state, &id).await?;
    session.apply_update(payload.answers.as_deref(), payload.time_remaining)?;
    session.flush(&state.pool).await?;

    let attempt = fetch_attempt(&state, &id).await?;
    Ok(Json(attempt))
}

pub async fn delete_attempt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.remove(&id);
    let result = sqlx::query("DELETE FROM attempts WHERE id = ?")
        .bind(&id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Attempt {} not found", id)));
    }
    Ok(Json(json!({ "message": "Attempt deleted" })))
}

pub async fn delete_all_attempts(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.clear();
    let result = sqlx::query("DELETE FROM attempts").execute(&state.pool).await?;
    Ok(Json(json!({ "deleted": result.rows_affected() })))
}

/// Records one answer selection on a live attempt.
pub async fn record_answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = live_session(&state, &id).await?;
    session.record_answer(payload.question_index, payload.option_index)?;
    Ok(Json(json!({ "message": "Answer recorded" })))
}

/// Feeds one raw cheat signal (tab switch, blur, copy/paste, ...) into the
/// aggregator. The response tells the client whether the attempt locked.
pub async fn report_signal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(kind): Json<SignalKind>,
) -> Result<impl IntoResponse, AppError> {
    let session = live_session(&state, &id).await?;
    let outcome = session.report_signal(&state.pool, kind).await?;
    Ok(Json(signal_response(outcome)))
}

/// Feeds one camera frame's detected objects through frame analysis and the
/// movement hysteresis, then into the aggregator. Camera signals only count
/// while proctored mode is on; otherwise the frame is dropped.
pub async fn report_detections(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(objects): Json<Vec<DetectedObject>>,
) -> Result<impl IntoResponse, AppError> {
    let config = ExamConfig::fetch_or_init(&state.pool).await?;
    if !config.proctored_mode {
        return Ok(Json(signal_response(SignalOutcome::Ignored)));
    }

    let session = live_session(&state, &id).await?;
    let outcome = session.report_detections(&state.pool, &objects).await?;
    Ok(Json(signal_response(outcome)))
}

fn signal_response(outcome: SignalOutcome) -> serde_json::Value {
    match outcome {
        SignalOutcome::Locked { cheat_count, reason } => json!({
            "locked": true,
            "cheatCount": cheat_count,
            "reason": reason,
        }),
        SignalOutcome::Ignored => json!({ "locked": false }),
    }
}

/// Student-side unlock of a locked attempt with the admin reset code.
pub async fn unlock_attempt(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UnlockRequest>,
) -> Result<impl IntoResponse, AppError> {
    let config = ExamConfig::fetch_or_init(&state.pool).await?;
    if payload.code != config.admin_reset_code {
        return Err(AppError::AuthError("Invalid reset code.".to_string()));
    }

    let session = live_session(&state, &id).await?;
    session.unlock()?;
    tracing::info!("Attempt {} unlocked with reset code", id);
    Ok(Json(json!({ "unlocked": true })))
}

/// Manual submission. Idempotent: a repeat call returns the already-final
/// record without rescoring.
pub async fn submit_attempt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = live_session(&state, &id).await?;
    session
        .submit(&state.pool, &state.sessions, SubmitTrigger::Manual)
        .await?;

    let attempt = fetch_attempt(&state, &id).await?;
    Ok(Json(attempt))
}
