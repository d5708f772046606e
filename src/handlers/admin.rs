// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    error::AppError,
    models::{
        admin_log::AdminLog,
        attempt::Attempt,
        exam_config::{ExamConfig, UpdateConfigRequest},
    },
    state::AppState,
};

pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";

/// Gate for everything under /api/admin: the `x-admin-password` header must
/// match the configured password.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let supplied = req
        .headers()
        .get(ADMIN_PASSWORD_HEADER)
        .and_then(|v| v.to_str().ok());

    match supplied {
        Some(password) if password == state.config.admin_password => Ok(next.run(req).await),
        _ => Err(AppError::AuthError("Invalid admin password".to_string())),
    }
}

/// Full configuration, reset code included. Admin-only.
pub async fn get_config(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let config = ExamConfig::fetch_or_init(&state.pool).await?;
    Ok(Json(config))
}

/// Partial config patch. Every change lands in the audit trail.
pub async fn update_config(
    State(state): State<AppState>,
    Json(payload): Json<UpdateConfigRequest>,
) -> Result<impl IntoResponse, AppError> {
    let current = ExamConfig::fetch_or_init(&state.pool).await?;

    if let Some(code) = &payload.admin_reset_code {
        if code.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Reset code must not be empty".to_string(),
            ));
        }
    }

    let exam_open = payload.exam_open.unwrap_or(current.exam_open);
    let proctored_mode = payload.proctored_mode.unwrap_or(current.proctored_mode);
    let admin_reset_code = payload
        .admin_reset_code
        .unwrap_or_else(|| current.admin_reset_code.clone());

    sqlx::query(
        "UPDATE exam_config SET exam_open = ?, proctored_mode = ?, admin_reset_code = ? \
         WHERE id = ?",
    )
    .bind(exam_open)
    .bind(proctored_mode)
    .bind(&admin_reset_code)
    .bind(ExamConfig::MAIN)
    .execute(&state.pool)
    .await?;

    if exam_open != current.exam_open {
        let action = if exam_open { "Exam Opened" } else { "Exam Closed" };
        AdminLog::append(&state.pool, action, "").await?;
    }
    if proctored_mode != current.proctored_mode {
        let action = if proctored_mode {
            "Proctoring Enabled"
        } else {
            "Proctoring Disabled"
        };
        AdminLog::append(&state.pool, action, "").await?;
    }
    if admin_reset_code != current.admin_reset_code {
        AdminLog::append(&state.pool, "Reset Code Changed", "").await?;
    }

    let updated = ExamConfig::fetch_or_init(&state.pool).await?;
    Ok(Json(updated))
}

/// Force-unlock: wipes the attempt's cheat flags so the lifecycle invariant
/// (`cheated` iff a positive violation count) holds afterwards. The prior
/// tally survives in the audit trail.
pub async fn force_unlock(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = sqlx::query_as::<_, Attempt>("SELECT * FROM attempts WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Attempt {} not found", id)))?;

    sqlx::query("UPDATE attempts SET cheated = 0, cheat_count = 0 WHERE id = ?")
        .bind(&id)
        .execute(&state.pool)
        .await?;

    if let Some(session) = state.sessions.get(&id) {
        session.force_unlock();
    }

    AdminLog::append(
        &state.pool,
        "Force Unlock",
        &format!(
            "Attempt {} (student {}) unlocked; prior violation count {}",
            id, attempt.student_id, attempt.cheat_count
        ),
    )
    .await?;

    let updated = sqlx::query_as::<_, Attempt>("SELECT * FROM attempts WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.pool)
        .await?;
    Ok(Json(updated))
}
