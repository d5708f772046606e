// src/handlers/logs.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::{
    error::AppError,
    models::admin_log::{AdminLog, CreateLogRequest},
    state::AppState,
};

pub async fn create_log(
    State(state): State<AppState>,
    Json(payload): Json<CreateLogRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.action.trim().is_empty() {
        return Err(AppError::BadRequest("Log action is required".to_string()));
    }
    let log = AdminLog::append(&state.pool, &payload.action, &payload.details).await?;
    Ok((StatusCode::CREATED, Json(log)))
}

/// Lists the audit trail, newest first.
pub async fn list_logs(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let logs =
        sqlx::query_as::<_, AdminLog>("SELECT * FROM admin_logs ORDER BY timestamp DESC")
            .fetch_all(&state.pool)
            .await?;
    Ok(Json(logs))
}

pub async fn clear_logs(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM admin_logs").execute(&state.pool).await?;
    Ok(Json(json!({ "deleted": result.rows_affected() })))
}
