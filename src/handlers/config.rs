// src/handlers/config.rs

use axum::{Json, extract::State, response::IntoResponse};

use crate::{error::AppError, models::exam_config::ExamConfig, state::AppState};

/// Returns the student-facing exam configuration.
///
/// Only `examOpen` and `proctoredMode` ship to the client; the reset code
/// stays server-side and is checked by the unlock endpoint.
pub async fn get_config(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let config = ExamConfig::fetch_or_init(&state.pool).await?;
    Ok(Json(config.public()))
}
