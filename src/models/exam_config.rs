// src/models/exam_config.rs

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use sqlx::prelude::FromRow;

/// Represents the singleton 'exam_config' row (id = "main").
///
/// Read before every attempt start and polled by in-progress attempts;
/// mutated only through the admin surface. `allocation_counter` is owned
/// exclusively by the allocation service.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamConfig {
    pub id: String,
    pub exam_open: bool,
    pub proctored_mode: bool,
    pub admin_reset_code: String,
    pub allocation_counter: i64,
}

/// Student-facing view. The reset code stays server-side; unlock attempts
/// are checked against it on the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicExamConfig {
    pub exam_open: bool,
    pub proctored_mode: bool,
}

impl ExamConfig {
    pub const MAIN: &'static str = "main";

    /// Fetches the singleton config row, creating it with schema defaults on
    /// first access (upsert semantics of the original `/config` endpoint).
    pub async fn fetch_or_init(pool: &SqlitePool) -> Result<ExamConfig, sqlx::Error> {
        if let Some(config) =
            sqlx::query_as::<_, ExamConfig>("SELECT * FROM exam_config WHERE id = ?")
                .bind(Self::MAIN)
                .fetch_optional(pool)
                .await?
        {
            return Ok(config);
        }

        sqlx::query("INSERT INTO exam_config (id) VALUES (?) ON CONFLICT(id) DO NOTHING")
            .bind(Self::MAIN)
            .execute(pool)
            .await?;

        sqlx::query_as::<_, ExamConfig>("SELECT * FROM exam_config WHERE id = ?")
            .bind(Self::MAIN)
            .fetch_one(pool)
            .await
    }

    pub fn public(&self) -> PublicExamConfig {
        PublicExamConfig {
            exam_open: self.exam_open,
            proctored_mode: self.proctored_mode,
        }
    }
}

/// DTO for the admin config patch. Fields are optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConfigRequest {
    pub exam_open: Option<bool>,
    pub proctored_mode: Option<bool>,
    pub admin_reset_code: Option<String>,
}
