// src/models/admin_log.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Represents the append-only 'admin_logs' table.
/// Rows are created on every admin mutation and never edited; the only
/// delete is the bulk "clear logs" action.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLog {
    pub id: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub details: String,
}

impl AdminLog {
    pub async fn append(
        pool: &SqlitePool,
        action: &str,
        details: &str,
    ) -> Result<AdminLog, sqlx::Error> {
        let log = AdminLog {
            id: format!("log-{}", Uuid::new_v4()),
            action: action.to_string(),
            timestamp: Utc::now(),
            details: details.to_string(),
        };
        sqlx::query("INSERT INTO admin_logs (id, action, timestamp, details) VALUES (?, ?, ?, ?)")
            .bind(&log.id)
            .bind(&log.action)
            .bind(log.timestamp)
            .bind(&log.details)
            .execute(pool)
            .await?;
        Ok(log)
    }
}

/// DTO for appending a log entry over the wire.
#[derive(Debug, Deserialize)]
pub struct CreateLogRequest {
    pub action: String,
    #[serde(default)]
    pub details: String,
}
