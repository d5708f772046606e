// src/core/allocation.rs

use sqlx::SqlitePool;

use crate::models::exam_config::ExamConfig;
use crate::models::question::SetId;

/// Assigns the next question set round-robin: A, B, C, D, A, ...
///
/// The counter increment is a single atomic UPDATE ... RETURNING, so
/// concurrent start requests never observe a stale counter or lose an
/// increment.
pub async fn allocate_set(pool: &SqlitePool) -> Result<SetId, sqlx::Error> {
    // Make sure the singleton row exists before touching the counter.
    ExamConfig::fetch_or_init(pool).await?;

    let (counter_after,): (i64,) = sqlx::query_as(
        "UPDATE exam_config SET allocation_counter = allocation_counter + 1 \
         WHERE id = ? RETURNING allocation_counter",
    )
    .bind(ExamConfig::MAIN)
    .fetch_one(pool)
    .await?;

    let counter = counter_after - 1;
    Ok(SetId::ROTATION[(counter % 4) as usize])
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn sequential_allocations_rotate_deterministically() {
        let pool = test_pool().await;

        let mut assigned = Vec::new();
        for _ in 0..8 {
            assigned.push(allocate_set(&pool).await.unwrap());
        }

        let expected: Vec<SetId> = SetId::ROTATION
            .into_iter()
            .chain(SetId::ROTATION)
            .collect();
        assert_eq!(assigned, expected);

        let config = ExamConfig::fetch_or_init(&pool).await.unwrap();
        assert_eq!(config.allocation_counter, 8);
    }
}
