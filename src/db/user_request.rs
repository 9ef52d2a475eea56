use crate::models;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::Instrument;
use uuid::Uuid;

pub async fn insert(pool: &PgPool, user_id: &str) -> Result<models::UserRequest, String> {
    let query_span = tracing::info_span!("Saving a user request", user_id = %user_id);
    sqlx::query_as::<_, models::UserRequest>(
        r#"
        INSERT INTO user_requests (id, user_id)
        VALUES ($1, $2)
        RETURNING id, user_id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .fetch_one(pool)
    .instrument(query_span)
    .await
    .map_err(|err| {
        tracing::error!("Failed to execute insert query: {:?}", err);
        "Could not record the request".to_string()
    })
}

/// Counts the requests of `user_id` made at or after `since` and records a new
/// one only while that count is below `limit`.
///
/// Callers for the same user are serialized by a transaction-scoped advisory
/// lock, so the count cannot go stale between the check and the insert.
/// Returns the count seen before inserting and the recorded row, if any.
pub async fn insert_below_limit(
    pool: &PgPool,
    user_id: &str,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<(i64, Option<models::UserRequest>), String> {
    let span = tracing::info_span!("Recording a user request within quota", user_id = %user_id);

    let result = async {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let used = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM user_requests
            WHERE user_id = $1 AND created_at >= $2
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&mut *tx)
        .await?;

        if used >= limit {
            tx.rollback().await?;
            return Ok::<_, sqlx::Error>((used, None));
        }

        let request = sqlx::query_as::<_, models::UserRequest>(
            r#"
            INSERT INTO user_requests (id, user_id)
            VALUES ($1, $2)
            RETURNING id, user_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((used, Some(request)))
    }
    .instrument(span)
    .await;

    result.map_err(|err| {
        tracing::error!("Failed to record the request within quota: {:?}", err);
        "Could not record the request".to_string()
    })
}
