use crate::models;
use sqlx::PgPool;
use tracing::Instrument;

pub async fn fetch(pool: &PgPool, id: &str) -> Result<Option<models::User>, String> {
    let query_span = tracing::info_span!("Fetching the user by ID");
    sqlx::query_as::<_, models::User>(
        r#"
        SELECT id, name, email, is_admin, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .instrument(query_span)
    .await
    .map_err(|err| {
        tracing::error!("Failed to execute fetch query: {:?}", err);
        "Could not fetch the user".to_string()
    })
}
