use crate::models::{self, Chat, ChatSummary, ChatWithMessages, Message, MessagePart};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat {0} belongs to a different user")]
    ForeignOwner(String),
    #[error("invalid stored message: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: String,
    role: String,
    parts: Json<Vec<MessagePart>>,
}

impl TryFrom<MessageRow> for Message {
    type Error = ChatError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let role = row.role.parse::<models::Role>().map_err(ChatError::Corrupt)?;
        Ok(Message::from_parts(row.id, role, row.parts.0))
    }
}

pub async fn fetch(pool: &PgPool, chat_id: &str) -> Result<Option<Chat>, ChatError> {
    let query_span = tracing::info_span!("Fetching the chat by ID", chat_id = %chat_id);
    let chat = sqlx::query_as::<_, Chat>(
        r#"
        SELECT id, user_id, title, created_at, updated_at
        FROM chats
        WHERE id = $1
        "#,
    )
    .bind(chat_id)
    .fetch_optional(pool)
    .instrument(query_span)
    .await?;

    Ok(chat)
}

/// The chat with messages in stored order; `None` when it is absent or owned
/// by somebody else.
pub async fn fetch_for_user(
    pool: &PgPool,
    user_id: &str,
    chat_id: &str,
) -> Result<Option<ChatWithMessages>, ChatError> {
    let chat = match fetch(pool, chat_id).await? {
        Some(chat) if chat.is_owned_by(user_id) => chat,
        _ => return Ok(None),
    };

    let query_span = tracing::info_span!("Fetching chat messages", chat_id = %chat_id);
    let rows = sqlx::query_as::<_, MessageRow>(
        r#"
        SELECT id, role, parts
        FROM messages
        WHERE chat_id = $1
        ORDER BY order_index ASC
        "#,
    )
    .bind(chat_id)
    .fetch_all(pool)
    .instrument(query_span)
    .await?;

    let messages = rows
        .into_iter()
        .map(Message::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(ChatWithMessages { chat, messages }))
}

pub async fn list_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<ChatSummary>, ChatError> {
    let query_span = tracing::info_span!("Listing user chats", user_id = %user_id);
    let chats = sqlx::query_as::<_, ChatSummary>(
        r#"
        SELECT id, title, created_at, updated_at
        FROM chats
        WHERE user_id = $1
        ORDER BY updated_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .instrument(query_span)
    .await?;

    Ok(chats)
}

async fn lock_chat(
    tx: &mut sqlx::PgConnection,
    chat_id: &str,
    span: &tracing::Span,
) -> Result<Option<Chat>, ChatError> {
    let chat = sqlx::query_as::<_, Chat>(
        r#"
        SELECT id, user_id, title, created_at, updated_at
        FROM chats
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(chat_id)
    .fetch_optional(&mut *tx)
    .instrument(span.clone())
    .await?;

    Ok(chat)
}

/// Creates the chat or replaces its title and whole message set.
///
/// Messages get fresh ids and `order_index` equal to their position. A chat
/// created concurrently under the same id is treated as already existing, so
/// the loser of that race gets the usual owner check.
pub async fn upsert(
    pool: &PgPool,
    user_id: &str,
    chat_id: &str,
    title: &str,
    messages: &[Message],
) -> Result<(), ChatError> {
    let span = tracing::info_span!("Upserting chat", chat_id = %chat_id, messages = messages.len());
    let mut tx = pool.begin().await?;

    let existing = match lock_chat(&mut tx, chat_id, &span).await? {
        Some(chat) => Some(chat),
        None => {
            let inserted = sqlx::query(
                r#"
                INSERT INTO chats (id, user_id, title)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(chat_id)
            .bind(user_id)
            .bind(title)
            .execute(&mut *tx)
            .instrument(span.clone())
            .await?
            .rows_affected();

            if inserted == 1 {
                None
            } else {
                tracing::debug!(parent: &span, "Chat was created concurrently");
                let chat = lock_chat(&mut tx, chat_id, &span).await?.ok_or_else(|| {
                    ChatError::Corrupt(format!("chat {} vanished while saving", chat_id))
                })?;
                Some(chat)
            }
        }
    };

    if let Some(chat) = existing {
        if !chat.is_owned_by(user_id) {
            tracing::warn!(parent: &span, "Chat id is already used by another user");
            return Err(ChatError::ForeignOwner(chat_id.to_string()));
        }

        sqlx::query(r#"UPDATE chats SET title = $1, updated_at = NOW() WHERE id = $2"#)
            .bind(title)
            .bind(chat_id)
            .execute(&mut *tx)
            .instrument(span.clone())
            .await?;

        sqlx::query(r#"DELETE FROM messages WHERE chat_id = $1"#)
            .bind(chat_id)
            .execute(&mut *tx)
            .instrument(span.clone())
            .await?;
    }

    for (index, message) in messages.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO messages (id, chat_id, role, parts, order_index)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(chat_id)
        .bind(message.role.as_str())
        .bind(Json(message.parts_or_content()))
        .bind(index as i32)
        .execute(&mut *tx)
        .instrument(span.clone())
        .await?;
    }

    tx.commit().await?;
    tracing::info!(parent: &span, "Chat has been saved to the database");
    Ok(())
}
