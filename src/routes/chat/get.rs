use crate::db;
use crate::helpers::JsonResponse;
use crate::models;
use actix_web::{get, web, Responder, Result};
use sqlx::PgPool;
use std::sync::Arc;

/// The account behind the session; 401 when either is missing.
async fn current_user(
    session: Option<web::ReqData<Arc<models::Session>>>,
    pg_pool: &PgPool,
) -> Result<models::User> {
    let session = session
        .map(|session| session.into_inner())
        .ok_or_else(|| JsonResponse::<String>::build().unauthorized("Unauthorized"))?;

    db::user::fetch(pg_pool, &session.user_id)
        .await
        .map_err(|err| JsonResponse::<String>::build().internal_server_error(err))?
        .ok_or_else(|| JsonResponse::<String>::build().unauthorized("Unauthorized"))
}

/// GET /api/chats
/// The caller's chats, most recently updated first.
#[tracing::instrument(name = "List user chats.", skip_all)]
#[get("/chats")]
pub async fn list(
    session: Option<web::ReqData<Arc<models::Session>>>,
    pg_pool: web::Data<PgPool>,
) -> Result<impl Responder> {
    let user = current_user(session, pg_pool.get_ref()).await?;

    db::chat::list_for_user(pg_pool.get_ref(), &user.id)
        .await
        .map(|chats| JsonResponse::build().set_list(chats).ok("OK"))
        .map_err(|err| JsonResponse::<String>::build().internal_server_error(err.to_string()))
}

/// GET /api/chats/{id}
/// One chat with its messages; 404 unless the caller owns it.
#[tracing::instrument(name = "Get user chat.", skip(session, pg_pool))]
#[get("/chats/{id}")]
pub async fn item(
    path: web::Path<(String,)>,
    session: Option<web::ReqData<Arc<models::Session>>>,
    pg_pool: web::Data<PgPool>,
) -> Result<impl Responder> {
    let user = current_user(session, pg_pool.get_ref()).await?;
    let chat_id = path.0.as_str();

    db::chat::fetch_for_user(pg_pool.get_ref(), &user.id, chat_id)
        .await
        .map_err(|err| JsonResponse::<String>::build().internal_server_error(err.to_string()))
        .and_then(|chat| match chat {
            Some(chat) => Ok(JsonResponse::build().set_item(chat).ok("OK")),
            None => Err(JsonResponse::<String>::build().not_found("Chat not found")),
        })
}
