use crate::configuration::Settings;
use crate::connectors::{ModelConnector, SearchConnector};
use crate::db::{self, chat::ChatError};
use crate::forms;
use crate::helpers::data_stream::{CONTENT_TYPE, GENERIC_ERROR, STREAM_HEADER};
use crate::helpers::{DataStreamWriter, JsonResponse, StreamClosed, StreamPart};
use crate::models::{self, Message};
use crate::services::{chat, quota, Agent, AgentError};
use actix_web::{post, web, HttpResponse, Result};
use chrono::Utc;
use futures::StreamExt;
use serde_json::json;
use serde_valid::Validate;
use sqlx::PgPool;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::Instrument;
use uuid::Uuid;

/// Parts buffered between the agent and the socket.
const STREAM_BUFFER: usize = 64;

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error("could not save the chat: {0}")]
    Store(#[from] ChatError),
    #[error(transparent)]
    Closed(#[from] StreamClosed),
}

impl RunError {
    fn is_disconnect(&self) -> bool {
        matches!(self, RunError::Closed(_) | RunError::Agent(AgentError::Closed(_)))
    }
}

/// Everything a spawned chat run needs once the handler has returned.
struct ChatRun {
    pg_pool: PgPool,
    agent: Agent,
    user_id: String,
    chat_id: String,
    is_new_chat: bool,
    messages: Vec<Message>,
}

/// POST /api/chat
/// Streams the agent's reply and stores the conversation once it is complete.
#[tracing::instrument(
    name = "Chat with the search agent.",
    skip_all,
    fields(user_id = tracing::field::Empty, chat_id = tracing::field::Empty)
)]
#[post("/chat")]
pub async fn handler(
    session: Option<web::ReqData<Arc<models::Session>>>,
    body: web::Bytes,
    pg_pool: web::Data<PgPool>,
    settings: web::Data<Settings>,
    model: web::Data<Arc<dyn ModelConnector>>,
    search: web::Data<Arc<dyn SearchConnector>>,
) -> Result<HttpResponse> {
    let session = session
        .map(|session| session.into_inner())
        .ok_or_else(|| JsonResponse::<String>::build().unauthorized("Unauthorized"))?;
    tracing::Span::current().record("user_id", session.user_id.as_str());

    let user = db::user::fetch(pg_pool.get_ref(), &session.user_id)
        .await
        .map_err(|err| JsonResponse::<String>::build().internal_server_error(err))?
        .ok_or_else(|| {
            tracing::warn!("Session user has no account row");
            JsonResponse::<String>::build().unauthorized("Unauthorized")
        })?;

    let status = quota::consume(
        pg_pool.get_ref(),
        &user,
        settings.quota.daily_request_limit,
        Utc::now(),
    )
    .await
    .map_err(|err| JsonResponse::<String>::build().internal_server_error(err))?;
    if status.is_exceeded() {
        return Err(JsonResponse::<String>::build().too_many_requests("Too many requests"));
    }

    let form = serde_json::from_slice::<forms::ChatRequest>(&body).map_err(|err| {
        JsonResponse::<String>::build().bad_request(format!("Invalid request body: {}", err))
    })?;
    if form.messages.is_empty() {
        return Err(JsonResponse::<String>::build().bad_request("No messages provided"));
    }
    form.validate()
        .map_err(|errors| JsonResponse::<String>::build().bad_request(errors.to_string()))?;

    let forms::ChatRequest {
        messages,
        chat_id,
        is_new_chat,
    } = form;
    let is_new_chat = is_new_chat || chat_id.is_none();
    let chat_id = chat_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    tracing::Span::current().record("chat_id", chat_id.as_str());

    if is_new_chat {
        let title = chat::title_from_messages(&messages);
        db::chat::upsert(pg_pool.get_ref(), &user.id, &chat_id, &title, &messages)
            .await
            .map_err(|err| match err {
                ChatError::ForeignOwner(_) => {
                    JsonResponse::<String>::build().not_found("Chat not found")
                }
                err => JsonResponse::<String>::build().internal_server_error(err.to_string()),
            })?;
    } else {
        match db::chat::fetch(pg_pool.get_ref(), &chat_id)
            .await
            .map_err(|err| JsonResponse::<String>::build().internal_server_error(err.to_string()))?
        {
            Some(chat) if chat.is_owned_by(&user.id) => {}
            _ => return Err(JsonResponse::<String>::build().not_found("Chat not found")),
        }
    }

    let agent = Agent::new(
        model.get_ref().clone(),
        search.get_ref().clone(),
        settings.model.max_steps,
        settings.search.num_results,
    );
    let run = ChatRun {
        pg_pool: pg_pool.get_ref().clone(),
        agent,
        user_id: user.id,
        chat_id,
        is_new_chat,
        messages,
    };

    let (writer, rx) = DataStreamWriter::channel(STREAM_BUFFER);
    actix_web::rt::spawn(run_chat(run, writer).instrument(tracing::Span::current()));

    Ok(HttpResponse::Ok()
        .content_type(CONTENT_TYPE)
        .insert_header(STREAM_HEADER)
        .streaming(ReceiverStream::new(rx).map(Ok::<_, Infallible>)))
}

/// Drives one chat to completion. A dropped response body cancels the
/// model and search calls in flight; nothing is saved in that case.
async fn run_chat(run: ChatRun, writer: DataStreamWriter) {
    let result = tokio::select! {
        result = stream_chat(run, &writer) => result,
        _ = writer.closed() => Err(RunError::Closed(StreamClosed)),
    };

    match result {
        Ok(()) => tracing::info!("Chat response completed"),
        Err(err) if err.is_disconnect() => {
            tracing::info!("Client went away before the response completed")
        }
        Err(err) => {
            tracing::error!(error = %err, "Chat response failed");
            if writer.error(GENERIC_ERROR).await.is_err() {
                tracing::debug!("Error part not delivered, client already gone");
            }
        }
    }
}

async fn stream_chat(run: ChatRun, writer: &DataStreamWriter) -> Result<(), RunError> {
    if run.is_new_chat {
        writer
            .data(json!({ "type": "NEW_CHAT_CREATED", "chatId": run.chat_id }))
            .await?;
    }

    let outcome = run.agent.run(&run.messages, writer).await?;

    let messages = chat::append_response(run.messages, outcome.message);
    let title = chat::title_from_messages(&messages);
    db::chat::upsert(&run.pg_pool, &run.user_id, &run.chat_id, &title, &messages).await?;

    writer
        .write(StreamPart::FinishMessage {
            finish_reason: outcome.finish_reason,
            usage: outcome.usage,
        })
        .await?;

    Ok(())
}
