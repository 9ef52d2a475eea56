#![allow(dead_code)]

use deepsearch::configuration::{get_configuration, DatabaseSettings, Settings};
use serde_json::{json, Value};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use wiremock::matchers::{header, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

pub const DAILY_LIMIT: i64 = 3;

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
    pub auth_server: MockServer,
    pub model_server: MockServer,
    pub search_server: MockServer,
}

pub async fn spawn_app() -> Option<TestApp> {
    let auth_server = MockServer::start().await;
    let model_server = MockServer::start().await;
    let search_server = MockServer::start().await;

    let mut configuration = get_configuration().expect("Failed to get configuration");
    configuration.auth.url = format!("{}/api/auth/session", auth_server.uri());
    configuration.auth.cache_ttl_secs = 0;
    configuration.model.base_url = model_server.uri();
    configuration.model.api_key = Some("test-model-key".to_string());
    configuration.model.max_steps = 4;
    configuration.search.base_url = search_server.uri();
    configuration.search.api_key = Some("test-search-key".to_string());
    configuration.quota.daily_request_limit = DAILY_LIMIT;

    let (address, db_pool) = spawn_app_with_configuration(configuration).await?;

    Some(TestApp {
        address,
        db_pool,
        auth_server,
        model_server,
        search_server,
    })
}

async fn spawn_app_with_configuration(mut configuration: Settings) -> Option<(String, PgPool)> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);
    configuration.database.database_name = uuid::Uuid::new_v4().to_string();

    let connection_pool = match configure_database(&configuration.database).await {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("Skipping tests: failed to connect to postgres: {}", err);
            return None;
        }
    };

    let server = deepsearch::startup::run(listener, connection_pool.clone(), configuration)
        .await
        .expect("Failed to bind address.");
    let _ = tokio::spawn(server);

    Some((address, connection_pool))
}

pub async fn configure_database(config: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    let mut connection = PgConnection::connect(&config.connection_string_without_db()).await?;

    connection
        .execute(format!(r#"CREATE DATABASE "{}""#, config.database_name).as_str())
        .await?;

    let connection_pool = PgPool::connect(&config.connection_string()).await?;

    sqlx::migrate!("./migrations").run(&connection_pool).await?;

    Ok(connection_pool)
}

impl TestApp {
    /// The auth provider answers `token` with a live session for `user_id`.
    pub async fn mount_session(&self, token: &str, user_id: &str) {
        Mock::given(method("GET"))
            .and(path("/api/auth/session"))
            .and(header("authorization", format!("Bearer {}", token).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": { "id": user_id, "email": format!("{}@example.com", user_id) },
                "expires": "2999-01-01T00:00:00.000Z"
            })))
            .mount(&self.auth_server)
            .await;
    }

    pub async fn post_chat(&self, token: Option<&str>, body: &Value) -> reqwest::Response {
        let mut request = reqwest::Client::new()
            .post(&format!("{}/api/chat", &self.address))
            .json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request.")
    }

    pub async fn model_calls(&self) -> usize {
        self.model_server.received_requests().await.unwrap().len()
    }
}

pub async fn create_user(pool: &PgPool, id: &str, is_admin: bool) {
    sqlx::query("INSERT INTO users (id, email, is_admin) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(format!("{}@example.com", id))
        .bind(is_admin)
        .execute(pool)
        .await
        .expect("Failed to insert user");
}

pub async fn insert_requests(pool: &PgPool, user_id: &str, count: usize) {
    for _ in 0..count {
        sqlx::query("INSERT INTO user_requests (id, user_id) VALUES ($1, $2)")
            .bind(uuid::Uuid::new_v4())
            .bind(user_id)
            .execute(pool)
            .await
            .expect("Failed to insert user request");
    }
}

pub async fn count_requests(pool: &PgPool, user_id: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM user_requests WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count user requests")
}

pub fn user_message(id: &str, text: &str) -> Value {
    json!({
        "id": id,
        "role": "user",
        "content": text,
        "parts": [{ "type": "text", "text": text }]
    })
}

pub fn assistant_message(id: &str, text: &str) -> Value {
    json!({
        "id": id,
        "role": "assistant",
        "content": text,
        "parts": [{ "type": "step-start" }, { "type": "text", "text": text }]
    })
}

/// A `text/event-stream` completion body ending in `[DONE]`.
pub fn sse_body(chunks: &[Value]) -> String {
    let mut body: String = chunks
        .iter()
        .map(|chunk| format!("data: {}\n\n", chunk))
        .collect();
    body.push_str("data: [DONE]\n\n");
    body
}

pub fn text_completion(parts: &[&str]) -> ResponseTemplate {
    let mut chunks: Vec<Value> = parts
        .iter()
        .map(|text| json!({ "choices": [{ "index": 0, "delta": { "content": text } }] }))
        .collect();
    chunks.push(json!({ "choices": [{ "index": 0, "delta": {}, "finish_reason": "stop" }] }));
    chunks.push(json!({ "choices": [], "usage": { "prompt_tokens": 12, "completion_tokens": 3 } }));

    ResponseTemplate::new(200).set_body_raw(sse_body(&chunks), "text/event-stream")
}

/// One `searchWeb` call whose arguments arrive in two fragments.
pub fn search_call_completion(call_id: &str, query: &str) -> ResponseTemplate {
    let arguments = json!({ "query": query }).to_string();
    let (head, tail) = arguments.split_at(arguments.len() / 2);
    let chunks = vec![
        json!({ "choices": [{ "index": 0, "delta": { "tool_calls": [{
            "index": 0, "id": call_id, "type": "function",
            "function": { "name": "searchWeb", "arguments": head }
        }] } }] }),
        json!({ "choices": [{ "index": 0, "delta": { "tool_calls": [{
            "index": 0, "function": { "arguments": tail }
        }] } }] }),
        json!({ "choices": [{ "index": 0, "delta": {}, "finish_reason": "tool_calls" }] }),
    ];

    ResponseTemplate::new(200).set_body_raw(sse_body(&chunks), "text/event-stream")
}

/// Matches model requests by whether they already carry a tool result.
pub struct CarriesToolResult(pub bool);

impl Match for CarriesToolResult {
    fn matches(&self, request: &Request) -> bool {
        String::from_utf8_lossy(&request.body).contains("\"tool_call_id\"") == self.0
    }
}

pub async fn mount_model(app: &TestApp, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-model-key"))
        .respond_with(response)
        .mount(&app.model_server)
        .await;
}

/// `(code, payload)` for every line of a data stream body.
pub fn parse_stream(body: &str) -> Vec<(String, Value)> {
    body.lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (code, payload) = line.split_once(':').expect("stream part without a code");
            let payload = serde_json::from_str(payload).expect("stream part is not JSON");
            (code.to_string(), payload)
        })
        .collect()
}
