use crate::configuration::Settings;
use crate::connectors;
use crate::middleware;
use crate::routes;
use actix_cors::Cors;
use actix_web::{dev::Server, web, App, HttpServer};
use sqlx::{Pool, Postgres};
use std::net::TcpListener;
use std::time::Duration;
use tracing_actix_web::TracingLogger;

/// Chat bodies carry the whole conversation.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

fn to_io_error<E: std::fmt::Display>(err: E) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
}

pub async fn run(
    listener: TcpListener,
    pg_pool: Pool<Postgres>,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let settings = web::Data::new(settings);
    let pg_pool = web::Data::new(pg_pool);

    let auth_http_client = reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(to_io_error)?;
    let auth_http_client = web::Data::new(auth_http_client);

    let session_cache = web::Data::new(middleware::authentication::SessionCache::new(
        Duration::from_secs(settings.auth.cache_ttl_secs),
    ));

    let model_connector = connectors::init_model_service(&settings.model).map_err(to_io_error)?;
    let search_connector =
        connectors::init_search_service(&settings.search).map_err(to_io_error)?;

    let payload_config = web::PayloadConfig::new(MAX_BODY_BYTES);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(middleware::authentication::Manager::new())
            .wrap(Cors::permissive())
            .service(web::scope("/health_check").service(routes::health_check))
            .service(
                web::scope("/api")
                    .service(routes::chat::stream::handler)
                    .service(routes::chat::get::list)
                    .service(routes::chat::get::item),
            )
            .app_data(payload_config.clone())
            .app_data(pg_pool.clone())
            .app_data(auth_http_client.clone())
            .app_data(session_cache.clone())
            .app_data(model_connector.clone())
            .app_data(search_connector.clone())
            .app_data(settings.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
