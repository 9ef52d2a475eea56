use crate::configuration::Settings;
use crate::forms;
use crate::middleware::authentication::{get_header, SessionCache};
use crate::models;
use actix_web::{dev::ServiceRequest, web, HttpMessage};
use reqwest::header::ACCEPT;
use std::sync::Arc;

fn try_extract_token(authentication: String) -> Result<String, String> {
    let mut authentication_parts = authentication.splitn(2, ' ');
    match authentication_parts.next() {
        Some("Bearer") => {}
        _ => return Err("Bearer missing scheme".to_string()),
    }

    match authentication_parts.next().map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => {
            tracing::error!("Bearer token is missing");
            Err("Authentication required".to_string())
        }
    }
}

#[tracing::instrument(name = "Authenticate with bearer token", skip(req))]
pub async fn try_bearer(req: &mut ServiceRequest) -> Result<bool, String> {
    let authentication = match get_header::<String>(req, "authorization")? {
        Some(value) => value,
        None => return Ok(false),
    };

    let token = match try_extract_token(authentication) {
        Ok(token) => token,
        Err(err) => {
            tracing::debug!(error = %err, "Ignoring unusable authorization header");
            return Ok(false);
        }
    };

    match resolve_session(req, token).await {
        Ok(session) => {
            attach_session(req, session)?;
            Ok(true)
        }
        Err(err) => {
            tracing::info!(error = %err, "Bearer token did not resolve to a session");
            Ok(false)
        }
    }
}

/// Looks the token up in the cache, falling back to the auth provider.
pub(super) async fn resolve_session(
    req: &ServiceRequest,
    token: String,
) -> Result<models::Session, String> {
    let settings = req
        .app_data::<web::Data<Settings>>()
        .ok_or("settings are not configured")?;
    let http_client = req
        .app_data::<web::Data<reqwest::Client>>()
        .ok_or("http client is not configured")?;
    let cache = req
        .app_data::<web::Data<SessionCache>>()
        .ok_or("session cache is not configured")?;

    if let Some(session) = cache.get(&token).await {
        return Ok(session);
    }

    let session = fetch_session(http_client.get_ref(), settings.auth.url.as_str(), &token).await?;
    cache.insert(token, session.clone()).await;
    tracing::debug!(user_id = %session.user_id, "Session resolved by the auth provider");

    Ok(session)
}

pub(super) fn attach_session(req: &mut ServiceRequest, session: models::Session) -> Result<(), String> {
    if req.extensions_mut().insert(Arc::new(session)).is_some() {
        return Err("session already attached".to_string());
    }
    Ok(())
}

pub async fn fetch_session(
    client: &reqwest::Client,
    auth_url: &str,
    token: &str,
) -> Result<models::Session, String> {
    let resp = client
        .get(auth_url)
        .bearer_auth(token)
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|err| {
            tracing::error!(target: "auth", error = %err, "Session request failed");
            "No response from auth server".to_string()
        })?;

    if !resp.status().is_success() {
        tracing::debug!(target: "auth", status = %resp.status(), "Session rejected");
        return Err("401 Unauthorized".to_string());
    }

    resp.json::<forms::SessionForm>()
        .await
        .map_err(|_err| "no active session".to_string())?
        .into_session(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(try_extract_token("Bearer abc".to_string()).unwrap(), "abc");
    }

    #[test]
    fn rejects_other_schemes_and_empty_tokens() {
        assert!(try_extract_token("Basic abc".to_string()).is_err());
        assert!(try_extract_token("Bearer".to_string()).is_err());
        assert!(try_extract_token("Bearer   ".to_string()).is_err());
    }
}
