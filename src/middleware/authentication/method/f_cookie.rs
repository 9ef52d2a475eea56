use crate::middleware::authentication::get_header;

use actix_web::dev::ServiceRequest;

/// Session cookies in lookup order.
const SESSION_COOKIES: [&str; 5] = [
    "session_token",
    "__Secure-authjs.session-token",
    "authjs.session-token",
    "__Secure-next-auth.session-token",
    "next-auth.session-token",
];

fn find_session_token(cookies: &str) -> Option<String> {
    let pairs: Vec<(&str, &str)> = cookies
        .split(';')
        .filter_map(|cookie| cookie.trim().split_once('='))
        .filter(|(_, value)| !value.is_empty())
        .collect();

    SESSION_COOKIES.iter().find_map(|name| {
        pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.to_string())
    })
}

#[tracing::instrument(name = "Authenticate with cookie", skip(req))]
pub async fn try_cookie(req: &mut ServiceRequest) -> Result<bool, String> {
    let cookies = match get_header::<String>(req, "cookie")? {
        Some(value) => value,
        None => return Ok(false),
    };

    let token = match find_session_token(&cookies) {
        Some(token) => token,
        None => return Ok(false),
    };
    tracing::debug!("Found session token in cookies");

    match super::f_bearer::resolve_session(req, token).await {
        Ok(session) => {
            super::f_bearer::attach_session(req, session)?;
            Ok(true)
        }
        Err(err) => {
            tracing::info!(error = %err, "Session cookie did not resolve to a session");
            Ok(false)
        }
    }
}
