use actix_web::dev::ServiceRequest;

/// No credentials at all; handlers decide whether that is acceptable.
#[tracing::instrument(name = "authenticate as anonym", skip(req))]
pub fn anonym(req: &mut ServiceRequest) -> Result<bool, String> {
    tracing::debug!(path = %req.path(), "Request carries no session");
    Ok(true)
}
