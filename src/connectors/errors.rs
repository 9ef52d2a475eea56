use std::fmt;

/// Errors that can occur during external service communication
#[derive(Debug)]
pub enum ConnectorError {
    /// HTTP request/response error
    HttpError(String),
    /// Service unreachable or timeout
    ServiceUnavailable(String),
    /// Invalid response format from external service
    InvalidResponse(String),
    /// Authentication error (401/403)
    Unauthorized(String),
    /// Rate limited or exceeded quota
    RateLimited(String),
    /// Internal error in connector
    Internal(String),
}

impl ConnectorError {
    /// Maps a non-success upstream status to the matching variant.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let details = format!("HTTP {} - {}", status, body);
        match status.as_u16() {
            401 | 403 => Self::Unauthorized(details),
            429 => Self::RateLimited(details),
            502..=504 => Self::ServiceUnavailable(details),
            _ => Self::HttpError(details),
        }
    }
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            Self::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            Self::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            Self::RateLimited(msg) => write!(f, "Rate limited: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ConnectorError {}

impl From<reqwest::Error> for ConnectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::ServiceUnavailable(format!("Request timeout: {}", err))
        } else if err.is_connect() {
            Self::ServiceUnavailable(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_statuses_map_to_variants() {
        assert!(matches!(
            ConnectorError::from_status(reqwest::StatusCode::UNAUTHORIZED, ""),
            ConnectorError::Unauthorized(_)
        ));
        assert!(matches!(
            ConnectorError::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS, ""),
            ConnectorError::RateLimited(_)
        ));
        assert!(matches!(
            ConnectorError::from_status(reqwest::StatusCode::BAD_GATEWAY, ""),
            ConnectorError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            ConnectorError::from_status(reqwest::StatusCode::BAD_REQUEST, "bad"),
            ConnectorError::HttpError(_)
        ));
    }

    #[test]
    fn display_names_the_failure() {
        let err = ConnectorError::RateLimited("slow down".to_string());
        assert_eq!(err.to_string(), "Rate limited: slow down");
    }
}
