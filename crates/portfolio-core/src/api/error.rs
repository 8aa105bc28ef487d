use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {}", .message.as_deref().unwrap_or("token may be expired"))]
    Unauthorized { message: Option<String> },

    #[error("Request rejected ({status}): {}", .message.as_deref().unwrap_or("no details"))]
    Rejected { status: u16, message: Option<String> },

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    /// `message` is the service's own text; `body` the raw reply when it had none
    #[error("Server error ({status}): {}", server_detail(.message, .body))]
    ServerError {
        status: u16,
        message: Option<String>,
        body: Option<String>,
    },

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    NetworkError(#[source] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

fn server_detail<'a>(message: &'a Option<String>, body: &'a Option<String>) -> &'a str {
    message.as_deref().or(body.as_deref()).unwrap_or("no details")
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error payload shapes the service answers with.
/// Auth routes use `msg`, validation failures use `error`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::NetworkError(err)
        }
    }
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let cut = (0..=MAX_ERROR_BODY_LENGTH)
                .rev()
                .find(|&i| body.is_char_boundary(i))
                .unwrap_or(0);
            format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
        }
    }

    /// Pull the human-readable message out of an error body, if there is one.
    fn extract_message(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        parsed
            .msg
            .or(parsed.error)
            .or(parsed.message)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::extract_message(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized { message },
            429 => ApiError::RateLimited,
            code @ 500..=599 => ApiError::ServerError {
                status: code,
                body: (message.is_none() && !body.trim().is_empty())
                    .then(|| Self::truncate_body(body)),
                message,
            },
            code => ApiError::Rejected { status: code, message },
        }
    }

    /// HTTP status code, when the failure came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::RateLimited => Some(429),
            ApiError::Rejected { status, .. } | ApiError::ServerError { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Message the service supplied for the user, unchanged
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { message }
            | ApiError::Rejected { message, .. }
            | ApiError::ServerError { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_unauthorized_keeps_msg() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, r#"{"msg": "Invalid credentials"}"#);
        assert!(err.is_unauthorized());
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.server_message(), Some("Invalid credentials"));
    }

    #[test]
    fn test_from_status_reads_error_key() {
        let err = ApiError::from_status(StatusCode::CONFLICT, r#"{"error": "Email already exists"}"#);
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.server_message(), Some("Email already exists"));
    }

    #[test]
    fn test_from_status_without_body() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, "");
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.server_message(), None);

        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, "not json");
        assert!(err.is_unauthorized());
        assert_eq!(err.server_message(), None);
    }

    #[test]
    fn test_from_status_rate_limited_and_server() {
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(err.status(), Some(502));
        // A raw body is logged but never shown to the user
        assert_eq!(err.server_message(), None);
        assert!(err.to_string().contains("upstream down"));
    }

    #[test]
    fn test_from_status_server_error_keeps_msg() {
        let err = ApiError::from_status(
            StatusCode::SERVICE_UNAVAILABLE,
            r#"{"msg": "Service in maintenance"}"#,
        );
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.server_message(), Some("Service in maintenance"));
        assert_eq!(err.to_string(), "Server error (503): Service in maintenance");
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.ends_with("(truncated, 520 total bytes)"));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }

    #[test]
    fn test_blank_message_is_ignored() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, r#"{"msg": "  "}"#);
        assert_eq!(err.server_message(), None);
    }
}
