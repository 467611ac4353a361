use reqwest::StatusCode;

/// Message carried by [`ApiError::SessionExpired`].
pub const SESSION_EXPIRED: &str = "Sessão expirada";

/// Notification shown to the user when the session ends.
pub const SESSION_EXPIRED_NOTICE: &str = "Sessão expirada. Faça login novamente.";

/// Errors returned by the request wrapper.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 401/403: the token was rejected and the session has been ended.
    #[error("Sessão expirada")]
    SessionExpired,

    /// Any other non-2xx response.
    #[error("{message}")]
    Request { status: StatusCode, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body was not valid JSON for the expected type.
    #[error("invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request body could not be serialized.
    #[error("could not encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// A typed call expected a body but the server sent none.
    #[error("response had no body")]
    EmptyBody,

    #[error("invalid URL '{0}'")]
    InvalidUrl(String),

    /// A login, refresh or OAuth callback did not yield a token.
    #[error("no session token in {0}")]
    MissingToken(String),

    #[error("token storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status behind the error, when one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Request { status, .. } => Some(*status),
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_expired_message() {
        let err = ApiError::SessionExpired;
        assert_eq!(err.to_string(), SESSION_EXPIRED);
        assert!(err.is_session_expired());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn request_error_displays_server_message() {
        let err = ApiError::Request {
            status: StatusCode::CONFLICT,
            message: "Horário indisponível".into(),
        };
        assert_eq!(err.to_string(), "Horário indisponível");
        assert_eq!(err.status(), Some(StatusCode::CONFLICT));
        assert!(!err.is_session_expired());
    }

    #[test]
    fn encode_error_names_the_request_body() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ApiError::Encode(source);
        assert!(err.to_string().starts_with("could not encode request body"));
    }
}
