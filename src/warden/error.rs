//! Error taxonomy shared by every flow.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a core operation.
///
/// Each variant maps to one stable code and one status class. Authentication
/// failures carry no detail so callers cannot tell which factor was wrong.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    Unauthorized,
    #[error("insufficient role")]
    Forbidden,
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("upstream failure: {0}")]
    Upstream(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::BadRequest(_) => "bad_request",
            Self::Upstream(_) => "upstream_failure",
            Self::Internal(_) => "internal",
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller. Internal details stay in the logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn codes_and_statuses_are_stable() {
        let cases = [
            (AuthError::Unauthorized, "unauthorized", 401),
            (AuthError::Forbidden, "forbidden", 403),
            (AuthError::Conflict("dup".into()), "conflict", 409),
            (AuthError::BadRequest("bad".into()), "bad_request", 400),
            (AuthError::Upstream("timeout".into()), "upstream_failure", 502),
            (AuthError::Internal(anyhow!("boom")), "internal", 500),
        ];
        for (err, code, status) in cases {
            assert_eq!(err.code(), code);
            assert_eq!(err.status_code().as_u16(), status);
        }
    }

    #[test]
    fn internal_details_are_not_public() {
        let err = AuthError::Internal(anyhow!("connection refused to 10.0.0.1"));
        assert_eq!(err.public_message(), "internal error");
        assert!(err.to_string().contains("10.0.0.1"));
    }

    #[test]
    fn unauthorized_message_is_generic() {
        assert_eq!(AuthError::Unauthorized.public_message(), "invalid credentials");
    }
}
