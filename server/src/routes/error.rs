//! HTTP error mapping.
//!
//! ERROR HANDLING
//! ==============
//! Every handler returns `Result<_, ApiError>`. Client mistakes keep their
//! message; internal failures are logged here with the real cause and the
//! caller only sees a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use protocol::MessageResponse;

use crate::services::accounts::AccountError;
use crate::services::users::UserStoreError;

pub const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("Unauthorized")]
    Forbidden,
    #[error("{0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the caller.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => INTERNAL_MESSAGE.to_owned(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(cause) = &self {
            tracing::error!(error = %cause, "request failed");
        }
        (self.status(), Json(MessageResponse::new(self.public_message()))).into_response()
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::MissingCredentials | AccountError::InvalidEmail | AccountError::PasswordTooShort => {
                Self::BadRequest(err.to_string())
            }
            AccountError::EmailTaken => Self::Conflict(err.to_string()),
            AccountError::InvalidCredentials => Self::Unauthorized(err.to_string()),
            AccountError::Store(_) | AccountError::Password(_) | AccountError::Worker(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<UserStoreError> for ApiError {
    fn from(err: UserStoreError) -> Self {
        Self::Internal(err.to_string())
    }
}
