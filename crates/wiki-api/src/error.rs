use std::fmt;

use axum::http::StatusCode;
use thiserror::Error;

/// Body of every 5xx response, whatever the cause.
pub const INTERNAL_ERROR_TEXT: &str = "Internal Server error.";
pub const UNAUTHORIZED_TEXT: &str = "You are unauthorized.";

/// An error that already knows which status the client should see.
#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    pub cause: Option<anyhow::Error>,
}

impl HttpError {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            cause: None,
        }
    }

    pub fn with_cause(status: StatusCode, cause: impl Into<anyhow::Error>) -> Self {
        Self {
            status,
            cause: Some(cause.into()),
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "status {}, reason {:#}", self.status.as_u16(), cause),
            None => write!(f, "status {}", self.status.as_u16()),
        }
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

/// What every handler returns on failure.
///
/// `Http` carries an explicit status. Anything else is `Internal`: logged in
/// full, answered with a bare 500.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Error {
    pub fn status(status: StatusCode) -> Self {
        HttpError::new(status).into()
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        HttpError::with_cause(StatusCode::BAD_REQUEST, anyhow::Error::msg(reason.into())).into()
    }

    pub fn unauthorized() -> Self {
        Self::status(StatusCode::UNAUTHORIZED)
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        HttpError::with_cause(StatusCode::FORBIDDEN, anyhow::Error::msg(reason.into())).into()
    }

    pub fn not_found() -> Self {
        Self::status(StatusCode::NOT_FOUND)
    }

    pub fn method_not_allowed() -> Self {
        Self::status(StatusCode::METHOD_NOT_ALLOWED)
    }

    pub fn payload_too_large() -> Self {
        Self::status(StatusCode::PAYLOAD_TOO_LARGE)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Http(e) => e.status,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show the client. Server-side causes never leak.
    pub fn public_message(&self) -> String {
        let status = self.status_code();
        if status.is_server_error() {
            return INTERNAL_ERROR_TEXT.to_string();
        }
        if status == StatusCode::UNAUTHORIZED {
            return UNAUTHORIZED_TEXT.to_string();
        }
        match self {
            Error::Http(HttpError {
                cause: Some(cause), ..
            }) => cause.to_string(),
            _ => format!("{}.", status.canonical_reason().unwrap_or("Error")),
        }
    }
}

impl From<wiki_db::Error> for Error {
    fn from(err: wiki_db::Error) -> Self {
        use wiki_db::Error as DbError;

        if err.is_not_found() {
            return Error::not_found();
        }
        match err {
            DbError::Begin(_) | DbError::TransactionFailed(_) | DbError::TransactionPanicked(_) => {
                HttpError::with_cause(StatusCode::INTERNAL_SERVER_ERROR, err).into()
            }
            other => Error::Internal(other.into()),
        }
    }
}
