use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network request failed: {0}")]
    Transport(String),
    #[error("session expired or not authorized")]
    Unauthorized,
    #[error("server returned {status}: {message}")]
    Status {
        status: u16,
        code: ErrorCode,
        message: String,
    },
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("credential store failure: {0}")]
    Credentials(#[source] anyhow::Error),
}

impl ClientError {
    /// Classifies by the HTTP status alone; the `statusCode` a body reports is
    /// informational.
    pub fn from_api_error(status: u16, body: ApiError) -> Self {
        if status == 401 {
            return ClientError::Unauthorized;
        }
        ClientError::Status {
            status,
            code: ErrorCode::from_status(status),
            message: body.message,
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Unauthorized => Some(ErrorCode::Unauthorized),
            ClientError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ClientError::Decode(err.to_string());
        }
        if let Some(status) = err.status() {
            if status.as_u16() == 401 {
                return ClientError::Unauthorized;
            }
            return ClientError::Status {
                status: status.as_u16(),
                code: ErrorCode::from_status(status.as_u16()),
                message: err.to_string(),
            };
        }
        ClientError::Transport(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::Validation(format!("invalid api url: {err}"))
    }
}
