use pulse_common::model::ModelValidationError;
use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Error constructing HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Server unreachable: {0}")]
    Offline(#[source] reqwest::Error),
    #[error("Not signed in, or the session expired")]
    Unauthorized,
    #[error("Not allowed to access {path}")]
    Forbidden { path: String },
    #[error("{path} does not exist")]
    NotFound { path: String },
    #[error("Server error {status} on {path}")]
    Server { status: StatusCode, path: String },
    #[error("Unexpected status {status} on {path}")]
    UnexpectedStatus { status: StatusCode, path: String },
    #[error("Response was not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Response contained an invalid object: {0}")]
    Data(#[from] ModelValidationError),
    #[error("{0}")]
    Validation(String),
    #[error("This action requires a signed-in user")]
    NotSignedIn,
}

/// Coarse failure classes a view chooses its message by.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum ErrorKind {
    Offline,
    Unauthorized,
    Forbidden,
    NotFound,
    Server,
    Invalid,
}

impl ApiError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Offline(_) => ErrorKind::Offline,
            ApiError::Unauthorized | ApiError::NotSignedIn => ErrorKind::Unauthorized,
            ApiError::Forbidden { .. } => ErrorKind::Forbidden,
            ApiError::NotFound { .. } => ErrorKind::NotFound,
            ApiError::Server { .. } => ErrorKind::Server,
            ApiError::Client(_)
            | ApiError::UnexpectedStatus { .. }
            | ApiError::Decode(_)
            | ApiError::Data(_)
            | ApiError::Validation(_) => ErrorKind::Invalid,
        }
    }

    pub(crate) fn from_status(status: StatusCode, path: &str) -> Self {
        let path = path.to_owned();
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::FORBIDDEN => ApiError::Forbidden { path },
            StatusCode::NOT_FOUND => ApiError::NotFound { path },
            status if status.is_server_error() => ApiError::Server { status, path },
            status => ApiError::UnexpectedStatus { status, path },
        }
    }
}
