use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::{error, warn};
use settlement_engine::{ErrorKind, SettlementError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server.")]
    BackendError,
    #[error("The service is temporarily unavailable. Please try again shortly.")]
    ServiceUnavailable,
    #[error("The request conflicts with data already stored.")]
    DataConflict,
    #[error("{0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    Conflict(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::DataConflict => StatusCode::CONFLICT,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

/// Business rule errors keep their message. Store and internal failures are logged here and reach the client only as
/// a generic message.
impl From<SettlementError> for ServerError {
    fn from(e: SettlementError) -> Self {
        match e.kind() {
            ErrorKind::Validation => Self::InvalidRequestBody(e.to_string()),
            ErrorKind::Integrity => {
                warn!("💻️ Store constraint rejected a request. {e}");
                Self::DataConflict
            },
            ErrorKind::NotFound => Self::NoRecordFound(e.to_string()),
            ErrorKind::Conflict => Self::Conflict(e.to_string()),
            ErrorKind::Transient => {
                error!("💻️ Transient backend failure. {e}");
                Self::ServiceUnavailable
            },
            ErrorKind::Downstream | ErrorKind::Internal => {
                error!("💻️ Backend failure. {e}");
                Self::BackendError
            },
        }
    }
}
