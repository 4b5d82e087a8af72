use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use kvdrop_store::StoreError;
use kvdrop_types::{Digest, Identifier};

pub const INVALID_INPUT_BODY: &str = "Invalid Parameters (data)";
pub const NOT_FOUND_BODY: &str = "This key don't exist on KV namespace (KV_KEY_DONT_EXIST)";
pub const PAYLOAD_TOO_LARGE_BODY: &str = "Payload Too Large";
pub const CORRUPT_ENTRY_BODY: &str = "Stored entry is corrupt";
pub const STORE_UNAVAILABLE_BODY: &str = "Backing store unavailable";
pub const INTERNAL_BODY: &str = "Internal Server Error";

#[derive(Debug, Error)]
pub enum ServerError {
    /// The upload carried no usable `data` field.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("payload exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("no blob stored under {0:?}")]
    NotFound(String),

    #[error("identifier {id} already holds {existing}, refusing {incoming}")]
    Collision {
        id: Identifier,
        existing: Digest,
        incoming: Digest,
    },

    #[error("corrupt entry {id}: {reason}")]
    CorruptEntry { id: Identifier, reason: String },

    #[error("backing store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StoreError::CorruptEntry { id, reason } => Self::CorruptEntry { id, reason },
            StoreError::Collision {
                id,
                existing,
                incoming,
            } => Self::Collision {
                id,
                existing,
                incoming,
            },
            StoreError::Io(e) => Self::Internal(e.to_string()),
        }
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Collision { .. } => StatusCode::CONFLICT,
            Self::CorruptEntry { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Plain-text body sent to the client. Details stay in the logs.
    pub fn body(&self) -> String {
        match self {
            Self::InvalidInput(_) => INVALID_INPUT_BODY.into(),
            Self::PayloadTooLarge { .. } => PAYLOAD_TOO_LARGE_BODY.into(),
            Self::NotFound(_) => NOT_FOUND_BODY.into(),
            Self::Collision { id, .. } => format!("Resource identifier collision ({id})"),
            Self::CorruptEntry { .. } => CORRUPT_ENTRY_BODY.into(),
            Self::StoreUnavailable(_) => STORE_UNAVAILABLE_BODY.into(),
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => INTERNAL_BODY.into(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, self.body()).into_response()
    }
}
