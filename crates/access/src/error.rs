use thiserror::Error;

/// Errors raised while talking to a blockchain access service.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("unknown network: {0}")]
    UnknownNetwork(String),
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("url error: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },
    #[error("decode error: {0}")]
    Decode(String),
}

impl AccessError {
    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        AccessError::Decode(msg.into())
    }

    pub(crate) fn server(status: u16, message: impl Into<String>) -> Self {
        AccessError::Server {
            status,
            message: message.into(),
        }
    }
}
