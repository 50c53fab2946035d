use bytes::Bytes;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The server answered with a status code that is not documented for the endpoint.
    /// Only raised when the client has `raise_on_unexpected_status` enabled.
    #[error("unexpected status code: {} | body: {}", status.as_u16(), String::from_utf8_lossy(content))]
    UnexpectedStatus { status: StatusCode, content: Bytes },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response body for status {status}: {source}")]
    Decode {
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

impl Error {
    /// Status code carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::UnexpectedStatus { status, .. } | Error::Decode { status, .. } => Some(*status),
            Error::Transport(err) => err.status(),
            Error::InvalidHeader(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
