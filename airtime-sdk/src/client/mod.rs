//! HTTP client for the AirtimePlus backend.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.

mod backend;

pub use backend::{BackendClient, DEFAULT_API_BASE};

use reqwest::StatusCode;

/// Errors produced by the backend HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api {
        status: StatusCode,
        /// The `error` field of the JSON body, when present.
        error: Option<String>,
        body: String,
    },

    /// A successful response carried a body that does not match the
    /// expected shape.
    #[error("malformed response body (status {status}): {source}")]
    Decode {
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// HTTP status of the failed response, if the request got that far.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } | ClientError::Decode { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }

    /// Message the backend attached to its error response.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Api { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    /// True when the backend could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        match self {
            ClientError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }
}
