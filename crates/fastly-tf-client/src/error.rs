use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("{operation}: request failed: {source}")]
    Http {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation}: HTTP {status}: {message}")]
    Api {
        operation: &'static str,
        status: u16,
        message: String,
    },

    #[error("{operation}: decode response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{operation}: {message}")]
    InvalidInput {
        operation: &'static str,
        message: String,
    },
}

impl ClientError {
    /// True when the API answered 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { status: 404, .. })
    }
}
