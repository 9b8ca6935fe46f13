use chromlm_error::{BODY_SNIPPET_MAX, truncate_for_error};
use thiserror::Error;

/// Failures of a single analysis round trip.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// No response at all: refused connection, DNS failure, transport timeout.
    #[error("Network request failed: {message}")]
    Transport {
        message: String,
        url: Option<String>,
        is_timeout: bool,
    },

    /// The service answered with a non-success status code.
    #[error("API error: {status}")]
    HttpStatus {
        status: u16,
        url: Option<String>,
        /// Truncated body snippet for diagnostics.
        body_snippet: Option<String>,
    },

    /// The body was not a JSON analysis result.
    #[error("Failed to parse API response: {message}")]
    MalformedResponse {
        message: String,
        body_snippet: Option<String>,
    },
}

impl ClientError {
    pub(crate) fn transport(err: &reqwest::Error) -> Self {
        ClientError::Transport {
            message: err.to_string(),
            url: err.url().map(|u| u.to_string()),
            is_timeout: err.is_timeout(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>, body: &str) -> Self {
        ClientError::MalformedResponse {
            message: message.into(),
            body_snippet: snippet(body),
        }
    }
}

pub(crate) fn snippet(body: &str) -> Option<String> {
    (!body.trim().is_empty()).then(|| truncate_for_error(body, BODY_SNIPPET_MAX))
}

impl From<ClientError> for chromlm_error::Error {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Transport {
                message,
                url,
                is_timeout,
            } => chromlm_error::Error::Transport {
                message,
                url,
                is_timeout,
            },
            ClientError::HttpStatus {
                status,
                url,
                body_snippet,
            } => chromlm_error::Error::HttpStatus {
                status,
                url,
                body_snippet,
            },
            ClientError::MalformedResponse {
                message,
                body_snippet,
            } => chromlm_error::Error::MalformedResponse {
                message,
                body_snippet,
            },
        }
    }
}
