pub mod severity;

pub use severity::Severity;

use std::path::PathBuf;
use std::sync::Arc;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Largest body excerpt kept on an error, in bytes.
pub const BODY_SNIPPET_MAX: usize = 2_000;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The address is not an Instagram post; rejected before any I/O.
    #[error("Not an Instagram post URL: {url}")]
    InvalidUrl { url: String },

    /// The request never produced a response (refused, DNS, transport timeout).
    #[error("Network request failed: {message}")]
    Transport {
        message: String,
        url: Option<String>,
        is_timeout: bool,
    },

    /// A response arrived with a non-success status code.
    #[error("API error: {status}")]
    HttpStatus {
        status: u16,
        url: Option<String>,
        body_snippet: Option<String>,
    },

    /// The response body could not be decoded as an analysis result.
    #[error("Failed to parse API response: {message}")]
    MalformedResponse {
        message: String,
        body_snippet: Option<String>,
    },

    /// The back end answered but declined to produce a verdict.
    #[error("{0}")]
    BackendReported(String),

    #[error("Storage operation {operation} failed for {path}: {source}")]
    Storage {
        operation: &'static str,
        path: PathBuf,
        source: Arc<std::io::Error>,
    },

    #[error("Stored record `{key}` could not be {action}: {message}")]
    Serialization {
        key: String,
        action: &'static str,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Error::InvalidUrl { url: url.into() }
    }

    pub fn storage(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Storage {
            operation,
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Error::InvalidUrl { .. } | Error::BackendReported(_) => Severity::Warning,
            Error::Transport { .. }
            | Error::HttpStatus { .. }
            | Error::MalformedResponse { .. }
            | Error::Storage { .. }
            | Error::Serialization { .. } => Severity::Error,
            Error::Config(_) => Severity::Fatal,
        }
    }

    /// Whether a manual retry of the same request can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Transport { .. }
                | Error::HttpStatus { .. }
                | Error::MalformedResponse { .. }
                | Error::BackendReported(_)
        )
    }

    /// Returns a diagnostic string with contextual fields for log surfaces.
    pub fn diagnostic(&self) -> String {
        match self {
            Error::Transport {
                message,
                url,
                is_timeout,
            } => {
                let mut msg = format!("Network request failed: {message}");
                if let Some(u) = url {
                    msg.push_str(&format!("\nurl: {u}"));
                }
                if *is_timeout {
                    msg.push_str("\ncontext: timed out");
                }
                msg
            }
            Error::HttpStatus {
                status,
                url,
                body_snippet,
            } => {
                let mut msg = format!("API error: {status}");
                if let Some(u) = url {
                    msg.push_str(&format!("\nurl: {u}"));
                }
                if let Some(snippet) = body_snippet {
                    msg.push_str("\nbody excerpt: ");
                    msg.push_str(snippet);
                }
                msg
            }
            Error::MalformedResponse {
                message,
                body_snippet,
            } => {
                let mut msg = format!("Failed to parse API response: {message}");
                if let Some(snippet) = body_snippet {
                    msg.push_str("\nbody excerpt: ");
                    msg.push_str(snippet);
                }
                msg
            }
            other => other.to_string(),
        }
    }
}

/// Truncate large response bodies so error strings remain bounded.
pub fn truncate_for_error(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let head_end = floor_char_boundary(s, max.saturating_sub(200));
    let tail_start = ceil_char_boundary(s, s.len().saturating_sub(200));
    format!("{}…<snip>…{}", &s[..head_end], &s[tail_start..])
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedResponse {
            message: err.to_string(),
            body_snippet: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_message_carries_code() {
        let err = Error::HttpStatus {
            status: 500,
            url: None,
            body_snippet: Some("internal".into()),
        };
        assert_eq!(err.to_string(), "API error: 500");
        assert!(err.diagnostic().contains("body excerpt: internal"));
        assert!(err.is_retryable());
    }

    #[test]
    fn backend_reported_is_verbatim() {
        let err = Error::BackendReported("Could not fetch post".into());
        assert_eq!(err.to_string(), "Could not fetch post");
        assert_eq!(err.severity(), Severity::Warning);
    }

    #[test]
    fn invalid_url_is_not_retryable() {
        let err = Error::invalid_url("not a url");
        assert!(!err.is_retryable());
        assert_eq!(err.severity(), Severity::Warning);
    }

    #[test]
    fn truncation_keeps_head_and_tail() {
        let body = "a".repeat(500) + &"z".repeat(500);
        let out = truncate_for_error(&body, 400);
        assert!(out.starts_with("aaaa"));
        assert!(out.ends_with("zzzz"));
        assert!(out.contains("<snip>"));
        assert_eq!(truncate_for_error("short", 400), "short");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let body = "é".repeat(1_000);
        let out = truncate_for_error(&body, 401);
        assert!(out.contains("<snip>"));
    }
}
