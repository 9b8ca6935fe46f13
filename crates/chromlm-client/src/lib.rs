//! Client for the external `/analyze/` service.
//!
//! One POST per call, body `{"url": "<post url>"}`, no caching and no
//! retry. The response body is handed back as an [`AnalysisResult`] without
//! interpretation: an error sentinel from the back end is still a success at
//! this layer.

pub mod error;
pub mod http;
pub mod wire;

pub use error::ClientError;
pub use http::{AnalyzeHttpConfig, HttpAnalysisClient};

use async_trait::async_trait;
use chromlm_core::{AnalysisResult, PostUrl};

/// The default analysis endpoint of a locally running back end.
pub const DEFAULT_ANALYZE_URL: &str = "http://127.0.0.1:8000/analyze/";

/// Target used for raw response bodies, routed to their own log file.
pub const API_JSON_TARGET: &str = "api_json";

/// Produces a verdict for a post.
///
/// Callers validate the URL before calling; implementors do not re-check it.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, url: &PostUrl) -> Result<AnalysisResult, ClientError>;
}

#[async_trait]
impl<T: Analyzer + ?Sized> Analyzer for std::sync::Arc<T> {
    async fn analyze(&self, url: &PostUrl) -> Result<AnalysisResult, ClientError> {
        (**self).analyze(url).await
    }
}
