use std::time::Duration;

use async_trait::async_trait;
use chromlm_core::{AnalysisResult, PostUrl};
use reqwest::header::ACCEPT;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::{ClientError, snippet};
use crate::wire::AnalyzeRequest;
use crate::{API_JSON_TARGET, Analyzer, DEFAULT_ANALYZE_URL};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeHttpConfig {
    pub endpoint: Url,
    /// `None` leaves the transport defaults in charge.
    pub timeout: Option<Duration>,
}

impl AnalyzeHttpConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for AnalyzeHttpConfig {
    fn default() -> Self {
        Self::new(Url::parse(DEFAULT_ANALYZE_URL).expect("Invalid default analyze URL"))
    }
}

/// [`Analyzer`] backed by the HTTP analysis service.
#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    client: reqwest::Client,
    cfg: AnalyzeHttpConfig,
}

impl HttpAnalysisClient {
    pub fn new(cfg: AnalyzeHttpConfig) -> Self {
        Self::with_client(reqwest::Client::new(), cfg)
    }

    pub fn with_client(client: reqwest::Client, cfg: AnalyzeHttpConfig) -> Self {
        Self { client, cfg }
    }
}

#[async_trait]
impl Analyzer for HttpAnalysisClient {
    #[instrument(skip(self, url), fields(endpoint = %self.cfg.endpoint, post = %url))]
    async fn analyze(&self, url: &PostUrl) -> Result<AnalysisResult, ClientError> {
        info!("sending analysis request");
        let mut req = self
            .client
            .post(self.cfg.endpoint.clone())
            .header(ACCEPT, "application/json")
            .json(&AnalyzeRequest { url: url.as_str() });
        if let Some(timeout) = self.cfg.timeout {
            req = req.timeout(timeout);
        }

        let resp = req.send().await.map_err(|e| {
            warn!(error = %e, "analysis request failed before a response");
            ClientError::transport(&e)
        })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| ClientError::transport(&e))?;
        debug!(target: API_JSON_TARGET, status = status.as_u16(), "{body}");

        if !status.is_success() {
            warn!(status = status.as_u16(), "analysis service returned an error status");
            return Err(ClientError::HttpStatus {
                status: status.as_u16(),
                url: Some(self.cfg.endpoint.to_string()),
                body_snippet: snippet(&body),
            });
        }

        let result = parse_analysis(&body)?;
        info!(
            verdict = result.verdict.as_ref().map(|v| v.as_str()).unwrap_or("-"),
            certainty = result.certainty_percent(),
            backend_error = result.error.is_some(),
            "analysis response received"
        );
        Ok(result)
    }
}

/// Decodes a success body. The back end's own error sentinel is returned as
/// a result, not an error.
pub fn parse_analysis(body: &str) -> Result<AnalysisResult, ClientError> {
    serde_json::from_str(body).map_err(|e| ClientError::malformed(e.to_string(), body))
}
