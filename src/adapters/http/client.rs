use crate::domain::graph::{BranchExpansion, CallFlowGraph};
use crate::domain::ports::{BranchExpandRequest, BranchExpander, CallFlowRequest, CallFlowSource};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const CALL_FLOW_PATH: &str = "/api/callflow";
const EXPAND_BRANCH_PATH: &str = "/api/callflow/expand-branch";

/// Client for the remote analysis service that owns the call-flow queries
pub struct AnalysisServiceClient {
    base_url: String,
    http: reqwest::Client,
}

impl AnalysisServiceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "analysis service request");

        let res = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow!(
                "{url} returned {status}: {}",
                error_detail(&text)
            ));
        }

        res.json::<T>()
            .await
            .with_context(|| format!("Invalid response body from {url}"))
    }
}

/// Pull `detail` or `error` out of a JSON error body, falling back to the raw text
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("detail")
                .or_else(|| v.get("error"))
                .map(|d| match d {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl CallFlowSource for AnalysisServiceClient {
    async fn call_flow(&self, request: &CallFlowRequest) -> Result<CallFlowGraph> {
        self.post(CALL_FLOW_PATH, request).await
    }
}

#[async_trait]
impl BranchExpander for AnalysisServiceClient {
    async fn expand(&self, request: &BranchExpandRequest) -> Result<BranchExpansion> {
        self.post(EXPAND_BRANCH_PATH, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail() {
        assert_eq!(error_detail(r#"{"detail": "no such function"}"#), "no such function");
        assert_eq!(error_detail(r#"{"error": {"code": 3}}"#), r#"{"code":3}"#);
        assert_eq!(error_detail("  gateway down \n"), "gateway down");
    }

    #[test]
    fn test_base_url_is_normalized() {
        let c = AnalysisServiceClient::new("http://localhost:8000/", Duration::from_secs(5)).unwrap();
        assert_eq!(c.base_url(), "http://localhost:8000");
    }
}
