//! Client for the external fix-pattern memory service, shaped after the
//! teacher's `infrastructure::claude::client` HTTP-client idiom: a thin
//! `reqwest::Client` wrapper, bearer auth, JSON request/response bodies.

use async_trait::async_trait;

use crate::domain::errors::MemoryError;
use crate::domain::models::{FixRecord, FixRecordHit};
use crate::domain::ports::FixMemory;

/// Talks to a configured memory service over HTTP. Construction requires
/// both `base_url` and `token`; callers that have neither should use
/// `NullFixMemory` instead of constructing this with empty strings.
pub struct HttpFixMemory {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpFixMemory {
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into(), token: token.into() }
    }
}

#[async_trait]
impl FixMemory for HttpFixMemory {
    async fn search(
        &self,
        container_tag: &str,
        query: &str,
        limit: u32,
        category: Option<&str>,
        min_score: Option<f64>,
    ) -> Result<Vec<FixRecordHit>, MemoryError> {
        let mut body = serde_json::json!({
            "container_tag": container_tag,
            "query": query,
            "limit": limit,
        });
        if let Some(category) = category {
            body["metadata_filter"] = serde_json::json!({ "error_category": category });
        }
        if let Some(min_score) = min_score {
            body["threshold"] = serde_json::json!(min_score);
        }

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| MemoryError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MemoryError::ApiError(body));
        }

        #[derive(serde::Deserialize)]
        struct SearchResponse {
            hits: Vec<FixRecordHit>,
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| MemoryError::ApiError(e.to_string()))?;
        Ok(parsed.hits)
    }

    async fn store(&self, record: FixRecord) -> Result<(), MemoryError> {
        let response = self
            .client
            .post(format!("{}/store", self.base_url))
            .bearer_auth(&self.token)
            .json(&record)
            .send()
            .await
            .map_err(|e| MemoryError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MemoryError::ApiError(body));
        }

        Ok(())
    }
}

/// No-op implementation used when the memory service is not configured,
/// so services can depend on `FixMemory` unconditionally rather than
/// branching on an `Option<Box<dyn FixMemory>>` everywhere they call it.
pub struct NullFixMemory;

#[async_trait]
impl FixMemory for NullFixMemory {
    async fn search(
        &self,
        _container_tag: &str,
        _query: &str,
        _limit: u32,
        _category: Option<&str>,
        _min_score: Option<f64>,
    ) -> Result<Vec<FixRecordHit>, MemoryError> {
        Ok(Vec::new())
    }

    async fn store(&self, _record: FixRecord) -> Result<(), MemoryError> {
        Ok(())
    }
}
