//! Hosted model inference (Hugging Face Inference API).
//!
//! The pipeline only depends on the [`InferenceClient`] trait so the hosted
//! service can be swapped for a substitute in tests.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

/// One ranked label from a text-classification model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Ranked label/confidence pairs for `text`.
    async fn classify(&self, model: &str, text: &str) -> anyhow::Result<Vec<LabelScore>>;

    /// Abstractive summary of `text`, `None` when the model produced nothing.
    async fn summarize(&self, model: &str, text: &str) -> anyhow::Result<Option<String>>;
}

// Classification returns `[[{label, score}]]` for a single input, but some
// deployments drop the outer list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassificationResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

impl ClassificationResponse {
    fn into_labels(self) -> Vec<LabelScore> {
        match self {
            ClassificationResponse::Nested(mut outer) => {
                if outer.is_empty() {
                    Vec::new()
                } else {
                    outer.swap_remove(0)
                }
            }
            ClassificationResponse::Flat(labels) => labels,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SummaryItem {
    summary_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

/// reqwest-backed client for the Hugging Face Inference API.
pub struct HuggingFaceClient {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
}

impl HuggingFaceClient {
    pub fn new(api_base: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        if api_key.is_none() {
            warn!("⚠️ [ML] No Hugging Face API key configured; requests will be anonymous");
        }
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/{}", self.api_base, model)
    }

    async fn post_inputs(&self, model: &str, text: &str) -> anyhow::Result<reqwest::Response> {
        let mut request = self
            .client
            .post(self.model_url(model))
            .json(&serde_json::json!({ "inputs": text }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);
        Err(anyhow::anyhow!("{} returned {}: {}", model, status, message))
    }
}

#[async_trait]
impl InferenceClient for HuggingFaceClient {
    async fn classify(&self, model: &str, text: &str) -> anyhow::Result<Vec<LabelScore>> {
        debug!("🧠 [ML] classify via {} ({} chars)", model, text.len());
        let response = self.post_inputs(model, text).await?;
        let parsed: ClassificationResponse = response.json().await?;
        Ok(parsed.into_labels())
    }

    async fn summarize(&self, model: &str, text: &str) -> anyhow::Result<Option<String>> {
        debug!("🧠 [ML] summarize via {} ({} chars)", model, text.len());
        let response = self.post_inputs(model, text).await?;
        let items: Vec<SummaryItem> = response.json().await?;
        Ok(items
            .into_iter()
            .next()
            .and_then(|item| item.summary_text)
            .filter(|s| !s.trim().is_empty()))
    }
}
