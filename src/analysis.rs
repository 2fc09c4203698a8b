//! Runs the independent model calls for one text blob concurrently.
//!
//! Any failing call fails the whole analysis; the error names the capability
//! that failed.

use std::fmt;

use thiserror::Error;
use tracing::{error, info};

use crate::config::ModelIds;
use crate::inference::{InferenceClient, LabelScore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Emotion,
    Sentiment,
    Summarization,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Emotion => "emotion",
            Capability::Sentiment => "sentiment",
            Capability::Summarization => "summarization",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("{capability} analysis failed ({model})")]
pub struct AnalysisError {
    pub capability: Capability,
    pub model: String,
    #[source]
    pub source: anyhow::Error,
}

/// Raw output of the three dataset-mode calls.
#[derive(Debug, Clone)]
pub struct ReviewAnalysis {
    pub emotion: Vec<LabelScore>,
    pub sentiment: Vec<LabelScore>,
    pub summary: Option<String>,
}

/// Raw output of the two live-mode calls.
#[derive(Debug, Clone)]
pub struct DescriptionAnalysis {
    pub sentiment: Vec<LabelScore>,
    pub summary: Option<String>,
}

async fn classify(
    client: &dyn InferenceClient,
    capability: Capability,
    model: &str,
    text: &str,
) -> Result<Vec<LabelScore>, AnalysisError> {
    client.classify(model, text).await.map_err(|source| {
        error!("❌ [ML] {} call to {} failed: {:#}", capability, model, source);
        AnalysisError {
            capability,
            model: model.to_string(),
            source,
        }
    })
}

async fn summarize(
    client: &dyn InferenceClient,
    model: &str,
    text: &str,
) -> Result<Option<String>, AnalysisError> {
    client.summarize(model, text).await.map_err(|source| {
        error!("❌ [ML] summarization call to {} failed: {:#}", model, source);
        AnalysisError {
            capability: Capability::Summarization,
            model: model.to_string(),
            source,
        }
    })
}

/// Emotion, sentiment and summary over aggregated reviews.
pub async fn analyze_reviews(
    client: &dyn InferenceClient,
    models: &ModelIds,
    text: &str,
) -> Result<ReviewAnalysis, AnalysisError> {
    let started = std::time::Instant::now();
    let (emotion, sentiment, summary) = tokio::try_join!(
        classify(client, Capability::Emotion, &models.emotion, text),
        classify(client, Capability::Sentiment, &models.dataset_sentiment, text),
        summarize(client, &models.summary, text),
    )?;

    info!(
        "🧠 [ML] Review analysis completed - duration={:.2}s, emotions={}, sentiments={}, summary={}",
        started.elapsed().as_secs_f32(),
        emotion.len(),
        sentiment.len(),
        summary.is_some()
    );

    Ok(ReviewAnalysis {
        emotion,
        sentiment,
        summary,
    })
}

/// Sentiment and summary over a scraped description.
pub async fn analyze_description(
    client: &dyn InferenceClient,
    models: &ModelIds,
    text: &str,
) -> Result<DescriptionAnalysis, AnalysisError> {
    let started = std::time::Instant::now();
    let (sentiment, summary) = tokio::try_join!(
        classify(client, Capability::Sentiment, &models.live_sentiment, text),
        summarize(client, &models.summary, text),
    )?;

    info!(
        "🧠 [ML] Description analysis completed - duration={:.2}s",
        started.elapsed().as_secs_f32()
    );

    Ok(DescriptionAnalysis { sentiment, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct ScriptedClient {
        fail_model: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl InferenceClient for ScriptedClient {
        async fn classify(&self, model: &str, _text: &str) -> anyhow::Result<Vec<LabelScore>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            if self.fail_model == Some(model) {
                anyhow::bail!("model overloaded");
            }
            Ok(vec![LabelScore {
                label: model.to_string(),
                score: 0.5,
            }])
        }

        async fn summarize(&self, model: &str, _text: &str) -> anyhow::Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            if self.fail_model == Some(model) {
                anyhow::bail!("model overloaded");
            }
            Ok(Some("summary".to_string()))
        }
    }

    fn client(fail_model: Option<&'static str>) -> ScriptedClient {
        ScriptedClient {
            fail_model,
            calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn review_analysis_routes_each_model() {
        let models = ModelIds::default();
        let c = client(None);
        let out = analyze_reviews(&c, &models, "text").await.unwrap();
        assert_eq!(out.emotion[0].label, models.emotion);
        assert_eq!(out.sentiment[0].label, models.dataset_sentiment);
        assert_eq!(out.summary.as_deref(), Some("summary"));
        assert_eq!(c.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn review_calls_run_concurrently() {
        let models = ModelIds::default();
        let started = std::time::Instant::now();
        analyze_reviews(&client(None), &models, "text").await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(250));
    }

    #[tokio::test]
    async fn failure_is_tagged_with_capability() {
        let models = ModelIds::default();
        let c = client(Some("facebook/bart-large-cnn"));
        let err = analyze_reviews(&c, &models, "text").await.unwrap_err();
        assert_eq!(err.capability, Capability::Summarization);
        assert_eq!(err.model, "facebook/bart-large-cnn");
    }

    #[tokio::test]
    async fn description_analysis_uses_live_sentiment_model() {
        let models = ModelIds::default();
        let c = client(None);
        let out = analyze_description(&c, &models, "text").await.unwrap();
        assert_eq!(out.sentiment[0].label, models.live_sentiment);
        assert_eq!(c.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn description_sentiment_failure_is_reported() {
        let models = ModelIds::default();
        let c = client(Some("siebert/sentiment-roberta-large-english"));
        let err = analyze_description(&c, &models, "text").await.unwrap_err();
        assert_eq!(err.capability, Capability::Sentiment);
    }
}
