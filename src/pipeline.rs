//! Pipeline coordinator: the two entry operations behind the HTTP boundary.
//!
//! Dataset mode: validate -> load -> filter -> three model calls -> normalize.
//! Live mode: validate -> scoreboard navigator -> two model calls -> pass through.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::analysis::{self, AnalysisError};
use crate::config::Config;
use crate::dataset;
use crate::error::{Mode, PipelineError};
use crate::inference::{InferenceClient, LabelScore};
use crate::navigator::{CancelFlag, Navigator, ScrapedCompany, SessionLauncher};
use crate::normalize::{self, EmotionScores, Insights, SentimentScores, NO_INSIGHTS};

/// Dataset-mode response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DatasetAnalysis {
    #[schema(value_type = Object)]
    pub emotions: EmotionScores,
    pub sentiment: SentimentScores,
    pub insights: Insights,
}

/// Live-mode response; sentiment is the model's ranked labels as returned.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LiveAnalysis {
    pub company: String,
    pub description: String,
    pub sentiment: Vec<LabelScore>,
    pub summary: String,
}

/// Either response shape. The two are versioned independently.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnalysisResult {
    Dataset(DatasetAnalysis),
    Live(LiveAnalysis),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Dataset,
    Live,
}

#[derive(Clone)]
pub struct Pipeline {
    config: Arc<Config>,
    inference: Arc<dyn InferenceClient>,
    launcher: Arc<dyn SessionLauncher>,
}

fn validate(company: Option<&str>, mode: Mode) -> Result<String, PipelineError> {
    company
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .ok_or(PipelineError::Validation(mode))
}

fn analysis_failed(mode: Mode) -> impl FnOnce(AnalysisError) -> PipelineError {
    move |source| PipelineError::Analysis { mode, source }
}

impl Pipeline {
    pub fn new(
        config: Arc<Config>,
        inference: Arc<dyn InferenceClient>,
        launcher: Arc<dyn SessionLauncher>,
    ) -> Self {
        Self {
            config,
            inference,
            launcher,
        }
    }

    /// Run whichever operation `source` names. This is what the HTTP
    /// handlers call; the response shape follows the source.
    pub async fn run(&self, source: Source, company: Option<&str>) -> Result<AnalysisResult, PipelineError> {
        match source {
            Source::Dataset => self.analyze_dataset(company).await.map(AnalysisResult::Dataset),
            Source::Live => self.analyze_live(company).await.map(AnalysisResult::Live),
        }
    }

    pub async fn analyze_dataset(&self, company: Option<&str>) -> Result<DatasetAnalysis, PipelineError> {
        let result = self.dataset_flow(company).await;
        if let Err(e) = &result {
            error!("❌ Dataset analysis failed for {:?}: {}", company, ErrorChain(e));
        }
        result
    }

    pub async fn analyze_live(&self, company: Option<&str>) -> Result<LiveAnalysis, PipelineError> {
        let result = self.live_flow(company).await;
        if let Err(e) = &result {
            error!("❌ Live analysis failed for {:?}: {}", company, ErrorChain(e));
        }
        result
    }

    async fn dataset_flow(&self, company: Option<&str>) -> Result<DatasetAnalysis, PipelineError> {
        let company = validate(company, Mode::Dataset)?;

        let records = dataset::load(&self.config.dataset_path).await?;
        let reviews = dataset::filter(&records, &company)?;
        let text = dataset::to_text_blob(&reviews);

        let raw = analysis::analyze_reviews(self.inference.as_ref(), &self.config.models, &text)
            .await
            .map_err(analysis_failed(Mode::Dataset))?;

        info!("✅ Dataset analysis ready for '{}' ({} reviews)", company, reviews.len());
        Ok(DatasetAnalysis {
            emotions: normalize::emotion_scores(&raw.emotion),
            sentiment: normalize::sentiment_scores(&raw.sentiment),
            insights: normalize::insights(raw.summary.as_deref(), self.config.insight_fallback),
        })
    }

    async fn live_flow(&self, company: Option<&str>) -> Result<LiveAnalysis, PipelineError> {
        let company = validate(company, Mode::Live)?;

        let scraped = self.scrape(&company).await?;

        let raw = analysis::analyze_description(
            self.inference.as_ref(),
            &self.config.models,
            &scraped.description,
        )
        .await
        .map_err(analysis_failed(Mode::Live))?;

        info!("✅ Live analysis ready for '{}'", company);
        Ok(LiveAnalysis {
            company: scraped.company,
            description: scraped.description,
            sentiment: raw.sentiment,
            summary: raw.summary.unwrap_or_else(|| NO_INSIGHTS.to_string()),
        })
    }

    /// Run the navigator on a blocking thread, restarting the whole protocol
    /// on infrastructure failures up to the configured attempt count. If this
    /// future is dropped the navigator is told to stop and closes its session.
    async fn scrape(&self, company: &str) -> Result<ScrapedCompany, PipelineError> {
        let cancel = CancelFlag::default();
        let cancel_on_drop = cancel.guard();
        let attempts = self.config.scrape.attempts.max(1);

        let mut attempt = 1;
        let outcome = loop {
            let navigator = Navigator::new(self.config.scrape.clone(), cancel.clone());
            let launcher = self.launcher.clone();
            let entity = company.to_string();

            let result = tokio::task::spawn_blocking(move || navigator.run(launcher.as_ref(), &entity))
                .await
                .map_err(|e| PipelineError::Task(e.to_string()))?;

            match result {
                Err(e) if e.is_infrastructure() && attempt < attempts => {
                    warn!("🔄 Scrape attempt {}/{} for '{}' failed: {}", attempt, attempts, company, e);
                    attempt += 1;
                }
                other => break other,
            }
        };

        cancel_on_drop.disarm();
        outcome.map_err(PipelineError::from)
    }
}

// Error followed by its whole source chain.
struct ErrorChain<'a>(&'a PipelineError);

impl std::fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = std::error::Error::source(self.0);
        while let Some(s) = source {
            write!(f, ": {}", s)?;
            source = s.source();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_trims_and_rejects_blank() {
        assert_eq!(validate(Some("  Acme "), Mode::Dataset).unwrap(), "Acme");
        assert!(matches!(validate(Some("   "), Mode::Live), Err(PipelineError::Validation(Mode::Live))));
        assert!(matches!(validate(None, Mode::Dataset), Err(PipelineError::Validation(Mode::Dataset))));
    }
}
