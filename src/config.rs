//! Runtime configuration, read from the environment (and `.env` via dotenv).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::normalize::InsightFallback;

pub const DEFAULT_SCOREBOARD_URL: &str = "https://www.customerservicescoreboard.com";
pub const DEFAULT_HF_API_BASE: &str = "https://api-inference.huggingface.co/models";

/// Hosted model identifiers, one per analysis capability.
#[derive(Debug, Clone)]
pub struct ModelIds {
    pub emotion: String,
    /// Sentiment model used over bundled reviews.
    pub dataset_sentiment: String,
    /// Sentiment model used over scraped descriptions.
    pub live_sentiment: String,
    pub summary: String,
}

impl Default for ModelIds {
    fn default() -> Self {
        Self {
            emotion: "j-hartmann/emotion-english-distilroberta-base".to_string(),
            dataset_sentiment: "cardiffnlp/twitter-roberta-base-sentiment".to_string(),
            live_sentiment: "siebert/sentiment-roberta-large-english".to_string(),
            summary: "facebook/bart-large-cnn".to_string(),
        }
    }
}

/// Knobs for the scoreboard navigator.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub base_url: String,
    pub match_timeout: Duration,
    pub poll_interval: Duration,
    pub browser_timeout: Duration,
    /// Whole-protocol attempts; only infrastructure failures are retried.
    pub attempts: u32,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SCOREBOARD_URL.to_string(),
            match_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(250),
            browser_timeout: Duration::from_secs(30),
            attempts: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub dataset_path: PathBuf,
    pub hf_api_key: Option<String>,
    pub hf_api_base: String,
    pub analysis_timeout: Duration,
    pub models: ModelIds,
    pub scrape: ScrapeConfig,
    pub insight_fallback: InsightFallback,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            dataset_path: PathBuf::from("data/glassdoor_reviews.csv"),
            hf_api_key: None,
            hf_api_base: DEFAULT_HF_API_BASE.to_string(),
            analysis_timeout: Duration::from_secs(60),
            models: ModelIds::default(),
            scrape: ScrapeConfig::default(),
            insight_fallback: InsightFallback::Shared,
        }
    }
}

impl Config {
    /// Build the configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        let models = ModelIds {
            emotion: env_or("EMOTION_MODEL", defaults.models.emotion),
            dataset_sentiment: env_or("DATASET_SENTIMENT_MODEL", defaults.models.dataset_sentiment),
            live_sentiment: env_or("LIVE_SENTIMENT_MODEL", defaults.models.live_sentiment),
            summary: env_or("SUMMARY_MODEL", defaults.models.summary),
        };

        let scrape = ScrapeConfig {
            base_url: env_or("SCOREBOARD_BASE_URL", defaults.scrape.base_url),
            match_timeout: Duration::from_secs(env_parse("MATCH_TIMEOUT_SECS", 30)),
            poll_interval: Duration::from_millis(env_parse("MATCH_POLL_MILLIS", 250)),
            browser_timeout: Duration::from_secs(env_parse("BROWSER_TIMEOUT_SECS", 30)),
            attempts: env_parse::<u32>("SCRAPE_ATTEMPTS", 1).max(1),
        };

        let hf_api_key = env::var("HUGGING_FACE_API_KEY")
            .or_else(|_| env::var("HUGGINGFACE_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());

        let insight_fallback = env::var("INSIGHT_FALLBACK")
            .ok()
            .and_then(|s| InsightFallback::parse(&s))
            .unwrap_or(defaults.insight_fallback);

        Self {
            bind_addr: env_or("BIND_ADDR", defaults.bind_addr),
            dataset_path: env::var("DATASET_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.dataset_path),
            hf_api_key,
            hf_api_base: env_or("HF_API_BASE", defaults.hf_api_base),
            analysis_timeout: Duration::from_secs(env_parse("ANALYSIS_TIMEOUT_SECS", 60)),
            models,
            scrape,
            insight_fallback,
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key).ok().filter(|v| !v.trim().is_empty()).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
