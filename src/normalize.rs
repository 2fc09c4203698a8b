//! Maps raw model output onto the dashboard's fixed schema.
//!
//! Pure functions, no failure path: anything missing becomes a default.

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::inference::LabelScore;

/// Emotion label every emotion map must carry.
pub const REQUIRED_EMOTION: &str = "Love";

pub const NO_INSIGHTS: &str = "No insights found.";
pub const NO_POSITIVE_FEEDBACK: &str = "No positive feedback found.";
pub const NO_NEGATIVE_FEEDBACK: &str = "No negative feedback found.";

/// Emotion label to integer percentage.
pub type EmotionScores = BTreeMap<String, u8>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct SentimentScores {
    pub positive: u8,
    pub neutral: u8,
    pub negative: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Insights {
    pub positive: String,
    pub negative: String,
}

/// Literal used for insight fields when summarization yields nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightFallback {
    /// "No insights found." in both fields.
    Shared,
    /// "No positive feedback found." / "No negative feedback found."
    PerPolarity,
}

impl InsightFallback {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "shared" => Some(InsightFallback::Shared),
            "per-polarity" | "per_polarity" | "polarity" => Some(InsightFallback::PerPolarity),
            _ => None,
        }
    }
}

/// Confidence in [0, 1] to a whole percentage, half rounding up.
pub fn to_percentage(score: f64) -> u8 {
    if !score.is_finite() {
        return 0;
    }
    (score * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Label to percentage for every returned label, plus `Love` at 0 when the
/// model did not return it.
pub fn emotion_scores(labels: &[LabelScore]) -> EmotionScores {
    let mut scores: EmotionScores = labels
        .iter()
        .map(|l| (l.label.clone(), to_percentage(l.score)))
        .collect();
    scores.entry(REQUIRED_EMOTION.to_string()).or_insert(0);
    scores
}

enum Polarity {
    Positive,
    Neutral,
    Negative,
}

fn polarity_of(label: &str) -> Option<Polarity> {
    match label.trim().to_lowercase().as_str() {
        "positive" | "label_2" => Some(Polarity::Positive),
        "neutral" | "label_1" => Some(Polarity::Neutral),
        "negative" | "label_0" => Some(Polarity::Negative),
        _ => None,
    }
}

/// Always yields all three polarities; unknown labels are ignored.
pub fn sentiment_scores(labels: &[LabelScore]) -> SentimentScores {
    let mut scores = SentimentScores::default();
    for l in labels {
        let pct = to_percentage(l.score);
        match polarity_of(&l.label) {
            Some(Polarity::Positive) => scores.positive = pct,
            Some(Polarity::Neutral) => scores.neutral = pct,
            Some(Polarity::Negative) => scores.negative = pct,
            None => {}
        }
    }
    scores
}

/// The one summary feeds both insight fields.
pub fn insights(summary: Option<&str>, fallback: InsightFallback) -> Insights {
    match summary.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => Insights {
            positive: text.to_string(),
            negative: text.to_string(),
        },
        None => match fallback {
            InsightFallback::Shared => Insights {
                positive: NO_INSIGHTS.to_string(),
                negative: NO_INSIGHTS.to_string(),
            },
            InsightFallback::PerPolarity => Insights {
                positive: NO_POSITIVE_FEEDBACK.to_string(),
                negative: NO_NEGATIVE_FEEDBACK.to_string(),
            },
        },
    }
}
