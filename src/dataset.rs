//! Bundled review dataset: loading, parsing and per-company filtering.
//!
//! The file is a simple `company,review` listing. Only the first comma is a
//! field boundary; review text may contain further commas.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

const FIELD_SEPARATOR: char = ',';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRecord {
    pub entity_name: String,
    pub review_text: String,
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no reviews found for '{0}'")]
    NotFound(String),
}

/// Read and parse the whole dataset. The file is re-read on every call.
pub async fn load(path: &Path) -> Result<Vec<ReviewRecord>, DatasetError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| DatasetError::Io {
            path: path.display().to_string(),
            source,
        })?;

    let records = parse(&content);
    debug!("📚 Loaded {} review records from {}", records.len(), path.display());
    Ok(records)
}

/// Parse dataset text. The first line is a header and is discarded; blank
/// lines and lines with an empty company name are skipped.
pub fn parse(content: &str) -> Vec<ReviewRecord> {
    content.lines().skip(1).filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<ReviewRecord> {
    if line.trim().is_empty() {
        return None;
    }

    let (name, rest) = match line.split_once(FIELD_SEPARATOR) {
        Some((name, rest)) => (name, rest),
        None => (line, ""),
    };

    let entity_name = name.trim();
    if entity_name.is_empty() {
        return None;
    }

    Some(ReviewRecord {
        entity_name: entity_name.to_string(),
        review_text: rest.trim().to_string(),
    })
}

/// Review texts whose company matches `entity_name` exactly, ignoring case,
/// in file order.
pub fn filter(records: &[ReviewRecord], entity_name: &str) -> Result<Vec<String>, DatasetError> {
    let wanted = entity_name.trim().to_lowercase();
    let matches: Vec<String> = records
        .iter()
        .filter(|r| r.entity_name.to_lowercase() == wanted)
        .map(|r| r.review_text.clone())
        .collect();

    if matches.is_empty() {
        return Err(DatasetError::NotFound(entity_name.to_string()));
    }

    info!("📚 {} reviews matched '{}'", matches.len(), entity_name);
    Ok(matches)
}

/// Join matched reviews into the single text handed to analysis.
pub fn to_text_blob(reviews: &[String]) -> String {
    reviews.join(" ")
}
