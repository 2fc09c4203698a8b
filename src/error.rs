//! Pipeline error taxonomy and its mapping onto the HTTP boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::analysis::AnalysisError;
use crate::dataset::DatasetError;
use crate::navigator::NavigatorError;

pub const MSG_COMPANY_REQUIRED: &str = "Company name is required";
pub const MSG_NO_REVIEWS: &str = "No reviews found for this company";
pub const MSG_INTERNAL: &str = "Internal Server Error";
pub const MSG_COMPANY_NOT_FOUND: &str = "Company not found";
pub const MSG_NO_DESCRIPTION: &str = "No description found";
pub const MSG_PROCESSING: &str = "An error occurred during processing";

/// Which operation a failure belongs to; the two operations word their
/// generic failures differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Dataset,
    Live,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("company name is required")]
    Validation(Mode),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Navigation(#[from] NavigatorError),

    #[error("{mode:?} analysis failed")]
    Analysis {
        mode: Mode,
        #[source]
        source: AnalysisError,
    },

    #[error("navigator task failed: {0}")]
    Task(String),
}

/// Body of every non-200 response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl PipelineError {
    /// Status and message sent to the caller. Internal detail never leaves
    /// this function except for the detail-page URL.
    pub fn boundary(&self) -> (StatusCode, String) {
        match self {
            PipelineError::Validation(_) => (StatusCode::BAD_REQUEST, MSG_COMPANY_REQUIRED.to_string()),
            PipelineError::Dataset(DatasetError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, MSG_NO_REVIEWS.to_string())
            }
            PipelineError::Dataset(DatasetError::Io { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL.to_string())
            }
            PipelineError::Navigation(e) => match e {
                NavigatorError::MatchTimeout(_) | NavigatorError::CompanyNotFound(_) => {
                    (StatusCode::NOT_FOUND, MSG_COMPANY_NOT_FOUND.to_string())
                }
                NavigatorError::DescriptionMissing(_) => {
                    (StatusCode::NOT_FOUND, MSG_NO_DESCRIPTION.to_string())
                }
                NavigatorError::DetailPageLoad { url, .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to load company page: {}", url),
                ),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, MSG_PROCESSING.to_string()),
            },
            PipelineError::Analysis { mode: Mode::Dataset, .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL.to_string())
            }
            PipelineError::Analysis { mode: Mode::Live, .. } | PipelineError::Task(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, MSG_PROCESSING.to_string())
            }
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let (status, error) = self.boundary();
        (status, Json(ErrorBody { error })).into_response()
    }
}
