//! HTTP boundary: one route per acquisition mode.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info_span, warn, Instrument};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

use crate::error::{ErrorBody, Mode, PipelineError};
use crate::inference::LabelScore;
use crate::normalize::{Insights, SentimentScores};
use crate::pipeline::{AnalysisResult, DatasetAnalysis, LiveAnalysis, Pipeline, Source};

pub struct AppState {
    pub pipeline: Pipeline,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub company: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CompanyQuery {
    /// Company name exactly as listed on the scoreboard.
    pub company: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(analyze_dataset, analyze_live, health),
    components(schemas(
        AnalyzeRequest,
        DatasetAnalysis,
        LiveAnalysis,
        SentimentScores,
        Insights,
        LabelScore,
        ErrorBody,
        HealthResponse
    )),
    tags((name = "analysis", description = "Entity reputation analysis"))
)]
pub struct ApiDoc;

/// Routes without docs or middleware; `main` layers those on.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/analyze", get(analyze_live).post(analyze_dataset))
        .route("/health", get(health))
        .with_state(state)
}

/// Analyze bundled reviews for a company.
#[utoipa::path(
    post,
    path = "/api/analyze",
    tag = "analysis",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Emotion, sentiment and insights", body = DatasetAnalysis),
        (status = 400, description = "Company name missing", body = ErrorBody),
        (status = 404, description = "No reviews for company", body = ErrorBody),
        (status = 500, description = "Dataset or model failure", body = ErrorBody)
    )
)]
pub async fn analyze_dataset(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, PipelineError> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("⚠️ Rejected dataset request body: {}", rejection);
            return Err(PipelineError::Validation(Mode::Dataset));
        }
    };

    let span = info_span!(
        "analyze",
        mode = "dataset",
        request_id = %Uuid::new_v4(),
        company = ?request.company
    );
    state
        .pipeline
        .run(Source::Dataset, request.company.as_deref())
        .instrument(span)
        .await
        .map(Json)
}

/// Scrape the live scoreboard for a company and analyze its description.
#[utoipa::path(
    get,
    path = "/api/analyze",
    tag = "analysis",
    params(CompanyQuery),
    responses(
        (status = 200, description = "Description with sentiment and summary", body = LiveAnalysis),
        (status = 400, description = "Company name missing", body = ErrorBody),
        (status = 404, description = "Company or description not found", body = ErrorBody),
        (status = 500, description = "Browser or model failure", body = ErrorBody)
    )
)]
pub async fn analyze_live(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CompanyQuery>,
) -> Result<Json<AnalysisResult>, PipelineError> {
    let span = info_span!(
        "analyze",
        mode = "live",
        request_id = %Uuid::new_v4(),
        company = ?query.company
    );
    state
        .pipeline
        .run(Source::Live, query.company.as_deref())
        .instrument(span)
        .await
        .map(Json)
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
