use std::sync::Arc;

use dotenv::dotenv;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use reputation_analyzer::api::{self, ApiDoc, AppState};
use reputation_analyzer::browser::ChromeLauncher;
use reputation_analyzer::config::Config;
use reputation_analyzer::inference::HuggingFaceClient;
use reputation_analyzer::pipeline::Pipeline;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Arc::new(Config::from_env());
    info!(
        "📚 Dataset: {} | 🌐 Scoreboard: {}",
        config.dataset_path.display(),
        config.scrape.base_url
    );

    let inference = Arc::new(HuggingFaceClient::new(
        &config.hf_api_base,
        config.hf_api_key.clone(),
        config.analysis_timeout,
    )?);
    let launcher = Arc::new(ChromeLauncher::new(config.scrape.browser_timeout));
    let pipeline = Pipeline::new(config.clone(), inference, launcher);

    let state = Arc::new(AppState { pipeline });

    let app = api::router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
