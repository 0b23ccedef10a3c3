mod assembler;
mod assistant;
mod chunks;
mod classifier;
mod config;
mod dispatcher;
mod encoder;
mod error;
mod labels;
mod types;

use axum::{
    Router,
    extract::{Host, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use clap::Parser;
use metrics::counter;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use assistant::{AssistantClient, AssistantConfig};
use config::{Config, DispatchConfig};
use dispatcher::Dispatcher;
use error::EngineError;
use labels::LabelVocabulary;
use types::{ScoreRequest, ScoreResponse};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,assistant_scorer=debug".into()),
        )
        .init();

    let config = Config::parse();

    if config.chunk_size == 0 {
        anyhow::bail!("--chunk-size must be greater than zero");
    }
    if config.workers == 0 {
        anyhow::bail!("--workers must be greater than zero");
    }

    let vocabulary = Arc::new(match config.parse_labels() {
        Some(labels) if !labels.is_empty() => LabelVocabulary::new(labels),
        _ => LabelVocabulary::default(),
    });
    tracing::info!(labels = vocabulary.len(), "label vocabulary loaded");

    let client = Arc::new(AssistantClient::new(AssistantConfig {
        service_url: config.service_url.clone(),
        api_key: config.api_key.clone(),
        assistant_id: config.assistant_id.clone(),
        version: config.api_version.clone(),
        timeout: config.timeout(),
    })?);

    // The worker pool outlives any single request; batches are fed to it
    // through the dispatcher's job queue.
    let dispatch_config = DispatchConfig::from(&config);
    let (dispatcher, workers) = Dispatcher::new(&dispatch_config, client, vocabulary);
    for worker in workers {
        tokio::spawn(worker.run_forever());
    }
    tracing::info!(
        workers = dispatch_config.workers,
        chunk_size = dispatch_config.chunk_size,
        "worker pool started"
    );

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let app = Router::new()
        .route("/v1/deployments/assistant/message", post(score_handler))
        .route("/v1/deployments", get(deployments_handler))
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(prometheus_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState {
            dispatcher: Arc::new(dispatcher),
        });

    let listener = TcpListener::bind(&config.server_address()).await?;
    tracing::info!("Server running on http://{}", config.server_address());

    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
}

#[tracing::instrument(skip(state, request), fields(item_count = request.values.len()))]
async fn score_handler(
    State(state): State<AppState>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<ScoreResponse>, (StatusCode, Json<Value>)> {
    counter!("score_requests_total").increment(1);

    match state.dispatcher.score(request.values).await {
        Ok(response) => Ok(Json(response)),
        Err(err) => {
            tracing::error!(error = %err, "scoring failed");
            counter!("score_requests_failed_total").increment(1);
            Err((status_for(&err), Json(json!({ "error": err.to_string() }))))
        }
    }
}

fn status_for(err: &EngineError) -> StatusCode {
    if err.is_bad_request() {
        return StatusCode::BAD_REQUEST;
    }
    match err {
        EngineError::Remote(_) | EngineError::Api { .. } | EngineError::UnknownLabel { .. } => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Static discovery descriptor advertising the scoring endpoint.
async fn deployments_handler(Host(host): Host) -> Json<Value> {
    Json(json!({
        "count": 1,
        "resources": [
            {
                "metadata": {
                    "guid": "assistant",
                    "created_at": "2019-06-27T12:00:00Z",
                    "modified_at": "2019-06-27T13:00:00Z"
                },
                "entity": {
                    "name": "Assistant",
                    "description": "Conversational assistant deployment",
                    "scoring_url": format!("http://{host}/v1/deployments/assistant/message"),
                    "asset": {
                        "name": "Assistant",
                        "guid": "assistant"
                    },
                    "asset_properties": {
                        "problem_type": "multiclass",
                        "input_data_type": "unstructured_text"
                    }
                }
            }
        ]
    }))
}
