mod llm;

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Request},
    middleware::{Next, from_fn},
    response::Json,
    routing::{get, post},
};
use movie_lookup::{
    FileRecentStorage, InMemoryRecentStorage, MovieResult, RecentSearchEntry, RecentStorage,
    SearchController, SearchSnapshot, SearchState,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::llm::OpenRouterLookup;

#[derive(Clone)]
struct AppState {
    controller: Arc<SearchController>,
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    query: String,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    movie: Option<MovieResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    recent: Vec<RecentSearchEntry>,
}

impl From<SearchSnapshot> for SearchResponse {
    fn from(snapshot: SearchSnapshot) -> Self {
        let (status, movie, error) = match snapshot.state {
            SearchState::Idle => ("idle", None, None),
            SearchState::Loading => ("loading", None, None),
            SearchState::Success(movie) => ("success", Some(movie), None),
            SearchState::Failed(failure) => ("failed", None, Some(failure.user_message())),
        };
        Self {
            status,
            movie,
            error,
            recent: snapshot.recent,
        }
    }
}

/// Initialize structured tracing based on environment variables
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "movie_lookup_service=debug,movie_lookup=debug,tower_http=debug".into()
    });

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}

/// Middleware to tag every request with a correlation ID
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(header) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", header);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

async fn health_check() -> &'static str {
    "OK"
}

async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Json<SearchResponse> {
    info!(query_length = request.query.len(), "processing search request");
    let snapshot = state.controller.submit(&request.query).await;
    Json(snapshot.into())
}

async fn recent(State(state): State<AppState>) -> Json<Vec<RecentSearchEntry>> {
    Json(state.controller.snapshot().await.recent)
}

async fn clear_recent(State(state): State<AppState>) -> Json<Vec<RecentSearchEntry>> {
    info!("clearing recent searches");
    Json(state.controller.clear_recent().await.recent)
}

async fn reset(State(state): State<AppState>) -> Json<SearchResponse> {
    state.controller.reset();
    Json(state.controller.snapshot().await.into())
}

fn recent_storage_from_env() -> Arc<dyn RecentStorage> {
    match std::env::var("RECENT_SEARCHES_PATH") {
        Ok(path) => {
            info!(%path, "using file-backed recent-search storage");
            Arc::new(FileRecentStorage::new(path))
        }
        Err(_) => {
            info!("using in-memory recent-search storage (set RECENT_SEARCHES_PATH to persist)");
            Arc::new(InMemoryRecentStorage::new())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("starting movie lookup service");

    let lookup = Arc::new(OpenRouterLookup::from_env()?);
    let storage = recent_storage_from_env();
    let controller = Arc::new(SearchController::start(lookup, storage).await);

    let state = AppState { controller };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/search", post(search))
        .route("/recent", get(recent).delete(clear_recent))
        .route("/reset", post(reset))
        .layer(from_fn(correlation_id_middleware))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    info!("Server running on http://0.0.0.0:3000");

    info!("Available endpoints:");
    info!("  GET    /health  - Health check");
    info!("  POST   /search  - Look up review scores for a movie title");
    info!("  GET    /recent  - Recent successful searches");
    info!("  DELETE /recent  - Clear recent searches");
    info!("  POST   /reset   - Return the controller to idle");

    axum::serve(listener, app).await?;

    Ok(())
}
