// Spendwise - Web Server
// JSON API over the transaction store and the search engine

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use spendwise::{
    get_all_transactions, setup_database, SearchConfig, SearchEngine, SearchField, Summary,
    Transaction,
};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    engine: Arc<SearchEngine>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        (
            StatusCode::OK,
            Json(Self {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
            .into_response()
    }

    fn failure(status: StatusCode, message: String) -> Response {
        (
            status,
            Json(Self {
                success: false,
                data: None,
                error: Some(message),
            }),
        )
            .into_response()
    }
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Deserialize)]
struct AdvancedSearchParams {
    #[serde(default)]
    q: String,
    /// Restricts the free-text term to one field (`description`, `amount`, ...)
    field: Option<String>,
}

#[derive(Deserialize)]
struct HighlightParams {
    #[serde(default)]
    text: String,
    #[serde(default)]
    q: String,
}

#[derive(Serialize)]
struct SearchResponse {
    query: String,
    count: usize,
    transactions: Vec<Transaction>,
}

fn load_transactions(state: &AppState) -> Result<Vec<Transaction>, Response> {
    let conn = state.db.lock().map_err(|_| {
        ApiResponse::<()>::failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            "database lock poisoned".to_string(),
        )
    })?;

    get_all_transactions(&conn).map_err(|e| {
        error!("Error getting transactions: {:#}", e);
        ApiResponse::<()>::failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> Response {
    ApiResponse::ok("OK")
}

/// GET /api/transactions - Get all transactions
async fn get_transactions(State(state): State<AppState>) -> Response {
    match load_transactions(&state) {
        Ok(transactions) => ApiResponse::ok(transactions),
        Err(response) => response,
    }
}

/// GET /api/stats - Dashboard totals
async fn get_stats(State(state): State<AppState>) -> Response {
    match load_transactions(&state) {
        Ok(transactions) => ApiResponse::ok(Summary::from_transactions(&transactions)),
        Err(response) => response,
    }
}

/// GET /api/search?q= - Pattern search across all fields
async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    match load_transactions(&state) {
        Ok(transactions) => {
            let found = state.engine.search_transactions(&transactions, &params.q);
            ApiResponse::ok(SearchResponse {
                query: params.q,
                count: found.len(),
                transactions: found,
            })
        }
        Err(response) => response,
    }
}

/// GET /api/search/advanced?q=&field= - Tagged query (category:, amount:, date:, description:)
async fn advanced_search(
    State(state): State<AppState>,
    Query(params): Query<AdvancedSearchParams>,
) -> Response {
    let mut options = state.engine.parse_search_query(&params.q);
    if let Some(field) = &params.field {
        match field.parse::<SearchField>() {
            Ok(field) => options.field = field,
            Err(e) => return ApiResponse::<()>::failure(StatusCode::BAD_REQUEST, e.to_string()),
        }
    }

    match load_transactions(&state) {
        Ok(transactions) => {
            let found = state.engine.advanced_search(&transactions, &options);
            ApiResponse::ok(SearchResponse {
                query: params.q,
                count: found.len(),
                transactions: found,
            })
        }
        Err(response) => response,
    }
}

/// GET /api/suggestions?q= - Search box completions
async fn suggestions(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Response {
    match load_transactions(&state) {
        Ok(transactions) => {
            ApiResponse::ok(state.engine.search_suggestions(&transactions, &params.q))
        }
        Err(response) => response,
    }
}

/// GET /api/highlight?text=&q= - Markup-safe highlighted text
async fn highlight(
    State(state): State<AppState>,
    Query(params): Query<HighlightParams>,
) -> Response {
    ApiResponse::ok(state.engine.highlight_matches(&params.text, &params.q))
}

fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/transactions", get(get_transactions))
        .route("/stats", get(get_stats))
        .route("/search", get(search))
        .route("/search/advanced", get(advanced_search))
        .route("/suggestions", get(suggestions))
        .route("/highlight", get(highlight))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let db_path = std::env::var("SPENDWISE_DB").unwrap_or_else(|_| "spendwise.db".to_string());
    let config = match std::env::var("SPENDWISE_SEARCH_CONFIG") {
        Ok(path) => SearchConfig::from_file(&path)?,
        Err(_) => SearchConfig::default(),
    };

    let conn = Connection::open(&db_path)
        .with_context(|| format!("Failed to open database {:?}", db_path))?;
    setup_database(&conn)?;
    info!(db = %db_path, "Database opened");

    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
        engine: Arc::new(SearchEngine::new(config)?),
    };

    let addr = std::env::var("SPENDWISE_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(%addr, "Server running, API under /api");

    axum::serve(listener, build_router(state))
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
