// Formaliza - Web API Server
// Serves the filtered records and the aggregate bundle over REST

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, patch, post},
    Router,
};
use formaliza::{
    load_collection, AggregateBundle, Collection, Config, CrossFilterEngine, FilterState, Record,
    RowStore, SupabaseSource,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
struct AppState {
    source: Arc<SupabaseSource>,
    engine: Arc<CrossFilterEngine>,
    collection: Arc<RwLock<Collection>>,
    page_size: usize,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: impl ToString) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message.to_string()),
        }
    }
}

/// Filter axes as query parameters, mirroring the dashboard pickers.
#[derive(Deserialize, Default)]
struct FilterParams {
    search: Option<String>,
    uf: Option<String>,
    situacao: Option<String>,
    ano: Option<String>,
}

impl From<FilterParams> for FilterState {
    fn from(params: FilterParams) -> Self {
        FilterState {
            search: params.search.unwrap_or_default(),
            region: params.uf,
            status: params.situacao,
            year: params.ano,
        }
    }
}

/// Records response: the filtered subset plus when it was loaded.
#[derive(Serialize)]
struct RecordsResponse {
    count: usize,
    loaded_at: chrono::DateTime<chrono::Utc>,
    records: Vec<Record>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/records - Filtered records
async fn get_records(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> impl IntoResponse {
    let collection = state.collection.read().await;
    let filter: FilterState = params.into();
    let (records, _) = state.engine.apply(&collection.records, &filter);

    Json(ApiResponse::ok(RecordsResponse {
        count: records.len(),
        loaded_at: collection.loaded_at,
        records,
    }))
}

/// GET /api/stats - Aggregate bundle for the same filter axes
async fn get_stats(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> impl IntoResponse {
    let collection = state.collection.read().await;
    let filter: FilterState = params.into();
    let (_, aggregates) = state.engine.apply(&collection.records, &filter);

    Json(ApiResponse::<AggregateBundle>::ok(aggregates))
}

/// PATCH /api/records/:id - Persist field values for one record, then reload
/// so the served collection reflects server state.
async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<HashMap<String, Value>>,
) -> impl IntoResponse {
    if let Err(err) = state.source.update(id, payload).await {
        eprintln!("Error updating record {}: {}", id, err);
        return (StatusCode::BAD_GATEWAY, Json(ApiResponse::err(err))).into_response();
    }

    match reload(&state).await {
        Ok(count) => (StatusCode::OK, Json(ApiResponse::ok(count))).into_response(),
        Err(err) => {
            // Update landed but the refresh failed; stale data stays served.
            eprintln!("Error reloading after update: {}", err);
            (StatusCode::BAD_GATEWAY, Json(ApiResponse::err(err))).into_response()
        }
    }
}

/// POST /api/reload - Re-run the full-set loader
async fn reload_collection(State(state): State<AppState>) -> impl IntoResponse {
    match reload(&state).await {
        Ok(count) => (StatusCode::OK, Json(ApiResponse::ok(count))).into_response(),
        Err(err) => {
            eprintln!("Error reloading: {}", err);
            (StatusCode::BAD_GATEWAY, Json(ApiResponse::err(err))).into_response()
        }
    }
}

async fn reload(state: &AppState) -> Result<usize, formaliza::TransportError> {
    let fresh = load_collection(state.source.as_ref(), state.page_size).await?;
    let count = fresh.len();
    *state.collection.write().await = fresh;
    Ok(count)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::from_env();
    cfg.validate()?;

    let source = Arc::new(SupabaseSource::new(&cfg));

    println!("📊 Loading {} ...", cfg.table);
    let collection = load_collection(source.as_ref(), cfg.page_size).await?;
    println!("✓ Loaded {} records", collection.len());

    let state = AppState {
        source,
        engine: Arc::new(CrossFilterEngine::new(cfg.completed_statuses.clone())),
        collection: Arc::new(RwLock::new(collection)),
        page_size: cfg.page_size,
    };

    let app = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/records", get(get_records))
        .route("/api/records/:id", patch(update_record))
        .route("/api/stats", get(get_stats))
        .route("/api/reload", post(reload_collection))
        .layer(CorsLayer::permissive())
        .with_state(state);

    println!("🚀 Formaliza API listening on {}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
