// Pokedex - REST API with Axum
// Router and handlers; the binary in bin/server.rs only binds and serves.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use crate::acquisition::{lock, AcquisitionService};
use crate::projection::{project_with, DisplayCard, ViewStatus};
use crate::store::{RecordStore, RefreshOutcome, RefreshStart, RefreshSummary};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<RecordStore>>,
    pub service: Arc<AcquisitionService>,
    pub artwork_base: Arc<str>,
}

impl AppState {
    pub fn new(service: AcquisitionService, store: RecordStore, artwork_base: &str) -> Self {
        AppState {
            store: Arc::new(Mutex::new(store)),
            service: Arc::new(service),
            artwork_base: Arc::from(artwork_base),
        }
    }

    /// Run a refresh on the tokio runtime without waiting for it
    pub fn spawn_refresh(&self) -> tokio::task::JoinHandle<RefreshOutcome> {
        let state = self.clone();
        tokio::spawn(async move { state.service.refresh(&state.store).await })
    }
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    fn failed(data: T, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CardQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
pub struct CardsResponse {
    pub query: String,
    pub status: ViewStatus,
    pub count: usize,
    pub cards: Vec<DisplayCard>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub loading: bool,
    pub records: usize,
    pub generation: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refresh: Option<RefreshSummary>,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub started: bool,
    pub generation: u64,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/cards?q= - Projected cards for a search query
async fn get_cards(
    State(state): State<AppState>,
    Query(params): Query<CardQuery>,
) -> impl IntoResponse {
    let (cards, loading) = {
        let store = lock(&state.store);
        (
            project_with(store.records(), &params.q, &state.artwork_base),
            store.is_loading(),
        )
    };

    Json(ApiResponse::ok(CardsResponse {
        status: ViewStatus::of(loading, &cards),
        count: cards.len(),
        query: params.q,
        cards,
    }))
}

/// GET /api/status - Loading flag and last refresh
async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let store = lock(&state.store);

    Json(ApiResponse::ok(StatusResponse {
        loading: store.is_loading(),
        records: store.records().len(),
        generation: store.generation(),
        last_refresh: store.last_refresh().cloned(),
    }))
}

/// POST /api/refresh - Re-acquire the catalog in the background
async fn post_refresh(State(state): State<AppState>) -> impl IntoResponse {
    let start = lock(&state.store).begin_refresh();

    match start {
        RefreshStart::Started(ticket) => {
            let generation = ticket.generation();
            let background = state.clone();
            tokio::spawn(async move {
                background
                    .service
                    .run_refresh(&background.store, ticket)
                    .await
            });

            (
                StatusCode::ACCEPTED,
                Json(ApiResponse::ok(RefreshResponse {
                    started: true,
                    generation,
                })),
            )
        }
        RefreshStart::Skipped { in_flight } => (
            StatusCode::CONFLICT,
            Json(ApiResponse::failed(
                RefreshResponse {
                    started: false,
                    generation: in_flight,
                },
                "refresh already in progress",
            )),
        ),
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/cards", get(get_cards))
        .route("/status", get(get_status))
        .route("/refresh", post(post_refresh))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}
