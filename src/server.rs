use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::info;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::data::{FilterFlags, Minute, RefreshSummary, ScoredCandidate, SubjectSelection};
use crate::portal::{CsvSnapshot, SlotSource};
use crate::solver::SchedulingEngine;

/// Shared between handlers. A refresh builds the replacement engine before
/// taking the write lock, so readers always see a complete ranked list.
pub struct AppState {
    pub engine: RwLock<SchedulingEngine>,
    pub source: CsvSnapshot,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectionRequest {
    index: usize,
    #[serde(default)]
    flags: FilterFlags,
}

async fn refresh_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RefreshSummary>, (StatusCode, String)> {
    let load = state
        .source
        .fetch(&mut |message| info!("{message}"))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let rebuilt = SchedulingEngine::from_records(load.records);
    let summary = rebuilt.summary(load.rejected);
    *state.engine.write().await = rebuilt;

    Ok(Json(summary))
}

async fn ranked_handler(State(state): State<Arc<AppState>>) -> Json<Vec<ScoredCandidate>> {
    Json(state.engine.read().await.ranked.clone())
}

async fn filter_handler(
    State(state): State<Arc<AppState>>,
    Json(flags): Json<FilterFlags>,
) -> Json<Vec<ScoredCandidate>> {
    Json(state.engine.read().await.filter(&flags))
}

async fn slots_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Minute>> {
    Json(state.engine.read().await.display_slots.clone())
}

async fn selection_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<Vec<SubjectSelection>>, (StatusCode, String)> {
    match state
        .engine
        .read()
        .await
        .selection(&request.flags, request.index)
    {
        Ok(selections) => Ok(Json(selections)),
        Err(e) => Err((StatusCode::BAD_REQUEST, e.to_string())),
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/timetable/refresh", post(refresh_handler))
        .route("/v1/timetable/ranked", get(ranked_handler))
        .route("/v1/timetable/filter", post(filter_handler))
        .route("/v1/timetable/slots", get(slots_handler))
        .route("/v1/timetable/selection", post(selection_handler))
        .with_state(state)
}

pub async fn run_server(state: Arc<AppState>) {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:8080")
        .await
        .unwrap();

    info!("Server running at http://{}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
