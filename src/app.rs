//! Aircraft API routes and handlers

use crate::app_state::{AppState, SharedAppState};
use crate::cli::CommandLineArgs;
use crate::error::AircraftApiError;
use crate::metrics::{metrics_handler, record_response_metrics, request_counter};
use crate::models;
use crate::validated_json::{ValidatedJson, ValidatedQuery};

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

/// Value returned by the ingestion endpoints on success
const INGEST_OK: &str = "OK";

/// Aircraft API service type
///
/// The router wrapped in a layer that trims trailing slashes from request paths, so that
/// `/api/s6/aircraft/` and `/api/s6/aircraft` route to the same handler.
pub type Service = NormalizePath<Router>;

/// Returns a [Service] for the Aircraft API.
///
/// The service is populated with all routes as well as the following middleware:
///
/// * a [tower_http::trace::TraceLayer] for tracing requests and responses
/// * a [tower_http::normalize_path::NormalizePathLayer] for trimming trailing slashes from
///   requests
///
/// # Arguments
///
/// * `args`: Command line arguments
pub async fn service(args: &CommandLineArgs) -> Result<Service, AircraftApiError> {
    let state = AppState::from_args(args).await?;
    Ok(service_with_state(Arc::new(state)))
}

/// Returns a [Service] for the Aircraft API with the provided shared state.
pub fn service_with_state(state: SharedAppState) -> Service {
    ServiceBuilder::new()
        .layer(NormalizePathLayer::trim_trailing_slash())
        .service(router(state))
}

/// Returns a [axum::Router] for the Aircraft API
///
/// # Arguments
///
/// * `state`: Shared application state
fn router(state: SharedAppState) -> Router {
    fn ingestion() -> Router<SharedAppState> {
        Router::new()
            .route("/aircraft/download", post(download))
            .route("/aircraft/prepare", post(prepare))
    }

    fn positions() -> Router<SharedAppState> {
        Router::new()
            .route("/aircraft", get(list_aircraft).post(create_aircraft))
            .route("/aircraft/stats", get(aircraft_stats))
            .route("/aircraft/:icao", get(get_aircraft).delete(delete_aircraft))
    }

    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/metrics", get(metrics_handler))
        .nest("/api/s4", ingestion())
        .nest("/api/s6", positions())
        .layer(
            TraceLayer::new_for_http()
                .on_request(request_counter)
                .on_response(record_response_metrics),
        )
        .with_state(state)
}

/// Liveness check
async fn health() -> Json<&'static str> {
    Json("ok")
}

/// Version of the running server
async fn version() -> Json<models::VersionResponse> {
    Json(models::VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Download the first `file_limit` snapshots of the day to object storage
async fn download(
    State(state): State<SharedAppState>,
    ValidatedQuery(params): ValidatedQuery<models::DownloadParams>,
) -> Result<Json<&'static str>, AircraftApiError> {
    let count = state.ingestion.download(params.file_limit).await?;
    tracing::info!("Downloaded {} snapshots", count);
    Ok(Json(INGEST_OK))
}

/// Prepare every staged snapshot of the day
async fn prepare(
    State(state): State<SharedAppState>,
) -> Result<Json<&'static str>, AircraftApiError> {
    let count = state.ingestion.prepare().await?;
    tracing::info!("Prepared {} snapshots", count);
    Ok(Json(INGEST_OK))
}

async fn create_aircraft(
    State(state): State<SharedAppState>,
    ValidatedJson(position): ValidatedJson<models::AircraftPosition>,
) -> Result<Json<models::StatusResponse>, AircraftApiError> {
    state.positions.insert(&position).await?;
    Ok(Json(models::StatusResponse::ok()))
}

async fn list_aircraft(
    State(state): State<SharedAppState>,
    ValidatedQuery(params): ValidatedQuery<models::ListParams>,
) -> Result<Json<Vec<models::PositionSummary>>, AircraftApiError> {
    Ok(Json(state.positions.list(&params).await?))
}

async fn aircraft_stats(
    State(state): State<SharedAppState>,
) -> Result<Json<Vec<models::TypeCount>>, AircraftApiError> {
    Ok(Json(state.positions.type_counts().await?))
}

/// Most recent position of an aircraft
async fn get_aircraft(
    State(state): State<SharedAppState>,
    Path(icao): Path<String>,
) -> Result<Json<models::AircraftPosition>, AircraftApiError> {
    match state.positions.latest(&icao).await? {
        Some(position) => Ok(Json(position)),
        None => Err(AircraftApiError::AircraftNotFound { icao }),
    }
}

async fn delete_aircraft(
    State(state): State<SharedAppState>,
    Path(icao): Path<String>,
) -> Result<Json<models::DeleteResponse>, AircraftApiError> {
    let deleted = state.positions.delete(&icao).await?;
    Ok(Json(models::DeleteResponse { deleted }))
}
