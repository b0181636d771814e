//! HTTP surface of the detection service.

mod analyze;
mod api_error;

use std::collections::BTreeMap;
use std::sync::Arc;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use crate::common::PathologyClass;
use crate::detection_runners::Predictor;
use crate::settings::Settings;

pub use analyze::{analyze, AnalyzeResponse, UPLOAD_FIELD};
pub use api_error::{ApiError, ErrorResponse};

pub const SERVICE_NAME: &str = "Dental Pathology Detection API";

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub predictor: Arc<Predictor>,
}

impl AppState {
    pub fn new(settings: Settings, predictor: Predictor) -> Self {
        Self {
            settings: Arc::new(settings),
            predictor: Arc::new(predictor),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub predictor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub service: String,
    pub version: String,
    pub status: String,
    pub endpoints: BTreeMap<String, String>,
}

/// Create HTTP router with all API routes
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.cors_origins());

    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/classes", get(classes))
        // size is enforced while the upload streams in
        .route("/api/analyze", post(analyze).layer(DefaultBodyLimit::disable()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn root() -> Json<RootResponse> {
    let endpoints = [
        ("health", "/api/health"),
        ("classes", "/api/classes"),
        ("analyze", "/api/analyze"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    Json(RootResponse {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
        endpoints,
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        predictor: state.predictor.kind().to_string(),
    })
}

async fn classes() -> Json<BTreeMap<u8, &'static str>> {
    Json(PathologyClass::table())
}
