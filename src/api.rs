use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, warn};

use crate::config::Config;
use crate::error::ScoringError;
use crate::hazard::Hazard;
use crate::scorer::{Route, Scorer, ScoringRequest, ScoringResult};

// Shared, read-only state for all requests
pub struct AppState {
    pub scorer: Scorer,
    pub default_threshold_m: f64,
    pub default_penalty_s: f64,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scorer: Scorer::new(config.scorer_options()),
            default_threshold_m: config.default_threshold_m,
            default_penalty_s: config.default_penalty_s,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    // Open CORS so a browser front end on another origin can call us
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/score", post(score_routes))
        .layer(cors)
        .with_state(state)
}

// --- API DTOs ---

/// `ScoringRequest` with the threshold and penalty left optional; missing
/// values come from the service configuration.
#[derive(Deserialize)]
pub struct ScoreRouteBody {
    candidates: Vec<Route>,
    #[serde(default)]
    hazards: Vec<Hazard>,
    proximity_threshold_meters: Option<f64>,
    penalty_seconds_per_hazard: Option<f64>,
}

impl ScoreRouteBody {
    fn into_request(self, state: &AppState) -> ScoringRequest {
        ScoringRequest {
            candidates: self.candidates,
            hazards: self.hazards,
            proximity_threshold_meters: self
                .proximity_threshold_meters
                .unwrap_or(state.default_threshold_m),
            penalty_seconds_per_hazard: self
                .penalty_seconds_per_hazard
                .unwrap_or(state.default_penalty_s),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

pub enum ApiError {
    Scoring(ScoringError),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Scoring(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    error: e.kind(),
                    message: e.to_string(),
                },
            ),
            Self::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "internal",
                    message,
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

// --- Handler ---

async fn score_routes(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ScoreRouteBody>,
) -> Result<Json<ScoringResult>, ApiError> {
    let request = payload.into_request(&state);

    // Scoring is CPU-bound; keep it off the async workers
    let scorer = state.scorer;
    let outcome = tokio::task::spawn_blocking(move || scorer.score_and_select(&request))
        .await
        .map_err(|e| {
            error!(error = %e, "scoring task failed");
            ApiError::Internal("scoring task failed".into())
        })?;

    match outcome {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            warn!(kind = e.kind(), error = %e, "rejected scoring request");
            Err(ApiError::Scoring(e))
        }
    }
}
