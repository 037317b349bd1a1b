//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::{debug, warn};

use crate::display::DisplayPayload;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/departures", get(next_departure))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Next departure for the stop, line and direction in the query string.
///
/// Failed lookups are still 200: the device shows the error frame in place
/// of the minutes.
async fn next_departure(
    State(state): State<AppState>,
    Query(req): Query<DepartureRequest>,
) -> Result<Json<DisplayPayload>, AppError> {
    let query = req
        .to_query()
        .map_err(|message| AppError::BadRequest { message })?;

    debug!(key = %query.cache_key(), "departure request");

    let payload = match state.departures.execute(&query).await {
        Ok(payload) => payload,
        Err(payload) => payload,
    };

    Ok(Json(payload))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
        };

        warn!(%status, %message, "rejected request");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
