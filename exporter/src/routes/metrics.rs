use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use collector::{CONTENT_TYPE, encode_text};

use crate::state::SharedState;

/// `GET /metrics`
///
/// Runs one full collection and returns it in text exposition format.
/// Upstream failures only drop samples; the response is still `200` with
/// every metric family present.
pub async fn metrics(State(state): State<SharedState>) -> Response {
    let snapshot = match state.scrape().await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            tracing::error!(error = %err, "collection task failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "collection failed").into_response();
        }
    };

    tracing::debug!(samples = snapshot.sample_count(), "scrape complete");

    match encode_text(&snapshot) {
        Ok(body) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
    }
}
