use axum::Json;
use serde::Serialize;

/// Body of `GET /health`.
#[derive(Serialize)]
pub struct Liveness {
    pub status: &'static str,
}

/// `GET /health`
///
/// Answers as soon as the server is up. Never runs a collection or talks to
/// Etherscan, so it stays cheap and does not count against the upstream
/// rate limit; upstream outages only show up as missing samples on
/// `/metrics`.
pub async fn health() -> Json<Liveness> {
    Json(Liveness { status: "ok" })
}
