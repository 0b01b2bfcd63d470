use salvo::{Router, handler};

/// GET /api/healthcheck - Liveness probe; needs no session or database.
#[handler]
async fn healthcheck() -> &'static str {
    "OK"
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("healthcheck").get(healthcheck)
}
