use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
}

impl HealthResponse {
    /// Storage is connected.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    /// No storage backend is reachable; storage-backed routes answer 503.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
        }
    }

    /// Whether the server reports itself healthy.
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
