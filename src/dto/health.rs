use serde::Serialize;
use utoipa::ToSchema;

/// Coarse service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// A storage backend is installed and answering.
    Ok,
    /// No usable storage; store-backed routes answer 503.
    Degraded,
}

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Current status of the service.
    pub status: HealthStatus,
}

impl HealthResponse {
    /// Storage installed and answering.
    pub fn ok() -> Self {
        Self {
            status: HealthStatus::Ok,
        }
    }

    /// Storage missing or failing its health checks.
    pub fn degraded() -> Self {
        Self {
            status: HealthStatus::Degraded,
        }
    }
}
