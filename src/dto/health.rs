use serde::Serialize;
use utoipa::ToSchema;

/// Whether the room store is currently usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Store reachable.
    Ok,
    /// Store unreachable; room routes answer 503.
    Degraded,
}

/// Payload of the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Room store status.
    pub status: HealthStatus,
    /// Size of the country reference table the engine plays with.
    pub countries: usize,
}
