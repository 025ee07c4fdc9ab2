use axum::Router;

use crate::state::SharedState;

/// Swagger UI and the OpenAPI document.
pub mod docs;
/// `/duel` room routes.
pub mod duel;
/// `/healthcheck`.
pub mod health;

/// Full HTTP surface: health check, duel rooms and API docs.
pub fn router(state: SharedState) -> Router<()> {
    Router::new()
        .merge(health::router())
        .merge(duel::router())
        .merge(docs::router())
        .with_state(state)
}
