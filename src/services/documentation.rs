use utoipa::OpenApi;

/// Aggregated OpenAPI specification for Geo Duel Back.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::duel::create_room,
        crate::routes::duel::join_room,
        crate::routes::duel::set_ready,
        crate::routes::duel::start_match,
        crate::routes::duel::submit_answer,
        crate::routes::duel::get_room_state,
        crate::routes::duel::create_rematch,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::duel::CreateRoomRequest,
            crate::dto::duel::PoolInput,
            crate::dto::duel::JoinRoomRequest,
            crate::dto::duel::ReadyRequest,
            crate::dto::duel::StartMatchRequest,
            crate::dto::duel::SubmitAnswerRequest,
            crate::dto::duel::RematchRequest,
            crate::dto::duel::RoomResponse,
            crate::dto::duel::SubmitAnswerResponse,
            crate::dto::duel::RoomSnapshot,
            crate::dto::duel::SeriesSnapshot,
            crate::error::ErrorBody,
            crate::state::room::DuelMode,
            crate::state::room::DuelStatus,
            crate::state::room::Continent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "duel", description = "Two-player duel rooms and best-of-N series"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_duel_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/duel/rooms",
            "/duel/rooms/join",
            "/duel/rooms/ready",
            "/duel/rooms/start",
            "/duel/rooms/answer",
            "/duel/rooms/rematch",
            "/duel/rooms/{room_ref}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
