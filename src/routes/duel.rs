use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::duel::{
        CreateRoomRequest, JoinRoomRequest, ReadyRequest, RematchRequest, RoomResponse,
        RoomStateQuery, StartMatchRequest, SubmitAnswerRequest, SubmitAnswerResponse,
    },
    error::{AppError, ErrorBody},
    services::duel_service,
    state::SharedState,
};

/// Duel room endpoints. Every response carries the room as seen by the caller.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/duel/rooms", post(create_room))
        .route("/duel/rooms/join", post(join_room))
        .route("/duel/rooms/ready", post(set_ready))
        .route("/duel/rooms/start", post(start_match))
        .route("/duel/rooms/answer", post(submit_answer))
        .route("/duel/rooms/rematch", post(create_rematch))
        .route("/duel/rooms/{room_ref}", get(get_room_state))
}

#[utoipa::path(
    post,
    path = "/duel/rooms",
    tag = "duel",
    request_body = CreateRoomRequest,
    responses(
        (status = 200, description = "Room created", body = RoomResponse),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
/// Create a waiting room hosted by the caller.
pub async fn create_room(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<CreateRoomRequest>>,
) -> Result<Json<RoomResponse>, AppError> {
    let payload = duel_service::create_room(&state, request).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    post,
    path = "/duel/rooms/join",
    tag = "duel",
    request_body = JoinRoomRequest,
    responses(
        (status = 200, description = "Joined, rejoined or spectating", body = RoomResponse),
        (status = 404, description = "Room not found", body = ErrorBody),
        (status = 409, description = "Room is full", body = ErrorBody)
    )
)]
/// Join a room by id or code.
pub async fn join_room(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<JoinRoomRequest>>,
) -> Result<Json<RoomResponse>, AppError> {
    let payload = duel_service::join_room(&state, request).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    post,
    path = "/duel/rooms/ready",
    tag = "duel",
    request_body = ReadyRequest,
    responses(
        (status = 200, description = "Readiness updated", body = RoomResponse),
        (status = 403, description = "Player is not in this room", body = ErrorBody),
        (status = 409, description = "Room already started", body = ErrorBody)
    )
)]
/// Mark a seated player ready or not ready.
pub async fn set_ready(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<ReadyRequest>>,
) -> Result<Json<RoomResponse>, AppError> {
    let payload = duel_service::set_ready(&state, request).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    post,
    path = "/duel/rooms/start",
    tag = "duel",
    request_body = StartMatchRequest,
    responses(
        (status = 200, description = "Match started", body = RoomResponse),
        (status = 400, description = "Continent selection or list missing", body = ErrorBody),
        (status = 403, description = "Only host can start the match", body = ErrorBody),
        (status = 409, description = "Start preconditions not met", body = ErrorBody)
    )
)]
/// Start the match in the requested mode.
pub async fn start_match(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<StartMatchRequest>>,
) -> Result<Json<RoomResponse>, AppError> {
    let payload = duel_service::start_match(&state, request).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    post,
    path = "/duel/rooms/answer",
    tag = "duel",
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer judged", body = SubmitAnswerResponse),
        (status = 404, description = "Room or question not found", body = ErrorBody),
        (status = 409, description = "Room is not active", body = ErrorBody)
    )
)]
/// Submit an answer for a discrete question or a country guess.
pub async fn submit_answer(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<SubmitAnswerRequest>>,
) -> Result<Json<SubmitAnswerResponse>, AppError> {
    let payload = duel_service::submit_answer(&state, request).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/duel/rooms/{room_ref}",
    tag = "duel",
    params(
        ("room_ref" = String, Path, description = "Room id or join code"),
        RoomStateQuery
    ),
    responses(
        (status = 200, description = "Current room state", body = RoomResponse),
        (status = 404, description = "Room not found", body = ErrorBody)
    )
)]
/// Poll the room as seen by a player or spectator.
pub async fn get_room_state(
    State(state): State<SharedState>,
    Path(room_ref): Path<String>,
    Valid(Query(query)): Valid<Query<RoomStateQuery>>,
) -> Result<Json<RoomResponse>, AppError> {
    let payload = duel_service::get_room_state(&state, &room_ref, &query.player_id).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    post,
    path = "/duel/rooms/rematch",
    tag = "duel",
    request_body = RematchRequest,
    responses(
        (status = 200, description = "Next match of the series", body = RoomResponse),
        (status = 403, description = "Only participants can create rematch", body = ErrorBody),
        (status = 409, description = "Match unfinished or series over", body = ErrorBody)
    )
)]
/// Create the next room of the series.
pub async fn create_rematch(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<RematchRequest>>,
) -> Result<Json<RoomResponse>, AppError> {
    let payload = duel_service::create_rematch(&state, request).await?;
    Ok(Json(payload))
}
