//! Room engine operations: every public duel action maps to one function here.

use std::time::SystemTime;

use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{
        room_store::RoomStore,
        storage::{StorageError, StorageResult},
    },
    dto::duel::{
        AnswerView, CreateRoomRequest, JoinRoomRequest, ReadyRequest, RematchRequest, RoomResponse,
        RoomSnapshot, StartMatchRequest, SubmitAnswerRequest, SubmitAnswerResponse,
    },
    error::ServiceError,
    services::{
        mutation::{self, load_room, mutate_room, normalize_room},
        questions::{build_match, sanitize_pool},
        scoring::evaluate_answer,
        series::{build_rematch_room, compute_series_snapshot},
    },
    state::{
        DuelError, SharedState,
        room::{DuelPlayer, DuelRoom, DuelStatus, clamp_best_of},
        state_machine::{
            self, JoinOutcome, RoomOptions, begin_match, display_name, ensure_can_start,
            reconcile, safe_player_id,
        },
    },
};

/// Alphabet of join codes, without look-alike characters.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
/// Length of a join code.
const CODE_LENGTH: usize = 6;

/// Draw a fresh join code.
pub fn new_room_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LENGTH)
        .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
        .collect()
}

fn required_player_id(raw: &str, field: &str) -> Result<String, ServiceError> {
    let player_id = safe_player_id(raw);
    if player_id.is_empty() {
        return Err(ServiceError::InvalidInput(format!("{field} is required")));
    }
    Ok(player_id)
}

/// Open a new waiting room with the caller as host and only player.
pub async fn create_room(
    state: &SharedState,
    request: CreateRoomRequest,
) -> Result<RoomResponse, ServiceError> {
    let player_id = required_player_id(&request.player_id, "playerId")?;
    let store = state.require_room_store().await?;
    mutation::sweep_expired(state, store.as_ref()).await;

    let now = state.clock().now();
    let config = state.config();
    let pool_input = request.pool.unwrap_or_default();
    let pool = sanitize_pool(
        pool_input.kind.as_deref(),
        pool_input.continent.as_deref(),
        &pool_input.allowed_countries,
        state.catalog(),
    );

    let room = state_machine::create_room(
        String::new(),
        RoomOptions {
            mode: request.mode,
            pool,
            best_of: clamp_best_of(request.series_best_of),
            rounds: config.discrete_rounds,
            duration_seconds: config.discrete_duration_seconds,
        },
        DuelPlayer::new(player_id.clone(), display_name(&request.player_name), now),
        now,
    );

    let room = insert_with_fresh_code(state, store.as_ref(), room, now)
        .await?
        .ok_or_else(|| ServiceError::Internal("Failed to create room".into()))?;
    info!(
        room_id = %room.id,
        code = %room.code,
        player_id = %player_id,
        mode = ?room.mode,
        best_of = room.series_best_of,
        "duel room created"
    );

    let snapshot = snapshot_for(state, store.as_ref(), &room, &player_id, now).await?;
    Ok(RoomResponse { room: snapshot })
}

/// Take the free seat of a waiting room, or refresh the name of a returning player.
pub async fn join_room(
    state: &SharedState,
    request: JoinRoomRequest,
) -> Result<RoomResponse, ServiceError> {
    let player_id = required_player_id(&request.player_id, "playerId")?;

    let mutated = mutate_room(state, &request.room_id, |room, now| {
        state_machine::join(room, &player_id, &request.player_name, now)
    })
    .await?;

    if mutated.value == JoinOutcome::Seated {
        info!(room_id = %mutated.room.id, player_id = %player_id, "player joined duel room");
    }

    room_response(state, &mutated.room, &player_id, mutated.now).await
}

/// Toggle readiness of a seated player.
pub async fn set_ready(
    state: &SharedState,
    request: ReadyRequest,
) -> Result<RoomResponse, ServiceError> {
    let player_id = required_player_id(&request.player_id, "playerId")?;

    let mutated = mutate_room(state, &request.room_id, |room, _now| {
        state_machine::set_ready(room, &player_id, request.ready)
    })
    .await?;

    room_response(state, &mutated.room, &player_id, mutated.now).await
}

/// Start the match: host only, two ready players, questions or targets generated on the spot.
pub async fn start_match(
    state: &SharedState,
    request: StartMatchRequest,
) -> Result<RoomResponse, ServiceError> {
    let host_id = required_player_id(&request.host_player_id, "hostPlayerId")?;

    let mutated = mutate_room(state, &request.room_id, |room, now| {
        ensure_can_start(room, &host_id)?;
        let setup = {
            let mut rng = rand::rng();
            build_match(
                request.mode,
                &room.pool,
                request.continent.as_deref(),
                &request.allowed_countries,
                state.catalog(),
                state.config(),
                &mut rng,
            )?
        };
        begin_match(room, setup, now)
    })
    .await?;

    info!(
        room_id = %mutated.room.id,
        mode = ?mutated.room.mode,
        rounds = mutated.room.rounds,
        duration_seconds = mutated.room.duration_seconds,
        "duel match started"
    );

    room_response(state, &mutated.room, &host_id, mutated.now).await
}

/// Record one answer or guess and report how it was judged.
pub async fn submit_answer(
    state: &SharedState,
    request: SubmitAnswerRequest,
) -> Result<SubmitAnswerResponse, ServiceError> {
    let player_id = required_player_id(&request.player_id, "playerId")?;

    let mutated = mutate_room(state, &request.room_id, |room, now| {
        evaluate_answer(room, &player_id, request.question_index, &request.answer, now)
    })
    .await?;

    let result = AnswerView::from(&mutated.value);
    let RoomResponse { room } =
        room_response(state, &mutated.room, &player_id, mutated.now).await?;
    Ok(SubmitAnswerResponse { room, result })
}

/// Current room as seen by `viewer`; a lapsed clock is finalized and persisted on the way.
pub async fn get_room_state(
    state: &SharedState,
    room_ref: &str,
    viewer: &str,
) -> Result<RoomResponse, ServiceError> {
    let viewer_id = required_player_id(viewer, "playerId")?;

    let mutated = mutate_room(state, room_ref, |_room, _now| Ok(())).await?;

    room_response(state, &mutated.room, &viewer_id, mutated.now).await
}

/// Spawn the next match of the series once the current one is over.
pub async fn create_rematch(
    state: &SharedState,
    request: RematchRequest,
) -> Result<RoomResponse, ServiceError> {
    let requester_id = required_player_id(&request.requester_player_id, "requesterPlayerId")?;
    let store = state.require_room_store().await?;

    let (source, now) = load_room(state, &request.room_id).await?;
    if source.status != DuelStatus::Finished {
        return Err(DuelError::MatchNotFinished.into());
    }
    if source.player(&requester_id).is_none() {
        return Err(DuelError::ParticipantsOnly.into());
    }

    let played = series_rooms(state, store.as_ref(), source.series_id, now).await?;
    // A later match that is still open is the rematch; hand it back instead of skipping ahead.
    if let Some(pending) = played
        .iter()
        .filter(|room| room.series_match_number > source.series_match_number)
        .filter(|room| room.status != DuelStatus::Finished)
        .min_by_key(|room| room.series_match_number)
    {
        debug!(
            series_id = %source.series_id,
            match_number = pending.series_match_number,
            "rematch already waiting"
        );
        let series = compute_series_snapshot(&played, pending);
        return Ok(RoomResponse {
            room: RoomSnapshot::for_viewer(pending, series, &requester_id, now),
        });
    }

    let series = compute_series_snapshot(&played, &source);
    // Exhaustion takes precedence over a decided series.
    let highest_match = series
        .history
        .iter()
        .map(|entry| entry.match_number)
        .max()
        .unwrap_or(source.series_match_number);
    let next_match = highest_match + 1;
    if next_match > source.series_best_of {
        return Err(DuelError::SeriesExhausted.into());
    }
    if series.decided {
        return Err(DuelError::SeriesDecided.into());
    }

    let rematch = build_rematch_room(&source, &requester_id, next_match, String::new(), now);
    match insert_with_fresh_code(state, store.as_ref(), rematch, now).await {
        Ok(Some(room)) => {
            info!(
                room_id = %room.id,
                series_id = %room.series_id,
                match_number = room.series_match_number,
                requester = %requester_id,
                "rematch room created"
            );
            room_response(state, &room, &requester_id, now).await
        }
        Ok(None) => Err(ServiceError::Internal("Failed to create rematch".into())),
        Err(StorageError::DuplicateSeriesMatch { .. }) => {
            // Both players asked at once; hand back the room the other request created.
            debug!(series_id = %source.series_id, match_number = next_match, "rematch already created");
            let rooms = series_rooms(state, store.as_ref(), source.series_id, now).await?;
            let existing = rooms
                .iter()
                .find(|room| room.series_match_number == next_match)
                .ok_or_else(|| ServiceError::Conflict("Conflict while updating room".into()))?;
            let series = compute_series_snapshot(&rooms, existing);
            Ok(RoomResponse {
                room: RoomSnapshot::for_viewer(existing, series, &requester_id, now),
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Insert `room` under a freshly drawn code, drawing again on collisions.
///
/// `Ok(None)` means every attempt collided.
async fn insert_with_fresh_code(
    state: &SharedState,
    store: &dyn RoomStore,
    mut room: DuelRoom,
    now: SystemTime,
) -> StorageResult<Option<DuelRoom>> {
    let config = state.config();
    let expires_at = now + config.room_ttl;

    for attempt in 1..=config.code_insert_attempts.max(1) {
        room.code = {
            let mut rng = rand::rng();
            new_room_code(&mut rng)
        };
        match store.insert_room(room.clone().into(), expires_at).await {
            Ok(_) => return Ok(Some(room)),
            Err(StorageError::DuplicateCode(code)) => {
                debug!(attempt, code = %code, "room code already taken; drawing another");
            }
            Err(err) => return Err(err),
        }
    }

    Ok(None)
}

/// Every room of a series, finalized in memory at `now`.
async fn series_rooms(
    state: &SharedState,
    store: &dyn RoomStore,
    series_id: Uuid,
    now: SystemTime,
) -> Result<Vec<DuelRoom>, ServiceError> {
    let entities = store.list_series(series_id).await?;
    Ok(entities
        .into_iter()
        .map(|entity| {
            let mut room = normalize_room(state, entity);
            reconcile(&mut room, now);
            room
        })
        .collect())
}

async fn snapshot_for(
    state: &SharedState,
    store: &dyn RoomStore,
    room: &DuelRoom,
    viewer_id: &str,
    now: SystemTime,
) -> Result<RoomSnapshot, ServiceError> {
    let rooms = series_rooms(state, store, room.series_id, now).await?;
    let series = compute_series_snapshot(&rooms, room);
    Ok(RoomSnapshot::for_viewer(room, series, viewer_id, now))
}

async fn room_response(
    state: &SharedState,
    room: &DuelRoom,
    viewer_id: &str,
    now: SystemTime,
) -> Result<RoomResponse, ServiceError> {
    let store = state.require_room_store().await?;
    let snapshot = snapshot_for(state, store.as_ref(), room, viewer_id, now).await?;
    Ok(RoomResponse { room: snapshot })
}
