//! Optimistic read-modify-write cycle shared by every room-mutating operation.

use std::time::{Duration, SystemTime};

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    dao::{models::DuelRoomEntity, room_store::RoomStore, storage::StorageError},
    error::ServiceError,
    services::questions,
    state::{
        DuelError, SharedState,
        room::{DuelRoom, DuelStatus},
        state_machine::reconcile,
    },
};

/// Outcome of a successful mutation: the task's value and the room as it was saved.
pub struct Mutated<T> {
    /// What the task returned.
    pub value: T,
    /// Room as persisted.
    pub room: DuelRoom,
    /// Instant the winning attempt was evaluated at.
    pub now: SystemTime,
}

/// Run `task` against the freshly loaded room and save it conditionally, retrying on conflicts.
///
/// The task is invoked again after every lost race, always on a newly loaded room, so it must
/// derive every decision from its argument. Domain errors abort immediately without saving.
pub async fn mutate_room<T, F>(
    state: &SharedState,
    room_ref: &str,
    mut task: F,
) -> Result<Mutated<T>, ServiceError>
where
    F: FnMut(&mut DuelRoom, SystemTime) -> Result<T, DuelError>,
{
    let store = state.require_room_store().await?;
    sweep_expired(state, store.as_ref()).await;

    let config = state.config();
    let attempts = config.mutation_max_retries.max(1);

    for attempt in 1..=attempts {
        let now = state.clock().now();
        let stored = store
            .find_room(room_ref.to_owned())
            .await?
            .ok_or(DuelError::RoomNotFound)?;

        let mut room = normalize_room(state, stored.room);
        let was_active = room.status == DuelStatus::Active;
        reconcile(&mut room, now);
        let value = task(&mut room, now)?;
        reconcile(&mut room, now);

        let expires_at = now + config.room_ttl;
        match store
            .save_room(room.clone().into(), Some(stored.version), expires_at)
            .await
        {
            Ok(_) => {
                if was_active && room.status == DuelStatus::Finished {
                    info!(room_id = %room.id, code = %room.code, "match finished");
                }
                return Ok(Mutated { value, room, now });
            }
            Err(StorageError::Conflict(_)) => {
                debug!(attempt, room_id = %room.id, "room write lost a race; retrying");
                let jitter = {
                    let mut rng = rand::rng();
                    rng.random_range(config.retry_jitter_range())
                };
                sleep(Duration::from_millis(jitter)).await;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(ServiceError::Conflict("Conflict while updating room".into()))
}

/// Load a room for reading, finalizing it in memory without writing anything back.
pub async fn load_room(
    state: &SharedState,
    room_ref: &str,
) -> Result<(DuelRoom, SystemTime), ServiceError> {
    let store = state.require_room_store().await?;
    sweep_expired(state, store.as_ref()).await;

    let now = state.clock().now();
    let stored = store
        .find_room(room_ref.to_owned())
        .await?
        .ok_or(DuelError::RoomNotFound)?;

    let mut room = normalize_room(state, stored.room);
    reconcile(&mut room, now);
    Ok((room, now))
}

/// Convert a stored record into a room, regenerating questions a started discrete room lost.
pub fn normalize_room(state: &SharedState, entity: DuelRoomEntity) -> DuelRoom {
    let mut room = DuelRoom::from(entity);
    if room.mode.is_discrete() && room.status != DuelStatus::Waiting && room.questions.is_empty() {
        let mut rng = rand::rng();
        room.questions = questions::questions_for_mode(
            room.mode,
            &room.pool,
            room.rounds,
            state.catalog(),
            &mut rng,
        );
    }
    room
}

/// Best-effort expiry sweep; failures are logged and swallowed.
pub async fn sweep_expired(state: &SharedState, store: &dyn RoomStore) {
    let now = state.clock().now();
    match store.sweep_expired(now).await {
        Ok(0) => {}
        Ok(removed) => debug!(removed, "swept expired rooms"),
        Err(err) => warn!(error = %err, "expired room sweep failed"),
    }
}
