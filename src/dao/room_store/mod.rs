/// CouchDB backend.
#[cfg(feature = "couch-store")]
pub mod couchdb;
/// In-process backend used by default and in tests.
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::time::SystemTime;

use crate::dao::models::{DuelRoomEntity, StoredRoom, VersionToken};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for duel rooms.
///
/// Every write carries the instant after which the record may be swept, and every
/// conditional save is an atomic compare-and-swap on the record's [`VersionToken`].
pub trait RoomStore: Send + Sync {
    /// Insert a brand-new room.
    ///
    /// Fails with `DuplicateCode` when the code is owned by another room and with
    /// `DuplicateSeriesMatch` when its series slot is already filled.
    fn insert_room(
        &self,
        room: DuelRoomEntity,
        expires_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<VersionToken>>;
    /// Look a room up by id, falling back to its code (case-insensitive).
    fn find_room(&self, room_ref: String) -> BoxFuture<'static, StorageResult<Option<StoredRoom>>>;
    /// Replace a room; when `expected` is set the write only lands if the stored version still matches.
    fn save_room(
        &self,
        room: DuelRoomEntity,
        expected: Option<VersionToken>,
        expires_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<VersionToken>>;
    /// Every room of a series, ordered by match number.
    fn list_series(&self, series_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<DuelRoomEntity>>>;
    /// Delete every room whose expiry is before `now`, returning how many went away.
    fn sweep_expired(&self, now: SystemTime) -> BoxFuture<'static, StorageResult<usize>>;
    /// Cheap round-trip used by the health route.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// A parsed room reference: either a room id or a join code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomRef {
    /// Room UUID.
    Id(Uuid),
    /// Uppercased join code.
    Code(String),
}

impl RoomRef {
    /// Interpret a raw reference; anything that is not a UUID is treated as an uppercase code.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match Uuid::parse_str(trimmed) {
            Ok(id) => RoomRef::Id(id),
            Err(_) => RoomRef::Code(trimmed.to_uppercase()),
        }
    }
}

/// Series a stored room belongs to; legacy rooms form a series of their own.
pub(crate) fn series_of(room: &DuelRoomEntity) -> Uuid {
    room.series_id.unwrap_or(room.id)
}

/// Position of a stored room inside its series.
pub(crate) fn match_number_of(room: &DuelRoomEntity) -> i64 {
    room.series_match_number.unwrap_or(1).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_ref_prefers_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(RoomRef::parse(&id.to_string()), RoomRef::Id(id));
        assert_eq!(RoomRef::parse(" ab3k9q "), RoomRef::Code("AB3K9Q".into()));
    }
}
