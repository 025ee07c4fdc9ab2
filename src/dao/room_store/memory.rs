//! Process-local room store backed by `dashmap`.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::SystemTime,
};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::{self, BoxFuture, FutureExt};
use uuid::Uuid;

use super::{RoomRef, RoomStore, match_number_of, series_of};
use crate::dao::{
    models::{DuelRoomEntity, StoredRoom, VersionToken},
    storage::{StorageError, StorageResult},
};

#[derive(Debug, Clone)]
struct MemoryRecord {
    room: DuelRoomEntity,
    version: u64,
    expires_at: SystemTime,
}

impl MemoryRecord {
    fn stored(&self) -> StoredRoom {
        StoredRoom {
            room: self.room.clone(),
            version: VersionToken(self.version.to_string()),
        }
    }
}

/// In-memory [`RoomStore`] with a version counter per record.
#[derive(Clone, Default)]
pub struct MemoryRoomStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    rooms: DashMap<Uuid, MemoryRecord>,
    codes: DashMap<String, Uuid>,
    series_slots: DashMap<(Uuid, i64), Uuid>,
    next_version: AtomicU64,
}

impl MemoryRoomStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_version(&self) -> u64 {
        self.inner.next_version.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn insert(&self, room: DuelRoomEntity, expires_at: SystemTime) -> StorageResult<VersionToken> {
        let inner = &self.inner;
        match inner.codes.entry(room.code.clone()) {
            Entry::Occupied(_) => return Err(StorageError::DuplicateCode(room.code)),
            Entry::Vacant(slot) => {
                slot.insert(room.id);
            }
        }

        let slot_key = (series_of(&room), match_number_of(&room));
        match inner.series_slots.entry(slot_key) {
            Entry::Occupied(_) => {
                inner.codes.remove(&room.code);
                return Err(StorageError::DuplicateSeriesMatch {
                    series_id: slot_key.0.to_string(),
                    match_number: slot_key.1,
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(room.id);
            }
        }

        let version = self.next_version();
        inner.rooms.insert(
            room.id,
            MemoryRecord {
                room,
                version,
                expires_at,
            },
        );
        Ok(VersionToken(version.to_string()))
    }

    fn find(&self, room_ref: &str) -> Option<StoredRoom> {
        let id = match RoomRef::parse(room_ref) {
            RoomRef::Id(id) => id,
            // copy the id out so the code shard is released before touching rooms
            RoomRef::Code(code) => *self.inner.codes.get(&code)?,
        };
        self.inner.rooms.get(&id).map(|record| record.stored())
    }

    fn save(
        &self,
        room: DuelRoomEntity,
        expected: Option<VersionToken>,
        expires_at: SystemTime,
    ) -> StorageResult<VersionToken> {
        let version = self.next_version();
        match self.inner.rooms.entry(room.id) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                if let Some(expected) = expected
                    && expected.0 != record.version.to_string()
                {
                    return Err(StorageError::Conflict(room.id.to_string()));
                }
                record.room = room;
                record.version = version;
                record.expires_at = expires_at;
            }
            Entry::Vacant(vacant) => {
                if expected.is_some() {
                    return Err(StorageError::Conflict(room.id.to_string()));
                }
                vacant.insert(MemoryRecord {
                    room,
                    version,
                    expires_at,
                });
            }
        }
        Ok(VersionToken(version.to_string()))
    }

    fn series(&self, series_id: Uuid) -> Vec<DuelRoomEntity> {
        let mut rooms = self
            .inner
            .rooms
            .iter()
            .filter(|record| series_of(&record.room) == series_id)
            .map(|record| record.room.clone())
            .collect::<Vec<_>>();
        rooms.sort_by_key(match_number_of);
        rooms
    }

    fn sweep(&self, now: SystemTime) -> usize {
        let expired = self
            .inner
            .rooms
            .iter()
            .filter(|record| record.expires_at < now)
            .map(|record| *record.key())
            .collect::<Vec<_>>();

        let mut removed = 0;
        for id in expired {
            if let Some((_, record)) = self
                .inner
                .rooms
                .remove_if(&id, |_, record| record.expires_at < now)
            {
                self.inner.codes.remove(&record.room.code);
                self.inner
                    .series_slots
                    .remove(&(series_of(&record.room), match_number_of(&record.room)));
                removed += 1;
            }
        }
        removed
    }
}

impl RoomStore for MemoryRoomStore {
    fn insert_room(
        &self,
        room: DuelRoomEntity,
        expires_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<VersionToken>> {
        future::ready(self.insert(room, expires_at)).boxed()
    }

    fn find_room(&self, room_ref: String) -> BoxFuture<'static, StorageResult<Option<StoredRoom>>> {
        future::ready(Ok(self.find(&room_ref))).boxed()
    }

    fn save_room(
        &self,
        room: DuelRoomEntity,
        expected: Option<VersionToken>,
        expires_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<VersionToken>> {
        future::ready(self.save(room, expected, expires_at)).boxed()
    }

    fn list_series(&self, series_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<DuelRoomEntity>>> {
        future::ready(Ok(self.series(series_id))).boxed()
    }

    fn sweep_expired(&self, now: SystemTime) -> BoxFuture<'static, StorageResult<usize>> {
        future::ready(Ok(self.sweep(now))).boxed()
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        future::ready(Ok(())).boxed()
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        future::ready(Ok(())).boxed()
    }
}
