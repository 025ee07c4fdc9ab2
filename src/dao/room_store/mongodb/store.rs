use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::{DateTime, doc},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoRoomDocument, doc_id},
};
use crate::dao::{
    models::{DuelRoomEntity, StoredRoom, VersionToken},
    room_store::{RoomRef, RoomStore, match_number_of, series_of},
    storage::{StorageError, StorageResult},
};

const ROOM_COLLECTION_NAME: &str = "duel_rooms";
const CODE_INDEX_NAME: &str = "duel_room_code_idx";
const SERIES_INDEX_NAME: &str = "duel_room_series_idx";
const EXPIRY_INDEX_NAME: &str = "duel_room_expiry_idx";
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Room store over a MongoDB collection, reconnecting after failed health checks.
#[derive(Clone)]
pub struct MongoRoomStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) = establish_connection(&self.config).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

/// Which unique index rejected an insert.
enum DuplicateKey {
    Code,
    SeriesMatch,
}

fn duplicate_key(err: &MongoError) -> Option<DuplicateKey> {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE => {
            if write.message.contains(SERIES_INDEX_NAME) {
                Some(DuplicateKey::SeriesMatch)
            } else {
                Some(DuplicateKey::Code)
            }
        }
        _ => None,
    }
}

impl MongoRoomStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) = establish_connection(&config).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.collection().await;

        let indexes = [
            (
                doc! {"code": 1},
                CODE_INDEX_NAME,
                "code",
                true,
            ),
            (
                doc! {"series_id": 1, "series_match_number": 1},
                SERIES_INDEX_NAME,
                "series_id,series_match_number",
                true,
            ),
            (
                doc! {"expires_at": 1},
                EXPIRY_INDEX_NAME,
                "expires_at",
                false,
            ),
        ];

        for (keys, name, label, unique) in indexes {
            let index = mongodb::IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(Some(name.to_owned()))
                        .unique(Some(unique))
                        .build(),
                )
                .build();

            collection
                .create_index(index)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection: ROOM_COLLECTION_NAME,
                    index: label,
                    source,
                })?;
        }

        Ok(())
    }

    async fn collection(&self) -> Collection<MongoRoomDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoRoomDocument>(ROOM_COLLECTION_NAME)
    }

    async fn insert(
        &self,
        room: DuelRoomEntity,
        expires_at: SystemTime,
    ) -> StorageResult<VersionToken> {
        let id = room.id;
        let code = room.code.clone();
        let series_id = series_of(&room);
        let match_number = match_number_of(&room);
        let document = MongoRoomDocument::new(room, 1, expires_at);

        match self.collection().await.insert_one(&document).await {
            Ok(_) => Ok(VersionToken(document.version.to_string())),
            Err(err) => match duplicate_key(&err) {
                Some(DuplicateKey::Code) => Err(StorageError::DuplicateCode(code)),
                Some(DuplicateKey::SeriesMatch) => Err(StorageError::DuplicateSeriesMatch {
                    series_id: series_id.to_string(),
                    match_number,
                }),
                None => Err(MongoDaoError::InsertRoom { id, source: err }.into()),
            },
        }
    }

    async fn find(&self, room_ref: String) -> MongoResult<Option<StoredRoom>> {
        let filter = match RoomRef::parse(&room_ref) {
            RoomRef::Id(id) => doc_id(id),
            RoomRef::Code(code) => doc! {"code": code},
        };

        let document = self
            .collection()
            .await
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::LoadRoom { room_ref, source })?;

        Ok(document.map(|document| StoredRoom {
            version: VersionToken(document.version.to_string()),
            room: document.room,
        }))
    }

    async fn save(
        &self,
        room: DuelRoomEntity,
        expected: Option<VersionToken>,
        expires_at: SystemTime,
    ) -> StorageResult<VersionToken> {
        let id = room.id;
        let collection = self.collection().await;

        let Some(expected) = expected else {
            let current = collection
                .find_one(doc_id(id))
                .await
                .map_err(|source| MongoDaoError::LoadRoom {
                    room_ref: id.to_string(),
                    source,
                })?
                .map(|document| document.version)
                .unwrap_or(0);
            let document = MongoRoomDocument::new(room, current + 1, expires_at);
            collection
                .replace_one(doc_id(id), &document)
                .upsert(true)
                .await
                .map_err(|source| MongoDaoError::SaveRoom { id, source })?;
            return Ok(VersionToken(document.version.to_string()));
        };

        let Ok(expected_version) = expected.0.parse::<i64>() else {
            return Err(StorageError::Conflict(id.to_string()));
        };

        let document = MongoRoomDocument::new(room, expected_version + 1, expires_at);
        let result = collection
            .replace_one(
                doc! {"_id": id.to_string(), "version": expected_version},
                &document,
            )
            .await
            .map_err(|source| MongoDaoError::SaveRoom { id, source })?;

        if result.matched_count == 0 {
            Err(StorageError::Conflict(id.to_string()))
        } else {
            Ok(VersionToken(document.version.to_string()))
        }
    }

    async fn series(&self, series_id: Uuid) -> MongoResult<Vec<DuelRoomEntity>> {
        let cursor = self
            .collection()
            .await
            .find(doc! {"series_id": series_id.to_string()})
            .sort(doc! {"series_match_number": 1})
            .await
            .map_err(|source| MongoDaoError::ListSeries { series_id, source })?;

        let documents: Vec<MongoRoomDocument> = cursor
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListSeries { series_id, source })?;

        Ok(documents.into_iter().map(|document| document.room).collect())
    }

    async fn sweep(&self, now: SystemTime) -> MongoResult<usize> {
        let result = self
            .collection()
            .await
            .delete_many(doc! {"expires_at": {"$lt": DateTime::from_system_time(now)}})
            .await
            .map_err(|source| MongoDaoError::SweepRooms { source })?;
        Ok(usize::try_from(result.deleted_count).unwrap_or(usize::MAX))
    }
}

impl RoomStore for MongoRoomStore {
    fn insert_room(
        &self,
        room: DuelRoomEntity,
        expires_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<VersionToken>> {
        let store = self.clone();
        Box::pin(async move { store.insert(room, expires_at).await })
    }

    fn find_room(&self, room_ref: String) -> BoxFuture<'static, StorageResult<Option<StoredRoom>>> {
        let store = self.clone();
        Box::pin(async move { store.find(room_ref).await.map_err(Into::into) })
    }

    fn save_room(
        &self,
        room: DuelRoomEntity,
        expected: Option<VersionToken>,
        expires_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<VersionToken>> {
        let store = self.clone();
        Box::pin(async move { store.save(room, expected, expires_at).await })
    }

    fn list_series(&self, series_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<DuelRoomEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.series(series_id).await.map_err(Into::into) })
    }

    fn sweep_expired(&self, now: SystemTime) -> BoxFuture<'static, StorageResult<usize>> {
        let store = self.clone();
        Box::pin(async move {
            let removed = store.sweep(now).await?;
            if removed > 0 {
                debug!(removed, "swept expired MongoDB rooms");
            }
            Ok(removed)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
