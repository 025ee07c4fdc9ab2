use std::{sync::Arc, time::SystemTime};

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, json};
use tracing::debug;
use uuid::Uuid;

use crate::dao::{
    models::{DuelRoomEntity, StoredRoom, VersionToken},
    room_store::{RoomRef, RoomStore, match_number_of},
    storage::{StorageError, StorageResult},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        CouchReservationDocument, CouchRoomDocument, ExpiredRoomRow, FindResponse, ROOM_DOC_TYPE,
        WriteResponse, code_doc_id, epoch_millis, room_doc_id, series_slot_of,
    },
};

const FIND: &str = "_find";
const SWEEP_BATCH: usize = 200;

/// Outcome of a document write that CouchDB may reject with `409`.
enum PutOutcome {
    Written(String),
    Conflict,
}

/// Room store backed by a CouchDB database reached over HTTP.
#[derive(Clone)]
pub struct CouchRoomStore {
    client: Client,
    /// `{base_url}/{database}` without a trailing slash.
    database_url: Arc<str>,
    database: Arc<str>,
    credentials: Option<Arc<(String, String)>>,
}

impl CouchRoomStore {
    /// Build the HTTP client and create the room database if it does not exist yet.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let database_url = format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            config.database
        );
        let store = Self {
            client,
            database_url: database_url.into(),
            database: config.database.into(),
            credentials: config.credentials.map(Arc::new),
        };

        store.ensure_database().await?;
        Ok(store)
    }

    /// Request against the database itself (`path == None`) or one of its endpoints.
    fn request(&self, method: Method, path: Option<&str>) -> RequestBuilder {
        let url = match path {
            Some(path) => format!("{}/{path}", self.database_url),
            None => self.database_url.to_string(),
        };
        let builder = self.client.request(method, url);
        match self.credentials.as_deref() {
            Some((user, password)) => builder.basic_auth(user, Some(password)),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder, path: &str) -> CouchResult<Response> {
        builder.send().await.map_err(|source| CouchDaoError::Transport {
            path: path.to_owned(),
            source,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> CouchResult<T> {
        response.json::<T>().await.map_err(|source| CouchDaoError::Decode {
            path: path.to_owned(),
            source,
        })
    }

    fn unexpected(path: &str, status: StatusCode) -> CouchDaoError {
        CouchDaoError::UnexpectedStatus {
            path: path.to_owned(),
            status,
        }
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.as_ref();
        let response = Self::send(self.request(Method::GET, None), database).await?;
        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let created = Self::send(self.request(Method::PUT, None), database).await?;
                let status = created.status();
                // 412: another instance created it first
                if status.is_success() || status == StatusCode::PRECONDITION_FAILED {
                    Ok(())
                } else {
                    Err(Self::unexpected(database, status))
                }
            }
            other => Err(Self::unexpected(database, other)),
        }
    }

    async fn get_document<T: DeserializeOwned>(&self, doc_id: &str) -> CouchResult<Option<T>> {
        let response = Self::send(self.request(Method::GET, Some(doc_id)), doc_id).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Self::decode(response, doc_id).await.map(Some),
            other => Err(Self::unexpected(doc_id, other)),
        }
    }

    /// Write a document; a `409` means the revision (or the reservation) is already taken.
    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<PutOutcome>
    where
        T: ?Sized + Serialize,
    {
        let builder = self.request(Method::PUT, Some(doc_id)).json(document);
        let response = Self::send(builder, doc_id).await?;
        match response.status() {
            StatusCode::CONFLICT => Ok(PutOutcome::Conflict),
            status if status.is_success() => {
                let written: WriteResponse = Self::decode(response, doc_id).await?;
                written
                    .rev
                    .map(PutOutcome::Written)
                    .ok_or_else(|| CouchDaoError::MissingRevision {
                        path: doc_id.to_owned(),
                    })
            }
            other => Err(Self::unexpected(doc_id, other)),
        }
    }

    /// Delete a document at a known revision. Missing or already-updated documents are left alone.
    async fn delete_document(&self, doc_id: &str, rev: &str) -> CouchResult<bool> {
        let builder = self
            .request(Method::DELETE, Some(doc_id))
            .query(&[("rev", rev)]);
        let response = Self::send(builder, doc_id).await?;
        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::CONFLICT => Ok(false),
            status if status.is_success() => Ok(true),
            other => Err(Self::unexpected(doc_id, other)),
        }
    }

    async fn release_reservation(&self, doc_id: &str) -> CouchResult<()> {
        if let Some(existing) = self.get_document::<CouchReservationDocument>(doc_id).await?
            && let Some(rev) = existing.rev
        {
            self.delete_document(doc_id, &rev).await?;
        }
        Ok(())
    }

    /// Run a Mango query and decode every returned row.
    async fn find_documents<T: DeserializeOwned>(&self, query: Value) -> CouchResult<Vec<T>> {
        let builder = self.request(Method::POST, Some(FIND)).json(&query);
        let response = Self::send(builder, FIND).await?;
        if !response.status().is_success() {
            return Err(Self::unexpected(FIND, response.status()));
        }

        let payload: FindResponse = Self::decode(response, FIND).await?;
        payload
            .docs
            .into_iter()
            .map(|doc| {
                from_value(doc).map_err(|source| CouchDaoError::MalformedDocument {
                    path: FIND.to_owned(),
                    source,
                })
            })
            .collect()
    }

    async fn load_room(&self, id: Uuid) -> CouchResult<Option<StoredRoom>> {
        let doc = self
            .get_document::<CouchRoomDocument>(&room_doc_id(id))
            .await?;
        Ok(doc.and_then(|doc| {
            doc.rev.map(|rev| StoredRoom {
                room: doc.room,
                version: VersionToken(rev),
            })
        }))
    }

    async fn insert(
        &self,
        room: DuelRoomEntity,
        expires_at: SystemTime,
    ) -> StorageResult<VersionToken> {
        let code_id = code_doc_id(&room.code);
        let code_doc = CouchReservationDocument::new(code_id.clone(), room.id);
        if let PutOutcome::Conflict = self.put_document(&code_id, &code_doc).await? {
            return Err(StorageError::DuplicateCode(room.code));
        }

        let (series_id, match_number, slot_id) = series_slot_of(&room);
        let slot_doc = CouchReservationDocument::new(slot_id.clone(), room.id);
        if let PutOutcome::Conflict = self.put_document(&slot_id, &slot_doc).await? {
            self.release_reservation(&code_id).await?;
            return Err(StorageError::DuplicateSeriesMatch {
                series_id: series_id.to_string(),
                match_number,
            });
        }

        let id = room.id;
        let doc = CouchRoomDocument::new(room, None, expires_at);
        match self.put_document(&doc.doc_id, &doc).await? {
            PutOutcome::Written(rev) => Ok(VersionToken(rev)),
            PutOutcome::Conflict => Err(StorageError::Conflict(id.to_string())),
        }
    }

    async fn save(
        &self,
        room: DuelRoomEntity,
        expected: Option<VersionToken>,
        expires_at: SystemTime,
    ) -> StorageResult<VersionToken> {
        let id = room.id;
        let rev = match expected {
            Some(token) => Some(token.0),
            None => self
                .get_document::<CouchRoomDocument>(&room_doc_id(id))
                .await?
                .and_then(|existing| existing.rev),
        };

        let doc = CouchRoomDocument::new(room, rev, expires_at);
        match self.put_document(&doc.doc_id, &doc).await? {
            PutOutcome::Written(rev) => Ok(VersionToken(rev)),
            PutOutcome::Conflict => Err(StorageError::Conflict(id.to_string())),
        }
    }

    async fn sweep(&self, now: SystemTime) -> CouchResult<usize> {
        let query = json!({
            "selector": {
                "doc_type": ROOM_DOC_TYPE,
                "expires_at_ms": { "$lt": epoch_millis(now) },
            },
            "fields": ["_id", "_rev", "id", "code", "series_id", "series_match_number"],
            "limit": SWEEP_BATCH,
        });
        let expired = self.find_documents::<ExpiredRoomRow>(query).await?;

        let mut removed = 0;
        for row in expired {
            if !self.delete_document(&row.doc_id, &row.rev).await? {
                continue;
            }
            for reservation in row.reservation_ids() {
                self.release_reservation(&reservation).await?;
            }
            removed += 1;
        }
        Ok(removed)
    }
}

impl RoomStore for CouchRoomStore {
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
        Box::pin(async move {
            let id = match RoomRef::parse(&room_ref) {
                RoomRef::Id(id) => id,
                RoomRef::Code(code) => {
                    match store
                        .get_document::<CouchReservationDocument>(&code_doc_id(&code))
                        .await?
                    {
                        Some(reservation) => reservation.room_id,
                        None => return Ok(None),
                    }
                }
            };
            store.load_room(id).await.map_err(Into::into)
        })
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
        Box::pin(async move {
            let query = json!({
                "selector": {
                    "doc_type": ROOM_DOC_TYPE,
                    "$or": [
                        { "series_id": series_id },
                        { "id": series_id },
                    ],
                },
            });
            let docs = store.find_documents::<CouchRoomDocument>(query).await?;
            let mut rooms = docs
                .into_iter()
                .map(|doc| doc.room)
                .filter(|room| room.series_id.unwrap_or(room.id) == series_id)
                .collect::<Vec<_>>();
            rooms.sort_by_key(match_number_of);
            Ok(rooms)
        })
    }

    fn sweep_expired(&self, now: SystemTime) -> BoxFuture<'static, StorageResult<usize>> {
        let store = self.clone();
        Box::pin(async move {
            let removed = store.sweep(now).await?;
            if removed > 0 {
                debug!(removed, "swept expired CouchDB rooms");
            }
            Ok(removed)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let database = store.database.as_ref();
            let response = Self::send(store.request(Method::GET, None), database).await?;
            if response.status().is_success() {
                Ok(())
            } else {
                Err(Self::unexpected(database, response.status()).into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
