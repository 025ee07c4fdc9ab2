use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::dao::models::DuelRoomEntity;
use crate::dao::room_store::{match_number_of, series_of};

pub const ROOM_PREFIX: &str = "room::";
pub const CODE_PREFIX: &str = "code::";
pub const SERIES_PREFIX: &str = "series::";

pub const ROOM_DOC_TYPE: &str = "room";
pub const RESERVATION_DOC_TYPE: &str = "reservation";

/// Response of a successful `PUT`.
#[derive(Debug, Deserialize)]
pub struct WriteResponse {
    #[serde(default)]
    pub rev: Option<String>,
}

/// Response of a Mango `_find` query.
#[derive(Debug, Deserialize)]
pub struct FindResponse {
    #[serde(default)]
    pub docs: Vec<Value>,
}

/// Stored room document: the entity plus bookkeeping fields used by Mango selectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchRoomDocument {
    #[serde(rename = "_id")]
    pub doc_id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub doc_type: String,
    pub expires_at_ms: i64,
    #[serde(flatten)]
    pub room: DuelRoomEntity,
}

impl CouchRoomDocument {
    pub fn new(room: DuelRoomEntity, rev: Option<String>, expires_at: SystemTime) -> Self {
        Self {
            doc_id: room_doc_id(room.id),
            rev,
            doc_type: ROOM_DOC_TYPE.to_owned(),
            expires_at_ms: epoch_millis(expires_at),
            room,
        }
    }
}

/// Marker document claiming a unique key (a room code or a series slot) for a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchReservationDocument {
    #[serde(rename = "_id")]
    pub doc_id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub doc_type: String,
    pub room_id: Uuid,
}

impl CouchReservationDocument {
    pub fn new(doc_id: String, room_id: Uuid) -> Self {
        Self {
            doc_id,
            rev: None,
            doc_type: RESERVATION_DOC_TYPE.to_owned(),
            room_id,
        }
    }
}

/// Projection returned by the expiry query.
#[derive(Debug, Deserialize)]
pub struct ExpiredRoomRow {
    #[serde(rename = "_id")]
    pub doc_id: String,
    #[serde(rename = "_rev")]
    pub rev: String,
    pub code: String,
    #[serde(default)]
    pub series_id: Option<Uuid>,
    #[serde(default)]
    pub series_match_number: Option<i64>,
    pub id: Uuid,
}

impl ExpiredRoomRow {
    /// Reservation documents owned by this room.
    pub fn reservation_ids(&self) -> [String; 2] {
        [
            code_doc_id(&self.code),
            series_doc_id(
                self.series_id.unwrap_or(self.id),
                self.series_match_number.unwrap_or(1).max(1),
            ),
        ]
    }
}

pub fn room_doc_id(id: Uuid) -> String {
    format!("{ROOM_PREFIX}{id}")
}

pub fn code_doc_id(code: &str) -> String {
    format!("{CODE_PREFIX}{}", code.to_uppercase())
}

pub fn series_doc_id(series_id: Uuid, match_number: i64) -> String {
    format!("{SERIES_PREFIX}{series_id}::{match_number}")
}

/// Series slot document id for a room.
pub fn series_slot_of(room: &DuelRoomEntity) -> (Uuid, i64, String) {
    let series_id = series_of(room);
    let match_number = match_number_of(room);
    (
        series_id,
        match_number,
        series_doc_id(series_id, match_number),
    )
}

pub fn epoch_millis(at: SystemTime) -> i64 {
    at.duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis()
        .try_into()
        .unwrap_or(i64::MAX)
}
