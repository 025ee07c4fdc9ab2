use std::time::SystemTime;

use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::DuelRoomEntity;
use crate::dao::room_store::{match_number_of, series_of};

/// Room document; lookup keys are lifted to the top level as strings so filters and
/// unique indexes do not depend on how the entity's UUIDs are encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoomDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub code: String,
    pub series_id: String,
    pub series_match_number: i64,
    pub version: i64,
    pub expires_at: DateTime,
    pub room: DuelRoomEntity,
}

impl MongoRoomDocument {
    pub fn new(room: DuelRoomEntity, version: i64, expires_at: SystemTime) -> Self {
        Self {
            id: room.id.to_string(),
            code: room.code.to_uppercase(),
            series_id: series_of(&room).to_string(),
            series_match_number: match_number_of(&room),
            version,
            expires_at: DateTime::from_system_time(expires_at),
            room,
        }
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::{DuelModeEntity, DuelStatusEntity};

    #[test]
    fn lookup_keys_are_lifted() {
        let id = Uuid::new_v4();
        let room = DuelRoomEntity {
            id,
            code: "ab3k9q".into(),
            mode: DuelModeEntity::WorldQuiz,
            pool: None,
            series_id: None,
            series_best_of: None,
            series_match_number: None,
            rounds: 0,
            duration_seconds: 0,
            host_player_id: "host".into(),
            status: DuelStatusEntity::Waiting,
            players: Vec::new(),
            questions: Vec::new(),
            target_countries: Vec::new(),
            focus_region: None,
            created_at: SystemTime::UNIX_EPOCH,
            started_at: None,
            ended_at: None,
        };

        let document = MongoRoomDocument::new(room, 3, SystemTime::UNIX_EPOCH);
        assert_eq!(document.id, id.to_string());
        assert_eq!(document.code, "AB3K9Q");
        assert_eq!(document.series_id, id.to_string());
        assert_eq!(document.series_match_number, 1);
        assert_eq!(document.version, 3);
    }
}
