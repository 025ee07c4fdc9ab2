use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, time::SystemTime};
use uuid::Uuid;

/// Persisted duel room, shared by every backend.
///
/// Fields added after the first schema are optional so older records still load;
/// the service layer backfills them when it turns the entity into a domain room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DuelRoomEntity {
    /// Stable identifier for the room.
    pub id: Uuid,
    /// Short uppercase code players type to join.
    pub code: String,
    /// Game mode played in this room.
    pub mode: DuelModeEntity,
    /// Country pool the questions are drawn from.
    #[serde(default)]
    pub pool: Option<DuelPoolEntity>,
    /// Series shared by every rematch of the first room.
    #[serde(default)]
    pub series_id: Option<Uuid>,
    /// Number of matches the series is played over.
    #[serde(default)]
    pub series_best_of: Option<i64>,
    /// Position of this room inside its series.
    #[serde(default)]
    pub series_match_number: Option<i64>,
    /// Question or target count fixed at match start.
    #[serde(default)]
    pub rounds: i64,
    /// Match length in seconds, fixed at match start.
    #[serde(default)]
    pub duration_seconds: i64,
    /// Player allowed to start the match.
    pub host_player_id: String,
    /// Lifecycle stage.
    pub status: DuelStatusEntity,
    /// Seated players in arrival order.
    #[serde(default)]
    pub players: Vec<DuelPlayerEntity>,
    /// Discrete questions for capital-guess and neighbour-chain.
    #[serde(default)]
    pub questions: Vec<DuelQuestionEntity>,
    /// Countries to name for the open-target modes.
    #[serde(default)]
    pub target_countries: Vec<String>,
    /// Continent the match focuses on, if any.
    #[serde(default)]
    pub focus_region: Option<String>,
    /// Creation time.
    pub created_at: SystemTime,
    /// Time the host started the match.
    #[serde(default)]
    pub started_at: Option<SystemTime>,
    /// Time the match was finalized.
    #[serde(default)]
    pub ended_at: Option<SystemTime>,
}

/// Stored form of the duel mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DuelModeEntity {
    /// `world-quiz`.
    WorldQuiz,
    /// `continent-quiz`.
    ContinentQuiz,
    /// `neighbour-chain`.
    NeighbourChain,
    /// `capital-guess`.
    CapitalGuess,
}

/// Stored lifecycle stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DuelStatusEntity {
    /// Seats open, match not started.
    Waiting,
    /// Match running.
    Active,
    /// Match over.
    Finished,
}

/// Country pool stored with a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DuelPoolEntity {
    /// Every country in the catalog.
    World,
    /// Countries of one continent picked by the host.
    Continent {
        /// Continent name.
        continent: String,
        /// Canonical names of the allowed countries.
        #[serde(default)]
        countries: Vec<String>,
    },
}

/// Player seated in a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DuelPlayerEntity {
    /// Stable client id.
    pub player_id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Seat time.
    pub joined_at: SystemTime,
    /// Pre-match readiness.
    #[serde(default)]
    pub ready: bool,
    /// Score of the running or finished match.
    #[serde(default)]
    pub score: i64,
    /// Discrete answers keyed by question index.
    #[serde(default)]
    pub answers: BTreeMap<String, DuelAnswerEntity>,
    /// Countries credited in open-target modes.
    #[serde(default)]
    pub guessed_countries: Vec<String>,
}

/// Stored discrete question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DuelQuestionEntity {
    /// Position in the list.
    pub idx: usize,
    /// Question text.
    pub prompt: String,
    /// Expected answer.
    pub answer: String,
    /// Country the question is about.
    pub country: String,
    /// Capital of that country.
    pub capital: String,
}

/// Stored verdict on one discrete answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DuelAnswerEntity {
    /// Answer as submitted.
    pub answer: String,
    /// Whether it scored.
    pub correct: bool,
    /// Submission time.
    pub submitted_at: SystemTime,
}

/// Opaque last-modified token used for compare-and-swap saves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken(pub String);

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A room together with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRoom {
    /// Room document.
    pub room: DuelRoomEntity,
    /// Token to pass back on the next save.
    pub version: VersionToken,
}
