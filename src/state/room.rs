//! Domain model of a duel room and its conversion to and from the persisted entity.

use std::{
    collections::BTreeMap,
    time::{Duration, SystemTime},
};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::{
    DuelAnswerEntity, DuelModeEntity, DuelPlayerEntity, DuelPoolEntity, DuelQuestionEntity,
    DuelRoomEntity, DuelStatusEntity,
};

/// Maximum number of seated players.
pub const MAX_PLAYERS: usize = 2;
/// Longest series a room can belong to.
pub const MAX_BEST_OF: u32 = 3;

/// Game mode of a duel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum DuelMode {
    /// Name every country of the world.
    WorldQuiz,
    /// Name every country of a continent subset.
    ContinentQuiz,
    /// Name the neighbours of a seed country.
    NeighbourChain,
    /// Give the capital of each prompted country.
    CapitalGuess,
}

impl DuelMode {
    /// Modes where players name countries from an open target set.
    pub fn is_open_target(self) -> bool {
        matches!(self, DuelMode::WorldQuiz | DuelMode::ContinentQuiz)
    }

    /// Modes played over an indexed question list.
    pub fn is_discrete(self) -> bool {
        !self.is_open_target()
    }
}

/// Continent a pool or a quiz can focus on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Continent {
    /// Africa.
    Africa,
    /// North, Central and South America with the Caribbean.
    Americas,
    /// Asia.
    Asia,
    /// Europe.
    Europe,
    /// Oceania.
    Oceania,
}

impl Continent {
    /// Parse the exact continent key used by clients.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Africa" => Some(Continent::Africa),
            "Americas" => Some(Continent::Americas),
            "Asia" => Some(Continent::Asia),
            "Europe" => Some(Continent::Europe),
            "Oceania" => Some(Continent::Oceania),
            _ => None,
        }
    }

    /// Client-facing key, the inverse of [`Continent::parse`].
    pub fn as_str(self) -> &'static str {
        match self {
            Continent::Africa => "Africa",
            Continent::Americas => "Americas",
            Continent::Asia => "Asia",
            Continent::Europe => "Europe",
            Continent::Oceania => "Oceania",
        }
    }

    /// Length of a continent quiz, scaled to the size of the continent.
    pub fn quiz_duration_seconds(self) -> i64 {
        match self {
            Continent::Oceania => 5 * 60,
            Continent::Americas | Continent::Europe => 7 * 60,
            Continent::Africa | Continent::Asia => 8 * 60,
        }
    }
}

/// Country pool questions are drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuelPool {
    /// Every country in the catalog.
    World,
    /// A host-picked subset of one continent.
    Continent {
        /// Continent the subset belongs to.
        continent: Continent,
        /// Canonical country names.
        countries: Vec<String>,
    },
}

/// Lifecycle stage of a room. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DuelStatus {
    /// Accepting players.
    Waiting,
    /// Match running.
    Active,
    /// Match over; scores are final.
    Finished,
}

/// One of the two seats of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuelPlayer {
    /// Stable client id.
    pub player_id: String,
    /// Display name.
    pub name: String,
    /// Seat time; orders the players.
    pub joined_at: SystemTime,
    /// Ready flag checked on start.
    pub ready: bool,
    /// Score of the current match.
    pub score: i64,
    /// Discrete answers keyed by question index.
    pub answers: BTreeMap<usize, DuelAnswer>,
    /// Resolved country names in the order they were found.
    pub guessed_countries: Vec<String>,
}

impl DuelPlayer {
    /// A freshly seated player with empty stats.
    pub fn new(player_id: String, name: String, joined_at: SystemTime) -> Self {
        Self {
            player_id,
            name,
            joined_at,
            ready: false,
            score: 0,
            answers: BTreeMap::new(),
            guessed_countries: Vec::new(),
        }
    }

    /// Clear everything a match accumulates.
    pub fn reset_stats(&mut self) {
        self.score = 0;
        self.answers.clear();
        self.guessed_countries.clear();
    }
}

/// A discrete question, shared by both players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuelQuestion {
    /// Position in the question list.
    pub idx: usize,
    /// Text shown to players.
    pub prompt: String,
    /// Expected answer, hidden until the match ends.
    pub answer: String,
    /// Country the question is about.
    pub country: String,
    /// Capital of that country.
    pub capital: String,
}

/// A player's first and only answer to one discrete question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuelAnswer {
    /// Trimmed text as submitted.
    pub answer: String,
    /// Whether it matched the expected answer.
    pub correct: bool,
    /// When it was accepted.
    pub submitted_at: SystemTime,
}

/// Aggregate root of the duel engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuelRoom {
    /// Primary key.
    pub id: Uuid,
    /// Six character join code from the unambiguous alphabet.
    pub code: String,
    /// Mode of the room; start may switch it.
    pub mode: DuelMode,
    /// Country pool questions are drawn from.
    pub pool: DuelPool,
    /// Series shared with every rematch.
    pub series_id: Uuid,
    /// Matches the series is played over, 1 to 3.
    pub series_best_of: u32,
    /// Position of this room in the series, starting at 1.
    pub series_match_number: u32,
    /// Question or target count.
    pub rounds: usize,
    /// Match length.
    pub duration_seconds: i64,
    /// Player allowed to start the match.
    pub host_player_id: String,
    /// Lifecycle stage.
    pub status: DuelStatus,
    /// At most two, ordered by seat time.
    pub players: Vec<DuelPlayer>,
    /// Discrete questions; empty in open-target modes.
    pub questions: Vec<DuelQuestion>,
    /// Countries to name in open-target modes.
    pub target_countries: Vec<String>,
    /// Continent of a continent quiz.
    pub focus_region: Option<Continent>,
    /// Creation time.
    pub created_at: SystemTime,
    /// Start time.
    pub started_at: Option<SystemTime>,
    /// Finalization time.
    pub ended_at: Option<SystemTime>,
}

impl DuelRoom {
    /// Seated player by id.
    pub fn player(&self, player_id: &str) -> Option<&DuelPlayer> {
        self.players
            .iter()
            .find(|player| player.player_id == player_id)
    }

    /// Mutable access to a seated player.
    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut DuelPlayer> {
        self.players
            .iter_mut()
            .find(|player| player.player_id == player_id)
    }

    /// Whole seconds since the match started, never negative.
    pub fn elapsed_seconds(&self, now: SystemTime) -> i64 {
        self.started_at
            .map(|started| {
                let elapsed = now.duration_since(started).unwrap_or(Duration::ZERO);
                i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX)
            })
            .unwrap_or(0)
    }

    /// Seconds left on the clock; only counts down while the match is active.
    pub fn remaining_seconds(&self, now: SystemTime) -> i64 {
        match self.status {
            DuelStatus::Active => (self.duration_seconds - self.elapsed_seconds(now)).max(0),
            DuelStatus::Waiting | DuelStatus::Finished => self.duration_seconds,
        }
    }

    /// Whether the match clock has run out.
    pub fn deadline_passed(&self, now: SystemTime) -> bool {
        self.started_at.is_some_and(|started| {
            let limit = Duration::from_secs(u64::try_from(self.duration_seconds).unwrap_or(0));
            now.duration_since(started).unwrap_or(Duration::ZERO) >= limit
        })
    }

    /// Progress shown on the public scoreboard for a player.
    pub fn progress_of(&self, player: &DuelPlayer) -> usize {
        if self.mode.is_open_target() {
            player.guessed_countries.len()
        } else {
            player.answers.len()
        }
    }
}

/// Clamp a requested series length into the supported range.
pub fn clamp_best_of(requested: Option<i64>) -> u32 {
    requested
        .map(|value| value.clamp(1, i64::from(MAX_BEST_OF)))
        .and_then(|value| u32::try_from(value).ok())
        .unwrap_or(1)
}

impl From<DuelModeEntity> for DuelMode {
    fn from(value: DuelModeEntity) -> Self {
        match value {
            DuelModeEntity::WorldQuiz => DuelMode::WorldQuiz,
            DuelModeEntity::ContinentQuiz => DuelMode::ContinentQuiz,
            DuelModeEntity::NeighbourChain => DuelMode::NeighbourChain,
            DuelModeEntity::CapitalGuess => DuelMode::CapitalGuess,
        }
    }
}

impl From<DuelMode> for DuelModeEntity {
    fn from(value: DuelMode) -> Self {
        match value {
            DuelMode::WorldQuiz => DuelModeEntity::WorldQuiz,
            DuelMode::ContinentQuiz => DuelModeEntity::ContinentQuiz,
            DuelMode::NeighbourChain => DuelModeEntity::NeighbourChain,
            DuelMode::CapitalGuess => DuelModeEntity::CapitalGuess,
        }
    }
}

impl From<DuelStatusEntity> for DuelStatus {
    fn from(value: DuelStatusEntity) -> Self {
        match value {
            DuelStatusEntity::Waiting => DuelStatus::Waiting,
            DuelStatusEntity::Active => DuelStatus::Active,
            DuelStatusEntity::Finished => DuelStatus::Finished,
        }
    }
}

impl From<DuelStatus> for DuelStatusEntity {
    fn from(value: DuelStatus) -> Self {
        match value {
            DuelStatus::Waiting => DuelStatusEntity::Waiting,
            DuelStatus::Active => DuelStatusEntity::Active,
            DuelStatus::Finished => DuelStatusEntity::Finished,
        }
    }
}

impl From<Option<DuelPoolEntity>> for DuelPool {
    fn from(value: Option<DuelPoolEntity>) -> Self {
        match value {
            Some(DuelPoolEntity::Continent {
                continent,
                countries,
            }) => match Continent::parse(&continent) {
                Some(continent) => DuelPool::Continent {
                    continent,
                    countries,
                },
                None => DuelPool::World,
            },
            Some(DuelPoolEntity::World) | None => DuelPool::World,
        }
    }
}

impl From<DuelPool> for DuelPoolEntity {
    fn from(value: DuelPool) -> Self {
        match value {
            DuelPool::World => DuelPoolEntity::World,
            DuelPool::Continent {
                continent,
                countries,
            } => DuelPoolEntity::Continent {
                continent: continent.as_str().to_owned(),
                countries,
            },
        }
    }
}

impl From<DuelPlayerEntity> for DuelPlayer {
    fn from(value: DuelPlayerEntity) -> Self {
        let answers = value
            .answers
            .into_iter()
            .filter_map(|(key, answer)| {
                key.parse::<usize>().ok().map(|idx| {
                    (
                        idx,
                        DuelAnswer {
                            answer: answer.answer,
                            correct: answer.correct,
                            submitted_at: answer.submitted_at,
                        },
                    )
                })
            })
            .collect();

        Self {
            player_id: value.player_id,
            name: value.name,
            joined_at: value.joined_at,
            ready: value.ready,
            score: value.score,
            answers,
            guessed_countries: value.guessed_countries,
        }
    }
}

impl From<DuelPlayer> for DuelPlayerEntity {
    fn from(value: DuelPlayer) -> Self {
        Self {
            player_id: value.player_id,
            name: value.name,
            joined_at: value.joined_at,
            ready: value.ready,
            score: value.score,
            answers: value
                .answers
                .into_iter()
                .map(|(idx, answer)| {
                    (
                        idx.to_string(),
                        DuelAnswerEntity {
                            answer: answer.answer,
                            correct: answer.correct,
                            submitted_at: answer.submitted_at,
                        },
                    )
                })
                .collect(),
            guessed_countries: value.guessed_countries,
        }
    }
}

impl From<DuelQuestionEntity> for DuelQuestion {
    fn from(value: DuelQuestionEntity) -> Self {
        Self {
            idx: value.idx,
            prompt: value.prompt,
            answer: value.answer,
            country: value.country,
            capital: value.capital,
        }
    }
}

impl From<DuelQuestion> for DuelQuestionEntity {
    fn from(value: DuelQuestion) -> Self {
        Self {
            idx: value.idx,
            prompt: value.prompt,
            answer: value.answer,
            country: value.country,
            capital: value.capital,
        }
    }
}

/// Loading backfills whatever an older record is missing: pool, series fields and counters.
impl From<DuelRoomEntity> for DuelRoom {
    fn from(value: DuelRoomEntity) -> Self {
        Self {
            id: value.id,
            code: value.code.to_uppercase(),
            mode: value.mode.into(),
            pool: value.pool.into(),
            series_id: value.series_id.unwrap_or(value.id),
            series_best_of: clamp_best_of(value.series_best_of),
            series_match_number: value
                .series_match_number
                .and_then(|number| u32::try_from(number.max(1)).ok())
                .unwrap_or(1),
            rounds: usize::try_from(value.rounds.max(0)).unwrap_or(0),
            duration_seconds: value.duration_seconds.max(0),
            host_player_id: value.host_player_id,
            status: value.status.into(),
            players: value.players.into_iter().map(Into::into).collect(),
            questions: value.questions.into_iter().map(Into::into).collect(),
            target_countries: value.target_countries,
            focus_region: value.focus_region.as_deref().and_then(Continent::parse),
            created_at: value.created_at,
            started_at: value.started_at,
            ended_at: value.ended_at,
        }
    }
}

impl From<DuelRoom> for DuelRoomEntity {
    fn from(value: DuelRoom) -> Self {
        Self {
            id: value.id,
            code: value.code,
            mode: value.mode.into(),
            pool: Some(value.pool.into()),
            series_id: Some(value.series_id),
            series_best_of: Some(i64::from(value.series_best_of)),
            series_match_number: Some(i64::from(value.series_match_number)),
            rounds: i64::try_from(value.rounds).unwrap_or(i64::MAX),
            duration_seconds: value.duration_seconds,
            host_player_id: value.host_player_id,
            status: value.status.into(),
            players: value.players.into_iter().map(Into::into).collect(),
            questions: value.questions.into_iter().map(Into::into).collect(),
            target_countries: value.target_countries,
            focus_region: value.focus_region.map(|continent| continent.as_str().to_owned()),
            created_at: value.created_at,
            started_at: value.started_at,
            ended_at: value.ended_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_entity() -> DuelRoomEntity {
        DuelRoomEntity {
            id: Uuid::new_v4(),
            code: "abc234".into(),
            mode: DuelModeEntity::CapitalGuess,
            pool: None,
            series_id: None,
            series_best_of: Some(7),
            series_match_number: Some(0),
            rounds: 12,
            duration_seconds: 180,
            host_player_id: "p1".into(),
            status: DuelStatusEntity::Waiting,
            players: vec![DuelPlayerEntity {
                player_id: "p1".into(),
                name: "Ana".into(),
                joined_at: SystemTime::UNIX_EPOCH,
                ready: false,
                score: 0,
                answers: BTreeMap::from([
                    (
                        "3".to_string(),
                        DuelAnswerEntity {
                            answer: "Paris".into(),
                            correct: true,
                            submitted_at: SystemTime::UNIX_EPOCH,
                        },
                    ),
                    (
                        "junk".to_string(),
                        DuelAnswerEntity {
                            answer: "?".into(),
                            correct: false,
                            submitted_at: SystemTime::UNIX_EPOCH,
                        },
                    ),
                ]),
                guessed_countries: Vec::new(),
            }],
            questions: Vec::new(),
            target_countries: Vec::new(),
            focus_region: Some("Atlantis".into()),
            created_at: SystemTime::UNIX_EPOCH,
            started_at: None,
            ended_at: None,
        }
    }

    #[test]
    fn legacy_records_are_backfilled() {
        let entity = legacy_entity();
        let room = DuelRoom::from(entity.clone());

        assert_eq!(room.code, "ABC234");
        assert_eq!(room.pool, DuelPool::World);
        assert_eq!(room.series_id, entity.id);
        assert_eq!(room.series_best_of, 3);
        assert_eq!(room.series_match_number, 1);
        assert_eq!(room.focus_region, None);
        assert_eq!(room.players[0].answers.len(), 1);
        assert!(room.players[0].answers.contains_key(&3));
    }

    #[test]
    fn unknown_pool_continent_falls_back_to_world() {
        let mut entity = legacy_entity();
        entity.pool = Some(DuelPoolEntity::Continent {
            continent: "Antarctica".into(),
            countries: vec!["France".into()],
        });
        assert_eq!(DuelRoom::from(entity).pool, DuelPool::World);
    }

    #[test]
    fn best_of_is_clamped() {
        assert_eq!(clamp_best_of(None), 1);
        assert_eq!(clamp_best_of(Some(-4)), 1);
        assert_eq!(clamp_best_of(Some(2)), 2);
        assert_eq!(clamp_best_of(Some(9)), 3);
    }

    #[test]
    fn remaining_time_counts_down_only_while_active() {
        let mut room = DuelRoom::from(legacy_entity());
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        room.started_at = Some(start);

        assert_eq!(room.remaining_seconds(start + Duration::from_secs(30)), 180);

        room.status = DuelStatus::Active;
        assert_eq!(room.remaining_seconds(start + Duration::from_millis(30_900)), 150);
        assert_eq!(room.remaining_seconds(start + Duration::from_secs(500)), 0);
        assert!(!room.deadline_passed(start + Duration::from_secs(179)));
        assert!(room.deadline_passed(start + Duration::from_secs(180)));
    }
}
