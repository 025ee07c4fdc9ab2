use std::{collections::BTreeMap, time::SystemTime};

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::{
    format_system_time,
    validation::{validate_player_id, validate_room_ref},
};
use crate::state::room::{
    Continent, DuelAnswer, DuelMode, DuelPool, DuelRoom, DuelStatus,
};

/// Pool requested when creating a room. Anything invalid falls back to the world pool.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PoolInput {
    /// `world` or `continent`.
    #[serde(default)]
    pub kind: Option<String>,
    /// One of `Africa`, `Americas`, `Asia`, `Europe`, `Oceania`.
    #[serde(default)]
    pub continent: Option<String>,
    /// Canonical country names; at least 8 are needed for a continent pool.
    #[serde(default)]
    pub allowed_countries: Vec<String>,
}

/// Payload to open a room hosted by the caller.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    /// Caller, seated as host.
    #[validate(custom(function = "validate_player_id"))]
    pub player_id: String,
    /// Display name; blank falls back to `Player`.
    #[serde(default)]
    #[validate(length(max = 200))]
    pub player_name: String,
    /// Mode the room is created for.
    pub mode: DuelMode,
    /// Series length; clamped into 1..=3.
    #[serde(default)]
    pub series_best_of: Option<i64>,
    /// Country pool for question generation.
    #[serde(default)]
    pub pool: Option<PoolInput>,
}

/// Payload to take the free seat of a room.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    /// Room id or join code.
    #[validate(custom(function = "validate_room_ref"))]
    pub room_id: String,
    /// Joining player.
    #[validate(custom(function = "validate_player_id"))]
    pub player_id: String,
    /// Display name; refreshed on rejoin.
    #[serde(default)]
    #[validate(length(max = 200))]
    pub player_name: String,
}

/// Payload to toggle readiness before the match.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReadyRequest {
    /// Room id or join code.
    #[validate(custom(function = "validate_room_ref"))]
    pub room_id: String,
    /// Seated player.
    #[validate(custom(function = "validate_player_id"))]
    pub player_id: String,
    /// New readiness.
    pub ready: bool,
}

/// Payload the host sends to start the match.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartMatchRequest {
    /// Room id or join code.
    #[validate(custom(function = "validate_room_ref"))]
    pub room_id: String,
    /// Must be the room host.
    #[validate(custom(function = "validate_player_id"))]
    pub host_player_id: String,
    /// Mode the match is played in.
    pub mode: DuelMode,
    /// Required for `continent-quiz`.
    #[serde(default)]
    pub continent: Option<String>,
    /// Required for `continent-quiz`: at least 8 canonical country names.
    #[serde(default)]
    pub allowed_countries: Vec<String>,
}

/// One answer for a discrete question or one guess for an open-target quiz.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    /// Room id or join code.
    #[validate(custom(function = "validate_room_ref"))]
    pub room_id: String,
    /// Seated player.
    #[validate(custom(function = "validate_player_id"))]
    pub player_id: String,
    /// Question index for discrete modes; clamped into range, defaults to 0.
    #[serde(default)]
    pub question_index: Option<i64>,
    /// Raw answer text.
    #[validate(length(max = 200))]
    pub answer: String,
}

/// Query string of the room state route.
#[derive(Debug, Clone, Deserialize, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RoomStateQuery {
    /// Viewer asking for the room.
    #[validate(custom(function = "validate_player_id"))]
    pub player_id: String,
}

/// Payload to spawn the next match of a series.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RematchRequest {
    /// Finished room the rematch follows.
    #[validate(custom(function = "validate_room_ref"))]
    pub room_id: String,
    /// Participant asking; hosts the new room.
    #[validate(custom(function = "validate_player_id"))]
    pub requester_player_id: String,
}

/// Envelope returned by every room operation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomResponse {
    /// Room as seen by the caller.
    pub room: RoomSnapshot,
}

/// Room plus the verdict on the submitted answer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubmitAnswerResponse {
    /// Room as seen by the submitter.
    pub room: RoomSnapshot,
    /// Outcome of this submission, or the stored one for a repeated discrete answer.
    pub result: AnswerView,
}

/// Room as seen by one viewer. Answers stay hidden until the match is finished.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    /// Room id.
    pub id: Uuid,
    /// Six character join code.
    pub code: String,
    /// Mode of the room.
    pub mode: DuelMode,
    /// Country pool summary.
    pub pool: PoolSummary,
    /// Live standing of the series.
    pub series: SeriesSnapshot,
    /// Question or target count.
    pub rounds: usize,
    /// Match length in seconds.
    pub duration_seconds: i64,
    /// Seconds left; the full duration unless the match is running.
    pub remaining_seconds: i64,
    /// Lifecycle stage.
    pub status: DuelStatus,
    /// Player allowed to start.
    pub host_player_id: String,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// RFC 3339 start time.
    pub started_at: Option<String>,
    /// RFC 3339 end time.
    pub ended_at: Option<String>,
    /// Public view of the seated players.
    pub players: Vec<PlayerView>,
    /// Private block of the viewer, `null` for spectators.
    pub me: Option<MeView>,
    /// Countries to name in open-target modes.
    pub target_countries: Vec<String>,
    /// Continent of a continent quiz.
    pub focus_region: Option<Continent>,
    /// Discrete questions; solutions only once finished.
    pub questions: Vec<QuestionView>,
}

/// Public summary of a room pool.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PoolSummary {
    /// `world` or `continent`.
    pub kind: String,
    /// Continent of a continent pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continent: Option<Continent>,
    /// Size of a continent pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countries_count: Option<usize>,
}

/// Public scoreboard line of a seated player.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    /// Player id.
    pub player_id: String,
    /// Display name.
    pub name: String,
    /// Readiness before the match.
    pub ready: bool,
    /// Current score.
    pub score: i64,
    /// Questions answered or countries found.
    pub answers_count: usize,
    /// Whether this is the viewer.
    pub is_self: bool,
}

/// Private block for the viewer.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeView {
    /// Viewer id.
    pub player_id: String,
    /// Discrete answers keyed by question index.
    pub answers: BTreeMap<String, AnswerView>,
    /// Countries credited so far.
    pub guessed_countries: Vec<String>,
    /// Viewer score.
    pub score: i64,
    /// Viewer readiness.
    pub ready: bool,
}

/// Stored verdict on one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerView {
    /// Answer as stored.
    pub answer: String,
    /// Whether it earned points.
    pub correct: bool,
    /// RFC 3339 submission time.
    pub submitted_at: String,
}

/// Discrete question as shown to players.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    /// Position in the question list.
    pub idx: usize,
    /// Text shown to both players.
    pub prompt: String,
    /// Country behind the question, once finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Capital behind the question, once finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capital: Option<String>,
}

/// Live standing of the best-of-N series a room belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSnapshot {
    /// Series id, shared by every rematch.
    pub id: Uuid,
    /// Number of matches the series is played over.
    pub best_of: u32,
    /// Wins needed to take the series.
    pub target_wins: u32,
    /// Whether the series is over.
    pub decided: bool,
    /// Series champion, if any.
    pub winner_player_id: Option<String>,
    /// Name of the series champion.
    pub winner_name: Option<String>,
    /// `null` once the series is decided or its last match already exists.
    pub next_match_number: Option<u32>,
    /// Position of the viewed room.
    pub current_match_number: u32,
    /// Sorted by wins, most first.
    pub wins: Vec<SeriesWins>,
    /// Every match of the series in order.
    pub history: Vec<SeriesHistoryEntry>,
}

/// Match wins of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeriesWins {
    /// Player id.
    pub player_id: String,
    /// Display name.
    pub name: String,
    /// Matches won.
    pub wins: u32,
}

/// One match of a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeriesHistoryEntry {
    /// Room the match was played in.
    pub room_id: Uuid,
    /// Position in the series.
    pub match_number: u32,
    /// Lifecycle stage of that room.
    pub status: DuelStatus,
    /// Match winner; `null` on a tie or before the end.
    pub winner_player_id: Option<String>,
    /// Name of the match winner.
    pub winner_name: Option<String>,
    /// RFC 3339 end time.
    pub ended_at: Option<String>,
    /// Final or current scores.
    pub scores: Vec<SeriesScore>,
}

/// Score of one player in one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeriesScore {
    /// Player id.
    pub player_id: String,
    /// Display name.
    pub name: String,
    /// Points in that match.
    pub score: i64,
}

impl From<&DuelAnswer> for AnswerView {
    fn from(value: &DuelAnswer) -> Self {
        Self {
            answer: value.answer.clone(),
            correct: value.correct,
            submitted_at: format_system_time(value.submitted_at),
        }
    }
}

impl From<&DuelPool> for PoolSummary {
    fn from(value: &DuelPool) -> Self {
        match value {
            DuelPool::World => Self {
                kind: "world".into(),
                continent: None,
                countries_count: None,
            },
            DuelPool::Continent {
                continent,
                countries,
            } => Self {
                kind: "continent".into(),
                continent: Some(*continent),
                countries_count: Some(countries.len()),
            },
        }
    }
}

impl RoomSnapshot {
    /// Sanitize a room for `viewer_id`, attaching the series standing.
    pub fn for_viewer(
        room: &DuelRoom,
        series: SeriesSnapshot,
        viewer_id: &str,
        now: SystemTime,
    ) -> Self {
        let finished = room.status == DuelStatus::Finished;

        let players = room
            .players
            .iter()
            .map(|player| PlayerView {
                player_id: player.player_id.clone(),
                name: player.name.clone(),
                ready: player.ready,
                score: player.score,
                answers_count: room.progress_of(player),
                is_self: player.player_id == viewer_id,
            })
            .collect();

        let me = room.player(viewer_id).map(|player| MeView {
            player_id: player.player_id.clone(),
            answers: player
                .answers
                .iter()
                .map(|(idx, answer)| (idx.to_string(), AnswerView::from(answer)))
                .collect(),
            guessed_countries: player.guessed_countries.clone(),
            score: player.score,
            ready: player.ready,
        });

        let questions = room
            .questions
            .iter()
            .map(|question| QuestionView {
                idx: question.idx,
                prompt: question.prompt.clone(),
                country: finished.then(|| question.country.clone()),
                capital: finished.then(|| question.capital.clone()),
            })
            .collect();

        Self {
            id: room.id,
            code: room.code.clone(),
            mode: room.mode,
            pool: PoolSummary::from(&room.pool),
            series,
            rounds: room.rounds,
            duration_seconds: room.duration_seconds,
            remaining_seconds: room.remaining_seconds(now),
            status: room.status,
            host_player_id: room.host_player_id.clone(),
            created_at: format_system_time(room.created_at),
            started_at: room.started_at.map(format_system_time),
            ended_at: room.ended_at.map(format_system_time),
            players,
            me,
            target_countries: room.target_countries.clone(),
            focus_region: room.focus_region,
            questions,
        }
    }
}
