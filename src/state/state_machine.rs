//! Room lifecycle rules: roster changes, readiness, match start and lazy finalization.
//!
//! Every function here works on a freshly loaded [`DuelRoom`] and derives its decision from
//! that room alone, so the mutation engine can safely re-run it after a conflicting write.

use std::time::SystemTime;

use thiserror::Error;
use uuid::Uuid;

use super::room::{
    Continent, DuelMode, DuelPlayer, DuelPool, DuelQuestion, DuelRoom, DuelStatus, MAX_PLAYERS,
};

/// Longest display name kept for a player.
pub const MAX_NAME_CHARS: usize = 40;
/// Longest player identifier kept.
pub const MAX_PLAYER_ID_CHARS: usize = 80;
/// Longest answer text kept.
pub const MAX_ANSWER_CHARS: usize = 80;
/// Name used when a player leaves theirs blank.
pub const DEFAULT_PLAYER_NAME: &str = "Player";

/// Points for each correct discrete answer.
pub const DISCRETE_POINTS: i64 = 100;
/// Points for each country found in an open-target mode.
pub const OPEN_TARGET_POINTS: i64 = 10;
/// Seconds of remaining time worth one bonus point.
pub const TIME_BONUS_DIVISOR: i64 = 6;

/// Domain failures. None of them is retried by the mutation engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DuelError {
    /// No room matches the reference.
    #[error("Room not found")]
    RoomNotFound,
    /// Both seats are taken by others.
    #[error("Room is full")]
    RoomFull,
    /// Someone other than the host tried to start.
    #[error("Only host can start the match")]
    HostOnly,
    /// Start needs two seated players.
    #[error("Two players are required")]
    TwoPlayersRequired,
    /// Start needs both players ready.
    #[error("Both players must be ready")]
    PlayersNotReady,
    /// The room has left the waiting stage.
    #[error("Room already started")]
    AlreadyStarted,
    /// Answers are only taken while the match runs.
    #[error("Room is not active")]
    NotActive,
    /// The caller holds no seat.
    #[error("Player is not in this room")]
    PlayerNotInRoom,
    /// A continent quiz needs a continent.
    #[error("Continent selection is required")]
    ContinentRequired,
    /// A continent pool needs at least 8 known countries.
    #[error("Continent country list is required")]
    ContinentCountriesRequired,
    /// The answer index points past the question list.
    #[error("Question not found")]
    QuestionNotFound,
    /// Rematches follow finished matches only.
    #[error("Current match must be finished first")]
    MatchNotFinished,
    /// Spectators cannot rematch.
    #[error("Only participants can create rematch")]
    ParticipantsOnly,
    /// A player already reached the target wins.
    #[error("Series is already decided")]
    SeriesDecided,
    /// Every match of the series exists.
    #[error("Maximum series matches reached")]
    SeriesExhausted,
}

/// Events that move a room along its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEvent {
    /// The host starts the match.
    Start,
    /// The clock ran out or every player completed the match.
    Finish,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while {from:?}")]
pub struct InvalidTransition {
    /// The status the room was in when the event was received.
    pub from: DuelStatus,
    /// The event that cannot be applied from this status.
    pub event: RoomEvent,
}

/// Compute the status an event leads to. Status never moves backwards.
pub fn next_status(from: DuelStatus, event: RoomEvent) -> Result<DuelStatus, InvalidTransition> {
    match (from, event) {
        (DuelStatus::Waiting, RoomEvent::Start) => Ok(DuelStatus::Active),
        (DuelStatus::Active, RoomEvent::Finish) => Ok(DuelStatus::Finished),
        (from, event) => Err(InvalidTransition { from, event }),
    }
}

/// Settings of a room that has not started yet.
#[derive(Debug, Clone)]
pub struct RoomOptions {
    /// Requested mode.
    pub mode: DuelMode,
    /// Sanitized pool.
    pub pool: DuelPool,
    /// Clamped series length.
    pub best_of: u32,
    /// Default question count.
    pub rounds: usize,
    /// Default match length.
    pub duration_seconds: i64,
}

/// Everything a match is played over, produced by the question generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSetup {
    /// Mode the match is played in.
    pub mode: DuelMode,
    /// Question or target count.
    pub rounds: usize,
    /// Match length.
    pub duration_seconds: i64,
    /// Discrete questions.
    pub questions: Vec<DuelQuestion>,
    /// Open-target countries.
    pub target_countries: Vec<String>,
    /// Continent of a continent quiz.
    pub focus_region: Option<Continent>,
}

/// How a join request was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new player took the free seat.
    Seated,
    /// The player was already seated; only the name changed.
    Rejoined,
    /// The match already started, so the caller only watches.
    Spectating,
}

/// Trim and cut a display name, falling back to [`DEFAULT_PLAYER_NAME`].
pub fn display_name(raw: &str) -> String {
    let clean = truncate_chars(raw.trim(), MAX_NAME_CHARS);
    if clean.trim().is_empty() {
        DEFAULT_PLAYER_NAME.to_owned()
    } else {
        clean
    }
}

/// Trim and cut a player identifier.
pub fn safe_player_id(raw: &str) -> String {
    truncate_chars(raw.trim(), MAX_PLAYER_ID_CHARS)
}

/// Trim and cut a submitted answer.
pub fn clean_answer(raw: &str) -> String {
    truncate_chars(raw.trim(), MAX_ANSWER_CHARS)
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Open-target score: ten points per country plus one per six seconds left.
pub fn open_target_score(guessed: usize, remaining_seconds: i64) -> i64 {
    let guessed = i64::try_from(guessed).unwrap_or(i64::MAX);
    guessed
        .saturating_mul(OPEN_TARGET_POINTS)
        .saturating_add(remaining_seconds.max(0) / TIME_BONUS_DIVISOR)
}

/// A new waiting room with its creator as the only, not yet ready, player.
pub fn create_room(code: String, options: RoomOptions, host: DuelPlayer, now: SystemTime) -> DuelRoom {
    let id = Uuid::new_v4();
    DuelRoom {
        id,
        code,
        mode: options.mode,
        pool: options.pool,
        series_id: Uuid::new_v4(),
        series_best_of: options.best_of,
        series_match_number: 1,
        rounds: options.rounds,
        duration_seconds: options.duration_seconds,
        host_player_id: host.player_id.clone(),
        status: DuelStatus::Waiting,
        players: vec![host],
        questions: Vec::new(),
        target_countries: Vec::new(),
        focus_region: None,
        created_at: now,
        started_at: None,
        ended_at: None,
    }
}

/// Seat a player, rename a returning one, or leave a started room untouched.
pub fn join(
    room: &mut DuelRoom,
    player_id: &str,
    name: &str,
    now: SystemTime,
) -> Result<JoinOutcome, DuelError> {
    if let Some(existing) = room.player_mut(player_id) {
        existing.name = display_name(name);
        return Ok(JoinOutcome::Rejoined);
    }

    if room.players.len() >= MAX_PLAYERS {
        return Err(DuelError::RoomFull);
    }

    if room.status != DuelStatus::Waiting {
        return Ok(JoinOutcome::Spectating);
    }

    room.players.push(DuelPlayer::new(
        player_id.to_owned(),
        display_name(name),
        now,
    ));
    Ok(JoinOutcome::Seated)
}

/// Toggle a seated player's readiness before the match starts.
pub fn set_ready(room: &mut DuelRoom, player_id: &str, ready: bool) -> Result<(), DuelError> {
    if room.status != DuelStatus::Waiting {
        return Err(DuelError::AlreadyStarted);
    }

    let player = room
        .player_mut(player_id)
        .ok_or(DuelError::PlayerNotInRoom)?;
    player.ready = ready;
    Ok(())
}

/// Check every start precondition, in the order clients expect them reported.
pub fn ensure_can_start(room: &DuelRoom, host_player_id: &str) -> Result<(), DuelError> {
    if room.status != DuelStatus::Waiting {
        return Err(DuelError::AlreadyStarted);
    }
    if room.host_player_id != host_player_id {
        return Err(DuelError::HostOnly);
    }
    if room.players.len() != MAX_PLAYERS {
        return Err(DuelError::TwoPlayersRequired);
    }
    if !room.players.iter().all(|player| player.ready) {
        return Err(DuelError::PlayersNotReady);
    }
    Ok(())
}

/// Move a waiting room into play with freshly generated questions or targets.
pub fn begin_match(room: &mut DuelRoom, setup: MatchSetup, now: SystemTime) -> Result<(), DuelError> {
    room.status = next_status(room.status, RoomEvent::Start).map_err(|_| DuelError::AlreadyStarted)?;
    room.mode = setup.mode;
    room.rounds = setup.rounds;
    room.duration_seconds = setup.duration_seconds;
    room.questions = setup.questions;
    room.target_countries = setup.target_countries;
    room.focus_region = setup.focus_region;
    room.started_at = Some(now);
    room.ended_at = None;
    for player in &mut room.players {
        player.reset_stats();
    }
    Ok(())
}

/// Questions a player must answer before a discrete match counts as complete.
fn required_answers(room: &DuelRoom) -> usize {
    room.questions.len().min(room.rounds).max(1)
}

/// Re-derive every time-dependent fact of the room at `now`.
///
/// Refreshes open-target scores while the match runs and finishes the match once the clock
/// has run out or the completion rule of its mode is met. Returns `true` when this call
/// finished the match.
pub fn reconcile(room: &mut DuelRoom, now: SystemTime) -> bool {
    if room.status != DuelStatus::Active || room.started_at.is_none() {
        return false;
    }

    let deadline_passed = room.deadline_passed(now);

    let completed = if room.mode.is_open_target() {
        let remaining = room.remaining_seconds(now);
        for player in &mut room.players {
            player.score = open_target_score(player.guessed_countries.len(), remaining);
        }
        let target_count = room.target_countries.len();
        target_count > 0
            && room
                .players
                .iter()
                .any(|player| player.guessed_countries.len() >= target_count)
    } else {
        let required = required_answers(room);
        room.players
            .iter()
            .all(|player| player.answers.len() >= required)
    };

    if !(deadline_passed || completed) {
        return false;
    }

    match next_status(room.status, RoomEvent::Finish) {
        Ok(next) => {
            room.status = next;
            room.ended_at = Some(now);
            true
        }
        Err(_) => false,
    }
}
