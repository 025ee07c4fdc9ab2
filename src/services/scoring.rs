//! Answer evaluation for both families of duel modes.

use std::time::SystemTime;

use crate::{
    countries::{CountryLookup, normalize_text},
    state::{
        DuelError,
        room::{DuelAnswer, DuelRoom, DuelStatus},
        state_machine::{DISCRETE_POINTS, clean_answer, open_target_score},
    },
};

/// Record one answer of `player_id` on an active room and return its outcome.
///
/// Only the submitting player's stats change. Completion is left to the caller's reconcile.
pub fn evaluate_answer(
    room: &mut DuelRoom,
    player_id: &str,
    question_index: Option<i64>,
    raw_answer: &str,
    now: SystemTime,
) -> Result<DuelAnswer, DuelError> {
    if room.status != DuelStatus::Active {
        return Err(DuelError::NotActive);
    }
    if room.player(player_id).is_none() {
        return Err(DuelError::PlayerNotInRoom);
    }

    if room.mode.is_open_target() {
        Ok(evaluate_guess(room, player_id, raw_answer, now))
    } else {
        evaluate_discrete(room, player_id, question_index, raw_answer, now)
    }
}

/// Open-target guess: credited once per resolved country, score rebuilt from scratch.
fn evaluate_guess(room: &mut DuelRoom, player_id: &str, raw_answer: &str, now: SystemTime) -> DuelAnswer {
    let answer = clean_answer(raw_answer);
    let lookup = CountryLookup::build(&room.target_countries);
    let resolved = lookup.resolve(&answer).map(str::to_owned);
    let remaining = room.remaining_seconds(now);

    let mut correct = false;
    if let Some(player) = room.player_mut(player_id) {
        if let Some(country) = resolved
            && !player.guessed_countries.contains(&country)
        {
            player.guessed_countries.push(country);
            correct = true;
        }
        player.score = open_target_score(player.guessed_countries.len(), remaining);
    }

    DuelAnswer {
        answer,
        correct,
        submitted_at: now,
    }
}

/// Indexed answer: first submission per question wins, repeats return the stored result.
fn evaluate_discrete(
    room: &mut DuelRoom,
    player_id: &str,
    question_index: Option<i64>,
    raw_answer: &str,
    now: SystemTime,
) -> Result<DuelAnswer, DuelError> {
    let last = i64::try_from(room.rounds.saturating_sub(1)).unwrap_or(i64::MAX);
    let idx = usize::try_from(question_index.unwrap_or(0).clamp(0, last)).unwrap_or(0);

    let expected = room.questions.get(idx).map(|question| question.answer.clone());
    let player = room
        .player_mut(player_id)
        .ok_or(DuelError::PlayerNotInRoom)?;

    if let Some(stored) = player.answers.get(&idx) {
        return Ok(stored.clone());
    }

    let expected = expected.ok_or(DuelError::QuestionNotFound)?;
    let answer = clean_answer(raw_answer);
    let correct = normalize_text(&answer) == normalize_text(&expected);
    if correct {
        player.score += DISCRETE_POINTS;
    }

    let result = DuelAnswer {
        answer,
        correct,
        submitted_at: now,
    };
    player.answers.insert(idx, result.clone());
    Ok(result)
}
