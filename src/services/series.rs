//! Best-of-N series accounting and rematch room construction.

use std::time::SystemTime;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::{
    dto::{
        duel::{SeriesHistoryEntry, SeriesScore, SeriesSnapshot, SeriesWins},
        format_system_time,
    },
    state::room::{DuelPlayer, DuelRoom, DuelStatus, MAX_PLAYERS},
};

/// Winner of a finished match: the strictly higher score of the two seated players.
pub fn match_winner(room: &DuelRoom) -> Option<&DuelPlayer> {
    if room.status != DuelStatus::Finished {
        return None;
    }
    match room.players.as_slice() {
        [first, second, ..] if first.score > second.score => Some(first),
        [first, second, ..] if second.score > first.score => Some(second),
        _ => None,
    }
}

/// Standing of the series `current` belongs to, given every stored room of that series.
///
/// `current` replaces its stored copy so the snapshot reflects any in-memory finalization.
pub fn compute_series_snapshot(rooms: &[DuelRoom], current: &DuelRoom) -> SeriesSnapshot {
    let mut matches = rooms
        .iter()
        .filter(|room| room.id != current.id)
        .collect::<Vec<_>>();
    matches.push(current);
    matches.sort_by_key(|room| room.series_match_number);

    let mut wins: IndexMap<&str, SeriesWins> = IndexMap::new();
    for room in &matches {
        for player in room.players.iter().take(MAX_PLAYERS) {
            wins.entry(player.player_id.as_str())
                .or_insert_with(|| SeriesWins {
                    player_id: player.player_id.clone(),
                    name: player.name.clone(),
                    wins: 0,
                });
        }
        if let Some(winner) = match_winner(room)
            && let Some(entry) = wins.get_mut(winner.player_id.as_str())
        {
            entry.wins += 1;
        }
    }

    let mut wins = wins.into_values().collect::<Vec<_>>();
    wins.sort_by(|a, b| b.wins.cmp(&a.wins));

    let best_of = current.series_best_of;
    let target_wins = best_of.div_ceil(2).max(1);
    let champion = wins.iter().find(|entry| entry.wins >= target_wins);
    let highest_match = matches
        .iter()
        .map(|room| room.series_match_number)
        .max()
        .unwrap_or(0);
    let played_through = matches
        .iter()
        .filter(|room| room.status == DuelStatus::Finished)
        .map(|room| room.series_match_number)
        .max()
        .unwrap_or(0);
    let decided = champion.is_some() || played_through >= best_of;

    let history = matches
        .iter()
        .map(|room| {
            let winner = match_winner(room);
            SeriesHistoryEntry {
                room_id: room.id,
                match_number: room.series_match_number,
                status: room.status,
                winner_player_id: winner.map(|player| player.player_id.clone()),
                winner_name: winner.map(|player| player.name.clone()),
                ended_at: room.ended_at.map(format_system_time),
                scores: room
                    .players
                    .iter()
                    .take(MAX_PLAYERS)
                    .map(|player| SeriesScore {
                        player_id: player.player_id.clone(),
                        name: player.name.clone(),
                        score: player.score,
                    })
                    .collect(),
            }
        })
        .collect();

    SeriesSnapshot {
        id: current.series_id,
        best_of,
        target_wins,
        decided,
        winner_player_id: champion.map(|entry| entry.player_id.clone()),
        winner_name: champion.map(|entry| entry.name.clone()),
        next_match_number: (!decided && highest_match < best_of).then_some(highest_match + 1),
        current_match_number: current.series_match_number,
        wins,
        history,
    }
}

/// Next room of the series: same settings, both seated players reset, requester hosting.
pub fn build_rematch_room(
    source: &DuelRoom,
    requester_id: &str,
    match_number: u32,
    code: String,
    now: SystemTime,
) -> DuelRoom {
    let players = source
        .players
        .iter()
        .take(MAX_PLAYERS)
        .map(|player| DuelPlayer::new(player.player_id.clone(), player.name.clone(), now))
        .collect::<Vec<_>>();
    let host_player_id = source
        .player(requester_id)
        .map(|player| player.player_id.clone())
        .unwrap_or_else(|| source.host_player_id.clone());

    DuelRoom {
        id: Uuid::new_v4(),
        code,
        mode: source.mode,
        pool: source.pool.clone(),
        series_id: source.series_id,
        series_best_of: source.series_best_of,
        series_match_number: match_number,
        rounds: source.rounds,
        duration_seconds: source.duration_seconds,
        host_player_id,
        status: DuelStatus::Waiting,
        players,
        questions: Vec::new(),
        target_countries: Vec::new(),
        focus_region: None,
        created_at: now,
        started_at: None,
        ended_at: None,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::state::room::{DuelMode, DuelPool};

    fn t(seconds: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(9_000_000 + seconds)
    }

    fn finished_match(series_id: Uuid, best_of: u32, number: u32, scores: (i64, i64)) -> DuelRoom {
        let mut a = DuelPlayer::new("a".into(), "Ana".into(), t(0));
        let mut b = DuelPlayer::new("b".into(), "Ben".into(), t(0));
        a.score = scores.0;
        b.score = scores.1;
        DuelRoom {
            id: Uuid::new_v4(),
            code: format!("ROOM{number:02}"),
            mode: DuelMode::CapitalGuess,
            pool: DuelPool::World,
            series_id,
            series_best_of: best_of,
            series_match_number: number,
            rounds: 12,
            duration_seconds: 180,
            host_player_id: "a".into(),
            status: DuelStatus::Finished,
            players: vec![a, b],
            questions: Vec::new(),
            target_countries: Vec::new(),
            focus_region: None,
            created_at: t(0),
            started_at: Some(t(1)),
            ended_at: Some(t(100)),
        }
    }

    #[test]
    fn winner_needs_finished_room_and_strict_lead() {
        let series = Uuid::new_v4();
        let mut room = finished_match(series, 1, 1, (300, 200));
        assert_eq!(match_winner(&room).map(|p| p.player_id.as_str()), Some("a"));

        room.players[1].score = 300;
        assert!(match_winner(&room).is_none());

        room.players[1].score = 400;
        room.status = DuelStatus::Active;
        assert!(match_winner(&room).is_none());
    }

    #[test]
    fn best_of_three_is_decided_by_two_wins() {
        let series = Uuid::new_v4();
        let rooms = vec![
            finished_match(series, 3, 1, (500, 100)),
            finished_match(series, 3, 2, (100, 500)),
            finished_match(series, 3, 3, (600, 200)),
        ];

        let snapshot = compute_series_snapshot(&rooms, &rooms[2]);
        assert_eq!(snapshot.target_wins, 2);
        assert!(snapshot.decided);
        assert_eq!(snapshot.winner_player_id.as_deref(), Some("a"));
        assert_eq!(snapshot.winner_name.as_deref(), Some("Ana"));
        assert_eq!(snapshot.next_match_number, None);
        assert_eq!(snapshot.wins[0].wins, 2);
        assert_eq!(snapshot.wins[1].wins, 1);
        assert_eq!(snapshot.history.len(), 3);
        assert_eq!(snapshot.history[1].winner_player_id.as_deref(), Some("b"));
    }

    #[test]
    fn open_series_offers_next_match() {
        let series = Uuid::new_v4();
        let rooms = vec![finished_match(series, 3, 1, (500, 100))];
        let snapshot = compute_series_snapshot(&rooms, &rooms[0]);
        assert!(!snapshot.decided);
        assert_eq!(snapshot.next_match_number, Some(2));
        assert_eq!(snapshot.current_match_number, 1);
    }

    #[test]
    fn tied_final_match_decides_without_winner() {
        let series = Uuid::new_v4();
        let rooms = vec![finished_match(series, 1, 1, (200, 200))];
        let snapshot = compute_series_snapshot(&rooms, &rooms[0]);
        assert!(snapshot.decided);
        assert_eq!(snapshot.winner_player_id, None);
        assert_eq!(snapshot.next_match_number, None);
    }

    #[test]
    fn unplayed_final_match_keeps_series_open() {
        let series = Uuid::new_v4();
        let mut decider = finished_match(series, 3, 3, (0, 0));
        decider.status = DuelStatus::Waiting;
        decider.ended_at = None;
        let rooms = vec![
            finished_match(series, 3, 1, (500, 100)),
            finished_match(series, 3, 2, (100, 500)),
            decider,
        ];

        let snapshot = compute_series_snapshot(&rooms, &rooms[2]);
        assert!(!snapshot.decided);
        assert_eq!(snapshot.winner_player_id, None);
        assert_eq!(snapshot.next_match_number, None);
        assert_eq!(snapshot.history.len(), 3);

        let from_first = compute_series_snapshot(&rooms, &rooms[0]);
        assert!(!from_first.decided);
    }

    #[test]
    fn current_room_replaces_stored_copy() {
        let series = Uuid::new_v4();
        let mut stored = finished_match(series, 3, 1, (0, 0));
        stored.status = DuelStatus::Active;
        let mut current = stored.clone();
        current.status = DuelStatus::Finished;
        current.players[1].score = 100;

        let snapshot = compute_series_snapshot(&[stored], &current);
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.history[0].winner_player_id.as_deref(), Some("b"));
    }

    #[test]
    fn rematch_resets_players_and_keeps_settings() {
        let source = finished_match(Uuid::new_v4(), 3, 1, (500, 100));
        let next = build_rematch_room(&source, "b", 2, "NEXT22".into(), t(200));

        assert_ne!(next.id, source.id);
        assert_eq!(next.series_id, source.series_id);
        assert_eq!(next.series_best_of, 3);
        assert_eq!(next.series_match_number, 2);
        assert_eq!(next.host_player_id, "b");
        assert_eq!(next.status, DuelStatus::Waiting);
        assert_eq!(next.rounds, source.rounds);
        assert!(next.players.iter().all(|p| !p.ready && p.score == 0));
        assert_eq!(next.players.len(), 2);
    }
}
