//! End-to-end duel flows driven through the service layer against the in-memory store.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::{Duration, SystemTime},
};

use futures::future::{BoxFuture, FutureExt};
use geo_duel_back::{
    config::AppConfig,
    countries::CountryCatalog,
    dao::{
        models::{DuelRoomEntity, StoredRoom, VersionToken},
        room_store::{RoomStore, memory::MemoryRoomStore},
        storage::{StorageError, StorageResult},
    },
    dto::duel::{
        CreateRoomRequest, JoinRoomRequest, PoolInput, ReadyRequest, RematchRequest,
        RoomSnapshot, StartMatchRequest, SubmitAnswerRequest, SubmitAnswerResponse,
    },
    error::ServiceError,
    services::duel_service,
    state::{
        AppState, DuelError, ManualClock, SharedState,
        room::{DuelMode, DuelStatus},
    },
};
use uuid::Uuid;

const EUROPE: [&str; 8] = [
    "France",
    "Germany",
    "Spain",
    "Italy",
    "Portugal",
    "Netherlands",
    "Belgium",
    "Austria",
];

type Competitor = Arc<Mutex<Option<BoxFuture<'static, ()>>>>;

/// Memory store that can inject competing writers, conflicts or code collisions.
#[derive(Clone, Default)]
struct ContendedStore {
    inner: MemoryRoomStore,
    competitor: Competitor,
    insert_competitor: Competitor,
    forced_conflicts: Arc<AtomicU32>,
    taken_codes: Arc<AtomicU32>,
    saves: Arc<AtomicU32>,
    inserts: Arc<AtomicU32>,
}

/// Decrement `counter` if it is above zero, reporting whether it was.
fn consume(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
        .is_ok()
}

impl ContendedStore {
    /// Run `competitor` to completion right before the next save lands.
    fn race_next_save(&self, competitor: BoxFuture<'static, ()>) {
        *self.competitor.lock().unwrap() = Some(competitor);
    }

    /// Run `competitor` to completion right before the next insert lands.
    fn race_next_insert(&self, competitor: BoxFuture<'static, ()>) {
        *self.insert_competitor.lock().unwrap() = Some(competitor);
    }

    fn force_conflicts(&self, count: u32) {
        self.forced_conflicts.store(count, Ordering::SeqCst);
    }

    /// Report the next `count` drawn codes as already owned by another room.
    fn take_codes(&self, count: u32) {
        self.taken_codes.store(count, Ordering::SeqCst);
    }
}

impl RoomStore for ContendedStore {
    fn insert_room(
        &self,
        room: DuelRoomEntity,
        expires_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<VersionToken>> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.clone();
        let competitor = self.insert_competitor.lock().unwrap().take();
        let taken = consume(&self.taken_codes);

        async move {
            if taken {
                return Err(StorageError::DuplicateCode(room.code));
            }
            if let Some(competitor) = competitor {
                competitor.await;
            }
            inner.insert_room(room, expires_at).await
        }
        .boxed()
    }

    fn find_room(&self, room_ref: String) -> BoxFuture<'static, StorageResult<Option<StoredRoom>>> {
        self.inner.find_room(room_ref)
    }

    fn save_room(
        &self,
        room: DuelRoomEntity,
        expected: Option<VersionToken>,
        expires_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<VersionToken>> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.clone();
        let competitor = self.competitor.lock().unwrap().take();
        let forced = consume(&self.forced_conflicts);

        async move {
            if forced {
                return Err(StorageError::Conflict(room.id.to_string()));
            }
            if let Some(competitor) = competitor {
                competitor.await;
            }
            inner.save_room(room, expected, expires_at).await
        }
        .boxed()
    }

    fn list_series(&self, series_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<DuelRoomEntity>>> {
        self.inner.list_series(series_id)
    }

    fn sweep_expired(&self, now: SystemTime) -> BoxFuture<'static, StorageResult<usize>> {
        self.inner.sweep_expired(now)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.try_reconnect()
    }
}

struct Harness {
    state: SharedState,
    clock: Arc<ManualClock>,
    store: ContendedStore,
}

async fn harness() -> Harness {
    let mut config = AppConfig::default();
    config.retry_jitter_min_ms = 1;
    config.retry_jitter_max_ms = 2;

    let clock = Arc::new(ManualClock::default());
    let catalog = CountryCatalog::embedded().expect("embedded catalog parses");
    let state = AppState::new(config, catalog, clock.clone());
    let store = ContendedStore::default();
    state.install_room_store(Arc::new(store.clone())).await;

    Harness {
        state,
        clock,
        store,
    }
}

impl Harness {
    async fn create(&self, player: &str, mode: DuelMode, best_of: Option<i64>) -> RoomSnapshot {
        duel_service::create_room(
            &self.state,
            CreateRoomRequest {
                player_id: player.into(),
                player_name: format!("Name {player}"),
                mode,
                series_best_of: best_of,
                pool: None,
            },
        )
        .await
        .expect("room created")
        .room
    }

    async fn join(&self, room_ref: &str, player: &str) -> Result<RoomSnapshot, ServiceError> {
        duel_service::join_room(
            &self.state,
            JoinRoomRequest {
                room_id: room_ref.into(),
                player_id: player.into(),
                player_name: format!("Name {player}"),
            },
        )
        .await
        .map(|response| response.room)
    }

    async fn ready(&self, room_ref: &str, player: &str) -> Result<RoomSnapshot, ServiceError> {
        duel_service::set_ready(
            &self.state,
            ReadyRequest {
                room_id: room_ref.into(),
                player_id: player.into(),
                ready: true,
            },
        )
        .await
        .map(|response| response.room)
    }

    async fn start(
        &self,
        room_ref: &str,
        host: &str,
        mode: DuelMode,
        continent: Option<&str>,
        allowed: &[&str],
    ) -> Result<RoomSnapshot, ServiceError> {
        duel_service::start_match(
            &self.state,
            StartMatchRequest {
                room_id: room_ref.into(),
                host_player_id: host.into(),
                mode,
                continent: continent.map(str::to_owned),
                allowed_countries: allowed.iter().map(|name| name.to_string()).collect(),
            },
        )
        .await
        .map(|response| response.room)
    }

    async fn answer(
        &self,
        room_ref: &str,
        player: &str,
        index: Option<i64>,
        answer: &str,
    ) -> Result<SubmitAnswerResponse, ServiceError> {
        duel_service::submit_answer(
            &self.state,
            SubmitAnswerRequest {
                room_id: room_ref.into(),
                player_id: player.into(),
                question_index: index,
                answer: answer.into(),
            },
        )
        .await
    }

    async fn view(&self, room_ref: &str, viewer: &str) -> Result<RoomSnapshot, ServiceError> {
        duel_service::get_room_state(&self.state, room_ref, viewer)
            .await
            .map(|response| response.room)
    }

    async fn rematch(&self, room_ref: &str, requester: &str) -> Result<RoomSnapshot, ServiceError> {
        duel_service::create_rematch(
            &self.state,
            RematchRequest {
                room_id: room_ref.into(),
                requester_player_id: requester.into(),
            },
        )
        .await
        .map(|response| response.room)
    }

    /// Seat `a` and `b`, ready both, and start as `a`.
    async fn started(&self, mode: DuelMode, best_of: Option<i64>) -> RoomSnapshot {
        let room = self.create("a", mode, best_of).await;
        let id = room.id.to_string();
        self.join(&id, "b").await.unwrap();
        self.ready(&id, "a").await.unwrap();
        self.ready(&id, "b").await.unwrap();
        let continent = (mode == DuelMode::ContinentQuiz).then_some("Europe");
        self.start(&id, "a", mode, continent, &EUROPE).await.unwrap()
    }

    fn capital_for(&self, country: &str) -> String {
        self.state
            .catalog()
            .capital_of(country)
            .expect("prompt is a known country")
            .to_owned()
    }

    /// Play a capital-guess room to completion with `winner` right and `loser` wrong on every question.
    async fn play_out(&self, room: &RoomSnapshot, winner: &str, loser: &str) -> RoomSnapshot {
        let id = room.id.to_string();
        for question in &room.questions {
            let capital = self.capital_for(&question.prompt);
            let index = Some(question.idx as i64);
            self.answer(&id, winner, index, &capital).await.unwrap();
            self.answer(&id, loser, index, "Atlantis").await.unwrap();
        }
        self.view(&id, winner).await.unwrap()
    }

    /// Ready both seated players of a rematch room and start it as its host.
    async fn start_rematch(&self, room: &RoomSnapshot) -> RoomSnapshot {
        let id = room.id.to_string();
        self.ready(&id, "a").await.unwrap();
        self.ready(&id, "b").await.unwrap();
        self.start(&id, &room.host_player_id, DuelMode::CapitalGuess, None, &[])
            .await
            .unwrap()
    }
}

fn duel_error(result: Result<impl std::fmt::Debug, ServiceError>) -> DuelError {
    match result {
        Err(ServiceError::Duel(err)) => err,
        other => panic!("expected a duel error, got {other:?}"),
    }
}

#[tokio::test]
async fn capital_guess_room_starts_with_hidden_answers() {
    let h = harness().await;
    let created = h.create("a", DuelMode::CapitalGuess, None).await;
    assert_eq!(created.status, DuelStatus::Waiting);
    assert_eq!(created.code.len(), 6);
    assert_eq!(created.series.best_of, 1);
    assert_eq!(created.series.current_match_number, 1);
    assert!(created.me.as_ref().is_some_and(|me| !me.ready));

    let joined = h.join(&created.code.to_lowercase(), "b").await.unwrap();
    assert_eq!(joined.players.len(), 2);
    assert!(joined.players[1].is_self);

    let id = created.id.to_string();
    h.ready(&id, "a").await.unwrap();
    h.ready(&id, "b").await.unwrap();
    let room = h
        .start(&id, "a", DuelMode::CapitalGuess, None, &[])
        .await
        .unwrap();

    assert_eq!(room.status, DuelStatus::Active);
    assert_eq!(room.rounds, 12);
    assert_eq!(room.duration_seconds, 180);
    assert_eq!(room.remaining_seconds, 180);
    assert_eq!(room.questions.len(), 12);
    for question in &room.questions {
        assert!(question.country.is_none());
        assert!(question.capital.is_none());
        assert!(h.state.catalog().contains(&question.prompt));
    }
}

#[tokio::test]
async fn third_player_is_turned_away() {
    let h = harness().await;
    let room = h.create("a", DuelMode::CapitalGuess, None).await;
    let id = room.id.to_string();
    h.join(&id, "b").await.unwrap();

    assert_eq!(duel_error(h.join(&id, "c").await), DuelError::RoomFull);

    let rejoined = h.join(&id, "b").await.unwrap();
    assert_eq!(rejoined.players.len(), 2);
}

#[tokio::test]
async fn start_preconditions_and_forward_only_status() {
    let h = harness().await;
    let room = h.create("a", DuelMode::CapitalGuess, None).await;
    let id = room.id.to_string();

    let mode = DuelMode::CapitalGuess;
    assert_eq!(
        duel_error(h.start(&id, "a", mode, None, &[]).await),
        DuelError::TwoPlayersRequired
    );

    h.join(&id, "b").await.unwrap();
    assert_eq!(
        duel_error(h.start(&id, "b", mode, None, &[]).await),
        DuelError::HostOnly
    );
    h.ready(&id, "a").await.unwrap();
    assert_eq!(
        duel_error(h.start(&id, "a", mode, None, &[]).await),
        DuelError::PlayersNotReady
    );

    h.ready(&id, "b").await.unwrap();
    h.start(&id, "a", mode, None, &[]).await.unwrap();

    assert_eq!(
        duel_error(h.start(&id, "a", mode, None, &[]).await),
        DuelError::AlreadyStarted
    );
    assert_eq!(duel_error(h.ready(&id, "b").await), DuelError::AlreadyStarted);

    h.clock.advance(Duration::from_secs(181));
    let finished = h.view(&id, "a").await.unwrap();
    assert_eq!(finished.status, DuelStatus::Finished);
    assert_eq!(
        duel_error(h.start(&id, "a", mode, None, &[]).await),
        DuelError::AlreadyStarted
    );
    assert_eq!(
        duel_error(h.answer(&id, "a", Some(0), "x").await),
        DuelError::NotActive
    );
    assert_eq!(h.view(&id, "a").await.unwrap().status, DuelStatus::Finished);
}

#[tokio::test]
async fn repeated_answer_returns_stored_result() {
    let h = harness().await;
    let room = h.started(DuelMode::CapitalGuess, None).await;
    let id = room.id.to_string();
    let capital = h.capital_for(&room.questions[0].prompt);

    let first = h.answer(&id, "a", Some(0), &capital).await.unwrap();
    assert!(first.result.correct);

    let again = h.answer(&id, "a", Some(0), "Atlantis").await.unwrap();
    assert_eq!(again.result, first.result);

    let me = again.room.me.unwrap();
    assert_eq!(me.score, 100);
    assert_eq!(me.answers.len(), 1);
    assert!(me.answers.contains_key("0"));
}

#[tokio::test]
async fn continent_quiz_resolves_aliases_once() {
    let h = harness().await;
    let room = h.started(DuelMode::ContinentQuiz, None).await;
    let id = room.id.to_string();
    assert_eq!(room.rounds, EUROPE.len());
    assert_eq!(room.duration_seconds, 420);
    assert_eq!(room.target_countries.len(), EUROPE.len());

    let first = h.answer(&id, "a", None, "Deutschland").await.unwrap();
    assert!(first.result.correct);
    let me = first.room.me.unwrap();
    assert_eq!(me.guessed_countries, vec!["Germany".to_string()]);
    // 1 country, 420 s left
    assert_eq!(me.score, 10 + 70);

    let again = h.answer(&id, "a", None, "germany").await.unwrap();
    assert!(!again.result.correct);
    assert_eq!(again.room.me.unwrap().guessed_countries.len(), 1);

    let other = h.answer(&id, "b", None, "  FRANCE ").await.unwrap();
    assert!(other.result.correct);
    assert_eq!(other.room.players[1].answers_count, 1);
}

#[tokio::test]
async fn continent_quiz_needs_selection_and_list() {
    let h = harness().await;
    let room = h.create("a", DuelMode::ContinentQuiz, None).await;
    let id = room.id.to_string();
    h.join(&id, "b").await.unwrap();
    h.ready(&id, "a").await.unwrap();
    h.ready(&id, "b").await.unwrap();

    let missing = h
        .start(&id, "a", DuelMode::ContinentQuiz, None, &EUROPE)
        .await;
    assert_eq!(duel_error(missing), DuelError::ContinentRequired);

    let short = h
        .start(&id, "a", DuelMode::ContinentQuiz, Some("Europe"), &EUROPE[..7])
        .await;
    assert_eq!(duel_error(short), DuelError::ContinentCountriesRequired);

    let waiting = h.view(&id, "a").await.unwrap();
    assert_eq!(waiting.status, DuelStatus::Waiting);
}

#[tokio::test]
async fn open_target_match_finishes_on_deadline_without_bonus() {
    let h = harness().await;
    let room = h.started(DuelMode::ContinentQuiz, None).await;
    let id = room.id.to_string();
    h.answer(&id, "b", None, "Spain").await.unwrap();

    h.clock.advance(Duration::from_secs(421));
    let finished = h.view(&id, "a").await.unwrap();
    assert_eq!(finished.status, DuelStatus::Finished);
    assert_eq!(finished.remaining_seconds, finished.duration_seconds);
    assert_eq!(finished.players[0].score, 0);
    assert_eq!(finished.players[1].score, 10);
    assert!(finished.ended_at.is_some());
}

#[tokio::test]
async fn discrete_match_finishes_when_both_answered_everything() {
    let h = harness().await;
    let room = h.started(DuelMode::CapitalGuess, None).await;
    let finished = h.play_out(&room, "a", "b").await;

    assert_eq!(finished.status, DuelStatus::Finished);
    assert_eq!(finished.players[0].score, 1_200);
    assert_eq!(finished.players[1].score, 0);
    assert!(
        finished
            .questions
            .iter()
            .all(|q| q.country.is_some() && q.capital.is_some())
    );
}

#[tokio::test]
async fn best_of_three_series_is_won_two_to_one() {
    let h = harness().await;

    let first = h.started(DuelMode::CapitalGuess, Some(3)).await;
    let first = h.play_out(&first, "a", "b").await;
    assert!(!first.series.decided);
    assert_eq!(first.series.next_match_number, Some(2));

    let second = h.rematch(&first.id.to_string(), "b").await.unwrap();
    assert_eq!(second.series.id, first.series.id);
    assert_eq!(second.series.current_match_number, 2);
    assert_eq!(second.host_player_id, "b");
    assert_eq!(second.status, DuelStatus::Waiting);
    assert!(second.players.iter().all(|p| !p.ready && p.score == 0));

    let second = h.start_rematch(&second).await;
    let second = h.play_out(&second, "b", "a").await;
    assert!(!second.series.decided);

    let third = h.rematch(&second.id.to_string(), "a").await.unwrap();
    let third = h.start_rematch(&third).await;
    let third = h.play_out(&third, "a", "b").await;

    let series = third.series;
    assert!(series.decided);
    assert_eq!(series.target_wins, 2);
    assert_eq!(series.winner_player_id.as_deref(), Some("a"));
    assert_eq!(series.next_match_number, None);
    assert_eq!(series.wins[0].player_id, "a");
    assert_eq!(series.wins[0].wins, 2);
    assert_eq!(series.wins[1].wins, 1);
    assert_eq!(series.history.len(), 3);

    assert_eq!(
        duel_error(h.rematch(&third.id.to_string(), "a").await),
        DuelError::SeriesExhausted
    );
}

#[tokio::test]
async fn series_won_early_refuses_rematch() {
    let h = harness().await;
    let first = h.started(DuelMode::CapitalGuess, Some(3)).await;
    let first = h.play_out(&first, "a", "b").await;

    let second = h.rematch(&first.id.to_string(), "a").await.unwrap();
    let second = h.start_rematch(&second).await;
    let second = h.play_out(&second, "a", "b").await;
    assert!(second.series.decided);
    assert_eq!(second.series.next_match_number, None);

    assert_eq!(
        duel_error(h.rematch(&second.id.to_string(), "b").await),
        DuelError::SeriesDecided
    );
}

#[tokio::test]
async fn best_of_one_cannot_be_extended() {
    let h = harness().await;
    let room = h.started(DuelMode::CapitalGuess, None).await;
    let id = room.id.to_string();

    assert_eq!(
        duel_error(h.rematch(&id, "a").await),
        DuelError::MatchNotFinished
    );

    let capital = h.capital_for(&room.questions[0].prompt);
    h.answer(&id, "a", Some(0), &capital).await.unwrap();
    h.clock.advance(Duration::from_secs(180));

    let finished = h.view(&id, "b").await.unwrap();
    assert_eq!(finished.status, DuelStatus::Finished);
    assert!(finished.series.decided);
    assert_eq!(finished.series.winner_player_id.as_deref(), Some("a"));
    assert_eq!(finished.series.next_match_number, None);

    assert_eq!(
        duel_error(h.rematch(&id, "stranger").await),
        DuelError::ParticipantsOnly
    );
    assert_eq!(
        duel_error(h.rematch(&id, "b").await),
        DuelError::SeriesExhausted
    );
}

#[tokio::test]
async fn tied_best_of_one_is_decided_without_winner() {
    let h = harness().await;
    let room = h.started(DuelMode::CapitalGuess, None).await;
    let id = room.id.to_string();

    h.clock.advance(Duration::from_secs(200));
    let finished = h.view(&id, "a").await.unwrap();
    assert!(finished.series.decided);
    assert_eq!(finished.series.winner_player_id, None);
    assert_eq!(finished.series.history[0].winner_player_id, None);
}

#[tokio::test]
async fn abandoned_room_expires_after_a_day() {
    let h = harness().await;
    let room = h.create("a", DuelMode::WorldQuiz, None).await;
    let id = room.id.to_string();

    h.clock.advance(Duration::from_secs(24 * 60 * 60 + 1));
    assert_eq!(duel_error(h.view(&id, "a").await), DuelError::RoomNotFound);
    assert_eq!(
        duel_error(h.view(&room.code, "a").await),
        DuelError::RoomNotFound
    );
}

#[tokio::test]
async fn competing_submissions_are_both_kept() {
    let h = harness().await;
    let room = h.started(DuelMode::CapitalGuess, None).await;
    let id = room.id.to_string();
    let capital = h.capital_for(&room.questions[0].prompt);

    let competitor = {
        let state = h.state.clone();
        let id = id.clone();
        let capital = capital.clone();
        async move {
            duel_service::submit_answer(
                &state,
                SubmitAnswerRequest {
                    room_id: id,
                    player_id: "b".into(),
                    question_index: Some(0),
                    answer: capital,
                },
            )
            .await
            .expect("competing answer saved");
        }
        .boxed()
    };
    h.store.race_next_save(competitor);

    let response = h.answer(&id, "a", Some(0), &capital).await.unwrap();
    assert!(response.result.correct);

    let view = h.view(&id, "a").await.unwrap();
    assert_eq!(view.players[0].answers_count, 1);
    assert_eq!(view.players[1].answers_count, 1);
    assert_eq!(view.players[0].score, 100);
    assert_eq!(view.players[1].score, 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_submissions_for_different_players_both_land() {
    let h = harness().await;
    let room = h.started(DuelMode::CapitalGuess, None).await;
    let id = room.id.to_string();

    let tasks = ["a", "b"].map(|player| {
        let state = h.state.clone();
        let id = id.clone();
        tokio::spawn(async move {
            duel_service::submit_answer(
                &state,
                SubmitAnswerRequest {
                    room_id: id,
                    player_id: player.into(),
                    question_index: Some(3),
                    answer: "Atlantis".into(),
                },
            )
            .await
        })
    });
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let view = h.view(&id, "a").await.unwrap();
    assert!(view.players.iter().all(|player| player.answers_count == 1));
}

#[tokio::test]
async fn conflicts_are_retried_then_reported() {
    let h = harness().await;
    let room = h.create("a", DuelMode::CapitalGuess, None).await;
    let id = room.id.to_string();

    h.store.force_conflicts(3);
    let before = h.store.saves.load(Ordering::SeqCst);
    h.join(&id, "b").await.unwrap();
    assert_eq!(h.store.saves.load(Ordering::SeqCst) - before, 4);

    h.store.force_conflicts(100);
    let err = h.ready(&id, "a").await.unwrap_err();
    assert!(matches!(&err, ServiceError::Conflict(message) if message == "Conflict while updating room"));
    h.store.force_conflicts(0);

    let view = h.view(&id, "a").await.unwrap();
    assert!(view.players.iter().all(|player| !player.ready));
}

#[tokio::test]
async fn domain_errors_do_not_write() {
    let h = harness().await;
    let room = h.create("a", DuelMode::CapitalGuess, None).await;
    let id = room.id.to_string();

    let before = h.store.saves.load(Ordering::SeqCst);
    assert_eq!(duel_error(h.ready(&id, "ghost").await), DuelError::PlayerNotInRoom);
    assert_eq!(h.store.saves.load(Ordering::SeqCst), before);
}

#[tokio::test]
async fn continent_pool_feeds_capital_questions() {
    let h = harness().await;
    let created = duel_service::create_room(
        &h.state,
        CreateRoomRequest {
            player_id: "a".into(),
            player_name: String::new(),
            mode: DuelMode::CapitalGuess,
            series_best_of: Some(9),
            pool: Some(PoolInput {
                kind: Some("continent".into()),
                continent: Some("Europe".into()),
                allowed_countries: EUROPE.iter().map(|name| name.to_string()).collect(),
            }),
        },
    )
    .await
    .unwrap()
    .room;

    assert_eq!(created.pool.kind, "continent");
    assert_eq!(created.pool.countries_count, Some(EUROPE.len()));
    assert_eq!(created.series.best_of, 3);
    assert_eq!(created.players[0].name, "Player");

    let id = created.id.to_string();
    h.join(&id, "b").await.unwrap();
    h.ready(&id, "a").await.unwrap();
    h.ready(&id, "b").await.unwrap();
    let room = h
        .start(&id, "a", DuelMode::CapitalGuess, None, &[])
        .await
        .unwrap();

    assert_eq!(room.questions.len(), EUROPE.len());
    assert!(room.questions.iter().all(|q| EUROPE.contains(&q.prompt.as_str())));
}

#[tokio::test]
async fn spectators_get_no_private_block() {
    let h = harness().await;
    let room = h.started(DuelMode::CapitalGuess, None).await;
    let view = h.view(&room.id.to_string(), "watcher").await.unwrap();
    assert!(view.me.is_none());
    assert!(view.players.iter().all(|player| !player.is_self));
}

#[tokio::test]
async fn colliding_codes_are_redrawn_a_bounded_number_of_times() {
    let h = harness().await;
    let attempts = h.state.config().code_insert_attempts;

    h.store.take_codes(attempts - 1);
    let before = h.store.inserts.load(Ordering::SeqCst);
    let room = h.create("a", DuelMode::CapitalGuess, None).await;
    assert_eq!(h.store.inserts.load(Ordering::SeqCst) - before, attempts);
    assert_eq!(h.view(&room.code, "a").await.unwrap().id, room.id);

    h.store.take_codes(attempts);
    let before = h.store.inserts.load(Ordering::SeqCst);
    let err = duel_service::create_room(
        &h.state,
        CreateRoomRequest {
            player_id: "c".into(),
            player_name: "Cleo".into(),
            mode: DuelMode::CapitalGuess,
            series_best_of: None,
            pool: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(&err, ServiceError::Internal(message) if message == "Failed to create room"));
    assert_eq!(h.store.inserts.load(Ordering::SeqCst) - before, attempts);
}

#[tokio::test]
async fn simultaneous_rematches_share_one_room() {
    let h = harness().await;
    let first = h.started(DuelMode::CapitalGuess, Some(3)).await;
    let first = h.play_out(&first, "a", "b").await;
    let first_id = first.id.to_string();

    let other_request = {
        let state = h.state.clone();
        let room_id = first_id.clone();
        async move {
            duel_service::create_rematch(
                &state,
                RematchRequest {
                    room_id,
                    requester_player_id: "b".into(),
                },
            )
            .await
            .expect("other rematch created");
        }
        .boxed()
    };
    h.store.race_next_insert(other_request);

    let mine = h.rematch(&first_id, "a").await.unwrap();
    assert_eq!(mine.series.current_match_number, 2);
    assert_eq!(mine.host_player_id, "b");
    assert_eq!(mine.status, DuelStatus::Waiting);

    let series = h.view(&mine.id.to_string(), "a").await.unwrap().series;
    assert_eq!(series.history.len(), 2);
}

#[tokio::test]
async fn repeated_rematch_returns_the_waiting_match() {
    let h = harness().await;
    let first = h.started(DuelMode::CapitalGuess, Some(3)).await;
    let first = h.play_out(&first, "a", "b").await;
    let first_id = first.id.to_string();

    let second = h.rematch(&first_id, "a").await.unwrap();
    let again = h.rematch(&first_id, "b").await.unwrap();
    assert_eq!(again.id, second.id);
    assert_eq!(again.series.current_match_number, 2);

    let series = h.view(&second.id.to_string(), "b").await.unwrap().series;
    assert!(!series.decided);
    assert_eq!(series.winner_player_id, None);
    assert_eq!(series.history.len(), 2);
    assert_eq!(series.next_match_number, Some(3));
}

#[tokio::test]
async fn waiting_decider_does_not_close_the_series() {
    let h = harness().await;
    let first = h.started(DuelMode::CapitalGuess, Some(3)).await;
    let first = h.play_out(&first, "a", "b").await;

    let second = h.rematch(&first.id.to_string(), "b").await.unwrap();
    let second = h.start_rematch(&second).await;
    let second = h.play_out(&second, "b", "a").await;

    let third = h.rematch(&second.id.to_string(), "a").await.unwrap();
    assert_eq!(third.series.current_match_number, 3);
    assert!(!third.series.decided);
    assert_eq!(third.series.next_match_number, None);

    let from_first = h.rematch(&first.id.to_string(), "b").await.unwrap();
    assert_eq!(from_first.id, third.id);
}
