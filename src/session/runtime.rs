//! Task owning a [`GameSession`].
//!
//! Player commands, timer deadlines and collaborator answers are all funnelled into one
//! `select!` loop, so the session is only ever mutated from this task. Dictionary lookups,
//! letter loading and saving run in spawned tasks and report back through an internal
//! channel tagged with the session generation; answers for an abandoned game are dropped.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, sleep_until},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    clients::{
        api::{ApiClientError, GameApi},
        dictionary::{DictionaryOracle, OracleError},
    },
    config::GameConfig,
    dto::{
        game::{CreateGameRequest, GameRecordDto},
        letters::TodayLettersResponse,
    },
    game::{
        history::{GameHistory, HistoryEvent},
        scoring::BestWord,
        tray::{LetterId, SubmitRejection},
    },
};

use super::{GameSession, SessionSnapshot, Verdict, WordOutcome, WordTicket, phase::SessionPhase};

const COMMAND_CAPACITY: usize = 32;
const UPDATE_CAPACITY: usize = 256;

/// Player input accepted by the session task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start asking for initials.
    BeginEntry,
    /// Submit the three-letter player tag.
    SubmitInitials(String),
    /// Replace the typed word.
    SetInput(String),
    /// Click a tray letter on or off.
    ToggleLetter(LetterId),
    /// Send the current word to the dictionary.
    SubmitWord,
    /// Abandon the current game.
    Reset,
}

/// Notifications published by the session task.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SessionUpdate {
    /// Full state after any change.
    Snapshot(SessionSnapshot),
    /// A command was refused.
    Rejected {
        /// Why it was refused.
        reason: String,
    },
    /// A word was scored or a letter expired.
    Scored(HistoryEvent),
    /// The dictionary could not answer; the word's letters are back in the tray.
    Returned {
        /// The word that could not be checked.
        word: String,
        /// What went wrong with the lookup.
        reason: String,
    },
    /// The day's letters could not be loaded.
    LoadFailed {
        /// What went wrong with the fetch.
        reason: String,
    },
    /// The tray ran dry and the game was saved, or failed to save.
    GameOver(GameOverSummary),
}

/// Results shown once the game ends.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOverSummary {
    /// Player tag.
    pub initials: String,
    /// Final score.
    pub score: i32,
    /// Highest-scoring valid word.
    pub best_word: Option<BestWord>,
    /// Every scored event with its subtotals.
    pub history: GameHistory,
    /// Whether the server stored the game.
    pub saved: SaveStatus,
}

/// Outcome of persisting the finished game.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaveStatus {
    /// Stored and ranked against today's board.
    Saved {
        /// Identifier assigned by the server.
        game_id: Uuid,
        /// Position on today's board, when it made the cut.
        rank: Option<usize>,
        /// Today's best games after this one was stored.
        top: Vec<GameRecordDto>,
    },
    /// The game could not be stored; the local results are still valid.
    Failed {
        /// Error reported by the API.
        message: String,
    },
}

/// The session task is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("game session has stopped")]
pub struct SessionClosed;

/// Handle used to drive a spawned session.
///
/// The task stops once every handle is dropped.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    updates: broadcast::Sender<SessionUpdate>,
}

impl SessionHandle {
    /// Queue a command; fails once the task has stopped.
    pub async fn send(&self, command: Command) -> Result<(), SessionClosed> {
        self.commands.send(command).await.map_err(|_| SessionClosed)
    }

    /// Receive every update published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }
}

/// Spawn a session task.
pub fn spawn(
    config: GameConfig,
    oracle: Arc<dyn DictionaryOracle>,
    api: Arc<dyn GameApi>,
) -> (SessionHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
    let (internal_tx, internal_rx) = mpsc::unbounded_channel();

    let runtime = SessionRuntime {
        session: GameSession::new(&config),
        aging_tick: config.aging_tick,
        oracle_timeout: config.oracle_timeout,
        oracle,
        api,
        updates: updates.clone(),
        internal: internal_tx,
    };
    let task = tokio::spawn(runtime.run(command_rx, internal_rx));

    (
        SessionHandle {
            commands: command_tx,
            updates,
        },
        task,
    )
}

/// Answers from spawned work.
enum Internal {
    LettersLoaded {
        generation: u64,
        result: Result<TodayLettersResponse, ApiClientError>,
    },
    WordChecked {
        ticket: WordTicket,
        result: Result<bool, OracleError>,
    },
    GameSaved {
        generation: u64,
        status: SaveStatus,
    },
}

struct SessionRuntime {
    session: GameSession,
    aging_tick: Duration,
    oracle_timeout: Duration,
    oracle: Arc<dyn DictionaryOracle>,
    api: Arc<dyn GameApi>,
    updates: broadcast::Sender<SessionUpdate>,
    internal: mpsc::UnboundedSender<Internal>,
}

impl SessionRuntime {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
    ) {
        let mut aging = tokio::time::interval(self.aging_tick);
        aging.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let arrival = self.session.next_arrival();
            let playing = self.session.is_playing();

            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(message) = internal.recv() => self.handle_internal(message),
                _ = sleep_until(arrival.unwrap_or_else(Instant::now)), if arrival.is_some() => {
                    self.on_arrival();
                }
                _ = aging.tick(), if playing => self.on_aging_tick(),
            }
        }

        self.session.reset();
        debug!("game session task stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::BeginEntry => match self.session.begin_entry() {
                Ok(()) => self.publish_snapshot(),
                Err(err) => self.reject(err),
            },
            Command::SubmitInitials(initials) => match self.session.submit_initials(&initials) {
                Ok(initials) => {
                    info!(%initials, "loading today's letters");
                    self.load_letters();
                    self.publish_snapshot();
                }
                Err(err) => self.reject(err),
            },
            Command::SetInput(text) => {
                self.session.set_input(&text);
                self.publish_snapshot();
            }
            Command::ToggleLetter(id) => {
                self.session.toggle(id);
                self.publish_snapshot();
            }
            Command::SubmitWord => match self.session.submit(Instant::now()) {
                Ok(ticket) => {
                    debug!(word = %ticket.word, "checking word");
                    self.check_word(ticket);
                    self.publish_snapshot();
                }
                Err(rejection @ SubmitRejection::Busy) => {
                    debug!("submission ignored while a word is validating");
                    self.reject(rejection);
                }
                Err(rejection) => self.reject(rejection),
            },
            Command::Reset => {
                self.session.reset();
                self.publish_snapshot();
            }
        }
    }

    fn handle_internal(&mut self, message: Internal) {
        match message {
            Internal::LettersLoaded { generation, result } => {
                if generation != self.session.generation()
                    || self.session.phase() != SessionPhase::Loading
                {
                    debug!(generation, "discarding letters for an abandoned game");
                    return;
                }
                self.on_letters(result);
            }
            Internal::WordChecked { ticket, result } => self.on_word_checked(ticket, result),
            Internal::GameSaved { generation, status } => {
                if generation != self.session.generation()
                    || self.session.phase() != SessionPhase::GameOver
                {
                    debug!(generation, "discarding save result for an abandoned game");
                    return;
                }
                let scoring = self.session.scoring();
                let summary = GameOverSummary {
                    initials: self.session.initials().unwrap_or_default().to_owned(),
                    score: scoring.score(),
                    best_word: scoring.best_word().cloned(),
                    history: self.session.history().clone(),
                    saved: status,
                };
                self.publish(SessionUpdate::GameOver(summary));
            }
        }
    }

    fn on_letters(&mut self, result: Result<TodayLettersResponse, ApiClientError>) {
        let reason = match result {
            Ok(response) if response.letters.is_empty() => "no letters available for today".into(),
            Ok(response) => {
                let count = response.letters.len();
                match self.session.start(
                    response.letters,
                    Some(response.sequence_id),
                    Instant::now(),
                ) {
                    Ok(_) => {
                        info!(count, sequence_id = %response.sequence_id, "game started");
                        self.publish_snapshot();
                        return;
                    }
                    Err(err) => err.to_string(),
                }
            }
            Err(err) if err.is_not_found() => "no letters available for today".into(),
            Err(err) => {
                warn!(error = %err, "failed to load today's letters");
                format!("failed to load today's letters: {err}")
            }
        };

        if let Err(err) = self.session.load_failed() {
            warn!(error = %err, "unexpected phase after a failed load");
        }
        self.publish(SessionUpdate::LoadFailed { reason });
        self.publish_snapshot();
    }

    fn on_word_checked(&mut self, ticket: WordTicket, result: Result<bool, OracleError>) {
        let (verdict, failure) = match result {
            Ok(true) => (Verdict::Valid, None),
            Ok(false) => (Verdict::Invalid, None),
            Err(err) => {
                warn!(word = %ticket.word, error = %err, "dictionary unavailable");
                (Verdict::Unavailable, Some(err.to_string()))
            }
        };

        match self.session.resolve(&ticket, verdict, Instant::now()) {
            Some(WordOutcome::Scored(event)) => {
                debug!(%event, "word resolved");
                self.publish(SessionUpdate::Scored(event));
            }
            Some(WordOutcome::Returned { word }) => {
                self.publish(SessionUpdate::Returned {
                    word,
                    reason: failure.unwrap_or_default(),
                });
            }
            None => {
                debug!(word = %ticket.word, "discarding stale dictionary answer");
                return;
            }
        }
        self.publish_snapshot();
        self.finish_if_done();
    }

    fn on_arrival(&mut self) {
        let arrived = self.session.arrival_due(Instant::now());
        if !arrived.is_empty() {
            self.publish_snapshot();
        }
    }

    fn on_aging_tick(&mut self) {
        let now = Instant::now();
        let aging = self.session.tray().is_some_and(|tray| tray.is_aging());
        if let Some(event) = self.session.tick(now) {
            debug!(%event, "letter expired");
            self.publish(SessionUpdate::Scored(event));
            self.publish_snapshot();
            self.finish_if_done();
        } else if aging {
            self.publish_snapshot();
        }
    }

    fn finish_if_done(&mut self) {
        if !self.session.finish_if_done() {
            return;
        }
        info!(score = self.session.scoring().score(), "game over");
        self.publish_snapshot();
        if let Some(record) = self.session.record() {
            self.save_game(record);
        }
    }

    fn load_letters(&self) {
        let api = Arc::clone(&self.api);
        let internal = self.internal.clone();
        let generation = self.session.generation();
        tokio::spawn(async move {
            let result = api.today_letters().await;
            let _ = internal.send(Internal::LettersLoaded { generation, result });
        });
    }

    fn check_word(&self, ticket: WordTicket) {
        let lookup = self.oracle.is_valid_word(&ticket.word);
        let internal = self.internal.clone();
        let limit = self.oracle_timeout;
        tokio::spawn(async move {
            let result = tokio::time::timeout(limit, lookup)
                .await
                .unwrap_or(Err(OracleError::Timeout(limit)));
            let _ = internal.send(Internal::WordChecked { ticket, result });
        });
    }

    fn save_game(&self, record: CreateGameRequest) {
        let api = Arc::clone(&self.api);
        let internal = self.internal.clone();
        let generation = self.session.generation();
        tokio::spawn(async move {
            let status = save_and_rank(api.as_ref(), record).await;
            let _ = internal.send(Internal::GameSaved { generation, status });
        });
    }

    fn reject(&self, reason: impl ToString) {
        self.publish(SessionUpdate::Rejected {
            reason: reason.to_string(),
        });
    }

    fn publish_snapshot(&self) {
        self.publish(SessionUpdate::Snapshot(
            self.session.snapshot(Instant::now()),
        ));
    }

    fn publish(&self, update: SessionUpdate) {
        let _ = self.updates.send(update);
    }
}

async fn save_and_rank(api: &dyn GameApi, record: CreateGameRequest) -> SaveStatus {
    let saved = match api.save_game(record).await {
        Ok(saved) => saved,
        Err(err) => {
            warn!(error = %err, "failed to save finished game");
            return SaveStatus::Failed {
                message: err.to_string(),
            };
        }
    };

    let top = match api.top_today().await {
        Ok(board) => board.games,
        Err(err) => {
            warn!(error = %err, "failed to load today's leaderboard");
            Vec::new()
        }
    };
    let rank = top
        .iter()
        .position(|game| game.game_id == saved.game_id)
        .map(|index| index + 1);

    SaveStatus::Saved {
        game_id: saved.game_id,
        rank,
        top,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use futures::future::{self, BoxFuture};

    use crate::{
        clients::api::OfflineGameApi,
        dto::game::{CreateGameResponse, TopGamesResponse},
        game::letters::{Letter, parse_letters},
        services::calendar,
    };

    use super::*;

    struct Words(HashSet<&'static str>);

    impl DictionaryOracle for Words {
        fn is_valid_word(&self, word: &str) -> BoxFuture<'static, Result<bool, OracleError>> {
            let found = self.0.contains(word);
            Box::pin(async move { Ok(found) })
        }
    }

    struct Unreachable;

    impl DictionaryOracle for Unreachable {
        fn is_valid_word(&self, _word: &str) -> BoxFuture<'static, Result<bool, OracleError>> {
            Box::pin(async {
                Err(OracleError::RequestStatus {
                    provider: "test".into(),
                    status: reqwest::StatusCode::BAD_GATEWAY,
                })
            })
        }
    }

    struct Silent;

    impl DictionaryOracle for Silent {
        fn is_valid_word(&self, _word: &str) -> BoxFuture<'static, Result<bool, OracleError>> {
            Box::pin(future::pending())
        }
    }

    /// Serves fixed letters and keeps games in memory.
    struct FixedLetters {
        letters: Option<Vec<Letter>>,
        games: OfflineGameApi,
    }

    impl FixedLetters {
        fn new(letters: &str) -> Arc<Self> {
            Arc::new(Self {
                letters: Some(parse_letters(letters).unwrap()),
                games: OfflineGameApi::new(0, 10),
            })
        }

        fn missing() -> Arc<Self> {
            Arc::new(Self {
                letters: None,
                games: OfflineGameApi::new(0, 10),
            })
        }
    }

    impl GameApi for FixedLetters {
        fn today_letters(
            &self,
        ) -> BoxFuture<'static, Result<TodayLettersResponse, ApiClientError>> {
            let letters = self.letters.clone();
            Box::pin(async move {
                let letters = letters.ok_or(ApiClientError::RequestStatus {
                    path: "/letters/today".into(),
                    status: reqwest::StatusCode::NOT_FOUND,
                    message: "no sequence for today".into(),
                })?;
                Ok(TodayLettersResponse {
                    success: true,
                    letters,
                    sequence_id: Uuid::new_v4(),
                    reference_date: calendar::day_start(calendar::today()),
                })
            })
        }

        fn save_game(
            &self,
            game: CreateGameRequest,
        ) -> BoxFuture<'static, Result<CreateGameResponse, ApiClientError>> {
            self.games.save_game(game)
        }

        fn game(&self, id: Uuid) -> BoxFuture<'static, Result<GameRecordDto, ApiClientError>> {
            self.games.game(id)
        }

        fn top_today(&self) -> BoxFuture<'static, Result<TopGamesResponse, ApiClientError>> {
            self.games.top_today()
        }

        fn top_yesterday(&self) -> BoxFuture<'static, Result<TopGamesResponse, ApiClientError>> {
            self.games.top_yesterday()
        }
    }

    async fn wait_for<F>(
        updates: &mut broadcast::Receiver<SessionUpdate>,
        mut matches: F,
    ) -> SessionUpdate
    where
        F: FnMut(&SessionUpdate) -> bool,
    {
        loop {
            match tokio::time::timeout(Duration::from_secs(60), updates.recv()).await {
                Ok(Ok(update)) if matches(&update) => return update,
                Ok(Ok(_)) | Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(err)) => panic!("update channel failed: {err}"),
                Err(_) => panic!("no matching update"),
            }
        }
    }

    fn is_playing(update: &SessionUpdate) -> bool {
        matches!(update, SessionUpdate::Snapshot(snapshot) if matches!(snapshot.phase, SessionPhase::Playing(_)))
    }

    async fn start_game(handle: &SessionHandle, updates: &mut broadcast::Receiver<SessionUpdate>) {
        handle.send(Command::BeginEntry).await.unwrap();
        handle
            .send(Command::SubmitInitials("abc".into()))
            .await
            .unwrap();
        wait_for(updates, is_playing).await;
    }

    #[tokio::test(start_paused = true)]
    async fn finished_game_is_saved_and_ranked() {
        let oracle = Arc::new(Words(HashSet::from(["CAT"])));
        let (handle, _task) = spawn(GameConfig::default(), oracle, FixedLetters::new("CAT"));
        let mut updates = handle.subscribe();
        start_game(&handle, &mut updates).await;

        handle.send(Command::SetInput("cat".into())).await.unwrap();
        handle.send(Command::SubmitWord).await.unwrap();

        let scored = wait_for(&mut updates, |u| matches!(u, SessionUpdate::Scored(_))).await;
        let SessionUpdate::Scored(HistoryEvent::Valid { final_points, .. }) = scored else {
            panic!("unexpected update {scored:?}");
        };
        assert_eq!(final_points, 5);

        let over = wait_for(&mut updates, |u| matches!(u, SessionUpdate::GameOver(_))).await;
        let SessionUpdate::GameOver(summary) = over else {
            unreachable!();
        };
        assert_eq!(summary.initials, "ABC");
        assert_eq!(summary.score, 5);
        assert_eq!(summary.best_word.unwrap().word, "CAT");
        match summary.saved {
            SaveStatus::Saved { rank, top, .. } => {
                assert_eq!(rank, Some(1));
                assert_eq!(top.len(), 1);
            }
            SaveStatus::Failed { message } => panic!("save failed: {message}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_dictionary_hands_the_letters_back() {
        let (handle, _task) = spawn(
            GameConfig::default(),
            Arc::new(Unreachable),
            FixedLetters::new("CATSEFGHIJ"),
        );
        let mut updates = handle.subscribe();
        start_game(&handle, &mut updates).await;

        handle.send(Command::SetInput("cat".into())).await.unwrap();
        handle.send(Command::SubmitWord).await.unwrap();

        let returned =
            wait_for(&mut updates, |u| matches!(u, SessionUpdate::Returned { .. })).await;
        let SessionUpdate::Returned { word, reason } = returned else {
            unreachable!();
        };
        assert_eq!(word, "CAT");
        assert!(reason.contains("502"));

        let snapshot = wait_for(&mut updates, |u| matches!(u, SessionUpdate::Snapshot(_))).await;
        let SessionUpdate::Snapshot(snapshot) = snapshot else {
            unreachable!();
        };
        assert_eq!(snapshot.score, 0);
        assert!(snapshot.validating.is_none());
        assert_eq!(snapshot.letters.len(), GameConfig::default().max_letters);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_dictionary_times_out() {
        let (handle, _task) = spawn(
            GameConfig::default(),
            Arc::new(Silent),
            FixedLetters::new("CATSEFGHIJ"),
        );
        let mut updates = handle.subscribe();
        start_game(&handle, &mut updates).await;

        handle.send(Command::SetInput("cat".into())).await.unwrap();
        let submitted_at = Instant::now();
        handle.send(Command::SubmitWord).await.unwrap();

        let returned =
            wait_for(&mut updates, |u| matches!(u, SessionUpdate::Returned { .. })).await;
        assert!(submitted_at.elapsed() >= GameConfig::default().oracle_timeout);
        let SessionUpdate::Returned { reason, .. } = returned else {
            unreachable!();
        };
        assert!(reason.contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn second_word_is_refused_while_validating() {
        let (handle, _task) = spawn(
            GameConfig::default(),
            Arc::new(Silent),
            FixedLetters::new("CATSEFGHIJ"),
        );
        let mut updates = handle.subscribe();
        start_game(&handle, &mut updates).await;

        handle.send(Command::SetInput("cat".into())).await.unwrap();
        handle.send(Command::SubmitWord).await.unwrap();
        handle.send(Command::SetInput("seg".into())).await.unwrap();
        handle.send(Command::SubmitWord).await.unwrap();

        let rejected =
            wait_for(&mut updates, |u| matches!(u, SessionUpdate::Rejected { .. })).await;
        let SessionUpdate::Rejected { reason } = rejected else {
            unreachable!();
        };
        assert_eq!(reason, SubmitRejection::Busy.to_string());
    }

    #[tokio::test(start_paused = true)]
    async fn oldest_letter_expires_with_a_penalty() {
        let oracle = Arc::new(Words(HashSet::new()));
        let (handle, _task) = spawn(GameConfig::default(), oracle, FixedLetters::new("ABCD"));
        let mut updates = handle.subscribe();
        start_game(&handle, &mut updates).await;

        let dropped = wait_for(&mut updates, |u| matches!(u, SessionUpdate::Scored(_))).await;
        let SessionUpdate::Scored(event) = dropped else {
            unreachable!();
        };
        assert_eq!(
            event,
            HistoryEvent::Drop {
                letter: Letter::from_char('A').unwrap(),
                points: -1,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_letters_return_to_idle() {
        let oracle = Arc::new(Words(HashSet::new()));
        let (handle, _task) = spawn(GameConfig::default(), oracle, FixedLetters::missing());
        let mut updates = handle.subscribe();

        handle.send(Command::BeginEntry).await.unwrap();
        handle
            .send(Command::SubmitInitials("abc".into()))
            .await
            .unwrap();

        let failed =
            wait_for(&mut updates, |u| matches!(u, SessionUpdate::LoadFailed { .. })).await;
        let SessionUpdate::LoadFailed { reason } = failed else {
            unreachable!();
        };
        assert_eq!(reason, "no letters available for today");

        let idle = wait_for(&mut updates, |u| matches!(u, SessionUpdate::Snapshot(_))).await;
        let SessionUpdate::Snapshot(snapshot) = idle else {
            unreachable!();
        };
        assert_eq!(snapshot.phase, SessionPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn bad_initials_are_rejected() {
        let oracle = Arc::new(Words(HashSet::new()));
        let (handle, _task) = spawn(GameConfig::default(), oracle, FixedLetters::new("CAT"));
        let mut updates = handle.subscribe();

        handle.send(Command::BeginEntry).await.unwrap();
        handle.send(Command::SubmitInitials("a".into())).await.unwrap();

        let rejected =
            wait_for(&mut updates, |u| matches!(u, SessionUpdate::Rejected { .. })).await;
        assert!(matches!(rejected, SessionUpdate::Rejected { .. }));
    }
}
