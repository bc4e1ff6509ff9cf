//! One player's game: phase machine, tray, scoring, history and the word being typed.
//!
//! [`GameSession`] is a plain value; every mutation goes through its methods and takes the
//! current instant explicitly. [`runtime`] owns a session inside a single task and feeds it
//! timer ticks, player commands and collaborator answers one at a time.

/// Session phases and their transitions.
pub mod phase;
pub mod runtime;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::warn;
use uuid::Uuid;

use crate::{
    config::GameConfig,
    dto::{game::CreateGameRequest, validation::validate_initials},
    game::{
        history::{GameHistory, HistoryEvent},
        letters::{Letter, LetterSequence},
        scoring::{BestWord, ScoringRules, ScoringState},
        selection::Selection,
        tray::{
            LetterId, LetterInstance, LetterView, SubmissionId, SubmitRejection, Tray, TrayPhase,
            TrayRules,
        },
    },
};

use self::phase::{InvalidTransition, PhaseMachine, PlayingPhase, SessionEvent, SessionPhase};

/// Why a session request was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Not three ASCII letters.
    #[error("initials must be exactly three letters A-Z")]
    InvalidInitials,
    /// The letter source returned an empty sequence.
    #[error("no letters were provided for this game")]
    NoLetters,
    /// The event is not allowed in the current phase.
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

/// A word whose letters are spent and which now waits for the dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordTicket {
    /// Game the word belongs to.
    pub generation: u64,
    /// Tray handle of the spent letters.
    pub submission: SubmissionId,
    /// The word, upper-case.
    pub word: String,
}

/// What the dictionary said about a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The word exists.
    Valid,
    /// The word does not exist.
    Invalid,
    /// No answer could be obtained.
    Unavailable,
}

/// Effect of a resolved word on the session.
#[derive(Debug, Clone, PartialEq)]
pub enum WordOutcome {
    /// Scored; the event was appended to the history.
    Scored(HistoryEvent),
    /// The letters went back to the tray untouched.
    Returned {
        /// The word that could not be checked.
        word: String,
    },
}

/// Renderable state of the whole session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Current phase.
    pub phase: SessionPhase,
    /// Game counter; see [`GameSession::generation`].
    pub generation: u64,
    /// Player tag once entered.
    pub initials: Option<String>,
    /// Running score.
    pub score: i32,
    /// Current streak multiplier.
    pub streak: f64,
    /// Highest-scoring valid word so far.
    pub best_word: Option<BestWord>,
    /// Text view of the current word.
    pub input: String,
    /// Tray letters backing the current word, in word order.
    pub selected: Vec<LetterId>,
    /// Tray letters in arrival order.
    pub letters: Vec<LetterView>,
    /// Tray-level state while a tray exists.
    pub tray_phase: Option<TrayPhase>,
    /// Letters still to arrive.
    pub remaining: usize,
    /// Word currently with the dictionary.
    pub validating: Option<String>,
}

/// Session controller state.
#[derive(Debug, Clone)]
pub struct GameSession {
    tray_rules: TrayRules,
    scoring_rules: ScoringRules,
    machine: PhaseMachine,
    initials: Option<String>,
    sequence_id: Option<Uuid>,
    tray: Option<Tray>,
    scoring: ScoringState,
    history: GameHistory,
    selection: Selection,
}

impl GameSession {
    /// Idle session using the rules in `config`.
    pub fn new(config: &GameConfig) -> Self {
        let scoring_rules = ScoringRules::from(config);
        Self {
            tray_rules: TrayRules::from(config),
            scoring: ScoringState::new(scoring_rules.clone()),
            scoring_rules,
            machine: PhaseMachine::new(),
            initials: None,
            sequence_id: None,
            tray: None,
            history: GameHistory::new(),
            selection: Selection::new(),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.machine.phase()
    }

    /// Changes whenever a new game starts or the session is reset.
    pub fn generation(&self) -> u64 {
        self.machine.generation()
    }

    /// Player tag once entered.
    pub fn initials(&self) -> Option<&str> {
        self.initials.as_deref()
    }

    /// Identifier of the daily sequence being played, when the server provided one.
    pub fn sequence_id(&self) -> Option<Uuid> {
        self.sequence_id
    }

    /// Tray of the running or finished game.
    pub fn tray(&self) -> Option<&Tray> {
        self.tray.as_ref()
    }

    /// Score and streak.
    pub fn scoring(&self) -> &ScoringState {
        &self.scoring
    }

    /// Scored events of the current game.
    pub fn history(&self) -> &GameHistory {
        &self.history
    }

    /// Word being composed.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Whether a game is running, including while a word is validated.
    pub fn is_playing(&self) -> bool {
        self.machine.is_playing()
    }

    /// Deadline of the next scheduled arrival while playing.
    pub fn next_arrival(&self) -> Option<Instant> {
        if !self.is_playing() {
            return None;
        }
        self.tray.as_ref().and_then(Tray::next_arrival)
    }

    /// Start asking for initials.
    pub fn begin_entry(&mut self) -> Result<(), InvalidTransition> {
        self.machine.apply(SessionEvent::BeginEntry).map(|_| ())
    }

    /// Accept the player's tag; the caller should now fetch the letters.
    pub fn submit_initials(&mut self, initials: &str) -> Result<String, SessionError> {
        let initials = initials.trim();
        validate_initials(initials).map_err(|_| SessionError::InvalidInitials)?;
        self.machine.apply(SessionEvent::InitialsSubmitted)?;
        let initials = initials.to_ascii_uppercase();
        self.initials = Some(initials.clone());
        Ok(initials)
    }

    /// Start the tray with the day's letters.
    pub fn start(
        &mut self,
        letters: Vec<Letter>,
        sequence_id: Option<Uuid>,
        now: Instant,
    ) -> Result<Vec<LetterInstance>, SessionError> {
        if letters.is_empty() {
            return Err(SessionError::NoLetters);
        }
        self.machine.apply(SessionEvent::LettersLoaded)?;
        self.sequence_id = sequence_id;
        self.scoring = ScoringState::new(self.scoring_rules.clone());
        self.history = GameHistory::new();
        self.selection.clear();

        let mut tray = Tray::new(self.tray_rules.clone(), LetterSequence::new(letters));
        let arrived = tray.start(now);
        self.tray = Some(tray);
        Ok(arrived)
    }

    /// Letters could not be obtained; back to idle.
    pub fn load_failed(&mut self) -> Result<(), InvalidTransition> {
        self.machine.apply(SessionEvent::LoadFailed).map(|_| ())
    }

    /// Replace the typed word.
    pub fn set_input(&mut self, text: &str) {
        if let Some(tray) = &self.tray
            && self.machine.is_playing()
        {
            self.selection.set_input(text, tray);
        }
    }

    /// Click a tray letter.
    pub fn toggle(&mut self, id: LetterId) {
        if let Some(tray) = &self.tray
            && self.machine.is_playing()
        {
            self.selection.toggle(id, tray);
        }
    }

    /// Spend the letters of the current word and hand it over for validation.
    pub fn submit(&mut self, now: Instant) -> Result<WordTicket, SubmitRejection> {
        match self.machine.phase() {
            SessionPhase::Playing(PlayingPhase::Active) => {}
            SessionPhase::Playing(PlayingPhase::Validating) => return Err(SubmitRejection::Busy),
            _ => return Err(SubmitRejection::NotPlaying),
        }
        let tray = self.tray.as_mut().ok_or(SubmitRejection::NotPlaying)?;

        let word = self.selection.input();
        let (submission, _) = tray.begin_submission(&word, &self.selection.preferred(), now)?;
        self.selection.clear();
        self.transition(SessionEvent::WordSubmitted);

        Ok(WordTicket {
            generation: self.machine.generation(),
            submission,
            word: word.to_ascii_uppercase(),
        })
    }

    /// Apply the dictionary's answer. Returns `None` for answers about another game or word.
    pub fn resolve(
        &mut self,
        ticket: &WordTicket,
        verdict: Verdict,
        now: Instant,
    ) -> Option<WordOutcome> {
        if ticket.generation != self.machine.generation() {
            return None;
        }
        let tray = self.tray.as_mut()?;

        let outcome = match verdict {
            Verdict::Valid => {
                let (pending, _) = tray.complete_submission(ticket.submission, now)?;
                let score = self.scoring.apply_valid(&pending.word);
                let event = self.history.record(HistoryEvent::valid(&pending.word, &score));
                WordOutcome::Scored(event.clone())
            }
            Verdict::Invalid => {
                let (pending, _) = tray.complete_submission(ticket.submission, now)?;
                let points = self.scoring.apply_invalid(&pending.word);
                let event = self.history.record(HistoryEvent::Invalid {
                    word: pending.word,
                    points,
                });
                WordOutcome::Scored(event.clone())
            }
            Verdict::Unavailable => {
                let word = tray.rollback_submission(ticket.submission, now)?;
                WordOutcome::Returned { word }
            }
        };

        self.selection.rebind(tray);
        self.transition(SessionEvent::WordResolved);
        Some(outcome)
    }

    /// Deliver a due arrival.
    pub fn arrival_due(&mut self, now: Instant) -> Vec<LetterInstance> {
        match (&mut self.tray, self.machine.is_playing()) {
            (Some(tray), true) => tray.on_arrival_due(now),
            _ => Vec::new(),
        }
    }

    /// Advance the aging countdown; an expired letter is penalised and recorded.
    pub fn tick(&mut self, now: Instant) -> Option<HistoryEvent> {
        if !self.machine.is_playing() {
            return None;
        }
        let tray = self.tray.as_mut()?;
        let expired = tray.tick(now)?;
        self.selection.rebind(tray);

        let points = self.scoring.apply_drop(expired.letter);
        let event = self.history.record(HistoryEvent::Drop {
            letter: expired.letter,
            points,
        });
        Some(event.clone())
    }

    /// End the game once the sequence and tray are empty and no word is in flight.
    pub fn finish_if_done(&mut self) -> bool {
        if self.machine.phase() != SessionPhase::Playing(PlayingPhase::Active) {
            return false;
        }
        let Some(tray) = self.tray.as_mut() else {
            return false;
        };
        if !tray.is_finished() {
            return false;
        }
        tray.cancel_timers();
        self.transition(SessionEvent::TrayFinished);
        true
    }

    /// Abandon the current game. In-flight answers become stale.
    pub fn reset(&mut self) {
        if let Some(tray) = self.tray.as_mut() {
            tray.cancel_timers();
        }
        self.transition(SessionEvent::Reset);
        self.tray = None;
        self.initials = None;
        self.sequence_id = None;
        self.selection.clear();
        self.scoring = ScoringState::new(self.scoring_rules.clone());
        self.history = GameHistory::new();
    }

    /// Payload to persist once the game is over.
    pub fn record(&self) -> Option<CreateGameRequest> {
        if self.machine.phase() != SessionPhase::GameOver {
            return None;
        }
        Some(CreateGameRequest {
            player_initials: self.initials.clone()?,
            score: self.scoring.score(),
            best_word: self.scoring.best_word().cloned(),
            history: self.history.clone(),
        })
    }

    /// Renderable view of the session at `now`.
    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        let tray = self.tray.as_ref();
        SessionSnapshot {
            phase: self.machine.phase(),
            generation: self.machine.generation(),
            initials: self.initials.clone(),
            score: self.scoring.score(),
            streak: self.scoring.streak(),
            best_word: self.scoring.best_word().cloned(),
            input: self.selection.input(),
            selected: self.selection.selected(),
            letters: tray.map(|tray| tray.views(now)).unwrap_or_default(),
            tray_phase: tray.map(Tray::phase),
            remaining: tray.map(Tray::remaining_in_sequence).unwrap_or(0),
            validating: tray
                .and_then(Tray::pending)
                .map(|pending| pending.word.clone()),
        }
    }

    fn transition(&mut self, event: SessionEvent) {
        if let Err(err) = self.machine.apply(event) {
            warn!(error = %err, "ignored session event");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::game::letters::{letters_to_string, parse_letters};

    use super::*;

    fn playing(letters: &str, now: Instant) -> GameSession {
        let mut session = GameSession::new(&GameConfig::default());
        session.begin_entry().unwrap();
        session.submit_initials("abc").unwrap();
        session
            .start(parse_letters(letters).unwrap(), None, now)
            .unwrap();
        session
    }

    fn tray_contents(session: &GameSession) -> String {
        letters_to_string(&session.tray().unwrap().available())
    }

    #[test]
    fn initials_are_validated_and_upper_cased() {
        let mut session = GameSession::new(&GameConfig::default());
        session.begin_entry().unwrap();
        assert_eq!(
            session.submit_initials("a1"),
            Err(SessionError::InvalidInitials)
        );
        assert_eq!(session.phase(), SessionPhase::CollectingInitials);
        assert_eq!(session.submit_initials(" xyz ").unwrap(), "XYZ");
        assert_eq!(session.phase(), SessionPhase::Loading);
    }

    #[test]
    fn empty_letter_list_does_not_start_a_game() {
        let mut session = GameSession::new(&GameConfig::default());
        session.begin_entry().unwrap();
        session.submit_initials("abc").unwrap();
        assert_eq!(
            session.start(Vec::new(), None, Instant::now()),
            Err(SessionError::NoLetters)
        );
        session.load_failed().unwrap();
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn valid_word_scores_and_grows_the_streak() {
        let now = Instant::now();
        let mut session = playing("CATSEFGHIJ", now);
        assert_eq!(tray_contents(&session), "CATSE");

        session.set_input("cat");
        let ticket = session.submit(now).unwrap();
        assert_eq!(ticket.word, "CAT");
        assert_eq!(
            session.phase(),
            SessionPhase::Playing(PlayingPhase::Validating)
        );
        assert!(session.selection().is_empty());

        let outcome = session.resolve(&ticket, Verdict::Valid, now).unwrap();
        match outcome {
            WordOutcome::Scored(HistoryEvent::Valid { final_points, .. }) => {
                assert_eq!(final_points, 5)
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(session.scoring().score(), 5);
        assert_eq!(session.scoring().streak(), 1.1);
        assert_eq!(session.phase(), SessionPhase::Playing(PlayingPhase::Active));
        assert_eq!(session.history().events().len(), 1);
    }

    #[test]
    fn rejected_word_costs_its_base_points() {
        let now = Instant::now();
        let mut session = playing("CATSEFGHIJ", now);
        session.set_input("tac");
        let ticket = session.submit(now).unwrap();
        session.resolve(&ticket, Verdict::Invalid, now).unwrap();
        assert_eq!(session.scoring().score(), -5);
        assert_eq!(session.scoring().streak(), 1.0);
        assert_eq!(session.history().invalid_points(), -5);
        // Letters stay spent.
        assert!(!tray_contents(&session).contains('C'));
    }

    #[test]
    fn unavailable_dictionary_returns_the_letters() {
        let now = Instant::now();
        let mut session = playing("CATSEFGHIJ", now);
        session.set_input("cat");
        let ticket = session.submit(now).unwrap();
        assert_eq!(tray_contents(&session), "SEFGH");

        let outcome = session
            .resolve(&ticket, Verdict::Unavailable, now)
            .unwrap();
        assert_eq!(outcome, WordOutcome::Returned { word: "CAT".into() });
        assert_eq!(tray_contents(&session), "CATSEFG");
        let tray = session.tray().unwrap();
        assert!(tray.len() <= tray.rules().max_letters);

        // A fresh countdown: nothing is lost to the failed lookup.
        assert!(session.tick(now).is_none());
        assert!(session.tick(now + Duration::from_secs(5)).is_none());
        assert_eq!(session.scoring().score(), 0);
        assert!(session.history().events().is_empty());
    }

    #[test]
    fn tray_keeps_moving_while_a_word_is_checked() {
        let now = Instant::now();
        let mut session = playing("CATSEFGHIJ", now);
        session.set_input("cat");
        let ticket = session.submit(now).unwrap();
        assert_eq!(tray_contents(&session), "SEFGH");

        let arrived = session.arrival_due(now + Duration::from_secs(3));
        assert_eq!(arrived.len(), 1);
        assert_eq!(tray_contents(&session), "SEFGHI");
        session.arrival_due(now + Duration::from_secs(6));
        assert_eq!(session.tray().unwrap().phase(), TrayPhase::Draining);

        assert!(session.tick(now + Duration::from_secs(6)).is_none());
        let event = session.tick(now + Duration::from_secs(12)).unwrap();
        assert_eq!(
            event,
            HistoryEvent::Drop {
                letter: Letter::from_char('S').unwrap(),
                points: -1,
            }
        );
        assert_eq!(
            session.phase(),
            SessionPhase::Playing(PlayingPhase::Validating)
        );

        session
            .resolve(&ticket, Verdict::Valid, now + Duration::from_secs(12))
            .unwrap();
        assert_eq!(session.scoring().score(), 4);
        assert_eq!(session.history().events().len(), 2);
    }

    #[test]
    fn emptied_tray_waits_for_the_word_in_flight() {
        let now = Instant::now();
        let mut session = playing("CATS", now);
        session.set_input("cat");
        let ticket = session.submit(now).unwrap();
        assert_eq!(tray_contents(&session), "S");

        session.tick(now);
        assert!(session.tick(now + Duration::from_secs(6)).is_some());
        assert!(session.tray().unwrap().is_empty());
        assert!(!session.finish_if_done());
        assert_eq!(
            session.phase(),
            SessionPhase::Playing(PlayingPhase::Validating)
        );

        session.resolve(&ticket, Verdict::Invalid, now).unwrap();
        assert!(session.finish_if_done());
        assert_eq!(session.phase(), SessionPhase::GameOver);
    }

    #[test]
    fn second_submission_is_busy_and_bad_words_are_rejected() {
        let now = Instant::now();
        let mut session = playing("CATSEFGHIJ", now);

        session.set_input("ca");
        assert!(matches!(
            session.submit(now),
            Err(SubmitRejection::TooShort { len: 2, min: 3 })
        ));
        session.set_input("zzz");
        assert_eq!(session.submit(now), Err(SubmitRejection::CannotForm));

        session.set_input("cat");
        session.submit(now).unwrap();
        session.set_input("seg");
        assert_eq!(session.submit(now), Err(SubmitRejection::Busy));
    }

    #[test]
    fn answers_for_a_reset_game_are_discarded() {
        let now = Instant::now();
        let mut session = playing("CATSEFGHIJ", now);
        session.set_input("cat");
        let ticket = session.submit(now).unwrap();

        session.reset();
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.resolve(&ticket, Verdict::Valid, now).is_none());
        assert_eq!(session.scoring().score(), 0);
        assert_eq!(session.submit(now), Err(SubmitRejection::NotPlaying));
    }

    #[test]
    fn expired_letter_is_recorded_as_a_drop() {
        let now = Instant::now();
        let mut session = playing("ABCD", now);
        assert_eq!(tray_contents(&session), "ABCD");

        assert!(session.tick(now).is_none());
        let event = session.tick(now + Duration::from_secs(6)).unwrap();
        assert_eq!(
            event,
            HistoryEvent::Drop {
                letter: Letter::from_char('A').unwrap(),
                points: -1,
            }
        );
        assert_eq!(session.scoring().score(), -1);
        assert_eq!(tray_contents(&session), "BCD");
    }

    #[test]
    fn game_ends_only_after_the_last_word_is_resolved() {
        let now = Instant::now();
        let mut session = playing("CAT", now);
        session.set_input("cat");
        let ticket = session.submit(now).unwrap();
        assert!(session.tray().unwrap().is_empty());
        assert!(!session.finish_if_done());

        session.resolve(&ticket, Verdict::Valid, now).unwrap();
        assert!(session.finish_if_done());
        assert_eq!(session.phase(), SessionPhase::GameOver);
        assert!(session.tray().unwrap().is_stopped());

        let record = session.record().unwrap();
        assert_eq!(record.player_initials, "ABC");
        assert_eq!(record.score, 5);
        assert_eq!(record.best_word.unwrap().word, "CAT");
        assert_eq!(record.history.valid_points(), 5);
    }

    #[test]
    fn clicked_letters_are_the_ones_spent() {
        let now = Instant::now();
        let mut session = playing("ABATX", now);
        let ids: Vec<LetterId> = session.tray().unwrap().letters().map(|l| l.id).collect();
        // Click the second A, then B and T: "ABT" is not a word but exercises binding.
        session.toggle(ids[2]);
        session.toggle(ids[1]);
        session.toggle(ids[3]);
        assert_eq!(session.selection().input(), "ABT");

        session.submit(now).unwrap();
        let left: Vec<LetterId> = session.tray().unwrap().letters().map(|l| l.id).collect();
        assert!(left.contains(&ids[0]));
        assert!(!left.contains(&ids[2]));
    }

    #[test]
    fn snapshot_reports_the_word_in_flight() {
        let now = Instant::now();
        let mut session = playing("CATSEFGHIJ", now);
        session.set_input("cat");
        session.submit(now).unwrap();
        let snapshot = session.snapshot(now);
        assert_eq!(snapshot.validating.as_deref(), Some("CAT"));
        assert_eq!(snapshot.letters.len(), 5);
        assert_eq!(snapshot.initials.as_deref(), Some("ABC"));
    }
}
