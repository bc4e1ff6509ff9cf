use serde::Serialize;
use thiserror::Error;

/// High-level phases of one player's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "detail", rename_all = "snake_case")]
pub enum SessionPhase {
    /// Nothing running; waiting for the player to start.
    Idle,
    /// Asking for the three-letter tag.
    CollectingInitials,
    /// Fetching the day's letters.
    Loading,
    /// Letters are dropping.
    Playing(PlayingPhase),
    /// Tray and sequence exhausted; results are shown.
    GameOver,
}

/// Sub-phase while letters are dropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayingPhase {
    /// Accepting words.
    Active,
    /// A word is with the dictionary; timers keep running.
    Validating,
}

/// Events that can be applied to the phase machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Player asked to play.
    BeginEntry,
    /// Initials accepted; letters are requested.
    InitialsSubmitted,
    /// Letters arrived; the tray starts.
    LettersLoaded,
    /// Letters could not be obtained.
    LoadFailed,
    /// A word left for the dictionary.
    WordSubmitted,
    /// The dictionary answered, or the word was handed back.
    WordResolved,
    /// Nothing left to play with.
    TrayFinished,
    /// Abandon whatever is running.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the machine was in when the event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// Phase machine with a generation counter that changes whenever a new game starts or the
/// session is reset, so answers addressed to an older game can be recognised.
#[derive(Debug, Clone)]
pub struct PhaseMachine {
    phase: SessionPhase,
    version: usize,
    generation: u64,
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            version: 0,
            generation: 0,
        }
    }
}

impl PhaseMachine {
    /// Machine in [`SessionPhase::Idle`] at generation zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Number of transitions applied so far.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Bumped each time a game starts or is abandoned.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the phase is [`SessionPhase::Playing`].
    pub fn is_playing(&self) -> bool {
        matches!(self.phase, SessionPhase::Playing(_))
    }

    /// Apply `event`, returning the new phase.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        if matches!(event, SessionEvent::InitialsSubmitted | SessionEvent::Reset) {
            self.generation += 1;
        }
        self.phase = next;
        self.version += 1;
        Ok(next)
    }

    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        use PlayingPhase::{Active, Validating};
        use SessionEvent as E;
        use SessionPhase as P;

        let next = match (self.phase, event) {
            (_, E::Reset) => P::Idle,
            (P::Idle | P::GameOver, E::BeginEntry) => P::CollectingInitials,
            (P::CollectingInitials, E::InitialsSubmitted) => P::Loading,
            (P::Loading, E::LettersLoaded) => P::Playing(Active),
            (P::Loading, E::LoadFailed) => P::Idle,
            (P::Playing(Active), E::WordSubmitted) => P::Playing(Validating),
            (P::Playing(Validating), E::WordResolved) => P::Playing(Active),
            (P::Playing(Active), E::TrayFinished) => P::GameOver,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(machine: &mut PhaseMachine, event: SessionEvent) -> SessionPhase {
        machine.apply(event).unwrap()
    }

    #[test]
    fn initial_state_is_idle() {
        let machine = PhaseMachine::new();
        assert_eq!(machine.phase(), SessionPhase::Idle);
        assert_eq!(machine.generation(), 0);
    }

    #[test]
    fn full_happy_path_through_a_game() {
        let mut machine = PhaseMachine::new();
        assert_eq!(
            apply(&mut machine, SessionEvent::BeginEntry),
            SessionPhase::CollectingInitials
        );
        assert_eq!(
            apply(&mut machine, SessionEvent::InitialsSubmitted),
            SessionPhase::Loading
        );
        assert_eq!(
            apply(&mut machine, SessionEvent::LettersLoaded),
            SessionPhase::Playing(PlayingPhase::Active)
        );
        assert_eq!(
            apply(&mut machine, SessionEvent::WordSubmitted),
            SessionPhase::Playing(PlayingPhase::Validating)
        );
        assert_eq!(
            apply(&mut machine, SessionEvent::WordResolved),
            SessionPhase::Playing(PlayingPhase::Active)
        );
        assert_eq!(
            apply(&mut machine, SessionEvent::TrayFinished),
            SessionPhase::GameOver
        );
        assert_eq!(
            apply(&mut machine, SessionEvent::BeginEntry),
            SessionPhase::CollectingInitials
        );
        assert_eq!(machine.version(), 7);
    }

    #[test]
    fn game_cannot_end_while_a_word_is_validating() {
        let mut machine = PhaseMachine::new();
        apply(&mut machine, SessionEvent::BeginEntry);
        apply(&mut machine, SessionEvent::InitialsSubmitted);
        apply(&mut machine, SessionEvent::LettersLoaded);
        apply(&mut machine, SessionEvent::WordSubmitted);

        let err = machine.apply(SessionEvent::TrayFinished).unwrap_err();
        assert_eq!(err.from, SessionPhase::Playing(PlayingPhase::Validating));
        assert_eq!(err.event, SessionEvent::TrayFinished);

        let err = machine.apply(SessionEvent::WordSubmitted).unwrap_err();
        assert_eq!(err.event, SessionEvent::WordSubmitted);
    }

    #[test]
    fn load_failure_returns_to_idle() {
        let mut machine = PhaseMachine::new();
        apply(&mut machine, SessionEvent::BeginEntry);
        apply(&mut machine, SessionEvent::InitialsSubmitted);
        assert_eq!(
            apply(&mut machine, SessionEvent::LoadFailed),
            SessionPhase::Idle
        );
    }

    #[test]
    fn reset_is_accepted_everywhere_and_bumps_the_generation() {
        let mut machine = PhaseMachine::new();
        apply(&mut machine, SessionEvent::Reset);
        assert_eq!(machine.generation(), 1);

        apply(&mut machine, SessionEvent::BeginEntry);
        apply(&mut machine, SessionEvent::InitialsSubmitted);
        assert_eq!(machine.generation(), 2);
        apply(&mut machine, SessionEvent::LettersLoaded);
        apply(&mut machine, SessionEvent::WordSubmitted);
        assert_eq!(apply(&mut machine, SessionEvent::Reset), SessionPhase::Idle);
        assert_eq!(machine.generation(), 3);
    }

    #[test]
    fn invalid_transition_returns_error() {
        let mut machine = PhaseMachine::new();
        let err = machine.apply(SessionEvent::WordSubmitted).unwrap_err();
        assert_eq!(err.from, SessionPhase::Idle);
        assert_eq!(machine.version(), 0);
    }
}
