//! Letter tray: timed arrivals, oldest-letter aging and the spend/confirm/rollback cycle of a submission.
//!
//! The tray is a plain value driven by explicit instants. It never sleeps; the session runtime
//! reads [`Tray::next_arrival`] and the aging period to decide when to call back in.

use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;
use serde_with::{DurationMilliSeconds, serde_as};
use thiserror::Error;
use tokio::time::Instant;

use crate::{
    config::GameConfig,
    game::{
        letters::{Letter, LetterSequence},
        scoring::can_form,
    },
};

/// Tray bounds and timings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayRules {
    /// Shortest word that may be submitted.
    pub min_word_length: usize,
    /// Floor enforced while the sequence still has letters.
    pub min_letters: usize,
    /// Capacity; arrivals pause at this size.
    pub max_letters: usize,
    /// Delay between regular arrivals.
    pub letter_drop_interval: Duration,
    /// Oldest-letter age at which it turns to warning.
    pub warning_threshold: Duration,
    /// Oldest-letter age at which it expires.
    pub danger_threshold: Duration,
    /// How long a new letter reports [`LetterState::Arriving`].
    pub arrival_highlight: Duration,
}

impl From<&GameConfig> for TrayRules {
    fn from(config: &GameConfig) -> Self {
        Self {
            min_word_length: config.min_word_length,
            min_letters: config.min_letters,
            max_letters: config.max_letters,
            letter_drop_interval: config.letter_drop_interval,
            warning_threshold: config.warning_threshold,
            danger_threshold: config.danger_threshold,
            arrival_highlight: config.arrival_highlight,
        }
    }
}

impl Default for TrayRules {
    fn default() -> Self {
        Self::from(&GameConfig::default())
    }
}

/// Stable handle of one physical letter in the tray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LetterId(u64);

impl LetterId {
    /// Never handed out; stands for "no particular letter".
    pub(crate) const UNBOUND: LetterId = LetterId(u64::MAX);
}

/// Handle of a submission awaiting the dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SubmissionId(u64);

/// A letter that is in play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetterInstance {
    /// Handle used by selection and submissions.
    pub id: LetterId,
    /// The symbol.
    pub letter: Letter,
    /// When it entered the tray.
    pub arrived_at: Instant,
}

/// Display state of a letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LetterState {
    /// Just arrived.
    Arriving,
    /// Idle, or the oldest letter early in its countdown.
    Normal,
    /// Oldest letter past the warning threshold.
    Warning,
    /// Oldest letter at the danger threshold; it expires on this tick.
    Danger,
}

/// Tray-level state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrayPhase {
    /// Below capacity with letters still to come.
    Filling,
    /// At (or above) capacity; the oldest letter is aging.
    Full,
    /// Sequence exhausted; remaining letters age out one by one.
    Draining,
    /// Nothing left in the tray or the sequence.
    Empty,
}

/// Renderable snapshot of one tray letter.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterView {
    /// Handle of the letter.
    pub id: LetterId,
    /// The symbol.
    pub letter: Letter,
    /// Display state.
    pub state: LetterState,
    /// Time left before expiry, only for the aging letter.
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    pub remaining: Option<Duration>,
}

/// Why a submission was refused without touching the tray.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitRejection {
    /// Shorter than the minimum word length.
    #[error("word must be at least {min} letters long (got {len})")]
    TooShort {
        /// Length of the submitted word.
        len: usize,
        /// Minimum accepted length.
        min: usize,
    },
    /// The tray does not hold the letters needed.
    #[error("cannot form this word with available letters")]
    CannotForm,
    /// Another word is still being validated.
    #[error("another word is being validated")]
    Busy,
    /// No game is in progress.
    #[error("no game in progress")]
    NotPlaying,
}

/// Letters spent on a word that is waiting for the dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
    /// Handle used to confirm or roll back.
    pub id: SubmissionId,
    /// The word, upper-case.
    pub word: String,
    letters: Vec<LetterInstance>,
    /// First letter handle issued after the letters were spent.
    later_than: u64,
}

impl PendingSubmission {
    /// Letters taken out of the tray for this word.
    pub fn letters(&self) -> &[LetterInstance] {
        &self.letters
    }
}

/// The set of in-play letters together with the arrival and aging timers.
#[derive(Debug, Clone)]
pub struct Tray {
    rules: TrayRules,
    letters: IndexMap<LetterId, LetterInstance>,
    sequence: LetterSequence,
    next_letter_id: u64,
    next_submission_id: u64,
    next_arrival: Option<Instant>,
    aging_anchor: Option<Instant>,
    pending: Option<PendingSubmission>,
    stopped: bool,
}

impl Tray {
    /// Empty tray fed by `sequence`.
    pub fn new(rules: TrayRules, sequence: LetterSequence) -> Self {
        Self {
            rules,
            letters: IndexMap::new(),
            sequence,
            next_letter_id: 0,
            next_submission_id: 0,
            next_arrival: None,
            aging_anchor: None,
            pending: None,
            stopped: false,
        }
    }

    /// Fill up to the working set and arm the arrival timer.
    pub fn start(&mut self, now: Instant) -> Vec<LetterInstance> {
        let arrived = self.top_up(now);
        self.refresh(now);
        arrived
    }

    /// Rules in effect.
    pub fn rules(&self) -> &TrayRules {
        &self.rules
    }

    /// Letters in arrival order.
    pub fn letters(&self) -> impl Iterator<Item = &LetterInstance> {
        self.letters.values()
    }

    /// Look a letter up by handle.
    pub fn get(&self, id: LetterId) -> Option<&LetterInstance> {
        self.letters.get(&id)
    }

    /// Number of letters in play.
    pub fn len(&self) -> usize {
        self.letters.len()
    }

    /// Whether no letter is in play.
    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    /// Symbols currently available, in arrival order.
    pub fn available(&self) -> Vec<Letter> {
        self.letters.values().map(|instance| instance.letter).collect()
    }

    /// Letters the sequence has yet to deliver.
    pub fn remaining_in_sequence(&self) -> usize {
        self.sequence.remaining()
    }

    /// Deadline of the pending arrival, if one is scheduled.
    pub fn next_arrival(&self) -> Option<Instant> {
        self.next_arrival
    }

    /// Start of the current aging countdown, if any.
    pub fn aging_anchor(&self) -> Option<Instant> {
        self.aging_anchor
    }

    /// Submission waiting for the dictionary.
    pub fn pending(&self) -> Option<&PendingSubmission> {
        self.pending.as_ref()
    }

    /// Whether the timers were cancelled.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Tray-level state.
    pub fn phase(&self) -> TrayPhase {
        if self.sequence.is_exhausted() {
            if self.letters.is_empty() {
                TrayPhase::Empty
            } else {
                TrayPhase::Draining
            }
        } else if self.letters.len() >= self.rules.max_letters {
            TrayPhase::Full
        } else {
            TrayPhase::Filling
        }
    }

    /// Whether the oldest letter is currently counting down.
    pub fn is_aging(&self) -> bool {
        !self.stopped
            && !self.letters.is_empty()
            && (self.letters.len() >= self.rules.max_letters || self.sequence.is_exhausted())
    }

    /// Sequence drained, tray empty and nothing in flight.
    pub fn is_finished(&self) -> bool {
        self.sequence.is_exhausted() && self.letters.is_empty() && self.pending.is_none()
    }

    /// Deliver the scheduled letter if its deadline has passed.
    pub fn on_arrival_due(&mut self, now: Instant) -> Vec<LetterInstance> {
        if self.stopped {
            return Vec::new();
        }
        let mut arrived = Vec::new();
        if let Some(due) = self.next_arrival
            && due <= now
        {
            self.next_arrival = None;
            if self.letters.len() < self.rules.max_letters
                && let Some(instance) = self.arrive(now)
            {
                arrived.push(instance);
            }
        }
        arrived.extend(self.top_up(now));
        self.refresh(now);
        arrived
    }

    /// Advance the aging countdown; returns the letter that expired, if any.
    pub fn tick(&mut self, now: Instant) -> Option<LetterInstance> {
        if !self.is_aging() {
            self.aging_anchor = None;
            return None;
        }

        let anchor = *self.aging_anchor.get_or_insert(now);
        if now.saturating_duration_since(anchor) < self.rules.danger_threshold {
            return None;
        }

        let (_, expired) = self.letters.shift_remove_index(0)?;
        self.aging_anchor = None;
        self.top_up(now);
        self.refresh(now);
        Some(expired)
    }

    /// Display state of every letter.
    pub fn views(&self, now: Instant) -> Vec<LetterView> {
        let oldest = self.letters.first().map(|(id, _)| *id);
        self.letters
            .values()
            .map(|instance| {
                let (state, remaining) = match self.aging_anchor {
                    Some(anchor) if Some(instance.id) == oldest => {
                        let age = now.saturating_duration_since(anchor);
                        let state = if age >= self.rules.danger_threshold {
                            LetterState::Danger
                        } else if age >= self.rules.warning_threshold {
                            LetterState::Warning
                        } else {
                            LetterState::Normal
                        };
                        (state, Some(self.rules.danger_threshold.saturating_sub(age)))
                    }
                    _ if now.saturating_duration_since(instance.arrived_at)
                        < self.rules.arrival_highlight =>
                    {
                        (LetterState::Arriving, None)
                    }
                    _ => (LetterState::Normal, None),
                };
                LetterView {
                    id: instance.id,
                    letter: instance.letter,
                    state,
                    remaining,
                }
            })
            .collect()
    }

    /// Greedy binding of `word` onto tray letters, honouring `preferred` handles when they fit.
    ///
    /// Position `i` keeps `preferred[i]` if that letter is present, unused and matches the
    /// character; otherwise the first unused matching letter in arrival order is taken.
    pub fn bind(&self, word: &str, preferred: &[LetterId]) -> Option<Vec<LetterId>> {
        let mut used: Vec<LetterId> = Vec::with_capacity(word.len());
        for (index, c) in word.chars().enumerate() {
            let letter = Letter::from_char(c).ok()?;
            let kept = preferred.get(index).copied().filter(|id| {
                !used.contains(id)
                    && self
                        .letters
                        .get(id)
                        .is_some_and(|instance| instance.letter == letter)
            });
            let id = match kept {
                Some(id) => id,
                None => self
                    .letters
                    .values()
                    .find(|instance| instance.letter == letter && !used.contains(&instance.id))
                    .map(|instance| instance.id)?,
            };
            used.push(id);
        }
        Some(used)
    }

    /// Spend the letters of `word` and park them until the dictionary answers.
    ///
    /// Returns the submission handle and any letters that arrived to restore the floor.
    pub fn begin_submission(
        &mut self,
        word: &str,
        preferred: &[LetterId],
        now: Instant,
    ) -> Result<(SubmissionId, Vec<LetterInstance>), SubmitRejection> {
        if self.pending.is_some() {
            return Err(SubmitRejection::Busy);
        }
        let len = word.chars().count();
        if len < self.rules.min_word_length {
            return Err(SubmitRejection::TooShort {
                len,
                min: self.rules.min_word_length,
            });
        }
        if !can_form(word, &self.available()) {
            return Err(SubmitRejection::CannotForm);
        }
        let ids = self
            .bind(word, preferred)
            .ok_or(SubmitRejection::CannotForm)?;

        let spent = ids
            .iter()
            .filter_map(|id| self.letters.shift_remove(id))
            .collect();
        let id = SubmissionId(self.next_submission_id);
        self.next_submission_id += 1;
        self.pending = Some(PendingSubmission {
            id,
            word: word.to_ascii_uppercase(),
            letters: spent,
            later_than: self.next_letter_id,
        });

        self.aging_anchor = None;
        let arrived = self.top_up(now);
        self.refresh(now);
        Ok((id, arrived))
    }

    /// The dictionary answered: the spent letters are consumed for good.
    pub fn complete_submission(
        &mut self,
        id: SubmissionId,
        now: Instant,
    ) -> Option<(PendingSubmission, Vec<LetterInstance>)> {
        let pending = self.take_pending(id)?;
        self.aging_anchor = None;
        let arrived = self.top_up(now);
        self.refresh(now);
        Some((pending, arrived))
    }

    /// The dictionary could not be reached: put the spent letters back where they were.
    ///
    /// Returned letters keep their arrival time. Letters that arrived while the word was in
    /// flight and no longer fit go back to the head of the sequence, newest first, so the
    /// tray never exceeds capacity and the next arrivals come in the original order.
    pub fn rollback_submission(&mut self, id: SubmissionId, now: Instant) -> Option<String> {
        let pending = self.take_pending(id)?;
        let later_than = pending.later_than;
        for instance in pending.letters {
            self.letters.insert(instance.id, instance);
        }
        self.letters
            .sort_by(|_, a, _, b| a.arrived_at.cmp(&b.arrived_at).then(a.id.cmp(&b.id)));

        while self.letters.len() > self.rules.max_letters {
            let newest = self
                .letters
                .keys()
                .rev()
                .find(|handle| handle.0 >= later_than)
                .copied();
            let Some(instance) = newest.and_then(|handle| self.letters.shift_remove(&handle))
            else {
                break;
            };
            self.sequence.push_front(instance.letter);
        }

        self.aging_anchor = None;
        self.refresh(now);
        Some(pending.word)
    }

    /// Cancel both timers. Safe to call any number of times.
    pub fn cancel_timers(&mut self) {
        self.stopped = true;
        self.next_arrival = None;
        self.aging_anchor = None;
    }

    fn take_pending(&mut self, id: SubmissionId) -> Option<PendingSubmission> {
        if self.pending.as_ref().is_some_and(|pending| pending.id == id) {
            self.pending.take()
        } else {
            None
        }
    }

    fn arrive(&mut self, now: Instant) -> Option<LetterInstance> {
        let letter = self.sequence.next_letter()?;
        let instance = LetterInstance {
            id: LetterId(self.next_letter_id),
            letter,
            arrived_at: now,
        };
        self.next_letter_id += 1;
        self.letters.insert(instance.id, instance.clone());
        Some(instance)
    }

    /// Force arrivals up to the floor, then one more for a working set.
    fn top_up(&mut self, now: Instant) -> Vec<LetterInstance> {
        let mut arrived = Vec::new();
        if self.stopped || self.letters.len() >= self.rules.min_letters {
            return arrived;
        }
        while self.letters.len() < self.rules.min_letters {
            match self.arrive(now) {
                Some(instance) => arrived.push(instance),
                None => return arrived,
            }
        }
        if self.letters.len() < self.rules.max_letters
            && let Some(instance) = self.arrive(now)
        {
            arrived.push(instance);
        }
        arrived
    }

    /// Re-derive timer state from the tray contents.
    fn refresh(&mut self, now: Instant) {
        if self.stopped {
            return;
        }
        if self.letters.len() < self.rules.max_letters && !self.sequence.is_exhausted() {
            if self.next_arrival.is_none() {
                self.next_arrival = Some(now + self.rules.letter_drop_interval);
            }
        } else {
            self.next_arrival = None;
        }
        if !self.is_aging() {
            self.aging_anchor = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::game::letters::{letters_to_string, parse_letters};

    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    fn tray(letters: &str) -> Tray {
        Tray::new(
            TrayRules::default(),
            LetterSequence::new(parse_letters(letters).unwrap()),
        )
    }

    fn contents(tray: &Tray) -> String {
        letters_to_string(&tray.available())
    }

    #[test]
    fn start_fills_to_one_above_the_floor() {
        let now = Instant::now();
        let mut tray = tray("ABCDEFGHIJ");
        let arrived = tray.start(now);
        assert_eq!(arrived.len(), 5);
        assert_eq!(contents(&tray), "ABCDE");
        assert_eq!(tray.phase(), TrayPhase::Filling);
        assert_eq!(tray.next_arrival(), Some(now + 3 * SECOND));
    }

    #[test]
    fn arrivals_stop_when_full() {
        let now = Instant::now();
        let mut tray = tray("ABCDEFGHIJKL");
        tray.start(now);

        assert!(tray.on_arrival_due(now + SECOND).is_empty());
        assert_eq!(tray.on_arrival_due(now + 3 * SECOND).len(), 1);
        assert_eq!(tray.next_arrival(), Some(now + 6 * SECOND));
        assert_eq!(tray.on_arrival_due(now + 6 * SECOND).len(), 1);

        assert_eq!(tray.len(), 7);
        assert_eq!(tray.phase(), TrayPhase::Full);
        assert!(tray.remaining_in_sequence() > 0);
        assert_eq!(tray.next_arrival(), None);
    }

    #[test]
    fn submitting_cat_spends_letters_and_tops_up() {
        let now = Instant::now();
        let mut tray = tray("CATSEFGHIJ");
        tray.start(now);
        assert_eq!(contents(&tray), "CATSE");

        let (_, arrived) = tray.begin_submission("cat", &[], now + SECOND).unwrap();
        assert_eq!(letters_to_string(&arrived.iter().map(|i| i.letter).collect::<Vec<_>>()), "FGH");
        assert_eq!(contents(&tray), "SEFGH");
        assert_eq!(tray.pending().unwrap().word, "CAT");
        assert_eq!(tray.pending().unwrap().letters().len(), 3);
    }

    #[test]
    fn rejected_submissions_leave_the_tray_alone() {
        let now = Instant::now();
        let mut tray = tray("CATSEFGHIJ");
        tray.start(now);

        assert_eq!(
            tray.begin_submission("CA", &[], now),
            Err(SubmitRejection::TooShort { len: 2, min: 3 })
        );
        assert_eq!(
            tray.begin_submission("CATT", &[], now),
            Err(SubmitRejection::CannotForm)
        );
        assert_eq!(contents(&tray), "CATSE");

        tray.begin_submission("SET", &[], now).unwrap();
        assert_eq!(
            tray.begin_submission("CAT", &[], now),
            Err(SubmitRejection::Busy)
        );
    }

    #[test]
    fn preferred_handles_decide_which_duplicate_is_spent() {
        let now = Instant::now();
        let mut tray = tray("AXABCDEFG");
        tray.start(now);
        let ids: Vec<LetterId> = tray.letters().map(|i| i.id).collect();

        let second_a = ids[2];
        let bound = tray.bind("AX", &[second_a]).unwrap();
        assert_eq!(bound, vec![second_a, ids[1]]);

        let greedy = tray.bind("AX", &[]).unwrap();
        assert_eq!(greedy, vec![ids[0], ids[1]]);
    }

    #[test]
    fn drained_tray_drops_only_the_oldest_letter() {
        let now = Instant::now();
        let mut tray = tray("ABCD");
        tray.start(now);
        assert_eq!(tray.phase(), TrayPhase::Draining);

        assert_eq!(tray.tick(now), None);
        assert_eq!(tray.tick(now + 5 * SECOND), None);
        let expired = tray.tick(now + 6 * SECOND).unwrap();
        assert_eq!(expired.letter, Letter::from_char('A').unwrap());
        assert_eq!(contents(&tray), "BCD");
        assert_eq!(tray.aging_anchor(), None);

        // The next-oldest letter starts its own countdown from zero.
        assert_eq!(tray.tick(now + 7 * SECOND), None);
        assert_eq!(tray.tick(now + 12 * SECOND), None);
        assert!(tray.tick(now + 13 * SECOND).is_some());
        assert_eq!(contents(&tray), "CD");
    }

    #[test]
    fn oldest_letter_walks_through_warning_and_danger() {
        let now = Instant::now();
        let mut tray = tray("ABCD");
        tray.start(now);
        tray.tick(now + 300 * Duration::from_millis(1));

        let views = tray.views(now + 4 * SECOND);
        assert_eq!(views[0].state, LetterState::Warning);
        assert_eq!(views[0].remaining, Some(Duration::from_millis(2_300)));
        assert!(views[1..].iter().all(|v| v.state == LetterState::Normal));

        let views = tray.views(now + 7 * SECOND);
        assert_eq!(views[0].state, LetterState::Danger);
        assert_eq!(views[0].remaining, Some(Duration::ZERO));
    }

    #[test]
    fn fresh_letters_report_arriving() {
        let now = Instant::now();
        let mut tray = tray("ABCDEFGHIJ");
        tray.start(now);
        let views = tray.views(now + Duration::from_millis(100));
        assert!(views.iter().all(|v| v.state == LetterState::Arriving));
        let views = tray.views(now + SECOND);
        assert!(views.iter().all(|v| v.state == LetterState::Normal));
    }

    #[test]
    fn any_submission_restarts_the_countdown() {
        let now = Instant::now();
        let mut tray = tray("CATSD");
        tray.start(now);
        assert!(tray.is_aging());
        tray.tick(now);
        assert_eq!(tray.aging_anchor(), Some(now));

        let (id, _) = tray.begin_submission("CAT", &[], now + 5 * SECOND).unwrap();
        assert_eq!(tray.aging_anchor(), None);
        tray.complete_submission(id, now + 5 * SECOND).unwrap();

        tray.tick(now + 5 * SECOND);
        assert_eq!(tray.tick(now + 10 * SECOND), None);
        assert!(tray.tick(now + 11 * SECOND).is_some());
    }

    #[test]
    fn rollback_returns_letters_in_arrival_order() {
        let now = Instant::now();
        let mut tray = tray("CATSEFGHIJ");
        tray.start(now);

        let (id, _) = tray.begin_submission("CAT", &[], now + SECOND).unwrap();
        assert_eq!(contents(&tray), "SEFGH");
        assert_eq!(tray.rollback_submission(id, now + SECOND), Some("CAT".into()));
        assert_eq!(contents(&tray), "CATSEFG");
        assert!(tray.pending().is_none());

        // H no longer fits and is queued again ahead of I and J.
        assert_eq!(tray.len(), tray.rules().max_letters);
        assert_eq!(tray.remaining_in_sequence(), 3);
        assert_eq!(tray.next_arrival(), None);
        assert_eq!(tray.rollback_submission(id, now), None);
    }

    #[test]
    fn rollback_after_arrivals_in_flight_keeps_capacity() {
        let now = Instant::now();
        let mut tray = tray("CATSEFGHIJKL");
        tray.start(now);
        tray.on_arrival_due(now + 3 * SECOND);
        tray.on_arrival_due(now + 6 * SECOND);
        assert_eq!(contents(&tray), "CATSEFG");

        let (id, arrived) = tray.begin_submission("CAT", &[], now + 7 * SECOND).unwrap();
        assert!(arrived.is_empty());
        assert_eq!(tray.len(), 4);
        assert_eq!(tray.on_arrival_due(now + 10 * SECOND).len(), 1);
        assert_eq!(contents(&tray), "SEFGH");

        tray.rollback_submission(id, now + 11 * SECOND).unwrap();
        assert_eq!(contents(&tray), "CATSEFG");
        assert!(tray.len() <= tray.rules().max_letters);
        assert_eq!(tray.remaining_in_sequence(), 5);

        // The countdown starts afresh, so nothing expires for a full danger period.
        assert_eq!(tray.tick(now + 11 * SECOND), None);
        assert_eq!(tray.tick(now + 16 * SECOND), None);
        assert_eq!(contents(&tray), "CATSEFG");

        let expired = tray.tick(now + 17 * SECOND).unwrap();
        assert_eq!(expired.letter, Letter::from_char('C').unwrap());
        assert_eq!(contents(&tray), "ATSEFG");
    }

    #[test]
    fn game_end_waits_for_the_submission_in_flight() {
        let now = Instant::now();
        let mut tray = tray("CAT");
        tray.start(now);
        let (id, _) = tray.begin_submission("CAT", &[], now).unwrap();
        assert!(tray.is_empty());
        assert!(!tray.is_finished());
        tray.complete_submission(id, now).unwrap();
        assert!(tray.is_finished());
        assert_eq!(tray.phase(), TrayPhase::Empty);
    }

    #[test]
    fn cancelling_timers_is_idempotent() {
        let now = Instant::now();
        let mut tray = tray("ABCDEFGHIJ");
        tray.start(now);

        tray.cancel_timers();
        let after_first = (tray.next_arrival(), tray.aging_anchor(), tray.len());
        tray.cancel_timers();
        assert_eq!((tray.next_arrival(), tray.aging_anchor(), tray.len()), after_first);
        assert!(tray.on_arrival_due(now + 10 * SECOND).is_empty());
        assert_eq!(tray.tick(now + 10 * SECOND), None);
    }

    #[test]
    fn size_stays_within_bounds_during_play() {
        let now = Instant::now();
        let mut tray = tray(&"ETAOINSHRD".repeat(4));
        tray.start(now);
        let rules = tray.rules().clone();

        for step in 1..=120u32 {
            let at = now + Duration::from_millis(u64::from(step) * 500);
            tray.on_arrival_due(at);
            tray.tick(at);
            if step % 9 == 0 {
                let word: String = tray.available().iter().take(3).map(|l| l.as_char()).collect();
                if let Ok((id, _)) = tray.begin_submission(&word, &[], at) {
                    tray.complete_submission(id, at);
                }
            }
            if tray.remaining_in_sequence() > 0 {
                assert!(tray.len() >= rules.min_letters, "step {step}: {}", tray.len());
            }
            assert!(tray.len() <= rules.max_letters);
            if tray.len() == rules.max_letters && tray.remaining_in_sequence() > 0 {
                assert_eq!(tray.next_arrival(), None);
            }
        }
    }
}
