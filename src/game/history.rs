//! Append-only log of scoring events with running per-category totals.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::game::{letters::Letter, scoring::ValidWordScore};

/// One scoring event. Points are signed deltas applied to the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum HistoryEvent {
    /// A dictionary-approved word.
    Valid {
        /// The word, upper-case.
        word: String,
        /// Sum of the letter values.
        base_points: u32,
        /// Multiplier from the word length.
        length_multiplier: f64,
        /// Streak multiplier in effect.
        streak_multiplier: f64,
        /// Points added to the score.
        final_points: i32,
    },
    /// A word the dictionary rejected.
    Invalid {
        /// The word, upper-case.
        word: String,
        /// Negative base points.
        points: i32,
    },
    /// A letter that aged out of the tray.
    Drop {
        /// The expired letter.
        #[schema(value_type = String)]
        letter: Letter,
        /// Negative letter value.
        points: i32,
    },
}

impl HistoryEvent {
    /// Build a `Valid` event from a scored word.
    pub fn valid(word: &str, score: &ValidWordScore) -> Self {
        Self::Valid {
            word: word.to_ascii_uppercase(),
            base_points: score.base_points,
            length_multiplier: score.length_multiplier,
            streak_multiplier: score.streak_multiplier,
            final_points: score.final_points,
        }
    }

    /// Score delta carried by the event.
    pub fn points(&self) -> i32 {
        match self {
            HistoryEvent::Valid { final_points, .. } => *final_points,
            HistoryEvent::Invalid { points, .. } | HistoryEvent::Drop { points, .. } => *points,
        }
    }
}

impl fmt::Display for HistoryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryEvent::Valid {
                word,
                base_points,
                length_multiplier,
                streak_multiplier,
                final_points,
            } => write!(
                f,
                "{word}: {base_points} × {length_multiplier} × {streak_multiplier} = {final_points}"
            ),
            HistoryEvent::Invalid { word, points } => {
                write!(f, "{word}: Invalid (-{})", points.unsigned_abs())
            }
            HistoryEvent::Drop { letter, points } => {
                write!(f, "{letter}(-{})", points.unsigned_abs())
            }
        }
    }
}

/// Ordered event log plus the totals per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameHistory {
    events: Vec<HistoryEvent>,
    valid_points: i32,
    invalid_points: i32,
    drop_points: i32,
}

impl GameHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and fold it into its category total.
    pub fn record(&mut self, event: HistoryEvent) -> &HistoryEvent {
        match &event {
            HistoryEvent::Valid { final_points, .. } => self.valid_points += final_points,
            HistoryEvent::Invalid { points, .. } => self.invalid_points += points,
            HistoryEvent::Drop { points, .. } => self.drop_points += points,
        }
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    /// Events in the order they happened.
    pub fn events(&self) -> &[HistoryEvent] {
        &self.events
    }

    /// Sum of valid-word points.
    pub fn valid_points(&self) -> i32 {
        self.valid_points
    }

    /// Sum of invalid-word penalties (zero or negative).
    pub fn invalid_points(&self) -> i32 {
        self.invalid_points
    }

    /// Sum of letter-drop penalties (zero or negative).
    pub fn drop_points(&self) -> i32 {
        self.drop_points
    }

    /// Net effect of every event.
    pub fn net_points(&self) -> i32 {
        self.valid_points + self.invalid_points + self.drop_points
    }

    /// Whether the stored totals agree with the event list.
    pub fn is_consistent(&self) -> bool {
        let mut rebuilt = GameHistory::new();
        for event in &self.events {
            rebuilt.record(event.clone());
        }
        rebuilt.valid_points == self.valid_points
            && rebuilt.invalid_points == self.invalid_points
            && rebuilt.drop_points == self.drop_points
    }
}
