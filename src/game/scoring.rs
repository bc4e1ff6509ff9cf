//! Scoring engine: point sums, length and streak multipliers, letter coverage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{config::GameConfig, game::letters::Letter};

/// Tolerance used before taking the ceiling so exact products stay exact.
const CEIL_EPSILON: f64 = 1e-9;

/// Sum of the point values of every letter in `word`, ignoring case.
///
/// Characters outside the alphabet contribute nothing.
pub fn word_points(word: &str) -> u32 {
    word.chars()
        .filter_map(|c| Letter::from_char(c).ok())
        .map(Letter::points)
        .sum()
}

/// Multiset containment: can `word` be spelled with `available`?
///
/// Stops at the first letter that is not covered by the remaining counts.
pub fn can_form(word: &str, available: &[Letter]) -> bool {
    let mut counts = [0usize; crate::game::letters::ALPHABET_LEN];
    for letter in available {
        counts[letter.index()] += 1;
    }

    for c in word.chars() {
        let Ok(letter) = Letter::from_char(c) else {
            return false;
        };
        let slot = &mut counts[letter.index()];
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
    }

    true
}

/// Round a multiplier to two decimals so repeated increments do not drift.
fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Configured scoring constants.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringRules {
    length_multipliers: BTreeMap<usize, f64>,
    streak_base: f64,
    streak_increment: f64,
    streak_max: f64,
}

impl ScoringRules {
    /// Build the rules from explicit values.
    pub fn new(
        length_multipliers: BTreeMap<usize, f64>,
        streak_base: f64,
        streak_increment: f64,
        streak_max: f64,
    ) -> Self {
        Self {
            length_multipliers,
            streak_base,
            streak_increment,
            streak_max: streak_max.max(streak_base),
        }
    }

    /// Multiplier for a word of `len` letters.
    ///
    /// Lengths without an entry use the largest configured step below them,
    /// or 1.0 when there is none.
    pub fn length_multiplier(&self, len: usize) -> f64 {
        self.length_multipliers
            .range(..=len)
            .next_back()
            .map(|(_, multiplier)| *multiplier)
            .unwrap_or(1.0)
    }

    /// Starting streak multiplier.
    pub fn streak_base(&self) -> f64 {
        self.streak_base
    }

    /// Cap for the streak multiplier.
    pub fn streak_max(&self) -> f64 {
        self.streak_max
    }

    /// Streak after one more valid word.
    pub fn next_streak(&self, current: f64) -> f64 {
        round_hundredths((current + self.streak_increment).min(self.streak_max))
    }

    /// `ceil(base × length × min(streak, MAX))`.
    pub fn valid_word_points(&self, base_points: u32, length_multiplier: f64, streak: f64) -> i32 {
        let raw = f64::from(base_points) * length_multiplier * streak.min(self.streak_max);
        (raw - CEIL_EPSILON).ceil() as i32
    }
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self::from(&GameConfig::default())
    }
}

impl From<&GameConfig> for ScoringRules {
    fn from(config: &GameConfig) -> Self {
        Self::new(
            config.length_multipliers.clone(),
            config.streak_base,
            config.streak_increment,
            config.streak_max,
        )
    }
}

/// Highest-scoring valid word of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BestWord {
    /// The word, upper-case.
    pub word: String,
    /// Final points it earned.
    pub score: i32,
}

/// Breakdown of a valid word's score.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidWordScore {
    /// Sum of the letter values.
    pub base_points: u32,
    /// Multiplier from the word length.
    pub length_multiplier: f64,
    /// Streak multiplier in effect when the word was scored.
    pub streak_multiplier: f64,
    /// Points added to the score.
    pub final_points: i32,
}

/// Running score, streak and best word for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringState {
    rules: ScoringRules,
    score: i32,
    streak: f64,
    best_word: Option<BestWord>,
}

impl ScoringState {
    /// Fresh state with the streak at its base value.
    pub fn new(rules: ScoringRules) -> Self {
        let streak = rules.streak_base();
        Self {
            rules,
            score: 0,
            streak,
            best_word: None,
        }
    }

    /// Current score.
    pub fn score(&self) -> i32 {
        self.score
    }

    /// Current streak multiplier.
    pub fn streak(&self) -> f64 {
        self.streak
    }

    /// Best word so far, if any valid word was scored.
    pub fn best_word(&self) -> Option<&BestWord> {
        self.best_word.as_ref()
    }

    /// Rules in effect.
    pub fn rules(&self) -> &ScoringRules {
        &self.rules
    }

    /// Score a dictionary-approved word, then advance the streak.
    pub fn apply_valid(&mut self, word: &str) -> ValidWordScore {
        let base_points = word_points(word);
        let length_multiplier = self.rules.length_multiplier(word.chars().count());
        let streak_multiplier = self.streak.min(self.rules.streak_max());
        let final_points =
            self.rules
                .valid_word_points(base_points, length_multiplier, streak_multiplier);

        self.score += final_points;
        self.streak = self.rules.next_streak(self.streak);

        let is_best = self
            .best_word
            .as_ref()
            .is_none_or(|best| final_points > best.score);
        if is_best {
            self.best_word = Some(BestWord {
                word: word.to_ascii_uppercase(),
                score: final_points,
            });
        }

        ValidWordScore {
            base_points,
            length_multiplier,
            streak_multiplier,
            final_points,
        }
    }

    /// Penalise a rejected word by its base points and reset the streak.
    pub fn apply_invalid(&mut self, word: &str) -> i32 {
        let points = -(word_points(word) as i32);
        self.score += points;
        self.streak = self.rules.streak_base();
        points
    }

    /// Penalise an expired letter by its value and reset the streak.
    pub fn apply_drop(&mut self, letter: Letter) -> i32 {
        let points = -(letter.points() as i32);
        self.score += points;
        self.streak = self.rules.streak_base();
        points
    }
}
