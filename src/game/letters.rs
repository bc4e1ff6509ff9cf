//! Letter alphabet, point values and the frequency-weighted letter pool.

use std::{collections::VecDeque, fmt};

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;

/// Number of symbols in the game alphabet.
pub const ALPHABET_LEN: usize = 26;

/// Scale applied to the frequency table before rounding to a replica count.
const FREQUENCY_SCALE: f64 = 100.0;

/// Point value per letter, indexed from `A`.
const LETTER_POINTS: [u32; ALPHABET_LEN] = [
    1, 3, 3, 2, 1, 4, 2, 4, 1, 8, 5, 1, 3, // A..M
    1, 1, 3, 10, 1, 1, 1, 1, 4, 4, 8, 4, 10, // N..Z
];

/// Relative English letter frequencies (percent), indexed from `A`.
const LETTER_FREQUENCIES: [f64; ALPHABET_LEN] = [
    8.2, 1.5, 2.8, 4.3, 13.0, 2.2, 2.0, 6.1, 7.0, 0.15, 0.77, 4.0, 2.4, // A..M
    6.7, 7.5, 1.9, 0.095, 6.0, 6.3, 9.1, 2.8, 0.98, 2.4, 0.15, 2.0, 0.074, // N..Z
];

/// Raised when a character outside `A-Z`/`a-z` is used as a letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("`{0}` is not a letter of the game alphabet")]
pub struct InvalidLetter(pub char);

/// One symbol of the fixed 26-letter alphabet, always stored upper-case.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Letter(u8);

impl Letter {
    /// Convert a character, accepting either case.
    pub fn from_char(c: char) -> Result<Self, InvalidLetter> {
        if c.is_ascii_alphabetic() {
            Ok(Self(c.to_ascii_uppercase() as u8))
        } else {
            Err(InvalidLetter(c))
        }
    }

    /// Upper-case character for this letter.
    pub fn as_char(self) -> char {
        self.0 as char
    }

    /// Zero-based position in the alphabet.
    pub fn index(self) -> usize {
        usize::from(self.0 - b'A')
    }

    /// Fixed point value (1..=10).
    pub fn points(self) -> u32 {
        LETTER_POINTS[self.index()]
    }

    /// Iterate the whole alphabet in order.
    pub fn all() -> impl Iterator<Item = Letter> {
        (b'A'..=b'Z').map(Letter)
    }
}

impl fmt::Debug for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl TryFrom<char> for Letter {
    type Error = InvalidLetter;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        Self::from_char(value)
    }
}

impl Serialize for Letter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut buf = [0u8; 4];
        serializer.serialize_str(self.as_char().encode_utf8(&mut buf))
    }
}

impl<'de> Deserialize<'de> for Letter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Letter::from_char(c).map_err(de::Error::custom),
            _ => Err(de::Error::custom(format!(
                "expected a single letter, got `{raw}`"
            ))),
        }
    }
}

/// Parse every character of `text` as a letter.
pub fn parse_letters(text: &str) -> Result<Vec<Letter>, InvalidLetter> {
    text.chars().map(Letter::from_char).collect()
}

/// Render letters back into an upper-case string.
pub fn letters_to_string(letters: &[Letter]) -> String {
    letters.iter().map(|letter| letter.as_char()).collect()
}

/// Frequency-weighted pool that letter sequences are sampled from.
#[derive(Debug, Clone)]
pub struct LetterPool {
    pool: Vec<Letter>,
}

impl LetterPool {
    /// Pool built from the English frequency table.
    pub fn english() -> Self {
        let weights = Letter::all().map(|letter| (letter, LETTER_FREQUENCIES[letter.index()]));
        Self::from_frequencies(weights)
    }

    /// Replicate each letter `round(frequency * 100)` times, at least once.
    pub fn from_frequencies(weights: impl IntoIterator<Item = (Letter, f64)>) -> Self {
        let mut pool = Vec::new();
        for (letter, frequency) in weights {
            let replicas = ((frequency * FREQUENCY_SCALE).round() as usize).max(1);
            pool.extend(std::iter::repeat_n(letter, replicas));
        }
        Self { pool }
    }

    /// Total number of entries in the pool.
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Whether the pool has no entries.
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// How many replicas of `letter` the pool holds.
    pub fn replicas(&self, letter: Letter) -> usize {
        self.pool.iter().filter(|entry| **entry == letter).count()
    }

    /// Draw `length` independent samples with replacement.
    pub fn generate_sequence<R: Rng + ?Sized>(&self, length: usize, rng: &mut R) -> Vec<Letter> {
        if self.pool.is_empty() {
            return Vec::new();
        }
        (0..length)
            .map(|_| self.pool[rng.random_range(0..self.pool.len())])
            .collect()
    }
}

impl Default for LetterPool {
    fn default() -> Self {
        Self::english()
    }
}

/// Generate a sequence from the English pool using the thread-local RNG.
pub fn generate_sequence(length: usize) -> Vec<Letter> {
    LetterPool::english().generate_sequence(length, &mut rand::rng())
}

/// Session-scoped queue of letters still to arrive, drained front to back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LetterSequence {
    remaining: VecDeque<Letter>,
}

impl LetterSequence {
    /// Wrap a pre-generated list of letters.
    pub fn new(letters: impl IntoIterator<Item = Letter>) -> Self {
        Self {
            remaining: letters.into_iter().collect(),
        }
    }

    /// Take the next letter, if any remain.
    pub fn next_letter(&mut self) -> Option<Letter> {
        self.remaining.pop_front()
    }

    /// Put an undelivered letter back at the head of the queue.
    pub fn push_front(&mut self, letter: Letter) {
        self.remaining.push_front(letter);
    }

    /// Letters not yet delivered.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// True once every letter has been delivered.
    pub fn is_exhausted(&self) -> bool {
        self.remaining.is_empty()
    }
}
