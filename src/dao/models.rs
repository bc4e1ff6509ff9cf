use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::game::{history::GameHistory, letters::Letter, scoring::BestWord};

/// Finished game as stored by the backends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameRecordEntity {
    /// Server-assigned identifier.
    pub game_id: Uuid,
    /// Three-letter player tag.
    pub player_initials: String,
    /// Final score.
    pub score: i32,
    /// Highest-scoring word, absent when no word was accepted.
    pub best_word: Option<BestWord>,
    /// Every scoring event and the per-category totals.
    pub history: GameHistory,
    /// When the server stored the record.
    #[serde(with = "time::serde::rfc3339")]
    pub played_at: OffsetDateTime,
}

/// Letters dealt for one reference day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LetterSequenceEntity {
    /// Identifier exposed as `sequenceId`.
    pub id: Uuid,
    /// Reference day, stored as that calendar date at midnight UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// The sequence, in arrival order.
    pub letters: Vec<Letter>,
    /// First insertion time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last modification time.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// One page of games plus the total number of stored games.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamePageEntity {
    /// Games on this page, most recent first.
    pub games: Vec<GameRecordEntity>,
    /// Count across all pages.
    pub total: u64,
}
