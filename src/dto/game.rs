use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::GameRecordEntity,
    dto::validation::{validate_history, validate_initials},
    game::{history::GameHistory, scoring::BestWord},
};

/// Finished game submitted by a client; the server adds `gameId` and `playedAt`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    /// Three letters A-Z; stored upper-case.
    #[validate(custom(function = "validate_initials"))]
    pub player_initials: String,
    /// Final score, which may be negative.
    pub score: i32,
    /// Highest-scoring valid word, if any.
    #[serde(default)]
    pub best_word: Option<BestWord>,
    /// Every scored event with its subtotals.
    #[validate(custom(function = "validate_history"))]
    pub history: GameHistory,
}

/// Acknowledgement of a stored game.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameResponse {
    /// Always `true` on success.
    pub success: bool,
    /// Identifier assigned to the game.
    pub game_id: Uuid,
    /// Human-readable confirmation.
    pub message: String,
}

/// A stored game, exactly as it was saved.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameRecordDto {
    /// Identifier assigned when the game was stored.
    pub game_id: Uuid,
    /// Player tag, upper-case.
    pub player_initials: String,
    /// Final score.
    pub score: i32,
    /// Highest-scoring valid word, if any.
    pub best_word: Option<BestWord>,
    /// Every scored event with its subtotals.
    pub history: GameHistory,
    /// Server time at which the game was stored.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub played_at: OffsetDateTime,
}

impl From<GameRecordEntity> for GameRecordDto {
    fn from(value: GameRecordEntity) -> Self {
        Self {
            game_id: value.game_id,
            player_initials: value.player_initials,
            score: value.score,
            best_word: value.best_word,
            history: value.history,
            played_at: value.played_at,
        }
    }
}

/// Envelope of `GET /games/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GameResponse {
    /// Always `true` on success.
    pub success: bool,
    /// The stored game.
    pub game: GameRecordDto,
}

/// Listing projection without the event history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    /// Identifier assigned when the game was stored.
    pub game_id: Uuid,
    /// Player tag, upper-case.
    pub player_initials: String,
    /// Final score.
    pub score: i32,
    /// Highest-scoring valid word, if any.
    pub best_word: Option<BestWord>,
    /// Server time at which the game was stored.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub played_at: OffsetDateTime,
}

impl From<GameRecordEntity> for GameSummary {
    fn from(value: GameRecordEntity) -> Self {
        Self {
            game_id: value.game_id,
            player_initials: value.player_initials,
            score: value.score,
            best_word: value.best_word,
            played_at: value.played_at,
        }
    }
}

/// Paging metadata of a game listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Games stored in total.
    pub total_games: u64,
    /// Pages at the current page size.
    pub total_pages: u64,
    /// 1-based page returned.
    pub current_page: u32,
    /// Games per page.
    pub page_size: u32,
    /// Whether a later page exists.
    pub has_next_page: bool,
    /// Whether an earlier page exists.
    pub has_prev_page: bool,
}

impl Pagination {
    /// Derive the metadata from the total count and the requested page.
    pub fn new(total_games: u64, current_page: u32, page_size: u32) -> Self {
        let total_pages = total_games.div_ceil(u64::from(page_size.max(1)));
        Self {
            total_games,
            total_pages,
            current_page,
            page_size,
            has_next_page: u64::from(current_page) < total_pages,
            has_prev_page: current_page > 1,
        }
    }
}

/// Envelope of `GET /games`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GameListResponse {
    /// Always `true` on success.
    pub success: bool,
    /// Games on this page, newest first.
    pub games: Vec<GameSummary>,
    /// Paging metadata.
    pub pagination: Pagination,
}

/// Query parameters of `GET /games`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct ListGamesQuery {
    /// 1-based page number.
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    /// Page size, at most 100.
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

/// Envelope of the daily leaderboards.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopGamesResponse {
    /// Always `true` on success.
    pub success: bool,
    /// Reference day covered, `YYYY-MM-DD`.
    pub date: String,
    /// Best games of the day, highest score first.
    pub games: Vec<GameRecordDto>,
}

/// Result of a retention purge.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    /// Always `true` on success.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Games deleted.
    pub games_removed: u64,
    /// Sequences deleted.
    pub sequences_removed: u64,
}

#[cfg(test)]
mod tests {
    use validator::Validate;

    use super::*;

    #[test]
    fn pagination_flags() {
        let first = Pagination::new(45, 1, 20);
        assert_eq!(first.total_pages, 3);
        assert!(first.has_next_page);
        assert!(!first.has_prev_page);

        let last = Pagination::new(45, 3, 20);
        assert!(!last.has_next_page);
        assert!(last.has_prev_page);

        let empty = Pagination::new(0, 1, 20);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page);
    }

    #[test]
    fn create_request_uses_camel_case_and_validates_initials() {
        let request: CreateGameRequest = serde_json::from_value(serde_json::json!({
            "playerInitials": "AB",
            "score": 12,
            "bestWord": { "word": "CAT", "score": 5 },
            "history": { "events": [], "validPoints": 0, "invalidPoints": 0, "dropPoints": 0 }
        }))
        .unwrap();
        assert_eq!(request.best_word.as_ref().unwrap().word, "CAT");
        assert!(request.validate().is_err());
    }

    #[test]
    fn list_query_limits() {
        let ok = ListGamesQuery {
            page: Some(2),
            limit: Some(100),
        };
        assert!(ok.validate().is_ok());
        let too_big = ListGamesQuery {
            page: None,
            limit: Some(101),
        };
        assert!(too_big.validate().is_err());
    }
}
