use time::Date;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::GameRecordEntity,
    dto::game::{
        CleanupResponse, CreateGameRequest, CreateGameResponse, GameListResponse, GameRecordDto,
        GameResponse, GameSummary, ListGamesQuery, Pagination, TopGamesResponse,
    },
    error::ServiceError,
    services::{calendar, maintenance_service},
    state::SharedState,
};

/// Store a finished game, stamping its id and play time.
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<CreateGameResponse, ServiceError> {
    request.validate()?;
    let store = state.require_game_store().await?;

    let CreateGameRequest {
        player_initials,
        score,
        best_word,
        history,
    } = request;

    let game = GameRecordEntity {
        game_id: Uuid::new_v4(),
        player_initials: player_initials.to_ascii_uppercase(),
        score,
        best_word,
        history,
        played_at: calendar::now_millis(),
    };
    let game_id = game.game_id;
    let initials = game.player_initials.clone();
    store.insert_game(game).await?;

    info!(%game_id, player = %initials, score, "game saved");
    Ok(CreateGameResponse {
        success: true,
        game_id,
        message: "Game saved successfully".into(),
    })
}

/// Fetch one stored game.
pub async fn get_game(state: &SharedState, id: Uuid) -> Result<GameResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let Some(game) = store.find_game(id).await? else {
        return Err(ServiceError::NotFound(format!("game `{id}` not found")));
    };
    Ok(GameResponse {
        success: true,
        game: game.into(),
    })
}

/// Most recent games, paginated.
pub async fn list_games(
    state: &SharedState,
    query: ListGamesQuery,
) -> Result<GameListResponse, ServiceError> {
    query.validate()?;
    let server = &state.config().server;
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(server.default_page_size)
        .clamp(1, server.max_page_size.max(1));

    let store = state.require_game_store().await?;
    let skip = u64::from(page - 1) * u64::from(limit);
    let result = store.list_games(skip, u64::from(limit)).await?;

    Ok(GameListResponse {
        success: true,
        games: result.games.into_iter().map(GameSummary::from).collect(),
        pagination: Pagination::new(result.total, page, limit),
    })
}

/// Leaderboard of the current reference day.
pub async fn top_today(state: &SharedState) -> Result<TopGamesResponse, ServiceError> {
    let limit = state.config().server.today_top_limit;
    top_for_day(state, calendar::today(), limit).await
}

/// Leaderboard of the previous reference day.
pub async fn top_yesterday(state: &SharedState) -> Result<TopGamesResponse, ServiceError> {
    let today = calendar::today();
    let yesterday = today.previous_day().unwrap_or(today);
    let limit = state.config().server.yesterday_top_limit;
    top_for_day(state, yesterday, limit).await
}

async fn top_for_day(
    state: &SharedState,
    day: Date,
    limit: u32,
) -> Result<TopGamesResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let (from, to) = calendar::day_range(day);
    let games = store.top_games(from, to, u64::from(limit)).await?;
    Ok(TopGamesResponse {
        success: true,
        date: day.to_string(),
        games: games.into_iter().map(GameRecordDto::from).collect(),
    })
}

/// Purge everything older than the retention window right away.
pub async fn cleanup(state: &SharedState) -> Result<CleanupResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let retention_days = state.config().server.retention_days;
    let purged = maintenance_service::purge_expired(store.as_ref(), retention_days).await?;
    Ok(CleanupResponse {
        success: true,
        message: format!(
            "Removed {} games and {} letter sequences older than {retention_days} days",
            purged.games, purged.sequences
        ),
        games_removed: purged.games,
        sequences_removed: purged.sequences,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        config::AppConfig,
        dao::game_store::memory::MemoryGameStore,
        game::{history::GameHistory, scoring::BestWord},
        state::AppState,
    };

    use super::*;

    async fn state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state.set_game_store(Arc::new(MemoryGameStore::new())).await;
        state
    }

    fn request(initials: &str, score: i32) -> CreateGameRequest {
        CreateGameRequest {
            player_initials: initials.into(),
            score,
            best_word: Some(BestWord {
                word: "CAT".into(),
                score: 5,
            }),
            history: GameHistory::new(),
        }
    }

    #[tokio::test]
    async fn created_games_can_be_read_back() {
        let state = state().await;
        let created = create_game(&state, request("abc", 42)).await.unwrap();
        let fetched = get_game(&state, created.game_id).await.unwrap().game;
        assert_eq!(fetched.player_initials, "ABC");
        assert_eq!(fetched.score, 42);
        assert_eq!(fetched.played_at.nanosecond() % 1_000_000, 0);

        let today = top_today(&state).await.unwrap();
        assert_eq!(today.games.len(), 1);
        assert!(top_yesterday(&state).await.unwrap().games.is_empty());
    }

    #[tokio::test]
    async fn invalid_initials_are_rejected() {
        let state = state().await;
        let err = create_game(&state, request("A1", 3)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn unknown_games_are_not_found() {
        let state = state().await;
        assert!(matches!(
            get_game(&state, Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn listing_uses_default_page_size() {
        let state = state().await;
        for score in 0..25 {
            create_game(&state, request("XYZ", score)).await.unwrap();
        }
        let listing = list_games(&state, ListGamesQuery::default()).await.unwrap();
        assert_eq!(listing.games.len(), 20);
        assert_eq!(listing.pagination.total_pages, 2);
        assert!(listing.pagination.has_next_page);
    }

    #[tokio::test]
    async fn degraded_state_refuses_writes() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            create_game(&state, request("ABC", 1)).await,
            Err(ServiceError::Degraded)
        ));
    }
}
