use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::game::{
        CleanupResponse, CreateGameRequest, CreateGameResponse, GameListResponse, GameResponse,
        ListGamesQuery, TopGamesResponse,
    },
    error::{AppError, ErrorBody},
    services::game_service,
    state::SharedState,
};

/// Routes for finished games and the daily leaderboards.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", post(create_game).get(list_games))
        .route("/games/today/top", get(top_today))
        .route("/games/yesterday/top", get(top_yesterday))
        .route("/games/cleanup", post(cleanup))
        .route("/games/{id}", get(get_game))
}

/// Store a finished game.
#[utoipa::path(
    post,
    path = "/api/games",
    tag = "games",
    request_body = CreateGameRequest,
    responses(
        (status = 201, description = "Game stored", body = CreateGameResponse),
        (status = 400, description = "Malformed game record", body = ErrorBody),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Json(payload): Json<CreateGameRequest>,
) -> Result<(StatusCode, Json<CreateGameResponse>), AppError> {
    let created = game_service::create_game(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Most recent games first.
#[utoipa::path(
    get,
    path = "/api/games",
    tag = "games",
    params(ListGamesQuery),
    responses(
        (status = 200, description = "One page of games", body = GameListResponse),
        (status = 400, description = "Invalid paging", body = ErrorBody)
    )
)]
pub async fn list_games(
    State(state): State<SharedState>,
    Query(query): Query<ListGamesQuery>,
) -> Result<Json<GameListResponse>, AppError> {
    let page = game_service::list_games(&state, query).await?;
    Ok(Json(page))
}

/// One stored game with its full history.
#[utoipa::path(
    get,
    path = "/api/games/{id}",
    tag = "games",
    params(("id" = Uuid, Path, description = "Identifier returned when the game was stored")),
    responses(
        (status = 200, description = "The stored game", body = GameResponse),
        (status = 404, description = "Unknown game", body = ErrorBody)
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameResponse>, AppError> {
    let game = game_service::get_game(&state, id).await?;
    Ok(Json(game))
}

/// Best games of the current reference day.
#[utoipa::path(
    get,
    path = "/api/games/today/top",
    tag = "games",
    responses((status = 200, description = "Today's leaderboard", body = TopGamesResponse))
)]
pub async fn top_today(
    State(state): State<SharedState>,
) -> Result<Json<TopGamesResponse>, AppError> {
    Ok(Json(game_service::top_today(&state).await?))
}

/// Best games of the previous reference day.
#[utoipa::path(
    get,
    path = "/api/games/yesterday/top",
    tag = "games",
    responses((status = 200, description = "Yesterday's leaderboard", body = TopGamesResponse))
)]
pub async fn top_yesterday(
    State(state): State<SharedState>,
) -> Result<Json<TopGamesResponse>, AppError> {
    Ok(Json(game_service::top_yesterday(&state).await?))
}

/// Purge games and sequences older than the retention window.
#[utoipa::path(
    post,
    path = "/api/games/cleanup",
    tag = "games",
    responses((status = 200, description = "Expired records removed", body = CleanupResponse))
)]
pub async fn cleanup(State(state): State<SharedState>) -> Result<Json<CleanupResponse>, AppError> {
    Ok(Json(game_service::cleanup(&state).await?))
}
