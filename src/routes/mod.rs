use axum::Router;

use crate::state::SharedState;

/// Swagger UI and the OpenAPI document.
pub mod docs;
/// Finished games and leaderboards.
pub mod game;
/// Liveness and storage health.
pub mod health;
/// Daily letter sequences.
pub mod letters;

/// Compose all route trees: the game API under `/api`, health and docs at the root.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = game::router().merge(letters::router());

    health::router()
        .nest("/api", api_router)
        .merge(docs::router())
        .with_state(state)
}
