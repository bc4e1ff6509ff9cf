use utoipa::OpenApi;

#[derive(OpenApi)]
/// OpenAPI document of the word game persistence API.
#[openapi(
    info(title = "Wordy Back", description = "Daily letters, finished games and leaderboards"),
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::create_game,
        crate::routes::game::list_games,
        crate::routes::game::get_game,
        crate::routes::game::top_today,
        crate::routes::game::top_yesterday,
        crate::routes::game::cleanup,
        crate::routes::letters::today_letters,
        crate::routes::letters::list_sequences,
        crate::routes::letters::get_sequence,
        crate::routes::letters::create_sequence,
        crate::routes::letters::update_sequence,
        crate::routes::letters::delete_sequence,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::CreateGameResponse,
            crate::dto::game::GameRecordDto,
            crate::dto::game::GameResponse,
            crate::dto::game::GameSummary,
            crate::dto::game::GameListResponse,
            crate::dto::game::Pagination,
            crate::dto::game::TopGamesResponse,
            crate::dto::game::CleanupResponse,
            crate::dto::letters::TodayLettersResponse,
            crate::dto::letters::LetterSequenceDto,
            crate::dto::letters::SequenceResponse,
            crate::dto::letters::SequenceListResponse,
            crate::dto::letters::CreateSequenceRequest,
            crate::dto::letters::UpdateSequenceRequest,
            crate::dto::letters::ActionResponse,
            crate::game::history::GameHistory,
            crate::game::history::HistoryEvent,
            crate::game::scoring::BestWord,
            crate::error::ErrorBody,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "games", description = "Finished games and leaderboards"),
        (name = "letters", description = "Daily letter sequences"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/api/games",
            "/api/games/{id}",
            "/api/games/today/top",
            "/api/letters/today",
            "/api/letters/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
