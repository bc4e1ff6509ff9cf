/// Reference-timezone calendar helpers.
pub mod calendar;
/// OpenAPI documentation generation.
pub mod documentation;
/// Finished games and leaderboards.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Daily letter sequences.
pub mod letter_service;
/// Retention purge and sequence pre-generation.
pub mod maintenance_service;
/// Storage connection supervisor with backoff.
pub mod storage_supervisor;
