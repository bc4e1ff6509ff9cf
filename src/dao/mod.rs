/// Persistence backends for finished games and daily letter sequences.
pub mod game_store;
/// Records as they are stored.
pub mod models;
/// Backend-agnostic storage errors.
pub mod storage;
