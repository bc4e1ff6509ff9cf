/// Persistence API clients (HTTP and offline).
pub mod api;
/// Dictionary oracles.
pub mod dictionary;
