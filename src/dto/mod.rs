/// Game record payloads and leaderboard envelopes.
pub mod game;
/// Health check payload.
pub mod health;
/// Daily letter sequence payloads.
pub mod letters;
/// Custom validators shared by request payloads.
pub mod validation;
