//! Library crate for wordy-back: the word game engine, its session controller and the
//! persistence API, exposed for the binaries and integration tests.

/// Dictionary oracles and persistence API clients.
pub mod clients;
/// Layered configuration.
pub mod config;
/// Storage backends and their records.
pub mod dao;
/// HTTP payloads and input validation.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// Word game rules: letters, scoring, tray and history.
pub mod game;
/// Axum route trees.
pub mod routes;
/// Business logic behind the routes and background tasks.
pub mod services;
/// Player session controller and its runtime.
pub mod session;
/// Shared server state.
pub mod state;
