//! Client side of the persistence API.

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    dao::{
        game_store::{GameStore, memory::MemoryGameStore},
        models::GameRecordEntity,
    },
    dto::{
        game::{
            CreateGameRequest, CreateGameResponse, GameListResponse, GameRecordDto, GameResponse,
            TopGamesResponse,
        },
        letters::{CreateSequenceRequest, SequenceResponse, TodayLettersResponse},
    },
    error::ErrorBody,
    game::letters::LetterPool,
    services::calendar,
};

/// Failures talking to the persistence API.
#[derive(Debug, Error)]
pub enum ApiClientError {
    /// Building the HTTP client failed.
    #[error("failed to build API client")]
    ClientBuilder {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent.
    #[error("failed to send request to `{path}`")]
    RequestSend {
        /// Request path below the API base.
        path: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with an error status.
    #[error("`{path}` answered {status}: {message}")]
    RequestStatus {
        /// Request path below the API base.
        path: String,
        /// HTTP status returned.
        status: StatusCode,
        /// Message from the error envelope, or the status reason.
        message: String,
    },
    /// The body did not match the expected payload.
    #[error("failed to decode response from `{path}`")]
    DecodeResponse {
        /// Request path below the API base.
        path: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The local store refused the operation.
    #[error("local storage failed")]
    Local(#[source] crate::dao::storage::StorageError),
}

impl ApiClientError {
    /// Whether the server reported that the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ApiClientError::RequestStatus {
                status: StatusCode::NOT_FOUND,
                ..
            }
        )
    }

    fn not_found(path: impl Into<String>, message: impl Into<String>) -> Self {
        ApiClientError::RequestStatus {
            path: path.into(),
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

/// Operations the game client needs from the persistence API.
pub trait GameApi: Send + Sync {
    /// `GET /letters/today`.
    fn today_letters(&self) -> BoxFuture<'static, Result<TodayLettersResponse, ApiClientError>>;
    /// `POST /games`.
    fn save_game(
        &self,
        game: CreateGameRequest,
    ) -> BoxFuture<'static, Result<CreateGameResponse, ApiClientError>>;
    /// `GET /games/{id}`.
    fn game(&self, id: Uuid) -> BoxFuture<'static, Result<GameRecordDto, ApiClientError>>;
    /// `GET /games/today/top`.
    fn top_today(&self) -> BoxFuture<'static, Result<TopGamesResponse, ApiClientError>>;
    /// `GET /games/yesterday/top`.
    fn top_yesterday(&self) -> BoxFuture<'static, Result<TopGamesResponse, ApiClientError>>;
}

/// [`GameApi`] over HTTP; `base_url` points at the `/api` prefix.
#[derive(Clone)]
pub struct HttpGameApi {
    client: Client,
    base_url: Arc<str>,
}

impl HttpGameApi {
    /// Client rooted at `base_url`, e.g. `http://localhost:3000/api`.
    pub fn new(base_url: &str) -> Result<Self, ApiClientError> {
        let client = Client::builder()
            .build()
            .map_err(|source| ApiClientError::ClientBuilder { source })?;
        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request<B, T>(
        self,
        method: Method,
        path: String,
        body: Option<B>,
    ) -> Result<T, ApiClientError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.request(method, url);
        if let Some(body) = &body {
            builder = builder.json(body);
        }
        let response = builder
            .send()
            .await
            .map_err(|source| ApiClientError::RequestSend {
                path: path.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.message,
                Err(_) => status.canonical_reason().unwrap_or("error").to_owned(),
            };
            return Err(ApiClientError::RequestStatus {
                path,
                status,
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| ApiClientError::DecodeResponse { path, source })
    }

    async fn get<T: DeserializeOwned>(self, path: String) -> Result<T, ApiClientError> {
        self.request::<(), T>(Method::GET, path, None).await
    }

    /// `GET /games?page=&limit=`.
    pub async fn list_games(&self, page: u32, limit: u32) -> Result<GameListResponse, ApiClientError> {
        self.clone()
            .get(format!("/games?page={page}&limit={limit}"))
            .await
    }

    /// `POST /letters`.
    pub async fn create_sequence(
        &self,
        request: CreateSequenceRequest,
    ) -> Result<SequenceResponse, ApiClientError> {
        self.clone()
            .request(Method::POST, "/letters".into(), Some(request))
            .await
    }
}

impl GameApi for HttpGameApi {
    fn today_letters(&self) -> BoxFuture<'static, Result<TodayLettersResponse, ApiClientError>> {
        Box::pin(self.clone().get::<TodayLettersResponse>("/letters/today".into()))
    }

    fn save_game(
        &self,
        game: CreateGameRequest,
    ) -> BoxFuture<'static, Result<CreateGameResponse, ApiClientError>> {
        Box::pin(
            self.clone()
                .request::<_, CreateGameResponse>(Method::POST, "/games".into(), Some(game)),
        )
    }

    fn game(&self, id: Uuid) -> BoxFuture<'static, Result<GameRecordDto, ApiClientError>> {
        let api = self.clone();
        Box::pin(async move {
            let response: GameResponse = api.get(format!("/games/{id}")).await?;
            Ok(response.game)
        })
    }

    fn top_today(&self) -> BoxFuture<'static, Result<TopGamesResponse, ApiClientError>> {
        Box::pin(self.clone().get::<TopGamesResponse>("/games/today/top".into()))
    }

    fn top_yesterday(&self) -> BoxFuture<'static, Result<TopGamesResponse, ApiClientError>> {
        Box::pin(self.clone().get::<TopGamesResponse>("/games/yesterday/top".into()))
    }
}

/// [`GameApi`] answering locally: letters are generated on demand, games live in memory.
#[derive(Clone)]
pub struct OfflineGameApi {
    store: MemoryGameStore,
    sequence_length: usize,
    top_limit: u32,
}

impl OfflineGameApi {
    /// Local API generating sequences of `sequence_length` letters and ranking the best `top_limit` games.
    pub fn new(sequence_length: usize, top_limit: u32) -> Self {
        Self {
            store: MemoryGameStore::new(),
            sequence_length,
            top_limit,
        }
    }

    async fn top_for(self, day: time::Date) -> Result<TopGamesResponse, ApiClientError> {
        let (from, to) = calendar::day_range(day);
        let games = self
            .store
            .top_games(from, to, u64::from(self.top_limit))
            .await
            .map_err(ApiClientError::Local)?;
        Ok(TopGamesResponse {
            success: true,
            date: day.to_string(),
            games: games.into_iter().map(GameRecordDto::from).collect(),
        })
    }
}

impl GameApi for OfflineGameApi {
    fn today_letters(&self) -> BoxFuture<'static, Result<TodayLettersResponse, ApiClientError>> {
        let letters = LetterPool::english().generate_sequence(self.sequence_length, &mut rand::rng());
        Box::pin(async move {
            Ok(TodayLettersResponse {
                success: true,
                letters,
                sequence_id: Uuid::new_v4(),
                reference_date: calendar::day_start(calendar::today()),
            })
        })
    }

    fn save_game(
        &self,
        game: CreateGameRequest,
    ) -> BoxFuture<'static, Result<CreateGameResponse, ApiClientError>> {
        let store = self.store.clone();
        Box::pin(async move {
            let record = GameRecordEntity {
                game_id: Uuid::new_v4(),
                player_initials: game.player_initials.to_ascii_uppercase(),
                score: game.score,
                best_word: game.best_word,
                history: game.history,
                played_at: calendar::now_millis(),
            };
            let game_id = record.game_id;
            store.insert_game(record).await.map_err(ApiClientError::Local)?;
            Ok(CreateGameResponse {
                success: true,
                game_id,
                message: "Game kept for this session".into(),
            })
        })
    }

    fn game(&self, id: Uuid) -> BoxFuture<'static, Result<GameRecordDto, ApiClientError>> {
        let store = self.store.clone();
        Box::pin(async move {
            store
                .find_game(id)
                .await
                .map_err(ApiClientError::Local)?
                .map(GameRecordDto::from)
                .ok_or_else(|| ApiClientError::not_found(format!("/games/{id}"), "game not found"))
        })
    }

    fn top_today(&self) -> BoxFuture<'static, Result<TopGamesResponse, ApiClientError>> {
        Box::pin(self.clone().top_for(calendar::today()))
    }

    fn top_yesterday(&self) -> BoxFuture<'static, Result<TopGamesResponse, ApiClientError>> {
        let today = calendar::today();
        Box::pin(self.clone().top_for(today.previous_day().unwrap_or(today)))
    }
}

#[cfg(test)]
mod tests {
    use crate::game::history::GameHistory;

    use super::*;

    fn request(initials: &str, score: i32) -> CreateGameRequest {
        CreateGameRequest {
            player_initials: initials.into(),
            score,
            best_word: None,
            history: GameHistory::new(),
        }
    }

    #[tokio::test]
    async fn offline_api_ranks_saved_games() {
        let api = OfflineGameApi::new(55, 10);
        let letters = api.today_letters().await.unwrap();
        assert_eq!(letters.letters.len(), 55);

        api.save_game(request("low", 3)).await.unwrap();
        let best = api.save_game(request("top", 30)).await.unwrap();

        let board = api.top_today().await.unwrap();
        assert_eq!(board.games[0].game_id, best.game_id);
        assert_eq!(board.games[0].player_initials, "TOP");
        assert!(api.top_yesterday().await.unwrap().games.is_empty());

        let missing = api.game(Uuid::new_v4()).await.unwrap_err();
        assert!(missing.is_not_found());
    }
}
