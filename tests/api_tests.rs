use std::{net::SocketAddr, sync::Arc};

use reqwest::StatusCode;
use time::Duration;
use tokio::net::TcpListener;
use uuid::Uuid;
use wordy_back::{
    clients::api::{ApiClientError, GameApi, HttpGameApi},
    config::AppConfig,
    dao::{
        game_store::{GameStore, memory::MemoryGameStore},
        models::GameRecordEntity,
    },
    dto::{
        game::CreateGameRequest, health::HealthResponse, letters::CreateSequenceRequest,
    },
    game::{
        history::{GameHistory, HistoryEvent},
        letters::generate_sequence,
        scoring::BestWord,
    },
    routes,
    services::calendar,
    state::AppState,
};

struct TestServer {
    addr: SocketAddr,
    store: MemoryGameStore,
    api: HttpGameApi,
}

async fn start_server() -> TestServer {
    let store = MemoryGameStore::new();
    let state = AppState::new(AppConfig::default());
    state.set_game_store(Arc::new(store.clone())).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = routes::router(state);
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });

    let api = HttpGameApi::new(&format!("http://{addr}/api")).unwrap();
    TestServer { addr, store, api }
}

fn cat_game(initials: &str) -> CreateGameRequest {
    let mut history = GameHistory::new();
    history.record(HistoryEvent::Valid {
        word: "CAT".into(),
        base_points: 5,
        length_multiplier: 1.0,
        streak_multiplier: 1.0,
        final_points: 5,
    });
    history.record(HistoryEvent::Drop {
        letter: 'Q'.try_into().unwrap(),
        points: -10,
    });
    CreateGameRequest {
        player_initials: initials.into(),
        score: -5,
        best_word: Some(BestWord {
            word: "CAT".into(),
            score: 5,
        }),
        history,
    }
}

fn status_of(err: &ApiClientError) -> Option<StatusCode> {
    match err {
        ApiClientError::RequestStatus { status, .. } => Some(*status),
        _ => None,
    }
}

#[tokio::test]
async fn saved_game_round_trips() {
    let server = start_server().await;
    let request = cat_game("abc");

    let created = server.api.save_game(request.clone()).await.unwrap();
    assert!(created.success);

    let game = server.api.game(created.game_id).await.unwrap();
    assert_eq!(game.game_id, created.game_id);
    assert_eq!(game.player_initials, "ABC");
    assert_eq!(game.score, request.score);
    assert_eq!(game.best_word, request.best_word);
    assert_eq!(game.history, request.history);
    assert_eq!(game.played_at.millisecond() as i64 * 1_000_000, game.played_at.nanosecond() as i64);
}

#[tokio::test]
async fn leaderboards_are_scoped_to_the_reference_day() {
    let server = start_server().await;
    let today_game = server.api.save_game(cat_game("TOD")).await.unwrap();

    let yesterday = calendar::today().previous_day().unwrap();
    let old = GameRecordEntity {
        game_id: Uuid::new_v4(),
        player_initials: "YES".into(),
        score: 50,
        best_word: None,
        history: GameHistory::new(),
        played_at: calendar::day_start(yesterday) + Duration::hours(12),
    };
    server.store.insert_game(old.clone()).await.unwrap();

    let today = server.api.top_today().await.unwrap();
    assert_eq!(today.date, calendar::today().to_string());
    assert_eq!(today.games.len(), 1);
    assert_eq!(today.games[0].game_id, today_game.game_id);

    let previous = server.api.top_yesterday().await.unwrap();
    assert_eq!(previous.games.len(), 1);
    assert_eq!(previous.games[0].game_id, old.game_id);
}

#[tokio::test]
async fn creation_answers_created() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/api/games", server.addr))
        .json(&cat_game("NEW"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let letters: Vec<String> = generate_sequence(40)
        .into_iter()
        .map(|letter| letter.to_string())
        .collect();
    let response = client
        .post(format!("http://{}/api/letters", server.addr))
        .json(&CreateSequenceRequest {
            date: calendar::today().to_string(),
            letters,
        })
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn unknown_game_is_not_found() {
    let server = start_server().await;
    let err = server.api.game(Uuid::new_v4()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn malformed_games_are_rejected() {
    let server = start_server().await;

    let err = server.api.save_game(cat_game("AB1")).await.unwrap_err();
    assert_eq!(status_of(&err), Some(StatusCode::BAD_REQUEST));

    let mut tampered = cat_game("ABC");
    tampered.history = serde_json::from_value(serde_json::json!({
        "events": [{ "type": "invalid", "word": "XYZ", "points": -16 }],
        "validPoints": 0,
        "invalidPoints": -1,
        "dropPoints": 0
    }))
    .unwrap();
    let err = server.api.save_game(tampered).await.unwrap_err();
    assert_eq!(status_of(&err), Some(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn todays_letters_come_from_the_stored_sequence() {
    let server = start_server().await;

    let err = server.api.today_letters().await.unwrap_err();
    assert!(err.is_not_found());

    let letters: Vec<String> = generate_sequence(40)
        .into_iter()
        .map(|letter| letter.to_string())
        .collect();
    let created = server
        .api
        .create_sequence(CreateSequenceRequest {
            date: calendar::today().to_string(),
            letters: letters.clone(),
        })
        .await
        .unwrap();

    let today = server.api.today_letters().await.unwrap();
    assert_eq!(today.sequence_id, created.sequence.id);
    let served: Vec<String> = today.letters.iter().map(ToString::to_string).collect();
    assert_eq!(served, letters);
    assert_eq!(today.reference_date, calendar::day_start(calendar::today()));

    let duplicate = server
        .api
        .create_sequence(CreateSequenceRequest {
            date: calendar::today().to_string(),
            letters,
        })
        .await
        .unwrap_err();
    assert_eq!(status_of(&duplicate), Some(StatusCode::CONFLICT));
}

#[tokio::test]
async fn short_sequences_are_rejected() {
    let server = start_server().await;
    let err = server
        .api
        .create_sequence(CreateSequenceRequest {
            date: calendar::today().to_string(),
            letters: vec!["A".into(); 10],
        })
        .await
        .unwrap_err();
    assert_eq!(status_of(&err), Some(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn games_are_listed_newest_first() {
    let server = start_server().await;
    let first = server.api.save_game(cat_game("ONE")).await.unwrap();
    let second = server.api.save_game(cat_game("TWO")).await.unwrap();

    let page = server.api.list_games(1, 1).await.unwrap();
    assert_eq!(page.pagination.total_games, 2);
    assert!(page.pagination.has_next_page);
    let listed = page.games[0].game_id;
    assert!(listed == second.game_id || listed == first.game_id);
}

#[tokio::test]
async fn healthcheck_reports_ok() {
    let server = start_server().await;
    let health: HealthResponse = reqwest::get(format!("http://{}/healthcheck", server.addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(health.is_ok());
}
