use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::letters::{
        ActionResponse, CreateSequenceRequest, SequenceListResponse, SequenceResponse,
        TodayLettersResponse, UpdateSequenceRequest,
    },
    error::{AppError, ErrorBody},
    services::letter_service,
    state::SharedState,
};

/// Routes serving and administering the daily letter sequences.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/letters", get(list_sequences).post(create_sequence))
        .route("/letters/today", get(today_letters))
        .route(
            "/letters/{id}",
            get(get_sequence).put(update_sequence).delete(delete_sequence),
        )
}

/// Letters every player gets today.
#[utoipa::path(
    get,
    path = "/api/letters/today",
    tag = "letters",
    responses(
        (status = 200, description = "Today's sequence", body = TodayLettersResponse),
        (status = 404, description = "No sequence generated for today", body = ErrorBody)
    )
)]
pub async fn today_letters(
    State(state): State<SharedState>,
) -> Result<Json<TodayLettersResponse>, AppError> {
    Ok(Json(letter_service::today_letters(&state).await?))
}

/// The 30 latest sequences by date.
#[utoipa::path(
    get,
    path = "/api/letters",
    tag = "letters",
    responses((status = 200, description = "Stored sequences", body = SequenceListResponse))
)]
pub async fn list_sequences(
    State(state): State<SharedState>,
) -> Result<Json<SequenceListResponse>, AppError> {
    Ok(Json(letter_service::list_sequences(&state).await?))
}

/// One sequence by identifier.
#[utoipa::path(
    get,
    path = "/api/letters/{id}",
    tag = "letters",
    params(("id" = Uuid, Path, description = "Sequence identifier")),
    responses(
        (status = 200, description = "The sequence", body = SequenceResponse),
        (status = 404, description = "Unknown sequence", body = ErrorBody)
    )
)]
pub async fn get_sequence(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SequenceResponse>, AppError> {
    Ok(Json(letter_service::get_sequence(&state, id).await?))
}

/// Store a hand-made sequence for a day that has none.
#[utoipa::path(
    post,
    path = "/api/letters",
    tag = "letters",
    request_body = CreateSequenceRequest,
    responses(
        (status = 201, description = "Sequence stored", body = SequenceResponse),
        (status = 400, description = "Bad date or letters", body = ErrorBody),
        (status = 409, description = "The day already has a sequence", body = ErrorBody)
    )
)]
pub async fn create_sequence(
    State(state): State<SharedState>,
    Json(payload): Json<CreateSequenceRequest>,
) -> Result<(StatusCode, Json<SequenceResponse>), AppError> {
    let created = letter_service::create_sequence(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Change the date or letters of a sequence.
#[utoipa::path(
    put,
    path = "/api/letters/{id}",
    tag = "letters",
    params(("id" = Uuid, Path, description = "Sequence identifier")),
    request_body = UpdateSequenceRequest,
    responses(
        (status = 200, description = "Sequence updated", body = SequenceResponse),
        (status = 400, description = "Bad date or letters", body = ErrorBody),
        (status = 404, description = "Unknown sequence", body = ErrorBody),
        (status = 409, description = "Another sequence holds that date", body = ErrorBody)
    )
)]
pub async fn update_sequence(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSequenceRequest>,
) -> Result<Json<SequenceResponse>, AppError> {
    Ok(Json(
        letter_service::update_sequence(&state, id, payload).await?,
    ))
}

/// Remove a sequence.
#[utoipa::path(
    delete,
    path = "/api/letters/{id}",
    tag = "letters",
    params(("id" = Uuid, Path, description = "Sequence identifier")),
    responses(
        (status = 200, description = "Sequence deleted", body = ActionResponse),
        (status = 404, description = "Unknown sequence", body = ErrorBody)
    )
)]
pub async fn delete_sequence(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(letter_service::delete_sequence(&state, id).await?))
}
