use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::LetterSequenceEntity, dto::validation::validate_sequence_letters,
    game::letters::Letter,
};

/// Letters a player receives for the current reference day.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodayLettersResponse {
    /// Always `true` on success.
    pub success: bool,
    /// Letters in arrival order.
    #[schema(value_type = Vec<String>)]
    pub letters: Vec<Letter>,
    /// Identifier of the stored sequence.
    pub sequence_id: Uuid,
    /// Midnight of the reference day.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub reference_date: OffsetDateTime,
}

/// A stored daily sequence.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LetterSequenceDto {
    /// Sequence identifier.
    pub id: Uuid,
    /// Reference-day midnight the sequence belongs to.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub date: OffsetDateTime,
    /// Letters in arrival order.
    #[schema(value_type = Vec<String>)]
    pub letters: Vec<Letter>,
    /// When the sequence was first stored.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
    /// When the sequence was last changed.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: OffsetDateTime,
}

impl From<LetterSequenceEntity> for LetterSequenceDto {
    fn from(value: LetterSequenceEntity) -> Self {
        Self {
            id: value.id,
            date: value.date,
            letters: value.letters,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// Envelope of a single sequence.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SequenceResponse {
    /// Always `true` on success.
    pub success: bool,
    /// The sequence.
    pub sequence: LetterSequenceDto,
}

/// Envelope of the sequence listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SequenceListResponse {
    /// Always `true` on success.
    pub success: bool,
    /// Sequences, latest date first.
    pub sequences: Vec<LetterSequenceDto>,
}

/// Body of `POST /letters`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateSequenceRequest {
    /// `YYYY-MM-DD` or an RFC 3339 timestamp; only the reference-day date is kept.
    pub date: String,
    /// Single letters A-Z, either case.
    #[validate(
        length(min = 30, max = 100, message = "a sequence holds between 30 and 100 letters"),
        custom(function = "validate_sequence_letters")
    )]
    pub letters: Vec<String>,
}

/// Body of `PUT /letters/{id}`; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct UpdateSequenceRequest {
    /// New date, `YYYY-MM-DD` or an RFC 3339 timestamp.
    #[serde(default)]
    pub date: Option<String>,
    /// Replacement letters.
    #[serde(default)]
    #[validate(
        length(min = 30, max = 100, message = "a sequence holds between 30 and 100 letters"),
        custom(function = "validate_sequence_letters")
    )]
    pub letters: Option<Vec<String>>,
}

/// Generic acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActionResponse {
    /// Whether the action succeeded.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
}

impl ActionResponse {
    /// Successful acknowledgement carrying `message`.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
