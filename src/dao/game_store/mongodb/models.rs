use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::MongoDaoError;
use crate::{
    dao::models::{GameRecordEntity, LetterSequenceEntity},
    game::{history::GameHistory, letters::Letter, scoring::BestWord},
};

/// Document stored in the `games` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoGameDocument {
    game_id: String,
    player_initials: String,
    score: i32,
    #[serde(default)]
    best_word: Option<BestWord>,
    history: GameHistory,
    played_at: DateTime,
}

impl From<GameRecordEntity> for MongoGameDocument {
    fn from(value: GameRecordEntity) -> Self {
        Self {
            game_id: value.game_id.to_string(),
            player_initials: value.player_initials,
            score: value.score,
            best_word: value.best_word,
            history: value.history,
            played_at: to_bson_datetime(value.played_at),
        }
    }
}

impl TryFrom<MongoGameDocument> for GameRecordEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoGameDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            game_id: parse_uuid(&value.game_id)?,
            player_initials: value.player_initials,
            score: value.score,
            best_word: value.best_word,
            history: value.history,
            played_at: from_bson_datetime(value.played_at)?,
        })
    }
}

/// Document stored in the `lettersequences` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoSequenceDocument {
    #[serde(rename = "_id")]
    id: String,
    date: DateTime,
    letters: Vec<Letter>,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<LetterSequenceEntity> for MongoSequenceDocument {
    fn from(value: LetterSequenceEntity) -> Self {
        Self {
            id: value.id.to_string(),
            date: to_bson_datetime(value.date),
            letters: value.letters,
            created_at: to_bson_datetime(value.created_at),
            updated_at: to_bson_datetime(value.updated_at),
        }
    }
}

impl TryFrom<MongoSequenceDocument> for LetterSequenceEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoSequenceDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&value.id)?,
            date: from_bson_datetime(value.date)?,
            letters: value.letters,
            created_at: from_bson_datetime(value.created_at)?,
            updated_at: from_bson_datetime(value.updated_at)?,
        })
    }
}

/// BSON date at millisecond precision.
pub fn to_bson_datetime(at: OffsetDateTime) -> DateTime {
    let millis = at.unix_timestamp_nanos() / 1_000_000;
    DateTime::from_millis(i64::try_from(millis).unwrap_or(i64::MAX))
}

fn from_bson_datetime(at: DateTime) -> Result<OffsetDateTime, MongoDaoError> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(at.timestamp_millis()) * 1_000_000)
        .map_err(|err| MongoDaoError::Malformed {
            reason: err.to_string(),
        })
}

fn parse_uuid(raw: &str) -> Result<Uuid, MongoDaoError> {
    Uuid::parse_str(raw).map_err(|err| MongoDaoError::Malformed {
        reason: format!("invalid id `{raw}`: {err}"),
    })
}

/// Filter matching one game by identifier.
pub fn game_filter(id: Uuid) -> Document {
    doc! { "gameId": id.to_string() }
}

/// Filter matching one sequence by identifier.
pub fn sequence_filter(id: Uuid) -> Document {
    doc! { "_id": id.to_string() }
}
