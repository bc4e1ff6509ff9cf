/// Lock-free in-memory backend.
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::{GameRecordEntity, GamePageEntity, LetterSequenceEntity};
use crate::dao::storage::StorageResult;

/// Abstraction over the persistence layer for game records and daily letter sequences.
pub trait GameStore: Send + Sync {
    /// Store a finished game.
    fn insert_game(&self, game: GameRecordEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Look a game up by identifier.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecordEntity>>>;
    /// Most recent games first.
    fn list_games(&self, skip: u64, limit: u64) -> BoxFuture<'static, StorageResult<GamePageEntity>>;
    /// Games played in `[from, to)`, best score first; ties go to the earlier game.
    fn top_games(
        &self,
        from: OffsetDateTime,
        to: OffsetDateTime,
        limit: u64,
    ) -> BoxFuture<'static, StorageResult<Vec<GameRecordEntity>>>;
    /// Remove games played before `cutoff`; returns how many were removed.
    fn delete_games_before(&self, cutoff: OffsetDateTime) -> BoxFuture<'static, StorageResult<u64>>;

    /// Fails with [`StorageError::Duplicate`](crate::dao::storage::StorageError::Duplicate)
    /// when a sequence already exists for the same date.
    fn insert_sequence(&self, sequence: LetterSequenceEntity)
    -> BoxFuture<'static, StorageResult<()>>;
    /// Look a sequence up by identifier.
    fn find_sequence(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<LetterSequenceEntity>>>;
    /// Sequence whose normalized date is exactly `date`.
    fn find_sequence_by_date(
        &self,
        date: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<Option<LetterSequenceEntity>>>;
    /// Latest dates first.
    fn list_sequences(&self, limit: u64)
    -> BoxFuture<'static, StorageResult<Vec<LetterSequenceEntity>>>;
    /// Replace an existing sequence; returns `false` when the id is unknown.
    fn update_sequence(
        &self,
        sequence: LetterSequenceEntity,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Delete a sequence; returns `false` when the id is unknown.
    fn delete_sequence(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Remove sequences dated before `cutoff`; returns how many were removed.
    fn delete_sequences_before(
        &self,
        cutoff: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<u64>>;

    /// Cheap round trip proving the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
