//! Process-local store used for development, offline play and tests.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{GameRecordEntity, GamePageEntity, LetterSequenceEntity},
    storage::{StorageError, StorageResult},
};

/// [`GameStore`] keeping everything in concurrent maps.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    games: DashMap<Uuid, GameRecordEntity>,
    sequences: DashMap<Uuid, LetterSequenceEntity>,
    /// Serialises sequence writes so the one-per-date rule holds.
    sequence_writes: Mutex<()>,
}

impl MemoryGameStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn date_taken(&self, date: OffsetDateTime, except: Option<Uuid>) -> bool {
        self.inner
            .sequences
            .iter()
            .any(|entry| entry.date == date && Some(entry.id) != except)
    }
}

impl GameStore for MemoryGameStore {
    fn insert_game(&self, game: GameRecordEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.games.insert(game.game_id, game);
            Ok(())
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.games.get(&id).map(|entry| entry.clone())) })
    }

    fn list_games(&self, skip: u64, limit: u64) -> BoxFuture<'static, StorageResult<GamePageEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let mut games: Vec<GameRecordEntity> = store
                .inner
                .games
                .iter()
                .map(|entry| entry.value().clone())
                .collect();
            games.sort_by(|a, b| b.played_at.cmp(&a.played_at));
            let total = games.len() as u64;
            let games = games
                .into_iter()
                .skip(usize::try_from(skip).unwrap_or(usize::MAX))
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .collect();
            Ok(GamePageEntity { games, total })
        })
    }

    fn top_games(
        &self,
        from: OffsetDateTime,
        to: OffsetDateTime,
        limit: u64,
    ) -> BoxFuture<'static, StorageResult<Vec<GameRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut games: Vec<GameRecordEntity> = store
                .inner
                .games
                .iter()
                .filter(|entry| entry.played_at >= from && entry.played_at < to)
                .map(|entry| entry.value().clone())
                .collect();
            games.sort_by(|a, b| {
                b.score
                    .cmp(&a.score)
                    .then_with(|| a.played_at.cmp(&b.played_at))
            });
            games.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            Ok(games)
        })
    }

    fn delete_games_before(&self, cutoff: OffsetDateTime) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            let mut removed = 0;
            store.inner.games.retain(|_, game| {
                let keep = game.played_at >= cutoff;
                removed += u64::from(!keep);
                keep
            });
            Ok(removed)
        })
    }

    fn insert_sequence(
        &self,
        sequence: LetterSequenceEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let _guard = store.inner.sequence_writes.lock().await;
            if store.date_taken(sequence.date, None) {
                return Err(StorageError::duplicate(format!(
                    "a letter sequence already exists for {}",
                    sequence.date.date()
                )));
            }
            store.inner.sequences.insert(sequence.id, sequence);
            Ok(())
        })
    }

    fn find_sequence(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<LetterSequenceEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.sequences.get(&id).map(|entry| entry.clone())) })
    }

    fn find_sequence_by_date(
        &self,
        date: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<Option<LetterSequenceEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .sequences
                .iter()
                .find(|entry| entry.date == date)
                .map(|entry| entry.value().clone()))
        })
    }

    fn list_sequences(
        &self,
        limit: u64,
    ) -> BoxFuture<'static, StorageResult<Vec<LetterSequenceEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut sequences: Vec<LetterSequenceEntity> = store
                .inner
                .sequences
                .iter()
                .map(|entry| entry.value().clone())
                .collect();
            sequences.sort_by(|a, b| b.date.cmp(&a.date));
            sequences.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            Ok(sequences)
        })
    }

    fn update_sequence(
        &self,
        sequence: LetterSequenceEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let _guard = store.inner.sequence_writes.lock().await;
            if !store.inner.sequences.contains_key(&sequence.id) {
                return Ok(false);
            }
            if store.date_taken(sequence.date, Some(sequence.id)) {
                return Err(StorageError::duplicate(format!(
                    "another letter sequence already exists for {}",
                    sequence.date.date()
                )));
            }
            store.inner.sequences.insert(sequence.id, sequence);
            Ok(true)
        })
    }

    fn delete_sequence(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.sequences.remove(&id).is_some()) })
    }

    fn delete_sequences_before(
        &self,
        cutoff: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            let mut removed = 0;
            store.inner.sequences.retain(|_, sequence| {
                let keep = sequence.date >= cutoff;
                removed += u64::from(!keep);
                keep
            });
            Ok(removed)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
