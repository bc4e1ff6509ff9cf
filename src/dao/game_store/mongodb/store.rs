use std::{sync::Arc, time::Duration};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    options::IndexOptions,
};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult, is_duplicate_key},
    models::{
        MongoGameDocument, MongoSequenceDocument, game_filter, sequence_filter, to_bson_datetime,
    },
};
use crate::dao::{
    game_store::GameStore,
    models::{GamePageEntity, GameRecordEntity, LetterSequenceEntity},
    storage::StorageResult,
};

const GAME_COLLECTION_NAME: &str = "games";
const SEQUENCE_COLLECTION_NAME: &str = "lettersequences";
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// [`GameStore`] backed by the `games` and `lettersequences` collections.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let retention =
            Duration::from_secs(u64::from(self.inner.config.retention_days) * SECONDS_PER_DAY);

        let games = self.games().await;
        let indexes = [
            ("playedAt_ttl", doc! { "playedAt": 1 }, Some(retention), false),
            ("score_desc", doc! { "score": -1 }, None, false),
            ("gameId_unique", doc! { "gameId": 1 }, None, true),
        ];
        for (name, keys, expire_after, unique) in indexes {
            games
                .create_index(index(name, keys, expire_after, unique))
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection: GAME_COLLECTION_NAME,
                    index: name,
                    source,
                })?;
        }

        let sequences = self.sequences().await;
        // One index carries both the one-per-date rule and the expiry.
        let name = "date_unique_ttl";
        sequences
            .create_index(index(name, doc! { "date": 1 }, Some(retention), true))
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SEQUENCE_COLLECTION_NAME,
                index: name,
                source,
            })?;

        Ok(())
    }

    async fn games(&self) -> Collection<MongoGameDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoGameDocument>(GAME_COLLECTION_NAME)
    }

    async fn sequences(&self) -> Collection<MongoSequenceDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoSequenceDocument>(SEQUENCE_COLLECTION_NAME)
    }

    async fn insert_game(&self, game: GameRecordEntity) -> MongoResult<()> {
        let id = game.game_id;
        let document: MongoGameDocument = game.into();
        self.games()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::SaveGame { id, source })?;
        Ok(())
    }

    async fn find_game(&self, id: Uuid) -> MongoResult<Option<GameRecordEntity>> {
        let document = self
            .games()
            .await
            .find_one(game_filter(id))
            .await
            .map_err(|source| MongoDaoError::LoadGame { id, source })?;
        document.map(TryInto::try_into).transpose()
    }

    async fn list_games(&self, skip: u64, limit: u64) -> MongoResult<GamePageEntity> {
        let collection = self.games().await;
        let total = collection
            .count_documents(doc! {})
            .await
            .map_err(|source| MongoDaoError::QueryGames { source })?;
        let documents: Vec<MongoGameDocument> = collection
            .find(doc! {})
            .sort(doc! { "playedAt": -1 })
            .skip(skip)
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await
            .map_err(|source| MongoDaoError::QueryGames { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::QueryGames { source })?;

        let games = documents
            .into_iter()
            .map(TryInto::try_into)
            .collect::<MongoResult<Vec<_>>>()?;
        Ok(GamePageEntity { games, total })
    }

    async fn top_games(
        &self,
        from: OffsetDateTime,
        to: OffsetDateTime,
        limit: u64,
    ) -> MongoResult<Vec<GameRecordEntity>> {
        let filter = doc! {
            "playedAt": { "$gte": to_bson_datetime(from), "$lt": to_bson_datetime(to) }
        };
        let documents: Vec<MongoGameDocument> = self
            .games()
            .await
            .find(filter)
            .sort(doc! { "score": -1, "playedAt": 1 })
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await
            .map_err(|source| MongoDaoError::QueryGames { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::QueryGames { source })?;

        documents.into_iter().map(TryInto::try_into).collect()
    }

    async fn delete_games_before(&self, cutoff: OffsetDateTime) -> MongoResult<u64> {
        let result = self
            .games()
            .await
            .delete_many(doc! { "playedAt": { "$lt": to_bson_datetime(cutoff) } })
            .await
            .map_err(|source| MongoDaoError::Purge {
                collection: GAME_COLLECTION_NAME,
                source,
            })?;
        Ok(result.deleted_count)
    }

    async fn insert_sequence(&self, sequence: LetterSequenceEntity) -> MongoResult<()> {
        let (id, date) = (sequence.id, sequence.date.date());
        let document: MongoSequenceDocument = sequence.into();
        self.sequences()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| {
                if is_duplicate_key(&source) {
                    MongoDaoError::DuplicateDate { date }
                } else {
                    MongoDaoError::SaveSequence { id, source }
                }
            })?;
        Ok(())
    }

    async fn find_sequence_where(
        &self,
        filter: Document,
    ) -> MongoResult<Option<LetterSequenceEntity>> {
        let document = self
            .sequences()
            .await
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::LoadSequences { source })?;
        document.map(TryInto::try_into).transpose()
    }

    async fn list_sequences(&self, limit: u64) -> MongoResult<Vec<LetterSequenceEntity>> {
        let documents: Vec<MongoSequenceDocument> = self
            .sequences()
            .await
            .find(doc! {})
            .sort(doc! { "date": -1 })
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await
            .map_err(|source| MongoDaoError::LoadSequences { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadSequences { source })?;

        documents.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_sequence(&self, sequence: LetterSequenceEntity) -> MongoResult<bool> {
        let (id, date) = (sequence.id, sequence.date.date());
        let document: MongoSequenceDocument = sequence.into();
        let result = self
            .sequences()
            .await
            .replace_one(sequence_filter(id), &document)
            .await
            .map_err(|source| {
                if is_duplicate_key(&source) {
                    MongoDaoError::DuplicateDate { date }
                } else {
                    MongoDaoError::SaveSequence { id, source }
                }
            })?;
        Ok(result.matched_count > 0)
    }

    async fn delete_sequence(&self, id: Uuid) -> MongoResult<bool> {
        let result = self
            .sequences()
            .await
            .delete_one(sequence_filter(id))
            .await
            .map_err(|source| MongoDaoError::DeleteSequence { id, source })?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_sequences_before(&self, cutoff: OffsetDateTime) -> MongoResult<u64> {
        let result = self
            .sequences()
            .await
            .delete_many(doc! { "date": { "$lt": to_bson_datetime(cutoff) } })
            .await
            .map_err(|source| MongoDaoError::Purge {
                collection: SEQUENCE_COLLECTION_NAME,
                source,
            })?;
        Ok(result.deleted_count)
    }
}

fn index(
    name: &str,
    keys: Document,
    expire_after: Option<Duration>,
    unique: bool,
) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .name(Some(name.to_owned()))
                .expire_after(expire_after)
                .unique(unique.then_some(true))
                .build(),
        )
        .build()
}

impl GameStore for MongoGameStore {
    fn insert_game(&self, game: GameRecordEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_game(game).await.map_err(Into::into) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(id).await.map_err(Into::into) })
    }

    fn list_games(&self, skip: u64, limit: u64) -> BoxFuture<'static, StorageResult<GamePageEntity>> {
        let store = self.clone();
        Box::pin(async move { store.list_games(skip, limit).await.map_err(Into::into) })
    }

    fn top_games(
        &self,
        from: OffsetDateTime,
        to: OffsetDateTime,
        limit: u64,
    ) -> BoxFuture<'static, StorageResult<Vec<GameRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.top_games(from, to, limit).await.map_err(Into::into) })
    }

    fn delete_games_before(&self, cutoff: OffsetDateTime) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.delete_games_before(cutoff).await.map_err(Into::into) })
    }

    fn insert_sequence(
        &self,
        sequence: LetterSequenceEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_sequence(sequence).await.map_err(Into::into) })
    }

    fn find_sequence(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<LetterSequenceEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_sequence_where(sequence_filter(id))
                .await
                .map_err(Into::into)
        })
    }

    fn find_sequence_by_date(
        &self,
        date: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<Option<LetterSequenceEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_sequence_where(doc! { "date": to_bson_datetime(date) })
                .await
                .map_err(Into::into)
        })
    }

    fn list_sequences(
        &self,
        limit: u64,
    ) -> BoxFuture<'static, StorageResult<Vec<LetterSequenceEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_sequences(limit).await.map_err(Into::into) })
    }

    fn update_sequence(
        &self,
        sequence: LetterSequenceEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.update_sequence(sequence).await.map_err(Into::into) })
    }

    fn delete_sequence(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_sequence(id).await.map_err(Into::into) })
    }

    fn delete_sequences_before(
        &self,
        cutoff: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_sequences_before(cutoff)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
