use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;
use uuid::Uuid;

/// Result alias for MongoDB store operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Server error code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11_000;

/// Failures of the MongoDB backend, mapped onto [`StorageError`](crate::dao::storage::StorageError).
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// The connection string could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// The rejected URI.
        uri: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The driver refused the client options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The server never answered the startup ping.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Pings tried before giving up.
        attempts: u32,
        /// Error of the last ping.
        #[source]
        source: MongoError,
    },
    /// A periodic ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// An index could not be created.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection holding the index.
        collection: &'static str,
        /// Index name.
        index: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Inserting a game failed.
    #[error("failed to save game `{id}`")]
    SaveGame {
        /// Game identifier.
        id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Reading a game failed.
    #[error("failed to load game `{id}`")]
    LoadGame {
        /// Game identifier.
        id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A listing or leaderboard query failed.
    #[error("failed to query games")]
    QueryGames {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Deleting expired documents failed.
    #[error("failed to delete expired {collection}")]
    Purge {
        /// Collection being purged.
        collection: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The date already has a letter sequence.
    #[error("a letter sequence already exists for {date}")]
    DuplicateDate {
        /// The contested day.
        date: time::Date,
    },
    /// Writing a letter sequence failed.
    #[error("failed to save letter sequence `{id}`")]
    SaveSequence {
        /// Sequence identifier.
        id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Reading letter sequences failed.
    #[error("failed to load letter sequences")]
    LoadSequences {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Deleting a letter sequence failed.
    #[error("failed to delete letter sequence `{id}`")]
    DeleteSequence {
        /// Sequence identifier.
        id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A stored document could not be turned back into a record.
    #[error("stored document is malformed: {reason}")]
    Malformed {
        /// What was wrong with it.
        reason: String,
    },
}

/// Whether `err` is a unique index violation.
pub fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE
    )
}
