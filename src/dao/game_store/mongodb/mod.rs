/// Connection settings.
pub mod config;
mod connection;
mod error;
mod models;
/// Store implementation over the two collections.
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoGameStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::DuplicateDate { date } => {
                StorageError::duplicate(format!("a letter sequence already exists for {date}"))
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
