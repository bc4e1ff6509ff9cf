use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

/// Database used when none is configured.
pub const DEFAULT_DATABASE: &str = "wordy3";

/// Connection settings of the MongoDB store.
#[derive(Clone)]
pub struct MongoConfig {
    /// Driver options parsed from the connection string.
    pub options: ClientOptions,
    /// Database holding the collections.
    pub database_name: String,
    /// Age after which games and sequences are dropped by the TTL indexes.
    pub retention_days: u32,
}

impl MongoConfig {
    /// Parse `uri` and pick `db_name`, falling back to [`DEFAULT_DATABASE`].
    pub async fn from_uri(uri: &str, db_name: Option<&str>, retention_days: u32) -> MongoResult<Self> {
        let database_name = db_name.unwrap_or(DEFAULT_DATABASE).to_owned();
        let mut options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;
        if options.app_name.is_none() {
            options.app_name = Some("wordy-back".to_owned());
        }

        Ok(Self {
            options,
            database_name,
            retention_days,
        })
    }
}
