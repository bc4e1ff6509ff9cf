//! Dictionary oracles: the Free Dictionary HTTP service, a static word list and a fallback chain.

use std::{collections::HashSet, fs, io, path::Path, sync::Arc};

use anyhow::Context;
use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::DictionaryConfig;

/// Words bundled with the crate for offline play.
const BUILTIN_WORDS: &str = include_str!("../../data/words.txt");

/// Definition markers of headwords that only exist as abbreviations.
const ABBREVIATION_MARKERS: [&str; 3] = ["abbreviation", "initialism", "acronym"];

/// Failures that prevent a dictionary from answering.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The lookup request could not be sent.
    #[error("failed to reach dictionary `{provider}`")]
    RequestSend {
        /// Provider name, as used in logs.
        provider: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The provider answered with something other than found / not found.
    #[error("unexpected dictionary response status {status} from `{provider}`")]
    RequestStatus {
        /// Provider name, as used in logs.
        provider: String,
        /// Status the provider answered with.
        status: StatusCode,
    },
    /// No answer within the allotted time.
    #[error("dictionary lookup timed out after {0:?}")]
    Timeout(std::time::Duration),
    /// Building the HTTP client failed.
    #[error("failed to build dictionary client")]
    ClientBuilder {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
}

/// Anything able to tell whether a word exists.
pub trait DictionaryOracle: Send + Sync {
    /// `Ok(true)` when the word is accepted, `Ok(false)` when it is not, `Err` when unknown.
    fn is_valid_word(&self, word: &str) -> BoxFuture<'static, Result<bool, OracleError>>;
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    meanings: Vec<Meaning>,
}

#[derive(Debug, Deserialize)]
struct Meaning {
    #[serde(default, rename = "partOfSpeech")]
    part_of_speech: String,
    #[serde(default)]
    definitions: Vec<Definition>,
}

#[derive(Debug, Deserialize)]
struct Definition {
    #[serde(default)]
    definition: String,
}

fn mentions_abbreviation(text: &str) -> bool {
    let text = text.to_ascii_lowercase();
    ABBREVIATION_MARKERS
        .iter()
        .any(|marker| text.contains(marker))
}

/// Whether every sense of every entry only describes an abbreviation.
fn only_abbreviations(entries: &[Entry]) -> bool {
    let mut senses = entries.iter().flat_map(|entry| &entry.meanings).peekable();
    if senses.peek().is_none() {
        return false;
    }
    senses.all(|meaning| {
        mentions_abbreviation(&meaning.part_of_speech)
            || (!meaning.definitions.is_empty()
                && meaning
                    .definitions
                    .iter()
                    .all(|definition| mentions_abbreviation(&definition.definition)))
    })
}

/// Client of a Free Dictionary style service: `GET {base}/{word}` answers 200 or 404.
#[derive(Clone)]
pub struct FreeDictionaryClient {
    client: Client,
    base_url: Arc<str>,
    rejected: Arc<HashSet<String>>,
}

impl FreeDictionaryClient {
    /// Client for `base_url`, refusing the given headwords.
    pub fn new(
        base_url: &str,
        rejected: impl IntoIterator<Item = String>,
    ) -> Result<Self, OracleError> {
        let client = Client::builder()
            .build()
            .map_err(|source| OracleError::ClientBuilder { source })?;
        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            rejected: Arc::new(
                rejected
                    .into_iter()
                    .map(|word| word.to_ascii_uppercase())
                    .collect(),
            ),
        })
    }

    /// Base URL of the provider.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn lookup(self, word: String) -> Result<bool, OracleError> {
        let upper = word.to_ascii_uppercase();
        let url = format!("{}/{}", self.base_url, word.to_ascii_lowercase());
        let response =
            self.client
                .get(&url)
                .send()
                .await
                .map_err(|source| OracleError::RequestSend {
                    provider: self.base_url.to_string(),
                    source,
                })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            StatusCode::OK => {
                if self.rejected.contains(&upper) {
                    debug!(word = %upper, "rejecting listed abbreviation");
                    return Ok(false);
                }
                match response.json::<Vec<Entry>>().await {
                    Ok(entries) if only_abbreviations(&entries) => {
                        debug!(word = %upper, "rejecting abbreviation-only entry");
                        Ok(false)
                    }
                    Ok(_) => Ok(true),
                    Err(err) => {
                        // A 200 means the headword exists even if the body is unexpected.
                        warn!(word = %upper, error = %err, "unreadable dictionary entry");
                        Ok(true)
                    }
                }
            }
            status => Err(OracleError::RequestStatus {
                provider: self.base_url.to_string(),
                status,
            }),
        }
    }
}

impl DictionaryOracle for FreeDictionaryClient {
    fn is_valid_word(&self, word: &str) -> BoxFuture<'static, Result<bool, OracleError>> {
        Box::pin(self.clone().lookup(word.to_owned()))
    }
}

/// Fixed set of accepted words, compared case-insensitively.
#[derive(Debug, Clone)]
pub struct WordListOracle {
    words: Arc<HashSet<String>>,
}

impl WordListOracle {
    /// Accept exactly `words`.
    pub fn new(words: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self {
            words: Arc::new(
                words
                    .into_iter()
                    .map(|word| word.as_ref().trim().to_ascii_uppercase())
                    .filter(|word| !word.is_empty())
                    .collect(),
            ),
        }
    }

    /// The list shipped with the crate.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_WORDS.lines())
    }

    /// One word per line; blank lines are skipped.
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(Self::new(contents.lines()))
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the list holds no word.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.to_ascii_uppercase())
    }
}

impl DictionaryOracle for WordListOracle {
    fn is_valid_word(&self, word: &str) -> BoxFuture<'static, Result<bool, OracleError>> {
        let found = self.contains(word);
        Box::pin(async move { Ok(found) })
    }
}

/// Asks a primary oracle, then a backup when the primary does not accept the word.
///
/// A word is valid when either accepts it. An error is reported only when no provider
/// accepted the word and at least one of them failed.
pub struct ChainedOracle {
    primary: Arc<dyn DictionaryOracle>,
    backup: Arc<dyn DictionaryOracle>,
}

impl ChainedOracle {
    /// Chain `primary` with a `backup` consulted when the primary does not accept the word.
    pub fn new(primary: Arc<dyn DictionaryOracle>, backup: Arc<dyn DictionaryOracle>) -> Self {
        Self { primary, backup }
    }
}

impl DictionaryOracle for ChainedOracle {
    fn is_valid_word(&self, word: &str) -> BoxFuture<'static, Result<bool, OracleError>> {
        let primary = self.primary.is_valid_word(word);
        let backup = self.backup.clone();
        let word = word.to_owned();
        Box::pin(async move {
            let first = primary.await;
            if let Ok(true) = first {
                return Ok(true);
            }
            if let Err(err) = &first {
                warn!(error = %err, "primary dictionary failed; trying backup");
            }
            match (first, backup.is_valid_word(&word).await) {
                (_, Ok(true)) => Ok(true),
                (Ok(_), Ok(false)) => Ok(false),
                (Err(err), _) | (_, Err(err)) => Err(err),
            }
        })
    }
}

/// Build the oracle described by the configuration.
///
/// A word list replaces the HTTP providers entirely; otherwise the primary service is used,
/// chained to the backup service when one is configured.
pub fn from_config(config: &DictionaryConfig) -> anyhow::Result<Arc<dyn DictionaryOracle>> {
    if let Some(path) = &config.word_list_path {
        let list = WordListOracle::from_file(path)
            .with_context(|| format!("failed to read word list `{}`", path.display()))?;
        return Ok(Arc::new(list));
    }

    let primary = Arc::new(FreeDictionaryClient::new(
        &config.primary_url,
        config.rejected_abbreviations.iter().cloned(),
    )?);
    match &config.backup_url {
        Some(backup_url) => {
            let backup = Arc::new(FreeDictionaryClient::new(
                backup_url,
                config.rejected_abbreviations.iter().cloned(),
            )?);
            Ok(Arc::new(ChainedOracle::new(primary, backup)))
        }
        None => Ok(primary),
    }
}
