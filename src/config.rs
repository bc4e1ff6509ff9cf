//! Application-level configuration loading: gameplay constants, server policy and dictionary providers.

use std::{collections::BTreeMap, env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, DurationSeconds, serde_as};
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/wordy.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "WORDY_CONFIG_PATH";

/// Free Dictionary API entry point used when no provider is configured.
pub const DEFAULT_DICTIONARY_URL: &str = "https://api.dictionaryapi.dev/api/v2/entries/en";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Tray, timing and scoring constants.
    pub game: GameConfig,
    /// Leaderboard, retention and sequence-generation policy.
    pub server: ServerConfig,
    /// Dictionary provider settings.
    pub dictionary: DictionaryConfig,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                Ok(config) => match config.game.check() {
                    Ok(()) => {
                        info!(path = %path.display(), "loaded configuration");
                        config
                    }
                    Err(reason) => {
                        warn!(
                            path = %path.display(),
                            %reason,
                            "inconsistent game settings; falling back to defaults"
                        );
                        Self::default()
                    }
                },
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
/// Gameplay constants for the tray, its timers and the scoring rules.
pub struct GameConfig {
    /// Shortest word that may be submitted.
    pub min_word_length: usize,
    /// Floor the tray is topped up to whenever letters remain.
    pub min_letters: usize,
    /// Tray capacity; arrivals pause at this size.
    pub max_letters: usize,
    /// Delay between two regular arrivals.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub letter_drop_interval: Duration,
    /// Age at which the oldest letter turns to warning.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub warning_threshold: Duration,
    /// Age at which the oldest letter expires.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub danger_threshold: Duration,
    /// Period of the aging ticker.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub aging_tick: Duration,
    /// How long a freshly arrived letter is reported as arriving.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub arrival_highlight: Duration,
    /// Upper bound on a dictionary lookup before it counts as a transport error.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub oracle_timeout: Duration,
    /// Length multiplier steps keyed by word length.
    pub length_multipliers: BTreeMap<usize, f64>,
    /// Streak multiplier at the start and after any reset.
    pub streak_base: f64,
    /// Streak gained per valid word.
    pub streak_increment: f64,
    /// Streak cap.
    pub streak_max: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_word_length: 3,
            min_letters: 4,
            max_letters: 7,
            letter_drop_interval: Duration::from_millis(3_000),
            warning_threshold: Duration::from_millis(3_000),
            danger_threshold: Duration::from_millis(6_000),
            aging_tick: Duration::from_millis(100),
            arrival_highlight: Duration::from_millis(300),
            oracle_timeout: Duration::from_secs(5),
            length_multipliers: BTreeMap::from([(5, 1.5), (6, 2.0), (7, 3.0)]),
            streak_base: 1.0,
            streak_increment: 0.1,
            streak_max: 2.0,
        }
    }
}

impl GameConfig {
    /// Reject settings the tray cannot run with.
    pub fn check(&self) -> Result<(), String> {
        if self.min_letters == 0 || self.min_letters > self.max_letters {
            return Err(format!(
                "min_letters ({}) must be between 1 and max_letters ({})",
                self.min_letters, self.max_letters
            ));
        }
        if self.warning_threshold > self.danger_threshold {
            return Err("warning_threshold must not exceed danger_threshold".into());
        }
        if self.aging_tick.is_zero() {
            return Err("aging_tick must be positive".into());
        }
        if self.streak_base > self.streak_max {
            return Err("streak_base must not exceed streak_max".into());
        }
        Ok(())
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
/// Server-side policy for leaderboards, retention and daily sequences.
pub struct ServerConfig {
    /// Days a game record or letter sequence is kept before expiring.
    pub retention_days: u32,
    /// Size of the "today" leaderboard.
    pub today_top_limit: u32,
    /// Size of the "yesterday" leaderboard.
    pub yesterday_top_limit: u32,
    /// Page size used when a listing request does not specify one.
    pub default_page_size: u32,
    /// Largest page size a listing request may ask for.
    pub max_page_size: u32,
    /// How many upcoming days get a sequence generated ahead of time.
    pub sequences_ahead: u32,
    /// Length of generated daily sequences.
    pub sequence_length: usize,
    /// How often the maintenance task checks whether today's sweep already ran.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub maintenance_interval: Duration,
    /// Origin allowed by CORS; any origin when unset.
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            retention_days: 3,
            today_top_limit: 10,
            yesterday_top_limit: 20,
            default_page_size: 20,
            max_page_size: 100,
            sequences_ahead: 7,
            sequence_length: 55,
            maintenance_interval: Duration::from_secs(60 * 60),
            cors_origin: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
/// Dictionary providers consulted when validating words.
pub struct DictionaryConfig {
    /// Base URL of the primary lookup service; the word is appended as a path segment.
    pub primary_url: String,
    /// Optional second service queried when the primary does not know the word.
    pub backup_url: Option<String>,
    /// Newline-separated word list used instead of the HTTP providers when set.
    pub word_list_path: Option<PathBuf>,
    /// Headwords rejected even when a provider lists them.
    pub rejected_abbreviations: Vec<String>,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            primary_url: DEFAULT_DICTIONARY_URL.to_owned(),
            backup_url: None,
            word_list_path: None,
            rejected_abbreviations: [
                "PCP", "FBI", "CIA", "NASA", "ASAP", "DNA", "IRS", "ATM", "DVD", "HTML", "USB",
                "PDF", "UFO", "SMS", "RSVP",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let raw = r#"{
            "game": { "max_letters": 8, "letter_drop_interval": 2500 },
            "server": { "retention_days": 5 }
        }"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.game.max_letters, 8);
        assert_eq!(config.game.min_letters, 4);
        assert_eq!(config.game.letter_drop_interval, Duration::from_millis(2_500));
        assert_eq!(config.game.danger_threshold, Duration::from_secs(6));
        assert_eq!(config.server.retention_days, 5);
        assert_eq!(config.server.today_top_limit, 10);
        assert_eq!(config.dictionary, DictionaryConfig::default());
    }

    #[test]
    fn length_multipliers_parse_from_string_keys() {
        let raw = r#"{ "game": { "length_multipliers": { "5": 1.25, "8": 4.0 } } }"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.game.length_multipliers.get(&5), Some(&1.25));
        assert_eq!(config.game.length_multipliers.get(&8), Some(&4.0));
    }

    #[test]
    fn inconsistent_tray_bounds_are_rejected() {
        let config = GameConfig {
            min_letters: 9,
            ..GameConfig::default()
        };
        assert!(config.check().is_err());
        assert!(GameConfig::default().check().is_ok());
    }
}
