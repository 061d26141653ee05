//! Application-level configuration loading, including the card deck seeded into new games.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::{dao::models::CardKindEntity, state::state_machine::LifecyclePolicy};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "RULETTE_BACK_CONFIG_PATH";

const DEFAULT_CACHE_MAX_AGE_MS: u64 = 500;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

/// One card template copied into every new game.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeckCard {
    /// Card variant.
    pub kind: CardKindEntity,
    /// Front text.
    pub front: String,
    /// Back text, only meaningful for rules.
    #[serde(default)]
    pub back: Option<String>,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// How long a cached snapshot is served before refetching.
    pub cache_max_age: Duration,
    /// Polling interval advertised to clients.
    pub poll_interval: Duration,
    /// Who may start and end games.
    pub lifecycle_policy: LifecyclePolicy,
    /// Upper bound on a single store write issued by an action.
    pub store_timeout: Duration,
    /// Cards seeded into new games.
    pub deck: Vec<DeckCard>,
}

/// Why a config file could not be used.
#[derive(Debug, Error)]
enum ConfigFileError {
    #[error("config file not found")]
    Missing,
    #[error("unreadable config file")]
    Read(#[source] std::io::Error),
    #[error("invalid config JSON")]
    Parse(#[source] serde_json::Error),
}

impl AppConfig {
    /// Read the JSON file named by `RULETTE_BACK_CONFIG_PATH` (or `config/app.json`).
    /// Any failure is logged and the built-in defaults are used instead.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match read_config_file(&path) {
            Ok(config) => {
                info!(
                    path = %path.display(),
                    deck_size = config.deck.len(),
                    policy = ?config.lifecycle_policy,
                    "loaded config"
                );
                config
            }
            Err(ConfigFileError::Missing) => {
                info!(path = %path.display(), "no config file; using defaults");
                Self::default()
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring config file; using defaults");
                Self::default()
            }
        }
    }

    /// Parse a JSON document; omitted fields take their defaults.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Values injected into every snapshot's client config map.
    pub fn client_defaults(&self) -> IndexMap<String, String> {
        let mut defaults = IndexMap::new();
        defaults.insert(
            "poll_interval".to_owned(),
            format!("{}ms", self.poll_interval.as_millis()),
        );
        defaults
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    cache_max_age_ms: u64,
    poll_interval_ms: u64,
    lifecycle_policy: LifecyclePolicy,
    store_timeout_ms: u64,
    deck: Vec<DeckCard>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            cache_max_age_ms: DEFAULT_CACHE_MAX_AGE_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            lifecycle_policy: LifecyclePolicy::default(),
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
            deck: default_deck(),
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            cache_max_age: Duration::from_millis(value.cache_max_age_ms),
            poll_interval: Duration::from_millis(value.poll_interval_ms),
            lifecycle_policy: value.lifecycle_policy,
            store_timeout: Duration::from_millis(value.store_timeout_ms),
            deck: value.deck,
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

fn read_config_file(path: &Path) -> Result<AppConfig, ConfigFileError> {
    let contents = fs::read_to_string(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => ConfigFileError::Missing,
        _ => ConfigFileError::Read(err),
    })?;
    AppConfig::from_json(&contents).map_err(ConfigFileError::Parse)
}

fn card(kind: CardKindEntity, front: &str, back: Option<&str>) -> DeckCard {
    DeckCard {
        kind,
        front: front.to_owned(),
        back: back.map(str::to_owned),
    }
}

/// Built-in deck shipped with the binary.
fn default_deck() -> Vec<DeckCard> {
    use CardKindEntity::{Modifier, Prompt, Rule};

    vec![
        card(Rule, "Speak only in questions", Some("Never ask a question")),
        card(Rule, "Stand up to talk", Some("Sit down to talk")),
        card(Rule, "Say \"please\" before every request", Some("Never say \"please\"")),
        card(
            Rule,
            "Refer to yourself in the third person",
            Some("Refer to others in the third person"),
        ),
        card(Rule, "Point with your elbow", Some("Never point")),
        card(Prompt, "Sing your next sentence", None),
        card(Prompt, "Tell the group a secret", None),
        card(Prompt, "Do your best impression of the host", None),
        card(Modifier, "Clone a rule you hold", None),
        card(Modifier, "Flip any rule on the table", None),
        card(Modifier, "Shred one of your rules", None),
        card(Modifier, "Transfer a rule to another player", None),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.cache_max_age, Duration::from_millis(500));
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert_eq!(config.lifecycle_policy, LifecyclePolicy::HostOnly);
        assert!(!config.deck.is_empty());
        assert_eq!(
            config.client_defaults().get("poll_interval").map(String::as_str),
            Some("500ms")
        );
    }

    #[test]
    fn partial_documents_keep_remaining_defaults() {
        let config = AppConfig::from_json(
            r#"{ "cache_max_age_ms": 250, "lifecycle_policy": "any_member" }"#,
        )
        .unwrap();
        assert_eq!(config.cache_max_age, Duration::from_millis(250));
        assert_eq!(config.lifecycle_policy, LifecyclePolicy::AnyMember);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.deck, default_deck());
    }

    #[test]
    fn custom_deck_replaces_the_builtin_one() {
        let config = AppConfig::from_json(
            r#"{ "deck": [
                { "kind": "rule", "front": "hum", "back": "whistle" },
                { "kind": "prompt", "front": "dance" }
            ] }"#,
        )
        .unwrap();
        assert_eq!(config.deck.len(), 2);
        assert_eq!(config.deck[0].back.as_deref(), Some("whistle"));
        assert_eq!(config.deck[1].back, None);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(AppConfig::from_json(r#"{ "lifecycle_policy": "anyone" }"#).is_err());
    }

    #[test]
    fn config_files_are_classified_by_failure() {
        let dir = env::temp_dir().join(format!("rulette-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let missing = dir.join("absent.json");
        assert!(matches!(read_config_file(&missing), Err(ConfigFileError::Missing)));

        let broken = dir.join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(read_config_file(&broken), Err(ConfigFileError::Parse(_))));

        let valid = dir.join("valid.json");
        fs::write(&valid, r#"{ "store_timeout_ms": 100 }"#).unwrap();
        let config = read_config_file(&valid).unwrap();
        assert_eq!(config.store_timeout, Duration::from_millis(100));

        fs::remove_dir_all(&dir).unwrap();
    }
}
