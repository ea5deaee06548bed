//! Typed configuration model: overlays, defaults, merge and snapshots.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Built-in defaults applied by [`ConfigOverlay::resolve`].
pub mod defaults {
    pub const FLAT_MESSAGE: bool = true;
    pub const DATABASE_HASH: bool = true;
    pub const FILTER_TRANSACTION_ENTRY: bool = false;
    pub const PARALLEL_THREAD_SIZE: usize = 8;
    pub const BATCH_SIZE: usize = 50;
    pub const FETCH_TIMEOUT_MS: u64 = 100;
    pub const ACCESS_CHANNEL: &str = "local";
    pub const SCAN_INTERVAL_SECS: u64 = 5;
}

/// Opaque identifier for a remote configuration revision.
///
/// Compared for equality only, never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Partial configuration: every recognized option is optional.
///
/// An option absent from an overlay never clears a previously set value;
/// [`ConfigOverlay::apply`] only copies options that are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverlay {
    pub flat_message: Option<bool>,
    pub database_hash: Option<bool>,
    pub filter_transaction_entry: Option<bool>,
    pub parallel_thread_size: Option<usize>,
    pub batch_size: Option<usize>,
    pub fetch_timeout_ms: Option<u64>,
    pub access_channel: Option<String>,
    pub credential_key: Option<String>,
    pub credential_secret: Option<String>,
    pub credential_account_id: Option<i64>,
    pub scan_interval_secs: Option<u64>,
}

impl ConfigOverlay {
    /// Overlay `other` on top of `self`: options present in `other` win,
    /// absent options leave `self` untouched.
    pub fn apply(&mut self, other: &ConfigOverlay) {
        if other.flat_message.is_some() {
            self.flat_message = other.flat_message;
        }
        if other.database_hash.is_some() {
            self.database_hash = other.database_hash;
        }
        if other.filter_transaction_entry.is_some() {
            self.filter_transaction_entry = other.filter_transaction_entry;
        }
        if other.parallel_thread_size.is_some() {
            self.parallel_thread_size = other.parallel_thread_size;
        }
        if other.batch_size.is_some() {
            self.batch_size = other.batch_size;
        }
        if other.fetch_timeout_ms.is_some() {
            self.fetch_timeout_ms = other.fetch_timeout_ms;
        }
        if other.access_channel.is_some() {
            self.access_channel = other.access_channel.clone();
        }
        if other.credential_key.is_some() {
            self.credential_key = other.credential_key.clone();
        }
        if other.credential_secret.is_some() {
            self.credential_secret = other.credential_secret.clone();
        }
        if other.credential_account_id.is_some() {
            self.credential_account_id = other.credential_account_id;
        }
        if other.scan_interval_secs.is_some() {
            self.scan_interval_secs = other.scan_interval_secs;
        }
    }

    /// Build an overlay from the authority's opaque key/value map.
    ///
    /// Wire keys are the camelCase option names. Unknown keys pass through
    /// silently (forward compatibility); unparseable values are rejected.
    pub fn from_key_map(map: &HashMap<String, String>) -> Result<Self, AgentError> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AgentError> {
            value.parse().map_err(|_| {
                AgentError::config_parse(format!("invalid value '{value}' for option '{key}'"))
            })
        }

        let mut overlay = ConfigOverlay::default();
        for (key, value) in map {
            match key.as_str() {
                "flatMessage" => overlay.flat_message = Some(parse(key, value)?),
                "databaseHash" => overlay.database_hash = Some(parse(key, value)?),
                "filterTransactionEntry" => {
                    overlay.filter_transaction_entry = Some(parse(key, value)?)
                }
                "parallelThreadSize" => overlay.parallel_thread_size = Some(parse(key, value)?),
                "batchSize" => overlay.batch_size = Some(parse(key, value)?),
                "fetchTimeoutMs" => overlay.fetch_timeout_ms = Some(parse(key, value)?),
                "accessChannel" => overlay.access_channel = Some(value.clone()),
                "credentialKey" => overlay.credential_key = Some(value.clone()),
                "credentialSecret" => overlay.credential_secret = Some(value.clone()),
                "credentialAccountId" => overlay.credential_account_id = Some(parse(key, value)?),
                "scanIntervalSecs" => overlay.scan_interval_secs = Some(parse(key, value)?),
                _ => {}
            }
        }
        Ok(overlay)
    }

    /// Resolve against the built-in defaults table.
    pub fn resolve(&self) -> AgentConfig {
        AgentConfig {
            flat_message: self.flat_message.unwrap_or(defaults::FLAT_MESSAGE),
            database_hash: self.database_hash.unwrap_or(defaults::DATABASE_HASH),
            filter_transaction_entry: self
                .filter_transaction_entry
                .unwrap_or(defaults::FILTER_TRANSACTION_ENTRY),
            parallel_thread_size: self
                .parallel_thread_size
                .unwrap_or(defaults::PARALLEL_THREAD_SIZE),
            batch_size: self.batch_size.unwrap_or(defaults::BATCH_SIZE),
            fetch_timeout_ms: self.fetch_timeout_ms.unwrap_or(defaults::FETCH_TIMEOUT_MS),
            access_channel: self
                .access_channel
                .clone()
                .unwrap_or_else(|| defaults::ACCESS_CHANNEL.to_string()),
            credential_key: self.credential_key.clone(),
            credential_secret: self.credential_secret.clone(),
            credential_account_id: self.credential_account_id,
            scan_interval_secs: self
                .scan_interval_secs
                .unwrap_or(defaults::SCAN_INTERVAL_SECS),
        }
    }
}

/// Merge a remote overlay with local overrides.
///
/// Local always wins on key collision; options present only in `remote` pass
/// through unchanged. The remote authority supplies defaults, the local file
/// supplies overrides.
///
/// Pure and idempotent: `merge(&merge(a, b), b) == merge(a, b)`.
pub fn merge(remote: &ConfigOverlay, local: &ConfigOverlay) -> ConfigOverlay {
    let mut merged = remote.clone();
    merged.apply(local);
    merged
}

/// Fully resolved configuration, recreated per poll tick and never mutated in
/// place.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub flat_message: bool,
    pub database_hash: bool,
    pub filter_transaction_entry: bool,
    pub parallel_thread_size: usize,
    pub batch_size: usize,
    pub fetch_timeout_ms: u64,
    pub access_channel: String,
    pub credential_key: Option<String>,
    pub credential_secret: Option<String>,
    pub credential_account_id: Option<i64>,
    pub scan_interval_secs: u64,
}

impl AgentConfig {
    /// Bounded dispatch queue capacity derived from the worker pool size.
    pub fn dispatch_queue_capacity(&self) -> usize {
        self.parallel_thread_size * 2
    }

    /// Fixed inter-tick delay for the reconfiguration poller.
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        ConfigOverlay::default().resolve()
    }
}

/// Immutable pair of a remote config overlay and its version token.
///
/// Produced only by an [`crate::AdminConfigClient`]; discarded once
/// superseded. Two snapshots are equal iff their version tokens are equal.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub config: ConfigOverlay,
    pub version: VersionToken,
}

impl ConfigSnapshot {
    pub fn new(config: ConfigOverlay, version: VersionToken) -> Self {
        Self { config, version }
    }
}

impl PartialEq for ConfigSnapshot {
    // token equality is authoritative
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for ConfigSnapshot {}

/// Local configuration file contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Identity this process registers under at the admin authority.
    pub server_id: String,

    /// Remote admin authority; absent means standalone mode (no poller).
    pub admin: Option<AdminSettings>,

    /// Local option overrides. These win over anything the authority sends.
    pub overrides: ConfigOverlay,
}

/// Connection settings for the remote admin authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    /// Base URL, e.g. `http://admin.internal:8089`.
    pub endpoint: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Register this server with the authority on first contact.
    pub auto_register: bool,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_key: None,
            secret_key: None,
            auto_register: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote() -> ConfigOverlay {
        ConfigOverlay {
            batch_size: Some(50),
            parallel_thread_size: Some(8),
            access_channel: Some("cloud".into()),
            ..Default::default()
        }
    }

    fn local() -> ConfigOverlay {
        ConfigOverlay {
            parallel_thread_size: Some(4),
            ..Default::default()
        }
    }

    #[test]
    fn merge_local_wins_on_collision() {
        let merged = merge(&remote(), &local());
        assert_eq!(merged.parallel_thread_size, Some(4));
        assert_eq!(merged.batch_size, Some(50));
        assert_eq!(merged.access_channel.as_deref(), Some("cloud"));
    }

    #[test]
    fn merge_is_idempotent() {
        let once = merge(&remote(), &local());
        let twice = merge(&once, &local());
        assert_eq!(once, twice);
    }

    #[test]
    fn absent_option_never_clears() {
        let mut base = remote();
        // local says nothing about batch_size, so the remote value survives
        base.apply(&local());
        assert_eq!(base.batch_size, Some(50));
        assert_eq!(base.parallel_thread_size, Some(4));
    }

    #[test]
    fn resolved_scenario_matches_contract() {
        // local {parallelThreadSize: 4}, remote v1 {batchSize: 50, parallelThreadSize: 8}
        let cfg = merge(&remote(), &local()).resolve();
        assert_eq!(cfg.parallel_thread_size, 4);
        assert_eq!(cfg.batch_size, 50);
        assert_eq!(cfg.dispatch_queue_capacity(), 8);
    }

    #[test]
    fn resolve_applies_defaults_table() {
        let cfg = AgentConfig::default();
        assert!(cfg.flat_message);
        assert!(cfg.database_hash);
        assert!(!cfg.filter_transaction_entry);
        assert_eq!(cfg.parallel_thread_size, 8);
        assert_eq!(cfg.batch_size, 50);
        assert_eq!(cfg.fetch_timeout_ms, 100);
        assert_eq!(cfg.access_channel, "local");
        assert_eq!(cfg.scan_interval_secs, 5);
        assert_eq!(cfg.credential_key, None);
    }

    #[test]
    fn from_key_map_parses_recognized_options() {
        let map: HashMap<String, String> = [
            ("flatMessage", "false"),
            ("parallelThreadSize", "16"),
            ("batchSize", "100"),
            ("credentialAccountId", "42"),
            ("someFutureOption", "ignored"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let overlay = ConfigOverlay::from_key_map(&map).unwrap();
        assert_eq!(overlay.flat_message, Some(false));
        assert_eq!(overlay.parallel_thread_size, Some(16));
        assert_eq!(overlay.batch_size, Some(100));
        assert_eq!(overlay.credential_account_id, Some(42));
        assert_eq!(overlay.database_hash, None);
    }

    #[test]
    fn from_key_map_rejects_unparseable_value() {
        let map: HashMap<String, String> =
            [("batchSize".to_string(), "not-a-number".to_string())].into();
        let err = ConfigOverlay::from_key_map(&map).unwrap_err();
        assert!(err.to_string().contains("batchSize"), "got: {err}");
    }

    #[test]
    fn snapshot_equality_is_token_equality() {
        let a = ConfigSnapshot::new(remote(), VersionToken::new("v1"));
        let b = ConfigSnapshot::new(ConfigOverlay::default(), VersionToken::new("v1"));
        let c = ConfigSnapshot::new(remote(), VersionToken::new("v2"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn local_config_deserializes_from_toml() {
        let content = r#"
server_id = "agent-1"

[admin]
endpoint = "http://127.0.0.1:8089"
access_key = "ak"

[overrides]
parallel_thread_size = 4
"#;
        let local: LocalConfig = toml::from_str(content).unwrap();
        assert_eq!(local.server_id, "agent-1");
        let admin = local.admin.unwrap();
        assert_eq!(admin.endpoint, "http://127.0.0.1:8089");
        assert_eq!(admin.access_key.as_deref(), Some("ak"));
        assert!(!admin.auto_register);
        assert_eq!(local.overrides.parallel_thread_size, Some(4));
        assert_eq!(local.overrides.batch_size, None);
    }
}
