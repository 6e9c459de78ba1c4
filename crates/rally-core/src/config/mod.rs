//! Storage configuration.
//!
//! Provides `StorageConfig`, the constructor-supplied configuration for the
//! local cache, the remote store credentials, and the remote client lifecycle.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::registry::CollectionKind;
use crate::util::{is_http_url, normalize_text_option};

const DEFAULT_MAX_CLIENT_AGE_SECS: u64 = 60 * 60;
const DEFAULT_TRANSPORT_ERROR_THRESHOLD: u32 = 3;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CACHE_FILE: &str = "rally-cache.db";

/// Credentials for the remote relational store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Project base URL, e.g. `https://demo.supabase.co`
    pub url: String,
    /// API key sent as both `apikey` and bearer token
    pub api_key: String,
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RemoteConfig")
            .field("url", &self.url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl RemoteConfig {
    pub fn new(url: impl AsRef<str>, api_key: impl Into<String>) -> Result<Self> {
        let url = url.as_ref().trim().trim_end_matches('/').to_string();
        if url.is_empty() {
            return Err(Error::Configuration("remote URL must not be empty".into()));
        }
        if !is_http_url(&url) {
            return Err(Error::Configuration(
                "remote URL must include http:// or https://".into(),
            ));
        }

        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(Error::Configuration(
                "remote API key must not be empty".into(),
            ));
        }

        Ok(Self { url, api_key })
    }
}

/// Remote client lifecycle tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// A connected client older than this is treated as stale
    #[serde(default = "default_max_client_age", with = "duration_secs")]
    pub max_client_age: Duration,
    /// Consecutive transport failures before the client is treated as stale
    #[serde(default = "default_transport_error_threshold")]
    pub transport_error_threshold: u32,
    /// Per-request timeout for the HTTP store
    #[serde(default = "default_request_timeout", with = "duration_secs")]
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            max_client_age: default_max_client_age(),
            transport_error_threshold: default_transport_error_threshold(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Full configuration for a `StorageCoordinator`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the local cache database file
    pub cache_path: PathBuf,
    /// Remote credentials; `None` runs in cache-only mode
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub client: ClientSettings,
    /// Collections kept in the cache only, never mirrored
    #[serde(default)]
    pub local_only: Vec<CollectionKind>,
}

impl StorageConfig {
    /// Cache-only configuration at the given path.
    pub fn local(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
            remote: None,
            client: ClientSettings::default(),
            local_only: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_remote(mut self, remote: RemoteConfig) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Build configuration from `RALLY_*` environment variables.
    ///
    /// `fallback_cache_path` is used when `RALLY_CACHE_PATH` is unset.
    pub fn from_env(fallback_cache_path: impl Into<PathBuf>) -> Result<Self> {
        let cache_path = normalize_text_option(env::var("RALLY_CACHE_PATH").ok())
            .map_or_else(|| fallback_cache_path.into(), PathBuf::from);

        let remote = resolve_remote_config(
            env::var("RALLY_REMOTE_URL").ok(),
            env::var("RALLY_REMOTE_KEY").ok(),
        )?;

        let mut client = ClientSettings::default();
        if let Some(secs) = env_u64("RALLY_CLIENT_MAX_AGE_SECS")? {
            client.max_client_age = Duration::from_secs(secs);
        }
        if let Some(threshold) = env_u64("RALLY_TRANSPORT_ERROR_THRESHOLD")? {
            client.transport_error_threshold = u32::try_from(threshold).unwrap_or(u32::MAX);
        }
        if let Some(secs) = env_u64("RALLY_REQUEST_TIMEOUT_SECS")? {
            client.request_timeout = Duration::from_secs(secs);
        }

        let local_only = normalize_text_option(env::var("RALLY_LOCAL_ONLY").ok())
            .map(|raw| parse_collection_list(&raw))
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            cache_path,
            remote,
            client,
            local_only,
        })
    }

    /// Whether remote credentials are present.
    pub const fn is_remote_configured(&self) -> bool {
        self.remote.is_some()
    }
}

/// Default file name of the cache database inside a data directory.
pub const fn default_cache_file_name() -> &'static str {
    DEFAULT_CACHE_FILE
}

/// Resolve optional remote credentials.
///
/// Both values absent means cache-only mode. Exactly one present is a
/// configuration error rather than a silent downgrade.
pub fn resolve_remote_config(
    url: Option<String>,
    api_key: Option<String>,
) -> Result<Option<RemoteConfig>> {
    let url = normalize_text_option(url);
    let api_key = normalize_text_option(api_key);

    match (url, api_key) {
        (None, None) => Ok(None),
        (Some(url), Some(api_key)) => RemoteConfig::new(url, api_key).map(Some),
        (Some(_), None) => Err(Error::Configuration(
            "RALLY_REMOTE_KEY is required when RALLY_REMOTE_URL is set".into(),
        )),
        (None, Some(_)) => Err(Error::Configuration(
            "RALLY_REMOTE_URL is required when RALLY_REMOTE_KEY is set".into(),
        )),
    }
}

/// Comma-separated collection keys, e.g. `match_events,session_settings`.
pub fn parse_collection_list(raw: &str) -> Result<Vec<CollectionKind>> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(|key| {
            key.parse::<CollectionKind>().map_err(|_| {
                Error::Configuration(format!("RALLY_LOCAL_ONLY names an unknown collection '{key}'"))
            })
        })
        .collect()
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    let Some(raw) = normalize_text_option(env::var(name).ok()) else {
        return Ok(None);
    };
    raw.parse()
        .map(Some)
        .map_err(|_| Error::Configuration(format!("{name} must be a whole number, got '{raw}'")))
}

const fn default_max_client_age() -> Duration {
    Duration::from_secs(DEFAULT_MAX_CLIENT_AGE_SECS)
}

const fn default_transport_error_threshold() -> u32 {
    DEFAULT_TRANSPORT_ERROR_THRESHOLD
}

const fn default_request_timeout() -> Duration {
    Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_remote_config_allows_cache_only_mode() {
        assert_eq!(resolve_remote_config(None, None).unwrap(), None);
        assert_eq!(
            resolve_remote_config(Some("  ".into()), Some(String::new())).unwrap(),
            None
        );
    }

    #[test]
    fn resolve_remote_config_rejects_partial_credentials() {
        let error = resolve_remote_config(Some("https://demo.supabase.co".into()), None)
            .unwrap_err()
            .to_string();
        assert!(error.contains("RALLY_REMOTE_KEY"));

        let error = resolve_remote_config(None, Some("anon".into()))
            .unwrap_err()
            .to_string();
        assert!(error.contains("RALLY_REMOTE_URL"));
    }

    #[test]
    fn remote_config_trims_and_validates_url() {
        let config = RemoteConfig::new(" https://demo.supabase.co/ ", " anon ").unwrap();
        assert_eq!(config.url, "https://demo.supabase.co");
        assert_eq!(config.api_key, "anon");

        assert!(RemoteConfig::new("demo.supabase.co", "anon").is_err());
        assert!(RemoteConfig::new("https://demo.supabase.co", "  ").is_err());
    }

    #[test]
    fn remote_config_debug_redacts_key() {
        let config = RemoteConfig::new("https://demo.supabase.co", "secret-key").unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn storage_config_deserializes_with_defaults() {
        let config: StorageConfig =
            serde_json::from_str(r#"{"cache_path":"/tmp/rally.db"}"#).unwrap();
        assert_eq!(config.cache_path, PathBuf::from("/tmp/rally.db"));
        assert!(!config.is_remote_configured());
        assert_eq!(config.client, ClientSettings::default());
        assert_eq!(config.client.transport_error_threshold, 3);
        assert!(config.local_only.is_empty());
    }

    #[test]
    fn collection_list_parses_keys_and_rejects_unknown_ones() {
        assert_eq!(
            parse_collection_list(" match_events, session-settings ,").unwrap(),
            vec![CollectionKind::MatchEvents, CollectionKind::SessionSettings]
        );
        let error = parse_collection_list("players,teams").unwrap_err().to_string();
        assert!(error.contains("teams"));
    }

    #[test]
    fn client_settings_round_trip_as_seconds() {
        let settings = ClientSettings {
            max_client_age: Duration::from_secs(120),
            transport_error_threshold: 5,
            request_timeout: Duration::from_secs(2),
        };
        let json = serde_json::to_value(settings).unwrap();
        assert_eq!(json["max_client_age"], 120);
        let parsed: ClientSettings = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, settings);
    }
}
