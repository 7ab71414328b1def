//! Process settings.
//!
//! Loaded from the `settings` object of a JSON file (camelCase keys) or from
//! `ADDRSYNC_*` environment variables. Everything except the two connection
//! strings has a default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use addrsync_addresses::{ProjectionOptions, TimestampSource};

use crate::sync::TableTarget;

/// Points at a JSON settings file; when unset, settings come from the environment.
pub const SETTINGS_PATH_VAR: &str = "ADDRSYNC_SETTINGS";

const ENV_PREFIX: &str = "ADDRSYNC_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing setting {0}")]
    Missing(String),

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub event_store_connection_string: String,
    pub postgis_connection_string: String,
    #[serde(default = "default_event_table")]
    pub event_table: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_replay_batch_size")]
    pub replay_batch_size: u32,
    /// Applied as `statement_timeout` to every import and refresh.
    #[serde(default = "default_export_timeout_secs")]
    pub export_timeout_secs: u64,
    #[serde(default)]
    pub timestamp_source: TimestampSource,
    #[serde(default = "default_true")]
    pub touch_updated_at_on_delete: bool,
    #[serde(default = "default_access_address_target")]
    pub access_address: TableTarget,
    #[serde(default = "default_unit_address_target")]
    pub unit_address: TableTarget,
}

fn default_event_table() -> String {
    "events.mt_events".to_string()
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_replay_batch_size() -> u32 {
    10_000
}

fn default_export_timeout_secs() -> u64 {
    3_600
}

fn default_true() -> bool {
    true
}

fn default_access_address_target() -> TableTarget {
    TableTarget::new(
        "location.official_access_address_staging",
        "location.official_access_address",
    )
}

fn default_unit_address_target() -> TableTarget {
    TableTarget::new(
        "location.official_unit_address_staging",
        "location.official_unit_address",
    )
}

#[derive(Deserialize)]
struct SettingsFile {
    settings: Settings,
}

impl Settings {
    /// Settings with defaults for everything but the connection strings.
    pub fn new(
        event_store_connection_string: impl Into<String>,
        postgis_connection_string: impl Into<String>,
    ) -> Self {
        Self {
            event_store_connection_string: event_store_connection_string.into(),
            postgis_connection_string: postgis_connection_string.into(),
            event_table: default_event_table(),
            poll_interval_secs: default_poll_interval_secs(),
            replay_batch_size: default_replay_batch_size(),
            export_timeout_secs: default_export_timeout_secs(),
            timestamp_source: TimestampSource::default(),
            touch_updated_at_on_delete: true,
            access_address: default_access_address_target(),
            unit_address: default_unit_address_target(),
        }
    }

    /// Read the file named by `ADDRSYNC_SETTINGS`, or the environment if unset.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var_os(SETTINGS_PATH_VAR) {
            Some(path) => Self::from_json_file(path),
            None => Self::from_env(),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse `{ "settings": { ... } }`.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let file: SettingsFile = serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        file.settings.validate()?;
        Ok(file.settings)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from `ADDRSYNC_*` keys resolved through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let require = |name: &str| get(name).ok_or_else(|| ConfigError::Missing(format!("{ENV_PREFIX}{name}")));

        let mut settings = Self::new(
            require("EVENT_STORE_CONNECTION_STRING")?,
            require("POSTGIS_CONNECTION_STRING")?,
        );

        if let Some(table) = get("EVENT_TABLE") {
            settings.event_table = table;
        }
        if let Some(raw) = get("POLL_INTERVAL_SECS") {
            settings.poll_interval_secs = parse_value("POLL_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = get("REPLAY_BATCH_SIZE") {
            settings.replay_batch_size = parse_value("REPLAY_BATCH_SIZE", &raw)?;
        }
        if let Some(raw) = get("EXPORT_TIMEOUT_SECS") {
            settings.export_timeout_secs = parse_value("EXPORT_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = get("TIMESTAMP_SOURCE") {
            settings.timestamp_source = match raw.trim() {
                "commit_time" => TimestampSource::CommitTime,
                "external_attribute" => TimestampSource::ExternalAttribute,
                other => {
                    return Err(ConfigError::invalid(
                        format!("{ENV_PREFIX}TIMESTAMP_SOURCE"),
                        format!("expected commit_time or external_attribute, got {other:?}"),
                    ));
                }
            };
        }
        if let Some(raw) = get("TOUCH_UPDATED_AT_ON_DELETE") {
            settings.touch_updated_at_on_delete = parse_value("TOUCH_UPDATED_AT_ON_DELETE", &raw)?;
        }
        if let Some(table) = get("ACCESS_ADDRESS_STAGING_TABLE") {
            settings.access_address.staging_table = table;
        }
        if let Some(view) = get("ACCESS_ADDRESS_VIEW") {
            settings.access_address.view = view;
        }
        if let Some(table) = get("UNIT_ADDRESS_STAGING_TABLE") {
            settings.unit_address.staging_table = table;
        }
        if let Some(view) = get("UNIT_ADDRESS_VIEW") {
            settings.unit_address.view = view;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_store_connection_string.trim().is_empty() {
            return Err(ConfigError::invalid("eventStoreConnectionString", "cannot be blank"));
        }
        if self.postgis_connection_string.trim().is_empty() {
            return Err(ConfigError::invalid("postgisConnectionString", "cannot be blank"));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::invalid("pollIntervalSecs", "must be greater than zero"));
        }
        if self.replay_batch_size == 0 {
            return Err(ConfigError::invalid("replayBatchSize", "must be greater than zero"));
        }

        // These end up in statement text, so only plain identifiers pass.
        for (key, name) in [
            ("eventTable", &self.event_table),
            ("accessAddress.stagingTable", &self.access_address.staging_table),
            ("accessAddress.view", &self.access_address.view),
            ("unitAddress.stagingTable", &self.unit_address.staging_table),
            ("unitAddress.view", &self.unit_address.view),
        ] {
            if !is_qualified_identifier(name) {
                return Err(ConfigError::invalid(
                    key,
                    format!("{name:?} is not a [schema.]table identifier"),
                ));
            }
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_secs(self.export_timeout_secs)
    }

    pub fn projection_options(&self) -> ProjectionOptions {
        ProjectionOptions {
            timestamp_source: self.timestamp_source,
            touch_updated_at_on_delete: self.touch_updated_at_on_delete,
        }
    }
}

fn parse_value<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(format!("{ENV_PREFIX}{name}"), e.to_string()))
}

fn is_qualified_identifier(name: &str) -> bool {
    let mut segments = name.split('.');
    let valid = |s: &str| {
        !s.is_empty()
            && !s.starts_with(|c: char| c.is_ascii_digit())
            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    let count = name.split('.').count();
    (1..=2).contains(&count) && segments.all(valid)
}
