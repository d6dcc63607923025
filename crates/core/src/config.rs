//! Synchronization settings.
//!
//! Loaded from an optional JSON file; every field falls back to its default so
//! a partial file (or none at all) is valid.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use turnsync_protocol::path::DEFAULT_NAMESPACE;

use crate::error::{Error, Result};

pub const DEFAULT_SESSION_PREFIX: &str = "match";
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 4_000;
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_SEAT_SETTLE_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
	/// Store path under which sessions live.
	pub namespace: String,
	/// Prefix of generated session ids.
	pub session_prefix: String,
	/// Bound on create, join and move writes.
	pub operation_timeout_ms: u64,
	/// How long a join waits for the session to appear.
	pub lookup_timeout_ms: u64,
	/// Delay between writing a seat and reading it back.
	pub seat_settle_ms: u64,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			namespace: DEFAULT_NAMESPACE.to_string(),
			session_prefix: DEFAULT_SESSION_PREFIX.to_string(),
			operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
			lookup_timeout_ms: DEFAULT_LOOKUP_TIMEOUT_MS,
			seat_settle_ms: DEFAULT_SEAT_SETTLE_MS,
		}
	}
}

impl SyncConfig {
	/// Reads and validates a config file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path).map_err(|err| Error::Config(format!("{}: {err}", path.display())))?;
		let config: Self = serde_json::from_str(&content).map_err(|err| Error::Config(format!("{}: {err}", path.display())))?;
		config.validate()?;
		debug!(target = "turnsync.config", path = %path.display(), "loaded sync config");
		Ok(config)
	}

	/// Loads `path` when given, defaults otherwise.
	pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
		match path {
			Some(path) => Self::load(path),
			None => Ok(Self::default()),
		}
	}

	pub fn validate(&self) -> Result<()> {
		if self.namespace.trim_matches('/').is_empty() {
			return Err(Error::Config("namespace must not be empty".into()));
		}
		if self.session_prefix.is_empty() || self.session_prefix.contains('/') {
			return Err(Error::Config(format!("invalid session prefix `{}`", self.session_prefix)));
		}
		if self.operation_timeout_ms == 0 || self.lookup_timeout_ms == 0 {
			return Err(Error::Config("timeouts must be positive".into()));
		}
		if self.seat_settle_ms >= self.operation_timeout_ms {
			return Err(Error::Config(format!(
				"seatSettleMs ({}) must be shorter than operationTimeoutMs ({})",
				self.seat_settle_ms, self.operation_timeout_ms
			)));
		}
		if self.lookup_timeout_ms.saturating_add(self.seat_settle_ms) >= self.operation_timeout_ms {
			return Err(Error::Config(format!(
				"lookupTimeoutMs ({}) plus seatSettleMs ({}) must be shorter than operationTimeoutMs ({})",
				self.lookup_timeout_ms, self.seat_settle_ms, self.operation_timeout_ms
			)));
		}
		Ok(())
	}

	pub fn operation_timeout(&self) -> Duration {
		Duration::from_millis(self.operation_timeout_ms)
	}

	pub fn lookup_timeout(&self) -> Duration {
		Duration::from_millis(self.lookup_timeout_ms)
	}

	pub fn seat_settle(&self) -> Duration {
		Duration::from_millis(self.seat_settle_ms)
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;

	fn write_config(content: &str) -> tempfile::NamedTempFile {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(content.as_bytes()).unwrap();
		file
	}

	#[test]
	fn partial_file_keeps_defaults() {
		let file = write_config(r#"{ "namespace": "arena/games", "seatSettleMs": 50 }"#);
		let config = SyncConfig::load(file.path()).unwrap();

		assert_eq!(config.namespace, "arena/games");
		assert_eq!(config.seat_settle(), Duration::from_millis(50));
		assert_eq!(config.session_prefix, DEFAULT_SESSION_PREFIX);
		assert_eq!(config.operation_timeout(), Duration::from_secs(4));
		assert_eq!(config.lookup_timeout(), Duration::from_secs(3));
	}

	#[test]
	fn rejects_settle_longer_than_operation_timeout() {
		let file = write_config(r#"{ "operationTimeoutMs": 100, "seatSettleMs": 100 }"#);
		let err = SyncConfig::load(file.path()).unwrap_err();
		assert!(matches!(err, Error::Config(msg) if msg.contains("seatSettleMs")));
	}

	#[test]
	fn rejects_lookup_that_outlasts_a_join() {
		let file = write_config(r#"{ "lookupTimeoutMs": 5000 }"#);
		let err = SyncConfig::load(file.path()).unwrap_err();
		assert!(matches!(err, Error::Config(msg) if msg.contains("lookupTimeoutMs")));

		let tight = SyncConfig {
			lookup_timeout_ms: 3_750,
			..SyncConfig::default()
		};
		assert!(tight.validate().is_err());
		let roomy = SyncConfig {
			lookup_timeout_ms: 3_749,
			..SyncConfig::default()
		};
		assert!(roomy.validate().is_ok());
	}

	#[test]
	fn rejects_unparseable_file() {
		let file = write_config("{ namespace: ");
		assert!(matches!(SyncConfig::load(file.path()), Err(Error::Config(_))));
	}

	#[test]
	fn missing_file_is_a_config_error() {
		let dir = tempfile::tempdir().unwrap();
		let err = SyncConfig::load(&dir.path().join("absent.json")).unwrap_err();
		assert!(matches!(err, Error::Config(msg) if msg.contains("absent.json")));
	}

	#[test]
	fn no_path_means_defaults() {
		assert_eq!(SyncConfig::load_or_default(None).unwrap(), SyncConfig::default());
		assert!(SyncConfig::default().validate().is_ok());
	}

	#[test]
	fn serializes_camel_case() {
		let value = serde_json::to_value(SyncConfig::default()).unwrap();
		assert_eq!(value["operationTimeoutMs"], 4000);
		assert_eq!(value["sessionPrefix"], "match");
	}
}
