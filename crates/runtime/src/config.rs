//! Bridge configuration.
//!
//! Loaded from a JSON file; every field has a default so an empty object is
//! a valid configuration.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 60_000;

/// Tunables for one [`Bridge`](crate::Bridge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
	/// Timeout applied to stubs created without an explicit override.
	pub default_timeout_ms: u64,
	/// Post a cancel notice to the receiver when a call times out.
	pub cancel_on_timeout: bool,
	/// Network-backed modules consulted as the last dispatch tier.
	pub remote: Option<RemoteConfig>,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			default_timeout_ms: DEFAULT_TIMEOUT_MS,
			cancel_on_timeout: true,
			remote: None,
		}
	}
}

impl BridgeConfig {
	/// Reads and validates a JSON configuration file.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let raw = std::fs::read_to_string(path)?;
		let config: BridgeConfig =
			serde_json::from_str(&raw).map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		if self.default_timeout_ms == 0 {
			return Err(Error::Config("defaultTimeoutMs must be greater than zero".into()));
		}
		if let Some(remote) = &self.remote {
			remote.validate()?;
		}
		Ok(())
	}

	pub fn default_timeout(&self) -> Duration {
		Duration::from_millis(self.default_timeout_ms)
	}
}

/// JSON-RPC endpoint backing the remote module tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
	/// HTTP(S) URL of the JSON-RPC server.
	pub endpoint: String,
	/// Exposed module names, each with an optional method allow-list.
	/// `None` exposes every method of the module.
	#[serde(default)]
	pub modules: BTreeMap<String, Option<Vec<String>>>,
	#[serde(default = "default_remote_timeout_ms")]
	pub request_timeout_ms: u64,
}

fn default_remote_timeout_ms() -> u64 {
	DEFAULT_REMOTE_TIMEOUT_MS
}

impl RemoteConfig {
	pub fn new(endpoint: impl Into<String>) -> Self {
		Self {
			endpoint: endpoint.into(),
			modules: BTreeMap::new(),
			request_timeout_ms: DEFAULT_REMOTE_TIMEOUT_MS,
		}
	}

	/// Exposes every method of `module`.
	pub fn module(mut self, module: impl Into<String>) -> Self {
		self.modules.insert(module.into(), None);
		self
	}

	/// Exposes only the listed methods of `module`.
	pub fn module_methods<I, S>(mut self, module: impl Into<String>, methods: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.modules
			.insert(module.into(), Some(methods.into_iter().map(Into::into).collect()));
		self
	}

	pub fn validate(&self) -> Result<()> {
		if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
			return Err(Error::Config(format!(
				"remote endpoint must be an http(s) URL, got '{}'",
				self.endpoint
			)));
		}
		if self.request_timeout_ms == 0 {
			return Err(Error::Config("remote requestTimeoutMs must be greater than zero".into()));
		}
		Ok(())
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;

	#[test]
	fn empty_object_uses_defaults() {
		let config: BridgeConfig = serde_json::from_str("{}").unwrap();
		assert_eq!(config, BridgeConfig::default());
		assert_eq!(config.default_timeout(), Duration::from_secs(30));
		assert!(config.cancel_on_timeout);
	}

	#[test]
	fn loads_remote_modules_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			r#"{{
				"defaultTimeoutMs": 500,
				"remote": {{
					"endpoint": "http://127.0.0.1:9000",
					"modules": {{"ledger": null, "mail": ["send"]}}
				}}
			}}"#
		)
		.unwrap();

		let config = BridgeConfig::from_path(file.path()).unwrap();
		assert_eq!(config.default_timeout_ms, 500);
		let remote = config.remote.unwrap();
		assert_eq!(remote.request_timeout_ms, DEFAULT_REMOTE_TIMEOUT_MS);
		assert_eq!(remote.modules.get("ledger"), Some(&None));
		assert_eq!(remote.modules.get("mail"), Some(&Some(vec!["send".to_string()])));
	}

	#[test]
	fn zero_timeout_is_rejected() {
		let config = BridgeConfig {
			default_timeout_ms: 0,
			..BridgeConfig::default()
		};
		assert!(matches!(config.validate(), Err(Error::Config(_))));
	}

	#[test]
	fn non_http_remote_endpoint_is_rejected() {
		let config = BridgeConfig {
			remote: Some(RemoteConfig::new("ws://127.0.0.1:1").module("ledger")),
			..BridgeConfig::default()
		};
		let err = config.validate().unwrap_err();
		assert!(err.to_string().contains("http(s) URL"));
	}

	#[test]
	fn malformed_file_reports_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, "{{ not json").unwrap();
		let err = BridgeConfig::from_path(file.path()).unwrap_err();
		assert!(err.to_string().starts_with("Configuration error:"));
	}
}
