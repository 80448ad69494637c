// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ShqConfigLayer;
use crate::sections::{CallbackConfigLayer, ClientConfigLayer, LoggingConfigLayer, TunnelConfigLayer};
use crate::secret::SecretString;

pub const ENV_TOKEN: &str = "SHQ_TOKEN";
pub const ENV_API_URL: &str = "SHQ_API_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "SHQ_REQUEST_TIMEOUT_SECS";
pub const ENV_CALLBACK_PORT: &str = "SHQ_CALLBACK_PORT";
pub const ENV_DEPLOYMENT_URL: &str = "VERCEL_URL";
pub const ENV_BASE_CALLBACK_URL: &str = "SHQ_BASE_CALLBACK_URL";
pub const ENV_ENVIRONMENT: &str = "SHQ_ENV";
pub const ENV_RESOLVE_TIMEOUT_SECS: &str = "SHQ_CALLBACK_RESOLVE_TIMEOUT_SECS";
pub const ENV_TUNNEL_AGENT_URL: &str = "SHQ_TUNNEL_AGENT_URL";
pub const ENV_LOG_LEVEL: &str = "SHQ_LOG_LEVEL";

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "shq.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ShqConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ShqConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ShqConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// `./shq.toml`
	pub fn working_dir() -> Self {
		Self::new(DEFAULT_CONFIG_FILE)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ShqConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ShqConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ShqConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Environment variable source.
///
/// Reads the process environment by default; [`EnvSource::from_pairs`] builds
/// a source over a fixed set of variables.
pub struct EnvSource {
	lookup: Lookup,
}

impl EnvSource {
	pub fn process() -> Self {
		Self {
			lookup: Box::new(|name| std::env::var(name).ok()),
		}
	}

	pub fn from_pairs<I, K, V>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let vars: HashMap<String, String> = pairs
			.into_iter()
			.map(|(k, v)| (k.into(), v.into()))
			.collect();
		Self {
			lookup: Box::new(move |name| vars.get(name).cloned()),
		}
	}

	fn var(&self, name: &str) -> Option<String> {
		(self.lookup)(name).filter(|s| !s.is_empty())
	}

	fn var_u16(&self, name: &str) -> Result<Option<u16>, ConfigError> {
		match self.var(name) {
			Some(v) => v.trim().parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid u16 value '{v}'"),
			}),
			None => Ok(None),
		}
	}

	fn var_u64(&self, name: &str) -> Result<Option<u64>, ConfigError> {
		match self.var(name) {
			Some(v) => v.trim().parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid u64 value '{v}'"),
			}),
			None => Ok(None),
		}
	}

	/// Load a secret using the `VAR` / `VAR_FILE` convention. `VAR_FILE` wins.
	fn secret(&self, name: &str) -> Result<Option<SecretString>, ConfigError> {
		let file_var = format!("{name}_FILE");

		if let Some(path) = self.var(&file_var) {
			let content = std::fs::read_to_string(&path).map_err(|e| {
				ConfigError::Secret(format!("failed to read {file_var} at {path}: {e}"))
			})?;
			let secret = content.strip_suffix('\n').unwrap_or(&content);
			return Ok(Some(SecretString::new(secret)));
		}

		Ok(self.var(name).map(SecretString::new))
	}

	fn load_client(&self) -> Result<ClientConfigLayer, ConfigError> {
		Ok(ClientConfigLayer {
			token: self.secret(ENV_TOKEN)?,
			api_url: self.var(ENV_API_URL),
			request_timeout_secs: self.var_u64(ENV_REQUEST_TIMEOUT_SECS)?,
		})
	}

	fn load_callback(&self) -> Result<CallbackConfigLayer, ConfigError> {
		Ok(CallbackConfigLayer {
			port: self.var_u16(ENV_CALLBACK_PORT)?,
			deployment_url: self.var(ENV_DEPLOYMENT_URL),
			base_url: self.var(ENV_BASE_CALLBACK_URL),
			environment: self.var(ENV_ENVIRONMENT),
			resolve_timeout_secs: self.var_u64(ENV_RESOLVE_TIMEOUT_SECS)?,
		})
	}

	fn load_tunnel(&self) -> TunnelConfigLayer {
		TunnelConfigLayer {
			agent_url: self.var(ENV_TUNNEL_AGENT_URL),
		}
	}

	fn load_logging(&self) -> LoggingConfigLayer {
		LoggingConfigLayer {
			level: self.var(ENV_LOG_LEVEL),
		}
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ShqConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ShqConfigLayer {
			client: Some(self.load_client()?),
			callback: Some(self.load_callback()?),
			tunnel: Some(self.load_tunnel()),
			logging: Some(self.load_logging()),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_env_source_reads_all_sections() {
		let source = EnvSource::from_pairs([
			(ENV_TOKEN, "T"),
			(ENV_CALLBACK_PORT, "4000"),
			(ENV_DEPLOYMENT_URL, "my-app.vercel.app"),
			(ENV_BASE_CALLBACK_URL, "https://jobs.example.com"),
			(ENV_ENVIRONMENT, "production"),
			(ENV_LOG_LEVEL, "debug"),
		]);
		let layer = source.load().unwrap();

		let client = layer.client.unwrap();
		assert_eq!(client.token.as_ref().map(|t| t.expose()), Some("T"));

		let callback = layer.callback.unwrap();
		assert_eq!(callback.port, Some(4000));
		assert_eq!(callback.deployment_url.as_deref(), Some("my-app.vercel.app"));
		assert_eq!(callback.base_url.as_deref(), Some("https://jobs.example.com"));
		assert_eq!(callback.environment.as_deref(), Some("production"));

		assert_eq!(layer.logging.unwrap().level.as_deref(), Some("debug"));
	}

	#[test]
	fn test_env_source_empty_values_are_unset() {
		let source = EnvSource::from_pairs([(ENV_BASE_CALLBACK_URL, "")]);
		let layer = source.load().unwrap();
		assert!(layer.callback.unwrap().base_url.is_none());
	}

	#[test]
	fn test_env_source_rejects_bad_port() {
		let source = EnvSource::from_pairs([(ENV_CALLBACK_PORT, "not-a-port")]);
		let err = source.load().unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == ENV_CALLBACK_PORT));
	}

	#[test]
	fn test_token_file_takes_precedence() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "from-file").unwrap();
		let path = file.path().display().to_string();

		let source = EnvSource::from_pairs([
			(ENV_TOKEN.to_string(), "from-env".to_string()),
			(format!("{ENV_TOKEN}_FILE"), path),
		]);
		let client = source.load().unwrap().client.unwrap();
		assert_eq!(client.token.as_ref().map(|t| t.expose()), Some("from-file"));
	}

	#[test]
	fn test_token_file_missing_is_error() {
		let source = EnvSource::from_pairs([(
			format!("{ENV_TOKEN}_FILE"),
			"/nonexistent/shq/token".to_string(),
		)]);
		assert!(matches!(source.load(), Err(ConfigError::Secret(_))));
	}

	#[test]
	fn test_toml_source_missing_file_is_empty() {
		let source = TomlSource::new("/nonexistent/shq.toml");
		let layer = source.load().unwrap();
		assert!(layer.callback.is_none());
	}

	#[test]
	fn test_toml_source_parse_error() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[callback\nport = ").unwrap();
		let source = TomlSource::new(file.path());
		assert!(matches!(source.load(), Err(ConfigError::TomlParse { .. })));
	}

	#[test]
	fn test_precedence_order() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
	}
}
