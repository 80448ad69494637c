// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the SHQ adapter.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - [`SecretString`] for the account token
//!
//! # Usage
//!
//! ```ignore
//! use shq_config::load_config;
//!
//! let config = load_config()?;
//! println!("callbacks on port {}", config.callback.port);
//! ```

pub mod error;
pub mod layer;
pub mod secret;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ShqConfigLayer;
pub use secret::{SecretString, REDACTED};
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved adapter configuration.
#[derive(Debug, Clone, Default)]
pub struct ShqConfig {
	pub client: ClientConfig,
	pub callback: CallbackConfig,
	pub tunnel: TunnelConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`SHQ_*`, `VERCEL_URL`)
/// 2. Config file (`./shq.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ShqConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::working_dir()),
		Box::new(EnvSource::process()),
	])
}

/// Load configuration from the environment only.
pub fn load_config_from_env() -> Result<ShqConfig, ConfigError> {
	load_from_sources(vec![Box::new(EnvSource::process())])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ShqConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource::process()),
	])
}

/// Merge the given sources by precedence and finalize the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ShqConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ShqConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ShqConfigLayer) -> Result<ShqConfig, ConfigError> {
	let client = layer.client.unwrap_or_default().finalize();
	let callback = layer.callback.unwrap_or_default().finalize();
	let tunnel = layer.tunnel.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&client, &callback)?;

	info!(
		api_url = %client.api_url,
		token_configured = client.token.is_some(),
		environment = %callback.environment,
		callback_port = callback.port,
		deployment_url = ?callback.deployment_url,
		base_callback_url = ?callback.base_url,
		"SHQ configuration loaded"
	);

	Ok(ShqConfig {
		client,
		callback,
		tunnel,
		logging,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(client: &ClientConfig, callback: &CallbackConfig) -> Result<(), ConfigError> {
	if callback.port == 0 {
		return Err(ConfigError::Validation(
			"SHQ_CALLBACK_PORT must be a non-zero port".to_string(),
		));
	}

	if callback.environment.is_production() && client.token.is_none() {
		return Err(ConfigError::Validation(
			"SHQ_TOKEN is required when SHQ_ENV=production".to_string(),
		));
	}

	Ok(())
}
