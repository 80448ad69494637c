// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Callback URL configuration.
//!
//! These values decide where the hosted queue delivers job callbacks. See the
//! resolver in `shq-adapter` for how they are combined.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_CALLBACK_PORT: u16 = 3000;
pub const DEFAULT_RESOLVE_TIMEOUT_SECS: u64 = 60;

/// Deployment mode, which decides the fallback when no static callback URL is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEnvironment {
	/// Missing callback URL is a fatal configuration error.
	Production,
	/// Missing callback URL is resolved through a local tunnel.
	Development,
	/// Anything else: no fallback, the callback URL stays unresolved.
	Other(String),
}

impl RuntimeEnvironment {
	pub fn parse(value: &str) -> Self {
		match value.trim().to_ascii_lowercase().as_str() {
			"production" | "prod" => Self::Production,
			"development" | "dev" => Self::Development,
			other => Self::Other(other.to_string()),
		}
	}

	pub fn is_production(&self) -> bool {
		matches!(self, Self::Production)
	}
}

impl Default for RuntimeEnvironment {
	fn default() -> Self {
		Self::Development
	}
}

impl fmt::Display for RuntimeEnvironment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Production => write!(f, "production"),
			Self::Development => write!(f, "development"),
			Self::Other(name) => write!(f, "{name}"),
		}
	}
}

/// Callback configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackConfig {
	/// Local port exposed through the development tunnel.
	pub port: u16,
	/// Platform-provided deployment host, e.g. `my-app.vercel.app`.
	pub deployment_url: Option<String>,
	/// Explicit callback base, e.g. `https://jobs.example.com`.
	pub base_url: Option<String>,
	pub environment: RuntimeEnvironment,
	/// `None` waits forever.
	pub resolve_timeout: Option<Duration>,
}

impl Default for CallbackConfig {
	fn default() -> Self {
		CallbackConfigLayer::default().finalize()
	}
}

/// Callback configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackConfigLayer {
	#[serde(default)]
	pub port: Option<u16>,
	#[serde(default)]
	pub deployment_url: Option<String>,
	#[serde(default)]
	pub base_url: Option<String>,
	#[serde(default)]
	pub environment: Option<String>,
	#[serde(default)]
	pub resolve_timeout_secs: Option<u64>,
}

impl CallbackConfigLayer {
	pub fn merge(&mut self, other: CallbackConfigLayer) {
		if other.port.is_some() {
			self.port = other.port;
		}
		if other.deployment_url.is_some() {
			self.deployment_url = other.deployment_url;
		}
		if other.base_url.is_some() {
			self.base_url = other.base_url;
		}
		if other.environment.is_some() {
			self.environment = other.environment;
		}
		if other.resolve_timeout_secs.is_some() {
			self.resolve_timeout_secs = other.resolve_timeout_secs;
		}
	}

	pub fn finalize(self) -> CallbackConfig {
		let timeout_secs = self
			.resolve_timeout_secs
			.unwrap_or(DEFAULT_RESOLVE_TIMEOUT_SECS);

		CallbackConfig {
			port: self.port.unwrap_or(DEFAULT_CALLBACK_PORT),
			deployment_url: non_empty(self.deployment_url),
			base_url: non_empty(self.base_url),
			environment: self
				.environment
				.as_deref()
				.map(RuntimeEnvironment::parse)
				.unwrap_or_default(),
			resolve_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
		}
	}
}

fn non_empty(value: Option<String>) -> Option<String> {
	value
		.map(|v| v.trim().to_string())
		.filter(|v| !v.is_empty())
}
