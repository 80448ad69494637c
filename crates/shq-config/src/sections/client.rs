// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Hosted queue client configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::secret::SecretString;

pub const DEFAULT_API_URL: &str = "https://api.serverlesshq.com";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct ClientConfig {
	/// Account token used for bearer auth and webhook signatures.
	pub token: Option<SecretString>,
	pub api_url: String,
	pub request_timeout: Duration,
}

impl Default for ClientConfig {
	fn default() -> Self {
		ClientConfigLayer::default().finalize()
	}
}

/// Client configuration layer (partial, for merging).
///
/// The token is never read from a config file; only the environment source
/// fills it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfigLayer {
	#[serde(skip)]
	pub token: Option<SecretString>,
	#[serde(default)]
	pub api_url: Option<String>,
	#[serde(default)]
	pub request_timeout_secs: Option<u64>,
}

impl ClientConfigLayer {
	pub fn merge(&mut self, other: ClientConfigLayer) {
		if other.token.is_some() {
			self.token = other.token;
		}
		if other.api_url.is_some() {
			self.api_url = other.api_url;
		}
		if other.request_timeout_secs.is_some() {
			self.request_timeout_secs = other.request_timeout_secs;
		}
	}

	pub fn finalize(self) -> ClientConfig {
		ClientConfig {
			token: self.token.filter(|t| !t.is_empty()),
			api_url: self
				.api_url
				.unwrap_or_else(|| DEFAULT_API_URL.to_string())
				.trim_end_matches('/')
				.to_string(),
			request_timeout: Duration::from_secs(
				self
					.request_timeout_secs
					.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
			),
		}
	}
}
