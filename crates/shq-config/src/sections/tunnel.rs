// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Development tunnel configuration.

use serde::Deserialize;

pub const DEFAULT_AGENT_URL: &str = "http://127.0.0.1:4040";

#[derive(Debug, Clone, PartialEq)]
pub struct TunnelConfig {
	/// Base URL of the local ngrok agent API.
	pub agent_url: String,
}

impl Default for TunnelConfig {
	fn default() -> Self {
		Self {
			agent_url: DEFAULT_AGENT_URL.to_string(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TunnelConfigLayer {
	#[serde(default)]
	pub agent_url: Option<String>,
}

impl TunnelConfigLayer {
	pub fn merge(&mut self, other: TunnelConfigLayer) {
		if other.agent_url.is_some() {
			self.agent_url = other.agent_url;
		}
	}

	pub fn finalize(self) -> TunnelConfig {
		TunnelConfig {
			agent_url: self
				.agent_url
				.unwrap_or_else(|| DEFAULT_AGENT_URL.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_agent_url() {
		assert_eq!(
			TunnelConfigLayer::default().finalize().agent_url,
			"http://127.0.0.1:4040"
		);
	}
}
