// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client with consistent User-Agent header.

use reqwest::{Client, ClientBuilder};

const SDK_NAME: &str = "shq-rust";

/// Creates a new HTTP client builder with the standard SHQ User-Agent header.
///
/// Use this when you need to customize the client (e.g., set timeout).
///
/// # Example
/// ```ignore
/// let client = shq_common_http::builder()
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Returns the standard User-Agent string: `shq-rust/{version}`.
pub fn user_agent() -> String {
	format!("{}/{}", SDK_NAME, env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[test]
	fn user_agent_has_correct_format() {
		let ua = user_agent();
		let parts: Vec<&str> = ua.split('/').collect();
		assert_eq!(parts.len(), 2);
		assert_eq!(parts[0], "shq-rust");
		assert_eq!(parts[1], env!("CARGO_PKG_VERSION"));
	}

	#[test]
	fn builder_with_timeout_builds() {
		let client = builder().timeout(Duration::from_secs(5)).build();
		assert!(client.is_ok());
	}
}
