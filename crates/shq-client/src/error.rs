// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the hosted queue client.

use reqwest::StatusCode;
use shq_common_http::{is_retryable_status, RetryableError};
use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the hosted queue.
#[derive(Debug, Error)]
pub enum ClientError {
	/// Token was not provided to the builder.
	#[error("missing SHQ token")]
	MissingToken,

	/// Base URL was not provided to the builder.
	#[error("missing SHQ API base URL")]
	MissingBaseUrl,

	/// Network-level error during HTTP communication.
	#[error("request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// Token rejected by the hosted queue.
	#[error("unauthorized: the SHQ token was rejected")]
	Unauthorized,

	/// Rate limit exceeded.
	#[error("rate limited (retry after {retry_after_secs:?}s)")]
	RateLimited { retry_after_secs: Option<u64> },

	/// Non-success response from the hosted queue.
	#[error("SHQ API error: {status} - {message}")]
	Api { status: u16, message: String },

	/// Request or response body could not be (de)serialized.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// A test double was told to fail.
	#[error("{0}")]
	Other(String),
}

impl RetryableError for ClientError {
	fn is_retryable(&self) -> bool {
		match self {
			Self::RequestFailed(e) => e.is_retryable(),
			Self::Api { status, .. } => StatusCode::from_u16(*status)
				.map(is_retryable_status)
				.unwrap_or(false),
			_ => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_error_display() {
		let err = ClientError::Api {
			status: 422,
			message: "unknown function".to_string(),
		};
		assert_eq!(err.to_string(), "SHQ API error: 422 - unknown function");
	}

	#[test]
	fn test_only_transient_api_errors_are_retryable() {
		let api = |status| ClientError::Api {
			status,
			message: String::new(),
		};
		assert!(api(503).is_retryable());
		assert!(api(500).is_retryable());
		assert!(!api(422).is_retryable());
		assert!(!ClientError::Unauthorized.is_retryable());
		assert!(!ClientError::RateLimited {
			retry_after_secs: Some(1)
		}
		.is_retryable());
	}
}
