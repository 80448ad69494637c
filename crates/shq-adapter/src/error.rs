// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the adapter.

use std::time::Duration;

use shq_client::ClientError;
use shq_tunnel::TunnelError;
use thiserror::Error;

/// Waiting for the callback URL did not produce one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
	#[error("timed out after {0:?} waiting for the callback URL")]
	Timeout(Duration),

	#[error("cancelled while waiting for the callback URL")]
	Cancelled,

	#[error("callback URL cannot be resolved: {0}")]
	Unresolvable(String),
}

/// Enqueueing a background function run failed.
#[derive(Debug, Error)]
pub enum EnqueueError {
	#[error(transparent)]
	Callback(#[from] CallbackError),

	#[error("failed to serialize job payload: {0}")]
	Serialize(#[from] serde_json::Error),

	/// Returned by the hosted queue client, unchanged.
	#[error(transparent)]
	Client(#[from] ClientError),
}

/// Building an [`ShqContext`](crate::ShqContext) from configuration failed.
#[derive(Debug, Error)]
pub enum SetupError {
	#[error("failed to build SHQ client: {0}")]
	Client(#[from] ClientError),

	#[error("failed to configure tunnel: {0}")]
	Tunnel(#[from] TunnelError),
}
