// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wire types exchanged with the hosted queue.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A decoded job payload. Opaque to the adapter.
pub type JobPayload = Map<String, Value>;

/// Request to schedule a background function run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
	pub function_name: String,
	#[serde(rename = "payloadJSON")]
	pub payload_json: Value,
	pub callback_url: String,
}

/// Acknowledgement returned by the hosted queue for an enqueue call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueReceipt {
	#[serde(default, alias = "id", skip_serializing_if = "Option::is_none")]
	pub job_id: Option<String>,
	/// Any other fields the service returns, kept verbatim.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// Failure report for a background function run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NackRequest {
	pub function_name: String,
	/// The original request body: JSON when it parses, a string otherwise.
	pub payload: Value,
	pub error: String,
	pub headers: BTreeMap<String, String>,
}

/// Failure report for a scheduled task run. Scheduled tasks are tracked by path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTaskNack {
	pub path: String,
	pub error: String,
}

/// Turn a raw webhook body into the `payload` field of a [`NackRequest`].
pub fn body_to_value(body: &[u8]) -> Value {
	serde_json::from_slice(body)
		.unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}
