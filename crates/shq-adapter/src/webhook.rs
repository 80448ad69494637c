// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Webhook dispatch shared by background functions and scheduled tasks.
//!
//! Every delivery moves through `Received -> Verified -> Executing` and ends in
//! exactly one [`WebhookOutcome`]:
//!
//! | Outcome     | Status | Body                           |
//! |-------------|--------|--------------------------------|
//! | `Rejected`  | 200    | `{"error":"invalid signature"}` |
//! | `Completed` | 200    | empty                          |
//! | `Failed`    | 500    | `{"error":"<handler error>"}`  |
//!
//! Rejections answer 200 so the hosted queue does not retry a delivery that
//! will never verify.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Instant;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use shq_client::{ClientError, JobQueueClient};
use shq_common_webhook::SIGNATURE_HEADER;
use tracing::{error, info, warn};

use crate::handler::JobHandler;

pub const INVALID_SIGNATURE: &str = "invalid signature";

/// JSON error body returned by webhook endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
	pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
	Rejected,
	Completed,
	Failed { error: String },
}

impl WebhookOutcome {
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Rejected | Self::Completed => StatusCode::OK,
			Self::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for WebhookOutcome {
	fn into_response(self) -> Response {
		let status = self.status();
		match self {
			Self::Completed => status.into_response(),
			Self::Rejected => (
				status,
				Json(ErrorBody {
					error: INVALID_SIGNATURE.to_string(),
				}),
			)
				.into_response(),
			Self::Failed { error } => (status, Json(ErrorBody { error })).into_response(),
		}
	}
}

/// Signature header value, or empty when missing or not valid UTF-8.
pub(crate) fn signature(headers: &HeaderMap) -> &str {
	headers
		.get(SIGNATURE_HEADER)
		.and_then(|v| v.to_str().ok())
		.unwrap_or_default()
}

/// Request headers as sent in a nack. Repeated headers are joined with `, `.
pub fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
	let mut map: BTreeMap<String, String> = BTreeMap::new();
	for (name, value) in headers {
		let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
		map.entry(name.as_str().to_string())
			.and_modify(|existing| {
				existing.push_str(", ");
				existing.push_str(&value);
			})
			.or_insert(value);
	}
	map
}

/// Axum route for a function path: `sendEmail` and `/sendEmail` both mount at `/api/sendEmail`.
pub fn route_for(path: &str) -> String {
	format!("/api/{}", path.strip_prefix('/').unwrap_or(path))
}

/// Verify, run the handler and report a failure through `nack`.
///
/// A failing `nack` is logged; the handler error still decides the outcome.
pub(crate) async fn dispatch<N, Fut>(
	client: &dyn JobQueueClient,
	handler: &dyn JobHandler,
	headers: &HeaderMap,
	body: &[u8],
	route: &str,
	nack: N,
) -> WebhookOutcome
where
	N: FnOnce(String) -> Fut,
	Fut: Future<Output = Result<(), ClientError>>,
{
	let Some(job) = client.verify_and_decrypt(body, signature(headers)) else {
		warn!(route, "rejected webhook with invalid signature");
		return WebhookOutcome::Rejected;
	};

	let started = Instant::now();
	match handler.handle(job).await {
		Ok(()) => {
			info!(
				route,
				elapsed_ms = started.elapsed().as_millis() as u64,
				"job completed"
			);
			WebhookOutcome::Completed
		}
		Err(e) => {
			let error = e.to_string();
			error!(
				route,
				error = %error,
				elapsed_ms = started.elapsed().as_millis() as u64,
				"job failed"
			);
			if let Err(nack_err) = nack(error.clone()).await {
				error!(route, error = %nack_err, "failed to report job failure");
			}
			WebhookOutcome::Failed { error }
		}
	}
}
