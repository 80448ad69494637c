// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scheduled tasks: jobs the hosted queue runs on its own schedule.
//!
//! The webhook contract matches [`BackgroundFunction`](crate::BackgroundFunction);
//! failures are reported by path instead of function name, and there is no
//! enqueue.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::Router;
use shq_client::{ScheduledTaskNack, SharedClient};
use tracing::instrument;

use crate::handler::JobHandler;
use crate::webhook::{self, WebhookOutcome};

#[derive(Clone)]
pub struct ScheduledTask {
	inner: Arc<Inner>,
}

struct Inner {
	path: String,
	handler: Arc<dyn JobHandler>,
	client: SharedClient,
}

impl ScheduledTask {
	pub fn new(path: impl Into<String>, handler: impl JobHandler, client: SharedClient) -> Self {
		Self {
			inner: Arc::new(Inner {
				path: path.into(),
				handler: Arc::new(handler),
				client,
			}),
		}
	}

	pub fn path(&self) -> &str {
		&self.inner.path
	}

	pub fn route(&self) -> String {
		webhook::route_for(&self.inner.path)
	}

	#[instrument(skip_all, fields(task = %self.inner.path))]
	pub async fn handle_webhook(&self, headers: &HeaderMap, body: &[u8]) -> WebhookOutcome {
		let route = self.route();
		let client = self.inner.client.clone();
		let path = self.inner.path.clone();

		webhook::dispatch(
			self.inner.client.as_ref(),
			self.inner.handler.as_ref(),
			headers,
			body,
			&route,
			|error| async move {
				client
					.nack_scheduled_task(ScheduledTaskNack { path, error })
					.await
			},
		)
		.await
	}

	pub fn router<S>(&self) -> Router<S>
	where
		S: Clone + Send + Sync + 'static,
	{
		let task = self.clone();
		Router::new().route(
			&self.route(),
			post(move |headers: HeaderMap, body: Bytes| {
				let task = task.clone();
				async move { task.handle_webhook(&headers, &body).await }
			}),
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::http::HeaderValue;
	use shq_client::testing::RecordingClient;
	use shq_client::JobPayload;
	use shq_common_webhook::SIGNATURE_HEADER;

	fn nightly(client: Arc<RecordingClient>, fail: bool) -> ScheduledTask {
		ScheduledTask::new(
			"nightly-report",
			move |_job: JobPayload| async move {
				anyhow::ensure!(!fail, "report generation failed");
				Ok(())
			},
			client,
		)
	}

	fn signed(client: &RecordingClient, body: &[u8]) -> HeaderMap {
		let mut headers = HeaderMap::new();
		headers.insert(
			SIGNATURE_HEADER,
			HeaderValue::from_str(&client.sign(body)).unwrap(),
		);
		headers
	}

	#[tokio::test]
	async fn test_completed_does_not_nack() {
		let client = Arc::new(RecordingClient::new("T"));
		let task = nightly(client.clone(), false);
		let body = br#"{}"#;

		let outcome = task.handle_webhook(&signed(&client, body), body).await;
		assert_eq!(outcome, WebhookOutcome::Completed);
		assert!(client.scheduled_nacks().is_empty());
	}

	#[tokio::test]
	async fn test_failure_nacks_by_path() {
		let client = Arc::new(RecordingClient::new("T"));
		let task = nightly(client.clone(), true);
		let body = br#"{}"#;

		let outcome = task.handle_webhook(&signed(&client, body), body).await;
		assert_eq!(
			outcome,
			WebhookOutcome::Failed {
				error: "report generation failed".to_string()
			}
		);

		let nacks = client.scheduled_nacks();
		assert_eq!(nacks.len(), 1);
		assert_eq!(nacks[0].path, "nightly-report");
		assert_eq!(nacks[0].error, "report generation failed");
		assert!(client.nacks().is_empty());
	}

	#[tokio::test]
	async fn test_invalid_signature_rejected() {
		let client = Arc::new(RecordingClient::new("T"));
		let task = nightly(client.clone(), true);

		let outcome = task.handle_webhook(&HeaderMap::new(), b"{}").await;
		assert_eq!(outcome, WebhookOutcome::Rejected);
		assert!(client.scheduled_nacks().is_empty());
	}

	#[test]
	fn test_route() {
		let task = nightly(Arc::new(RecordingClient::new("T")), false);
		assert_eq!(task.route(), "/api/nightly-report");
	}
}
