// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background functions: jobs enqueued by application code and delivered back
//! to a webhook route.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::Router;
use serde::Serialize;
use shq_client::{body_to_value, EnqueueReceipt, EnqueueRequest, NackRequest, SharedClient};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::callback::CallbackUrlHandle;
use crate::error::EnqueueError;
use crate::handler::JobHandler;
use crate::webhook::{self, WebhookOutcome};

/// A named background function bound to a route path.
///
/// Clones share the same handler, client and callback URL.
#[derive(Clone)]
pub struct BackgroundFunction {
	inner: Arc<Inner>,
}

struct Inner {
	name: String,
	path: String,
	handler: Arc<dyn JobHandler>,
	client: SharedClient,
	callback: CallbackUrlHandle,
}

impl BackgroundFunction {
	pub fn new(
		name: impl Into<String>,
		path: impl Into<String>,
		handler: impl JobHandler,
		client: SharedClient,
		callback: CallbackUrlHandle,
	) -> Self {
		Self {
			inner: Arc::new(Inner {
				name: name.into(),
				path: path.into(),
				handler: Arc::new(handler),
				client,
				callback,
			}),
		}
	}

	pub fn name(&self) -> &str {
		&self.inner.name
	}

	pub fn path(&self) -> &str {
		&self.inner.path
	}

	/// The axum route this function is mounted at, e.g. `/api/sendEmail`.
	pub fn route(&self) -> String {
		webhook::route_for(&self.inner.path)
	}

	/// Handle one webhook delivery.
	#[instrument(skip_all, fields(function = %self.inner.name))]
	pub async fn handle_webhook(&self, headers: &HeaderMap, body: &[u8]) -> WebhookOutcome {
		let route = self.route();
		let client = self.inner.client.clone();
		let function_name = self.inner.name.clone();

		webhook::dispatch(
			self.inner.client.as_ref(),
			self.inner.handler.as_ref(),
			headers,
			body,
			&route,
			|error| async move {
				client
					.nack(NackRequest {
						function_name,
						payload: body_to_value(body),
						error,
						headers: webhook::header_map(headers),
					})
					.await
			},
		)
		.await
	}

	/// Router with `POST /api/<path>` mounted. Merge it into the application router.
	pub fn router<S>(&self) -> Router<S>
	where
		S: Clone + Send + Sync + 'static,
	{
		let function = self.clone();
		Router::new().route(
			&self.route(),
			post(move |headers: HeaderMap, body: Bytes| {
				let function = function.clone();
				async move { function.handle_webhook(&headers, &body).await }
			}),
		)
	}

	/// Enqueue a run of this function.
	///
	/// Waits for the callback URL with the handle's default timeout.
	pub async fn enqueue<T>(&self, payload: &T) -> Result<EnqueueReceipt, EnqueueError>
	where
		T: Serialize + ?Sized,
	{
		let payload_json = serde_json::to_value(payload)?;
		let callback = self.inner.callback.wait().await?;
		self.send(payload_json, callback.join(&self.inner.path))
			.await
	}

	/// Enqueue a run, waiting for the callback URL at most `timeout` and
	/// giving up when `cancel` fires.
	pub async fn enqueue_with<T>(
		&self,
		payload: &T,
		timeout: Option<Duration>,
		cancel: &CancellationToken,
	) -> Result<EnqueueReceipt, EnqueueError>
	where
		T: Serialize + ?Sized,
	{
		let payload_json = serde_json::to_value(payload)?;
		let callback = self.inner.callback.wait_with(timeout, cancel).await?;
		self.send(payload_json, callback.join(&self.inner.path))
			.await
	}

	#[instrument(skip(self, payload_json), fields(function = %self.inner.name))]
	async fn send(
		&self,
		payload_json: serde_json::Value,
		callback_url: String,
	) -> Result<EnqueueReceipt, EnqueueError> {
		let receipt = self
			.inner
			.client
			.enqueue(EnqueueRequest {
				function_name: self.inner.name.clone(),
				payload_json,
				callback_url,
			})
			.await?;

		info!(job_id = ?receipt.job_id, "job enqueued");
		Ok(receipt)
	}
}
