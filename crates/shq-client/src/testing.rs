// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory [`JobQueueClient`] for tests.
//!
//! Verifies signatures exactly like [`HttpJobQueueClient`](crate::HttpJobQueueClient)
//! and records every outbound call instead of sending it.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::client::{verify_signed_payload, JobQueueClient};
use crate::error::{ClientError, Result};
use crate::types::{EnqueueReceipt, EnqueueRequest, JobPayload, NackRequest, ScheduledTaskNack};

#[derive(Default)]
struct Recorded {
	enqueued: Vec<EnqueueRequest>,
	nacks: Vec<NackRequest>,
	scheduled_nacks: Vec<ScheduledTaskNack>,
}

pub struct RecordingClient {
	token: String,
	receipt: EnqueueReceipt,
	enqueue_error: Option<String>,
	nack_error: Option<String>,
	recorded: Mutex<Recorded>,
}

impl RecordingClient {
	pub fn new(token: impl Into<String>) -> Self {
		Self {
			token: token.into(),
			receipt: EnqueueReceipt {
				job_id: Some("job_1".to_string()),
				..Default::default()
			},
			enqueue_error: None,
			nack_error: None,
			recorded: Mutex::new(Recorded::default()),
		}
	}

	/// Receipt returned by every successful enqueue.
	pub fn with_receipt(mut self, receipt: EnqueueReceipt) -> Self {
		self.receipt = receipt;
		self
	}

	/// Make every enqueue fail with `ClientError::Other(message)`.
	pub fn failing_enqueue(mut self, message: impl Into<String>) -> Self {
		self.enqueue_error = Some(message.into());
		self
	}

	/// Make every nack fail with `ClientError::Other(message)`. Calls are still recorded.
	pub fn failing_nack(mut self, message: impl Into<String>) -> Self {
		self.nack_error = Some(message.into());
		self
	}

	/// Sign `body` the way the hosted queue would.
	pub fn sign(&self, body: &[u8]) -> String {
		shq_common_webhook::sign(self.token.as_bytes(), body)
	}

	pub fn enqueued(&self) -> Vec<EnqueueRequest> {
		self.lock().enqueued.clone()
	}

	pub fn nacks(&self) -> Vec<NackRequest> {
		self.lock().nacks.clone()
	}

	pub fn scheduled_nacks(&self) -> Vec<ScheduledTaskNack> {
		self.lock().scheduled_nacks.clone()
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
		self.recorded.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}
}

#[async_trait]
impl JobQueueClient for RecordingClient {
	fn verify_and_decrypt(&self, body: &[u8], signature: &str) -> Option<JobPayload> {
		verify_signed_payload(&self.token, body, signature)
	}

	async fn enqueue(&self, request: EnqueueRequest) -> Result<EnqueueReceipt> {
		if let Some(message) = &self.enqueue_error {
			return Err(ClientError::Other(message.clone()));
		}
		self.lock().enqueued.push(request);
		Ok(self.receipt.clone())
	}

	async fn nack(&self, request: NackRequest) -> Result<()> {
		self.lock().nacks.push(request);
		match &self.nack_error {
			Some(message) => Err(ClientError::Other(message.clone())),
			None => Ok(()),
		}
	}

	async fn nack_scheduled_task(&self, request: ScheduledTaskNack) -> Result<()> {
		self.lock().scheduled_nacks.push(request);
		match &self.nack_error {
			Some(message) => Err(ClientError::Other(message.clone())),
			None => Ok(()),
		}
	}
}
