// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client for the hosted SHQ job queue.
//!
//! The adapter consumes four capabilities from the hosted service, captured by
//! [`JobQueueClient`]:
//!
//! - **verify_and_decrypt**: authenticate a webhook body and decode the job payload
//! - **enqueue**: schedule a background function run with a callback URL
//! - **nack**: report a failed background function run
//! - **nack_scheduled_task**: report a failed scheduled task run
//!
//! [`HttpJobQueueClient`] implements them over HTTP. With the `test-util`
//! feature, [`testing::RecordingClient`] records calls in memory instead.

mod client;
mod error;
mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use client::{
	verify_signed_payload, HttpJobQueueClient, HttpJobQueueClientBuilder, JobQueueClient,
	SharedClient,
};
pub use error::{ClientError, Result};
pub use types::{
	body_to_value, EnqueueReceipt, EnqueueRequest, JobPayload, NackRequest, ScheduledTaskNack,
};
