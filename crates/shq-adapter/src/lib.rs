// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Axum adapter for the SHQ hosted job queue.
//!
//! A [`BackgroundFunction`] is a named handler mounted at `POST /api/<path>`.
//! Application code enqueues runs through it; the hosted queue later delivers
//! each job back to that route with a signed body. A [`ScheduledTask`] has the
//! same webhook contract but is triggered by the queue's own schedule.
//!
//! ```ignore
//! let config = shq_config::load_config()?;
//! let (shq, _resolution) = ShqContext::from_config(&config)?;
//!
//! let send_email = shq.background_function("sendEmail", "sendEmail", |job: JobPayload| async move {
//!     mailer::send(&job).await?;
//!     Ok(())
//! });
//!
//! let app = Router::new().merge(send_email.router());
//! send_email.enqueue(&json!({"to": "a@b.com"})).await?;
//! ```

mod background;
mod callback;
mod context;
mod error;
mod handler;
mod scheduled;
mod webhook;

pub use background::BackgroundFunction;
pub use callback::{
	CallbackState, CallbackUrl, CallbackUrlHandle, CallbackUrlResolver, CallbackUrlSetter,
	Resolution,
};
pub use context::ShqContext;
pub use error::{CallbackError, EnqueueError, SetupError};
pub use handler::JobHandler;
pub use scheduled::ScheduledTask;
pub use webhook::{header_map, route_for, ErrorBody, WebhookOutcome, INVALID_SIGNATURE};

pub use shq_client::{EnqueueReceipt, JobPayload};
