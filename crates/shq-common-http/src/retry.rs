// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Retry with exponential backoff for calls to the hosted queue.

use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Whether a response status from the hosted queue is worth another attempt.
pub fn is_retryable_status(status: StatusCode) -> bool {
	matches!(
		status,
		StatusCode::REQUEST_TIMEOUT
			| StatusCode::INTERNAL_SERVER_ERROR
			| StatusCode::BAD_GATEWAY
			| StatusCode::SERVICE_UNAVAILABLE
			| StatusCode::GATEWAY_TIMEOUT
	)
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
}

impl RetryConfig {
	/// A config that performs exactly one attempt.
	pub fn none() -> Self {
		Self {
			max_attempts: 1,
			..Self::default()
		}
	}
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(200),
			max_delay: Duration::from_secs(5),
			backoff_factor: 2.0,
			jitter: true,
		}
	}
}

pub trait RetryableError {
	fn is_retryable(&self) -> bool;
}

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		if self.is_timeout() || self.is_connect() {
			return true;
		}

		self.status().map(is_retryable_status).unwrap_or(false)
	}
}

fn calculate_delay(cfg: &RetryConfig, attempt: u32) -> Duration {
	let exponential = cfg.base_delay.as_secs_f64() * cfg.backoff_factor.powi(attempt as i32);
	let capped = exponential.min(cfg.max_delay.as_secs_f64());

	let delay = if cfg.jitter {
		capped * (0.5 + fastrand::f64())
	} else {
		capped
	};

	Duration::from_secs_f64(delay)
}

/// Run `f` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` is reached.
pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, mut f: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Debug,
{
	let mut attempt = 0;

	loop {
		let err = match f().await {
			Ok(result) => return Ok(result),
			Err(err) => err,
		};
		attempt += 1;

		if !err.is_retryable() {
			return Err(err);
		}

		if attempt >= cfg.max_attempts {
			warn!(
				error = ?err,
				attempt,
				max_attempts = cfg.max_attempts,
				"max retry attempts exhausted"
			);
			return Err(err);
		}

		let delay = calculate_delay(cfg, attempt - 1);
		warn!(
			error = ?err,
			attempt,
			max_attempts = cfg.max_attempts,
			delay_ms = delay.as_millis() as u64,
			"retrying after error"
		);

		tokio::time::sleep(delay).await;
	}
}
