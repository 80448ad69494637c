// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for the SHQ adapter.
//!
//! This crate provides:
//! - A pre-configured HTTP client with a consistent User-Agent header
//! - Retry logic with exponential backoff for transient failures

mod client;
mod retry;

pub use client::{builder, user_agent};
pub use retry::{is_retryable_status, retry, RetryConfig, RetryableError};
