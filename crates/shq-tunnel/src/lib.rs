// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Development tunnels for job callbacks.
//!
//! When no public callback URL is configured in development, the adapter asks
//! a [`TunnelProvider`] to expose the local callback port and uses the
//! returned public URL instead.

pub mod error;
pub mod ngrok;

use async_trait::async_trait;

pub use error::{Result, TunnelError};
pub use ngrok::NgrokAgent;

/// Something that can expose a local port on a public URL.
#[async_trait]
pub trait TunnelProvider: Send + Sync {
	/// Expose `port` and return the public base URL, e.g. `https://abcd.ngrok.app`.
	async fn connect(&self, port: u16) -> Result<String>;
}
