// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Callback URL resolution.
//!
//! The hosted queue delivers every job to `<callback base>/<path>`, where the
//! base always ends in `/api/`. The base comes from, in order:
//!
//! 1. the platform deployment host (`VERCEL_URL`), as `https://<host>/api/`
//! 2. an explicit base URL (`SHQ_BASE_CALLBACK_URL`), as `<base>/api/`
//! 3. production: nothing, resolution fails
//! 4. development: a tunnel to the local callback port, established in the background
//! 5. anything else: nothing, the URL stays pending until set by hand
//!
//! Consumers hold a [`CallbackUrlHandle`] and wait on it; the wait ends when
//! the URL resolves, resolution fails, the timeout elapses or the caller
//! cancels.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use shq_config::{CallbackConfig, RuntimeEnvironment, DEFAULT_RESOLVE_TIMEOUT_SECS};
use shq_tunnel::TunnelProvider;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::CallbackError;

const API_SEGMENT: &str = "api/";

/// Public base URL for job callbacks. Always ends with `/api/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallbackUrl(String);

impl CallbackUrl {
	/// `https://app.example.com` becomes `https://app.example.com/api/`.
	pub fn from_base(base: &str) -> Self {
		Self(format!("{}/{API_SEGMENT}", base.trim_end_matches('/')))
	}

	/// Build from a bare deployment host such as `my-app.vercel.app`.
	///
	/// A scheme, if present, is replaced by `https`.
	pub fn from_deployment_host(host: &str) -> Self {
		let host = host
			.trim()
			.trim_start_matches("https://")
			.trim_start_matches("http://");
		Self::from_base(&format!("https://{host}"))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Full callback URL for a function path. One leading `/` on `path` is dropped.
	pub fn join(&self, path: &str) -> String {
		let path = path.strip_prefix('/').unwrap_or(path);
		format!("{}{path}", self.0)
	}
}

impl fmt::Display for CallbackUrl {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Current state of callback URL resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackState {
	Pending,
	Resolved(CallbackUrl),
	Failed(String),
}

impl CallbackState {
	fn is_settled(&self) -> bool {
		!matches!(self, Self::Pending)
	}
}

/// Read side of the callback URL. Cheap to clone; every clone sees the same state.
#[derive(Debug, Clone)]
pub struct CallbackUrlHandle {
	rx: watch::Receiver<CallbackState>,
	default_timeout: Option<Duration>,
	// Holds the channel open when no setter is guaranteed to outlive the handle.
	_keepalive: Option<Arc<watch::Sender<CallbackState>>>,
}

/// Write side of the callback URL. Settles the state exactly once.
#[derive(Debug)]
pub struct CallbackUrlSetter {
	tx: Arc<watch::Sender<CallbackState>>,
}

impl CallbackUrlSetter {
	pub fn resolve(self, url: CallbackUrl) {
		self.tx.send_replace(CallbackState::Resolved(url));
	}

	pub fn fail(self, reason: impl Into<String>) {
		self.tx.send_replace(CallbackState::Failed(reason.into()));
	}
}

impl CallbackUrlHandle {
	fn from_state(state: CallbackState) -> (Arc<watch::Sender<CallbackState>>, Self) {
		let (tx, rx) = watch::channel(state);
		let handle = Self {
			rx,
			default_timeout: Some(Duration::from_secs(DEFAULT_RESOLVE_TIMEOUT_SECS)),
			_keepalive: None,
		};
		(Arc::new(tx), handle)
	}

	/// A handle that is already resolved.
	pub fn resolved(url: CallbackUrl) -> Self {
		Self::from_state(CallbackState::Resolved(url)).1
	}

	/// A handle that has already failed.
	pub fn failed(reason: impl Into<String>) -> Self {
		Self::from_state(CallbackState::Failed(reason.into())).1
	}

	/// A pending handle and the setter that settles it.
	///
	/// Dropping the setter without settling fails every waiter.
	pub fn pending() -> (CallbackUrlSetter, Self) {
		let (tx, handle) = Self::from_state(CallbackState::Pending);
		(CallbackUrlSetter { tx }, handle)
	}

	/// A pending handle that stays pending after the setter is dropped.
	///
	/// Waiters end only when the setter settles the URL, the timeout
	/// elapses or they are cancelled.
	fn pending_detached() -> (CallbackUrlSetter, Self) {
		let (tx, mut handle) = Self::from_state(CallbackState::Pending);
		handle._keepalive = Some(tx.clone());
		(CallbackUrlSetter { tx }, handle)
	}

	/// Timeout used by [`wait`](Self::wait). `None` waits forever.
	pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.default_timeout = timeout;
		self
	}

	pub fn state(&self) -> CallbackState {
		self.rx.borrow().clone()
	}

	/// The resolved URL, without waiting.
	pub fn current(&self) -> Option<CallbackUrl> {
		match &*self.rx.borrow() {
			CallbackState::Resolved(url) => Some(url.clone()),
			_ => None,
		}
	}

	/// Wait for the URL using the handle's default timeout.
	pub async fn wait(&self) -> Result<CallbackUrl, CallbackError> {
		self.wait_with(self.default_timeout, &CancellationToken::new())
			.await
	}

	/// Wait for the URL until it settles, `timeout` elapses or `cancel` fires.
	pub async fn wait_with(
		&self,
		timeout: Option<Duration>,
		cancel: &CancellationToken,
	) -> Result<CallbackUrl, CallbackError> {
		let mut rx = self.rx.clone();
		let settled = async move {
			let state = match rx.wait_for(CallbackState::is_settled).await {
				Ok(state) => state.clone(),
				Err(_) => {
					return Err(CallbackError::Unresolvable(
						"resolver dropped before settling".to_string(),
					))
				}
			};
			match state {
				CallbackState::Resolved(url) => Ok(url),
				CallbackState::Failed(reason) => Err(CallbackError::Unresolvable(reason)),
				CallbackState::Pending => Err(CallbackError::Unresolvable(
					"resolver left the URL pending".to_string(),
				)),
			}
		};

		let bounded = async move {
			match timeout {
				Some(limit) => tokio::time::timeout(limit, settled)
					.await
					.map_err(|_| CallbackError::Timeout(limit))?,
				None => settled.await,
			}
		};

		tokio::select! {
			biased;
			_ = cancel.cancelled() => Err(CallbackError::Cancelled),
			result = bounded => result,
		}
	}
}

/// What [`CallbackUrlResolver::resolve`] decided.
#[derive(Debug)]
pub enum Resolution {
	/// Static configuration produced the URL.
	Resolved(CallbackUrl),
	/// A tunnel is being established in the background.
	Tunneling,
	/// No source applies in this environment. The setter may settle the URL later.
	Unresolved(CallbackUrlSetter),
	/// The URL cannot be resolved.
	Failed(String),
}

/// Decides the callback URL from configuration.
pub struct CallbackUrlResolver {
	config: CallbackConfig,
	tunnel: Option<Arc<dyn TunnelProvider>>,
}

impl CallbackUrlResolver {
	pub fn new(config: CallbackConfig) -> Self {
		Self {
			config,
			tunnel: None,
		}
	}

	/// Tunnel used in development when no static URL is configured.
	pub fn with_tunnel(mut self, tunnel: Arc<dyn TunnelProvider>) -> Self {
		self.tunnel = Some(tunnel);
		self
	}

	/// The URL from static configuration alone, if any.
	pub fn static_url(&self) -> Option<CallbackUrl> {
		if let Some(host) = &self.config.deployment_url {
			return Some(CallbackUrl::from_deployment_host(host));
		}
		self.config
			.base_url
			.as_deref()
			.map(CallbackUrl::from_base)
	}

	/// Start resolution and return the handle consumers wait on.
	///
	/// In development this spawns the tunnel task, so it must run inside a
	/// Tokio runtime.
	pub fn resolve(self) -> (CallbackUrlHandle, Resolution) {
		let timeout = self.config.resolve_timeout;

		if let Some(url) = self.static_url() {
			info!(callback_url = %url, "callback URL resolved from configuration");
			let handle = CallbackUrlHandle::resolved(url.clone()).with_timeout(timeout);
			return (handle, Resolution::Resolved(url));
		}

		match &self.config.environment {
			RuntimeEnvironment::Production => {
				let reason =
					"no deployment URL or base callback URL configured in production".to_string();
				error!(
					"callback URL not configured in production; set VERCEL_URL or SHQ_BASE_CALLBACK_URL"
				);
				let handle = CallbackUrlHandle::failed(reason.clone()).with_timeout(timeout);
				(handle, Resolution::Failed(reason))
			}
			RuntimeEnvironment::Development => match self.tunnel {
				Some(tunnel) => {
					let (setter, handle) = CallbackUrlHandle::pending();
					spawn_tunnel(tunnel, self.config.port, setter);
					(handle.with_timeout(timeout), Resolution::Tunneling)
				}
				None => {
					let reason = "no tunnel provider configured for development".to_string();
					error!("{reason}");
					let handle = CallbackUrlHandle::failed(reason.clone()).with_timeout(timeout);
					(handle, Resolution::Failed(reason))
				}
			},
			RuntimeEnvironment::Other(name) => {
				warn!(
					environment = %name,
					"no callback URL source for this environment; enqueue will wait"
				);
				let (setter, handle) = CallbackUrlHandle::pending_detached();
				(handle.with_timeout(timeout), Resolution::Unresolved(setter))
			}
		}
	}
}

fn spawn_tunnel(tunnel: Arc<dyn TunnelProvider>, port: u16, setter: CallbackUrlSetter) {
	info!(port, "starting development tunnel for job callbacks");
	tokio::spawn(async move {
		match tunnel.connect(port).await {
			Ok(public_url) => {
				let url = CallbackUrl::from_base(&public_url);
				info!(callback_url = %url, "callback URL resolved through tunnel");
				setter.resolve(url);
			}
			Err(e) => {
				error!(error = %e, port, "failed to establish development tunnel");
				setter.fail(format!("tunnel failed: {e}"));
			}
		}
	});
}
