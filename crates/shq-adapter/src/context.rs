// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use shq_client::{HttpJobQueueClientBuilder, SharedClient};
use shq_config::ShqConfig;
use shq_tunnel::NgrokAgent;
use tracing::info;

use crate::background::BackgroundFunction;
use crate::callback::{CallbackUrlHandle, CallbackUrlResolver, Resolution};
use crate::error::SetupError;
use crate::handler::JobHandler;
use crate::scheduled::ScheduledTask;

/// Client and callback URL shared by every function and task of an application.
#[derive(Clone)]
pub struct ShqContext {
	client: SharedClient,
	callback: CallbackUrlHandle,
}

impl ShqContext {
	pub fn new(client: SharedClient, callback: CallbackUrlHandle) -> Self {
		Self { client, callback }
	}

	/// Build the HTTP client and start callback URL resolution.
	///
	/// Must be called inside a Tokio runtime. The returned [`Resolution`]
	/// carries the setter when the URL has to be provided by hand.
	pub fn from_config(config: &ShqConfig) -> Result<(Self, Resolution), SetupError> {
		let client = HttpJobQueueClientBuilder::from_config(&config.client).build()?;
		let tunnel = NgrokAgent::from_config(&config.tunnel)?;

		let (callback, resolution) = CallbackUrlResolver::new(config.callback.clone())
			.with_tunnel(Arc::new(tunnel))
			.resolve();

		info!(
			api_url = %client.base_url(),
			environment = %config.callback.environment,
			"SHQ context ready"
		);

		Ok((Self::new(Arc::new(client), callback), resolution))
	}

	pub fn client(&self) -> &SharedClient {
		&self.client
	}

	pub fn callback(&self) -> &CallbackUrlHandle {
		&self.callback
	}

	pub fn background_function(
		&self,
		name: impl Into<String>,
		path: impl Into<String>,
		handler: impl JobHandler,
	) -> BackgroundFunction {
		BackgroundFunction::new(
			name,
			path,
			handler,
			self.client.clone(),
			self.callback.clone(),
		)
	}

	pub fn scheduled_task(&self, path: impl Into<String>, handler: impl JobHandler) -> ScheduledTask {
		ScheduledTask::new(path, handler, self.client.clone())
	}
}
