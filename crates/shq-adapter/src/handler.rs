// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::future::Future;

use async_trait::async_trait;
use shq_client::JobPayload;

/// User code run for each delivered job.
///
/// An error is reported to the hosted queue (which may retry the job) and
/// returned to the caller as a 500. Any async closure
/// `Fn(JobPayload) -> impl Future<Output = anyhow::Result<()>>` is a handler.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
	async fn handle(&self, job: JobPayload) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> JobHandler for F
where
	F: Fn(JobPayload) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
	async fn handle(&self, job: JobPayload) -> anyhow::Result<()> {
		(self)(job).await
	}
}
