// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{CallbackConfigLayer, ClientConfigLayer, LoggingConfigLayer, TunnelConfigLayer};

/// Adapter configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShqConfigLayer {
	#[serde(default)]
	pub client: Option<ClientConfigLayer>,
	#[serde(default)]
	pub callback: Option<CallbackConfigLayer>,
	#[serde(default)]
	pub tunnel: Option<TunnelConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl ShqConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ShqConfigLayer) {
		merge_option(&mut self.client, other.client, ClientConfigLayer::merge);
		merge_option(&mut self.callback, other.callback, CallbackConfigLayer::merge);
		merge_option(&mut self.tunnel, other.tunnel, TunnelConfigLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}
