// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

pub mod callback;
pub mod client;
pub mod logging;
pub mod tunnel;

pub use callback::{
	CallbackConfig, CallbackConfigLayer, RuntimeEnvironment, DEFAULT_CALLBACK_PORT,
	DEFAULT_RESOLVE_TIMEOUT_SECS,
};
pub use client::{ClientConfig, ClientConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use tunnel::{TunnelConfig, TunnelConfigLayer};
