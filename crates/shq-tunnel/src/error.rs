// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TunnelError {
	#[error("tunnel agent request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("tunnel agent error: {status} - {message}")]
	Api { status: u16, message: String },

	#[error("tunnel agent returned no public URL")]
	MissingPublicUrl,

	#[error("URL parse error: {0}")]
	UrlParse(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, TunnelError>;
