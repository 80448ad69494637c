// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret wrapper that keeps the SHQ token out of logs.
//!
//! [`SecretString`] prints `[REDACTED]` for both `Debug` and `Display`, is zeroed
//! on drop, and requires an explicit [`SecretString::expose`] to read.

use std::fmt;
use zeroize::Zeroize;

/// The redaction placeholder used in all output.
pub const REDACTED: &str = "[REDACTED]";

#[derive(Zeroize)]
#[zeroize(drop)]
pub struct SecretString {
	inner: String,
}

impl SecretString {
	pub fn new(inner: impl Into<String>) -> Self {
		Self {
			inner: inner.into(),
		}
	}

	/// Explicitly access the inner value.
	pub fn expose(&self) -> &str {
		&self.inner
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}
}

impl Clone for SecretString {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("SecretString").field(&REDACTED).finish()
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl Eq for SecretString {}

impl From<String> for SecretString {
	fn from(inner: String) -> Self {
		Self::new(inner)
	}
}

impl From<&str> for SecretString {
	fn from(inner: &str) -> Self {
		Self::new(inner)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn debug_is_redacted() {
		let secret = SecretString::new("shq_live_token");
		let out = format!("{secret:?}");
		assert!(!out.contains("shq_live_token"));
		assert_eq!(out, "SecretString(\"[REDACTED]\")");
	}

	#[test]
	fn display_is_redacted() {
		let secret = SecretString::new("shq_live_token");
		assert_eq!(format!("{secret}"), REDACTED);
	}

	#[test]
	fn expose_returns_inner_value() {
		let secret = SecretString::from("T");
		assert_eq!(secret.expose(), "T");
		assert!(!secret.is_empty());
	}

	proptest! {
		#[test]
		fn prop_formatting_never_leaks(value in "[a-zA-Z0-9_]{12,64}") {
			let secret = SecretString::new(value.clone());
			let debug = format!("{:?}", secret);
			let display = secret.to_string();
			prop_assert!(!debug.contains(&value));
			prop_assert!(!display.contains(&value));
		}
	}
}
