// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HMAC-SHA256 signatures for SHQ job webhooks.
//!
//! The hosted queue signs every callback body with the account token and sends
//! the hex digest in the [`SIGNATURE_HEADER`] header.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature on inbound job callbacks.
pub const SIGNATURE_HEADER: &str = "shq-webhook-signature";

/// Compute the hex-encoded HMAC-SHA256 signature of `body`.
pub fn sign(secret: &[u8], body: &[u8]) -> String {
	let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
	mac.update(body);
	hex::encode(mac.finalize().into_bytes())
}

/// Verify a hex-encoded HMAC-SHA256 signature of `body`.
///
/// Tolerates surrounding whitespace and an optional `sha256=` prefix. The
/// comparison is constant time.
pub fn verify(secret: &[u8], body: &[u8], signature: &str) -> bool {
	let signature = signature.trim();
	let signature = signature.strip_prefix("sha256=").unwrap_or(signature);

	let expected = match hex::decode(signature) {
		Ok(bytes) => bytes,
		Err(_) => return false,
	};

	let mut mac = match HmacSha256::new_from_slice(secret) {
		Ok(m) => m,
		Err(_) => return false,
	};

	mac.update(body);
	mac.verify_slice(&expected).is_ok()
}
