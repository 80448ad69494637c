// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Hosted queue client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shq_common_http::RetryConfig;
use shq_config::{ClientConfig, SecretString};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{ClientError, Result};
use crate::types::{EnqueueReceipt, EnqueueRequest, JobPayload, NackRequest, ScheduledTaskNack};

/// The hosted queue capabilities the adapter relies on.
///
/// Implemented over HTTP by [`HttpJobQueueClient`]; tests substitute a double.
#[async_trait]
pub trait JobQueueClient: Send + Sync {
	/// Check the webhook signature and decode the job payload.
	///
	/// Returns `None` when the signature does not match or the body is not a
	/// job payload.
	fn verify_and_decrypt(&self, body: &[u8], signature: &str) -> Option<JobPayload>;

	/// Schedule a background function run.
	async fn enqueue(&self, request: EnqueueRequest) -> Result<EnqueueReceipt>;

	/// Report a failed background function run.
	async fn nack(&self, request: NackRequest) -> Result<()>;

	/// Report a failed scheduled task run.
	async fn nack_scheduled_task(&self, request: ScheduledTaskNack) -> Result<()>;
}

/// Shared handle to a client implementation.
pub type SharedClient = Arc<dyn JobQueueClient>;

/// Verify an HMAC-signed webhook body and decode it as a job payload.
pub fn verify_signed_payload(token: &str, body: &[u8], signature: &str) -> Option<JobPayload> {
	if !shq_common_webhook::verify(token.as_bytes(), body, signature) {
		return None;
	}
	serde_json::from_slice::<JobPayload>(body).ok()
}

/// Builder for constructing an [`HttpJobQueueClient`].
pub struct HttpJobQueueClientBuilder {
	token: Option<SecretString>,
	base_url: Option<String>,
	request_timeout: Duration,
	retry_config: RetryConfig,
}

impl HttpJobQueueClientBuilder {
	pub fn new() -> Self {
		Self {
			token: None,
			base_url: None,
			request_timeout: Duration::from_secs(30),
			retry_config: RetryConfig::default(),
		}
	}

	/// Seed the builder from resolved configuration.
	pub fn from_config(config: &ClientConfig) -> Self {
		let mut builder = Self::new()
			.base_url(config.api_url.clone())
			.request_timeout(config.request_timeout);
		builder.token = config.token.clone();
		builder
	}

	/// Sets the account token used for API auth and webhook signatures.
	pub fn token(mut self, token: impl Into<SecretString>) -> Self {
		self.token = Some(token.into());
		self
	}

	/// Sets the hosted queue API base URL.
	///
	/// Example: `https://api.serverlesshq.com`
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.base_url = Some(url.into());
		self
	}

	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;
		self
	}

	pub fn retry_config(mut self, config: RetryConfig) -> Self {
		self.retry_config = config;
		self
	}

	pub fn build(self) -> Result<HttpJobQueueClient> {
		let token = self
			.token
			.filter(|t| !t.is_empty())
			.ok_or(ClientError::MissingToken)?;
		let base_url = self.base_url.ok_or(ClientError::MissingBaseUrl)?;
		let base_url = base_url.trim_end_matches('/').to_string();

		let http = shq_common_http::builder()
			.timeout(self.request_timeout)
			.build()
			.map_err(ClientError::RequestFailed)?;

		info!(base_url = %base_url, "SHQ client initialized");

		Ok(HttpJobQueueClient {
			http,
			base_url,
			token,
			retry_config: self.retry_config,
		})
	}
}

impl Default for HttpJobQueueClientBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// [`JobQueueClient`] backed by the hosted queue's HTTP API.
///
/// # Example
///
/// ```ignore
/// let client = HttpJobQueueClient::builder()
///     .token("shq_xxx")
///     .base_url("https://api.serverlesshq.com")
///     .build()?;
///
/// let receipt = client.enqueue(EnqueueRequest { .. }).await?;
/// ```
pub struct HttpJobQueueClient {
	http: Client,
	base_url: String,
	token: SecretString,
	retry_config: RetryConfig,
}

impl HttpJobQueueClient {
	pub fn builder() -> HttpJobQueueClientBuilder {
		HttpJobQueueClientBuilder::new()
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
		let url = format!("{}{}", self.base_url, path);
		debug!(url = %url, "POST to SHQ");

		shq_common_http::retry(&self.retry_config, || async {
			let response = self
				.http
				.post(&url)
				.bearer_auth(self.token.expose())
				.json(body)
				.send()
				.await?;
			check_status(response).await
		})
		.await
	}

	async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
	where
		B: Serialize + ?Sized,
		T: DeserializeOwned,
	{
		let response = self.post(path, body).await?;
		let bytes = response.bytes().await?;
		if bytes.is_empty() {
			return Ok(serde_json::from_value(serde_json::Value::Object(
				Default::default(),
			))?);
		}
		Ok(serde_json::from_slice(&bytes)?)
	}
}

async fn check_status(response: Response) -> Result<Response> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}

	if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
		warn!(status = status.as_u16(), "SHQ token rejected");
		return Err(ClientError::Unauthorized);
	}

	if status == StatusCode::TOO_MANY_REQUESTS {
		let retry_after_secs = response
			.headers()
			.get("Retry-After")
			.and_then(|v| v.to_str().ok())
			.and_then(|s| s.parse().ok());
		return Err(ClientError::RateLimited { retry_after_secs });
	}

	let message = response.text().await.unwrap_or_default();
	error!(status = status.as_u16(), message = %message, "SHQ request failed");
	Err(ClientError::Api {
		status: status.as_u16(),
		message,
	})
}

#[async_trait]
impl JobQueueClient for HttpJobQueueClient {
	fn verify_and_decrypt(&self, body: &[u8], signature: &str) -> Option<JobPayload> {
		verify_signed_payload(self.token.expose(), body, signature)
	}

	#[instrument(skip(self, request), fields(function_name = %request.function_name, callback_url = %request.callback_url))]
	async fn enqueue(&self, request: EnqueueRequest) -> Result<EnqueueReceipt> {
		let receipt: EnqueueReceipt = self.post_json("/v1/jobs", &request).await?;
		info!(job_id = ?receipt.job_id, "Job enqueued");
		Ok(receipt)
	}

	#[instrument(skip(self, request), fields(function_name = %request.function_name))]
	async fn nack(&self, request: NackRequest) -> Result<()> {
		self.post("/v1/jobs/nack", &request).await?;
		Ok(())
	}

	#[instrument(skip(self, request), fields(path = %request.path))]
	async fn nack_scheduled_task(&self, request: ScheduledTaskNack) -> Result<()> {
		self.post("/v1/scheduled-tasks/nack", &request).await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use std::collections::BTreeMap;
	use wiremock::matchers::{body_json, header, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn client_for(server: &MockServer) -> HttpJobQueueClient {
		HttpJobQueueClient::builder()
			.token("T")
			.base_url(server.uri())
			.retry_config(RetryConfig::none())
			.build()
			.unwrap()
	}

	fn retrying_client_for(server: &MockServer) -> HttpJobQueueClient {
		HttpJobQueueClient::builder()
			.token("T")
			.base_url(server.uri())
			.retry_config(RetryConfig {
				max_attempts: 3,
				base_delay: Duration::from_millis(1),
				max_delay: Duration::from_millis(5),
				backoff_factor: 2.0,
				jitter: false,
			})
			.build()
			.unwrap()
	}

	fn enqueue_request() -> EnqueueRequest {
		EnqueueRequest {
			function_name: "sendEmail".to_string(),
			payload_json: json!({"to": "a@b.com"}),
			callback_url: "https://app.example.com/api/sendEmail".to_string(),
		}
	}

	#[test]
	fn test_builder_requires_token() {
		let result = HttpJobQueueClient::builder()
			.base_url("https://example.com")
			.build();
		assert!(matches!(result, Err(ClientError::MissingToken)));
	}

	#[test]
	fn test_builder_rejects_empty_token() {
		let result = HttpJobQueueClient::builder()
			.token("")
			.base_url("https://example.com")
			.build();
		assert!(matches!(result, Err(ClientError::MissingToken)));
	}

	#[test]
	fn test_builder_requires_base_url() {
		let result = HttpJobQueueClient::builder().token("T").build();
		assert!(matches!(result, Err(ClientError::MissingBaseUrl)));
	}

	#[test]
	fn test_builder_normalizes_base_url() {
		let client = HttpJobQueueClient::builder()
			.token("T")
			.base_url("https://example.com/")
			.build()
			.unwrap();
		assert_eq!(client.base_url(), "https://example.com");
	}

	#[test]
	fn test_builder_from_config() {
		let config = ClientConfig {
			token: Some(SecretString::new("T")),
			api_url: "https://queue.internal".to_string(),
			request_timeout: Duration::from_secs(5),
		};
		let client = HttpJobQueueClientBuilder::from_config(&config).build().unwrap();
		assert_eq!(client.base_url(), "https://queue.internal");
	}

	#[test]
	fn test_verify_and_decrypt_valid() {
		let client = HttpJobQueueClient::builder()
			.token("T")
			.base_url("https://example.com")
			.build()
			.unwrap();
		let body = br#"{"to":"a@b.com"}"#;
		let signature = shq_common_webhook::sign(b"T", body);

		let payload = client.verify_and_decrypt(body, &signature).unwrap();
		assert_eq!(payload.get("to"), Some(&json!("a@b.com")));
	}

	#[test]
	fn test_verify_and_decrypt_rejects_bad_signature() {
		let body = br#"{"to":"a@b.com"}"#;
		assert!(verify_signed_payload("T", body, "deadbeef").is_none());
		assert!(verify_signed_payload("T", body, "").is_none());
	}

	#[test]
	fn test_verify_and_decrypt_rejects_non_object() {
		let body = b"[1,2,3]";
		let signature = shq_common_webhook::sign(b"T", body);
		assert!(verify_signed_payload("T", body, &signature).is_none());
	}

	#[tokio::test]
	async fn test_enqueue_posts_request_and_returns_receipt() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1/jobs"))
			.and(header("authorization", "Bearer T"))
			.and(body_json(json!({
				"functionName": "sendEmail",
				"payloadJSON": {"to": "a@b.com"},
				"callbackUrl": "https://app.example.com/api/sendEmail"
			})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobId": "job_123"})))
			.expect(1)
			.mount(&server)
			.await;

		let receipt = client_for(&server).enqueue(enqueue_request()).await.unwrap();
		assert_eq!(receipt.job_id.as_deref(), Some("job_123"));
	}

	#[tokio::test]
	async fn test_enqueue_empty_body_is_empty_receipt() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1/jobs"))
			.respond_with(ResponseTemplate::new(202))
			.mount(&server)
			.await;

		let receipt = client_for(&server).enqueue(enqueue_request()).await.unwrap();
		assert_eq!(receipt, EnqueueReceipt::default());
	}

	#[tokio::test]
	async fn test_enqueue_maps_unauthorized() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1/jobs"))
			.respond_with(ResponseTemplate::new(401))
			.mount(&server)
			.await;

		let result = client_for(&server).enqueue(enqueue_request()).await;
		assert!(matches!(result, Err(ClientError::Unauthorized)));
	}

	#[tokio::test]
	async fn test_enqueue_maps_rate_limit() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1/jobs"))
			.respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
			.mount(&server)
			.await;

		let result = client_for(&server).enqueue(enqueue_request()).await;
		assert!(matches!(
			result,
			Err(ClientError::RateLimited {
				retry_after_secs: Some(7)
			})
		));
	}

	#[tokio::test]
	async fn test_enqueue_maps_api_error() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1/jobs"))
			.respond_with(ResponseTemplate::new(422).set_body_string("unknown function"))
			.mount(&server)
			.await;

		let err = client_for(&server)
			.enqueue(enqueue_request())
			.await
			.unwrap_err();
		match err {
			ClientError::Api { status, message } => {
				assert_eq!(status, 422);
				assert_eq!(message, "unknown function");
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_enqueue_retries_service_unavailable() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1/jobs"))
			.respond_with(ResponseTemplate::new(503))
			.up_to_n_times(1)
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(method("POST"))
			.and(path("/v1/jobs"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobId": "job_2"})))
			.expect(1)
			.mount(&server)
			.await;

		let receipt = retrying_client_for(&server)
			.enqueue(enqueue_request())
			.await
			.unwrap();
		assert_eq!(receipt.job_id.as_deref(), Some("job_2"));
	}

	#[tokio::test]
	async fn test_enqueue_does_not_retry_client_errors() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1/jobs"))
			.respond_with(ResponseTemplate::new(422).set_body_string("unknown function"))
			.expect(1)
			.mount(&server)
			.await;

		let result = retrying_client_for(&server).enqueue(enqueue_request()).await;
		assert!(matches!(result, Err(ClientError::Api { status: 422, .. })));
	}

	#[tokio::test]
	async fn test_enqueue_gives_up_after_max_attempts() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1/jobs"))
			.respond_with(ResponseTemplate::new(502))
			.expect(3)
			.mount(&server)
			.await;

		let result = retrying_client_for(&server).enqueue(enqueue_request()).await;
		assert!(matches!(result, Err(ClientError::Api { status: 502, .. })));
	}

	#[tokio::test]
	async fn test_nack_posts_failure_report() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1/jobs/nack"))
			.and(body_json(json!({
				"functionName": "sendEmail",
				"payload": {"to": "a@b.com"},
				"error": "boom",
				"headers": {"shq-webhook-signature": "abc"}
			})))
			.respond_with(ResponseTemplate::new(200))
			.expect(1)
			.mount(&server)
			.await;

		let request = NackRequest {
			function_name: "sendEmail".to_string(),
			payload: json!({"to": "a@b.com"}),
			error: "boom".to_string(),
			headers: BTreeMap::from([("shq-webhook-signature".to_string(), "abc".to_string())]),
		};
		client_for(&server).nack(request).await.unwrap();
	}

	#[tokio::test]
	async fn test_nack_scheduled_task_posts_path_and_error() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1/scheduled-tasks/nack"))
			.and(body_json(json!({"path": "/nightly-report", "error": "boom"})))
			.respond_with(ResponseTemplate::new(204))
			.expect(1)
			.mount(&server)
			.await;

		let request = ScheduledTaskNack {
			path: "/nightly-report".to_string(),
			error: "boom".to_string(),
		};
		client_for(&server).nack_scheduled_task(request).await.unwrap();
	}
}
