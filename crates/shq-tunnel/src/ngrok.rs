// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tunnels through a locally running ngrok agent.
//!
//! The agent exposes a local API (by default on `127.0.0.1:4040`). Starting a
//! tunnel is a `POST /api/tunnels`; an already running tunnel with the same
//! name is looked up with `GET /api/tunnels/{name}`.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use shq_config::TunnelConfig;
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::{Result, TunnelError};
use crate::TunnelProvider;

pub struct NgrokAgent {
	http: Client,
	agent_url: Url,
}

#[derive(Debug, Serialize)]
struct StartTunnelRequest<'a> {
	name: &'a str,
	proto: &'a str,
	addr: String,
}

#[derive(Debug, Deserialize)]
struct TunnelInfo {
	#[serde(default)]
	public_url: Option<String>,
}

impl NgrokAgent {
	pub fn new(agent_url: Url) -> Result<Self> {
		Ok(Self {
			http: shq_common_http::builder().build()?,
			agent_url,
		})
	}

	pub fn from_config(config: &TunnelConfig) -> Result<Self> {
		Self::new(Url::parse(&config.agent_url)?)
	}

	fn api_url(&self, path: &str) -> Result<Url> {
		Ok(self.agent_url.join(path)?)
	}

	fn tunnel_name(port: u16) -> String {
		format!("shq-{port}")
	}

	async fn start(&self, name: &str, port: u16) -> Result<Response> {
		let request = StartTunnelRequest {
			name,
			proto: "http",
			addr: port.to_string(),
		};

		Ok(self
			.http
			.post(self.api_url("/api/tunnels")?)
			.json(&request)
			.send()
			.await?)
	}

	async fn existing(&self, name: &str) -> Result<TunnelInfo> {
		let response = self
			.http
			.get(self.api_url(&format!("/api/tunnels/{name}"))?)
			.send()
			.await?;
		parse_tunnel(response).await
	}
}

async fn parse_tunnel(response: Response) -> Result<TunnelInfo> {
	if !response.status().is_success() {
		let status = response.status().as_u16();
		let message = response.text().await.unwrap_or_default();
		return Err(TunnelError::Api { status, message });
	}
	Ok(response.json().await?)
}

#[async_trait]
impl TunnelProvider for NgrokAgent {
	#[instrument(skip(self), fields(agent_url = %self.agent_url))]
	async fn connect(&self, port: u16) -> Result<String> {
		let name = Self::tunnel_name(port);
		let response = self.start(&name, port).await?;

		let info = match response.status() {
			status @ (StatusCode::BAD_REQUEST | StatusCode::CONFLICT) => {
				let message = response.text().await.unwrap_or_default();
				debug!(name = %name, status = status.as_u16(), "tunnel start rejected, looking up running tunnel");
				match self.existing(&name).await {
					Ok(info) => info,
					Err(e) => {
						debug!(name = %name, error = %e, "no running tunnel to reuse");
						return Err(TunnelError::Api {
							status: status.as_u16(),
							message,
						});
					}
				}
			}
			_ => parse_tunnel(response).await?,
		};

		let public_url = info
			.public_url
			.filter(|u| !u.is_empty())
			.ok_or(TunnelError::MissingPublicUrl)?;
		let public_url = public_url.trim_end_matches('/').to_string();

		info!(port, public_url = %public_url, "ngrok tunnel established");
		Ok(public_url)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use wiremock::matchers::{body_json, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn agent_for(server: &MockServer) -> NgrokAgent {
		NgrokAgent::new(Url::parse(&server.uri()).unwrap()).unwrap()
	}

	#[tokio::test]
	async fn test_connect_starts_tunnel() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/api/tunnels"))
			.and(body_json(json!({"name": "shq-3000", "proto": "http", "addr": "3000"})))
			.respond_with(ResponseTemplate::new(201).set_body_json(json!({
				"name": "shq-3000",
				"public_url": "https://abcd.ngrok.app/",
				"proto": "https"
			})))
			.expect(1)
			.mount(&server)
			.await;

		let url = agent_for(&server).connect(3000).await.unwrap();
		assert_eq!(url, "https://abcd.ngrok.app");
	}

	#[tokio::test]
	async fn test_connect_reuses_running_tunnel() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/api/tunnels"))
			.respond_with(ResponseTemplate::new(400).set_body_string("tunnel already exists"))
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/api/tunnels/shq-4000"))
			.respond_with(
				ResponseTemplate::new(200).set_body_json(json!({"public_url": "https://efgh.ngrok.app"})),
			)
			.expect(1)
			.mount(&server)
			.await;

		let url = agent_for(&server).connect(4000).await.unwrap();
		assert_eq!(url, "https://efgh.ngrok.app");
	}

	#[tokio::test]
	async fn test_connect_surfaces_rejection_when_no_tunnel_running() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/api/tunnels"))
			.respond_with(
				ResponseTemplate::new(400).set_body_string("invalid tunnel configuration: bad addr"),
			)
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/api/tunnels/shq-3000"))
			.respond_with(ResponseTemplate::new(404).set_body_string("tunnel not found"))
			.expect(1)
			.mount(&server)
			.await;

		let err = agent_for(&server).connect(3000).await.unwrap_err();
		match err {
			TunnelError::Api { status, message } => {
				assert_eq!(status, 400);
				assert_eq!(message, "invalid tunnel configuration: bad addr");
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_connect_agent_error() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/api/tunnels"))
			.respond_with(ResponseTemplate::new(502).set_body_string("session closed"))
			.mount(&server)
			.await;

		let err = agent_for(&server).connect(3000).await.unwrap_err();
		assert!(matches!(err, TunnelError::Api { status: 502, .. }));
	}

	#[tokio::test]
	async fn test_connect_missing_public_url() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/api/tunnels"))
			.respond_with(ResponseTemplate::new(201).set_body_json(json!({"name": "shq-3000"})))
			.mount(&server)
			.await;

		let err = agent_for(&server).connect(3000).await.unwrap_err();
		assert!(matches!(err, TunnelError::MissingPublicUrl));
	}

	#[test]
	fn test_from_config_default_agent() {
		let agent = NgrokAgent::from_config(&TunnelConfig {
			agent_url: "http://127.0.0.1:4040".to_string(),
		})
		.unwrap();
		assert_eq!(agent.agent_url.as_str(), "http://127.0.0.1:4040/");
	}

	#[test]
	fn test_from_config_rejects_bad_url() {
		let config = TunnelConfig {
			agent_url: "not a url".to_string(),
		};
		assert!(matches!(
			NgrokAgent::from_config(&config),
			Err(TunnelError::UrlParse(_))
		));
	}
}
