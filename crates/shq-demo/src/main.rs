// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Example service with one background function and one scheduled task.
//!
//! `POST /send-email` enqueues a `sendEmail` job; the hosted queue delivers it
//! back to `POST /api/sendEmail`. The queue triggers `POST /api/nightly-report`
//! on its own schedule.

use std::path::PathBuf;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::{json, Value};
use shq_adapter::{BackgroundFunction, JobPayload, Resolution, ShqContext};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "shq-demo", about = "SHQ background function demo", version)]
struct Args {
	/// Path to a TOML config file (defaults to ./shq.toml)
	#[arg(long)]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[derive(Clone)]
struct AppState {
	send_email: BackgroundFunction,
}

#[derive(Debug, Deserialize)]
struct SendEmailRequest {
	to: String,
	#[serde(default)]
	subject: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("shq-demo version: {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => shq_config::load_config_with_file(path)?,
		None => shq_config::load_config()?,
	};

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	let (shq, resolution) = ShqContext::from_config(&config)?;
	// Held for the life of the process so pending enqueues wait instead of failing.
	let _unresolved = match resolution {
		Resolution::Unresolved(setter) => Some(setter),
		Resolution::Failed(reason) => {
			tracing::warn!(%reason, "enqueue will fail until the callback URL is configured");
			None
		}
		Resolution::Resolved(_) | Resolution::Tunneling => None,
	};

	let send_email = shq.background_function("sendEmail", "sendEmail", deliver_email);
	let nightly_report = shq.scheduled_task("nightly-report", |job: JobPayload| async move {
		tracing::info!(fields = job.len(), "generating nightly report");
		Ok(())
	});

	let state = AppState {
		send_email: send_email.clone(),
	};

	let app = Router::new()
		.route("/send-email", post(enqueue_email))
		.merge(send_email.router::<AppState>())
		.merge(nightly_report.router::<AppState>())
		.layer(TraceLayer::new_for_http())
		.with_state(state);

	let addr = format!("0.0.0.0:{}", config.callback.port);
	tracing::info!("listening on {}", addr);
	let listener = tokio::net::TcpListener::bind(&addr).await?;

	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("received shutdown signal");
		}
	}

	tracing::info!("server shutdown complete");
	Ok(())
}

async fn deliver_email(job: JobPayload) -> anyhow::Result<()> {
	let to = job
		.get("to")
		.and_then(Value::as_str)
		.ok_or_else(|| anyhow::anyhow!("job payload has no recipient"))?;
	let subject = job
		.get("subject")
		.and_then(Value::as_str)
		.unwrap_or("(no subject)");

	tracing::info!(to, subject, "sending email");
	Ok(())
}

async fn enqueue_email(
	State(state): State<AppState>,
	Json(request): Json<SendEmailRequest>,
) -> (StatusCode, Json<Value>) {
	let payload = json!({"to": request.to, "subject": request.subject});
	match state.send_email.enqueue(&payload).await {
		Ok(receipt) => (StatusCode::ACCEPTED, Json(json!(receipt))),
		Err(e) => {
			tracing::error!(error = %e, "failed to enqueue sendEmail");
			(StatusCode::BAD_GATEWAY, Json(json!({"error": e.to_string()})))
		}
	}
}
