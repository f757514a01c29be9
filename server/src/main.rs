#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

mod app;
mod config;

use scopecfg_types::prelude::*;

#[tokio::main]
async fn main() -> ClResult<()> {
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_target(false)
		.init();

	let config = config::Config::from_env()?;
	if config.sign_key.is_none() {
		warn!("SIGN_KEY is not set, responses are not signed");
	}
	let app = app::App::new(&config);

	let listener = tokio::net::TcpListener::bind(&config.listen).await?;
	info!("Listening on HTTP {}", config.listen);
	axum::serve(listener, app.router()).await?;
	Ok(())
}

// vim: ts=4
