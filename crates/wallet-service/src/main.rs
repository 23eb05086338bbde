//! Main entry point for the account-abstraction playground backend.
//!
//! Loads the TOML configuration, builds the shared wallet services and
//! serves the HTTP API until interrupted.
//!
//! ```bash
//! export ZERODEV_PROJECT_ID="..."
//! playground --config config/playground.toml --port 3000
//! ```

use clap::Parser;
use std::path::PathBuf;
use wallet_config::Config;
use wallet_core::WalletServices;
use wallet_service::{server, AppState};

/// Command-line arguments for the playground service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/playground.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	/// Overrides the API host from the configuration
	#[arg(long)]
	host: Option<String>,

	/// Overrides the API port from the configuration
	#[arg(long)]
	port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	// Missing .env is fine; the environment may already be set
	dotenvy::dotenv().ok();

	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started playground");

	tracing::info!("Loading configuration from file: {:?}", args.config);
	let mut config = Config::from_file(&args.config).await?;
	if let Some(host) = args.host {
		config.api.host = host;
	}
	if let Some(port) = args.port {
		config.api.port = port;
	}
	tracing::info!("Loaded configuration [{}]", config.app.id);

	let services = WalletServices::from_config(config)?;
	tracing::info!(
		chains = ?services.delivery.chain_ids(),
		intents = services.intents.is_some(),
		"Built wallet services"
	);
	let state = AppState::new(services)?;

	tokio::select! {
		result = server::start_server(state) => {
			tracing::info!("API server finished");
			result?;
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	tracing::info!("Stopped playground");
	Ok(())
}
