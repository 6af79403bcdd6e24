// graphql-validity demo server
//
// Serves the demo schema on POST /graphql with validation errors and
// profiling reports wired in through the validity middleware.

mod config;
mod schema;
mod server;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use graphql_validity::{Executor, ValidityConfig};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

const LOG_ENV: &str = "VALIDITY_LOG";

#[derive(Parser, Debug)]
#[command(version, about = "GraphQL server with field validation and profiling")]
struct Args {
	/// YAML config file
	#[arg(short, long, default_value = "config.yaml")]
	config: PathBuf,

	/// Address to listen on, overriding the config file
	#[arg(short, long)]
	listen: Option<SocketAddr>,

	#[arg(long, value_enum, default_value_t = LogFormat::Text)]
	log_format: LogFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
	Text,
	Json,
}

fn init_logging(format: LogFormat) {
	let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
	let registry = tracing_subscriber::registry().with(filter);
	match format {
		LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
		LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();
	init_logging(args.log_format);

	let mut config = AppConfig::load(&args.config).await?;
	if let Some(listen) = args.listen {
		config.listen = listen;
	}
	info!(target: "validity", options = ?config.validity, "loaded configuration");

	let schema = schema::instrumented_schema(ValidityConfig::new(config.validity))?;
	server::serve(config.listen, Executor::new(Arc::new(schema))).await
}
