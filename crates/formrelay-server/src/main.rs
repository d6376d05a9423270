//! formrelay server binary.
//!
//! Reads `formrelay.toml` (or the path specified with `--config`), then
//! `FORMRELAY_*` environment variables, then command-line overrides. Starts
//! the web server and the datagram listener and runs until Ctrl-C.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use formrelay_server::{ServerConfig, Supervisor};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Form submission relay: HTTP in, JSON file and UDP out")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "formrelay.toml")]
  config: PathBuf,

  /// Bind address for both listeners.
  #[arg(long)]
  host: Option<String>,

  #[arg(long)]
  http_port: Option<u16>,

  #[arg(long)]
  datagram_port: Option<u16>,

  /// Path of the JSON record store.
  #[arg(long)]
  store_path: Option<PathBuf>,

  /// Directory views and static assets are served from.
  #[arg(long)]
  asset_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("FORMRELAY").try_parsing(true))
    .set_override_option("host", cli.host)?
    .set_override_option("http_port", cli.http_port)?
    .set_override_option("datagram_port", cli.datagram_port)?
    .set_override_option("store_path", cli.store_path.map(path_string))?
    .set_override_option("asset_root", cli.asset_root.map(path_string))?
    .build()
    .context("failed to read configuration")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let supervisor = Supervisor::start(server_cfg)
    .await
    .context("failed to start servers")?;

  supervisor.run_until(interrupted()).await;

  Ok(())
}

/// Resolves on Ctrl-C. If the signal handler cannot be installed, never
/// resolves, so the process runs until it is killed.
async fn interrupted() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "cannot listen for Ctrl-C");
    std::future::pending::<()>().await;
  }
}

fn path_string(path: PathBuf) -> String { path.to_string_lossy().into_owned() }
