use clap::Parser;
use color_eyre::Result;
use hrdesk::{app, config, logging};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "hrdesk")]
#[command(about = "A terminal client for HR administration records")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/hrdesk/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// HR API base url, overrides the config file
  #[arg(long)]
  api_url: Option<String>,

  /// Keep filters and sort order in memory only
  #[arg(long)]
  no_persist: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Held until exit so buffered log lines are flushed
  let _log_guard = logging::init_tracing()?;

  // Load configuration, with the API url from the command line if given
  let config = config::Config::load(args.config.as_deref(), args.api_url)?;

  info!("starting hrdesk against {}", config.api.url);

  // Initialize and run the app
  let mut app = app::App::new(config, !args.no_persist)?;
  app.run().await?;

  Ok(())
}
