mod app;
mod commands;
mod event;
mod ui;

use clap::Parser;
use color_eyre::Result;
use lensdesk::api::Resource;
use lensdesk::{config, logging};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lensdesk")]
#[command(about = "A terminal browser for the lensdesk optical-retail API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/lensdesk/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// List to open (shops, products, distributions, invoices)
  #[arg(short, long)]
  resource: Option<Resource>,

  /// Initial location, e.g. "?shopId=42" or "invoices?status=PAID"
  #[arg(short, long)]
  url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Held until exit so buffered log lines are flushed
  let _log_guard = logging::init()?;

  let config = config::Config::load(args.config.as_deref())?;

  let config = if let Some(resource) = args.resource {
    config::Config {
      default_resource: resource,
      ..config
    }
  } else {
    config
  };

  let mut app = app::App::new(config, args.url.as_deref())?;
  app.run().await?;

  Ok(())
}
