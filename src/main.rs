mod app;
mod cache;
mod commands;
mod config;
mod event;
mod filter;
mod logging;
mod progress;
mod query;
mod store;
mod submit;
mod ui;

use cache::{CacheLayer, CacheStorage, MemoryStorage, NoopStorage, SqliteStorage};
use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use store::{CachedStore, RecordSchema, StoreClient};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "oatrack")]
#[command(about = "A terminal UI for tracking order records kept in a spreadsheet")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/oatrack/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Store collection URL; overrides the config file and OATRACK_STORE_URL
  #[arg(long)]
  url: Option<String>,

  /// Open the editor for this record on startup
  #[arg(short, long, value_name = "ID")]
  record: Option<String>,

  /// Disable the local cache entirely
  #[arg(long)]
  no_cache: bool,

  /// Directory for log files (default: $XDG_DATA_HOME/oatrack/logs)
  #[arg(long)]
  log_dir: Option<PathBuf>,
}

fn open_storage(no_cache: bool) -> Arc<dyn CacheStorage> {
  if no_cache {
    info!("cache disabled");
    return Arc::new(NoopStorage);
  }
  match SqliteStorage::open() {
    Ok(storage) => Arc::new(storage),
    Err(e) => {
      warn!(error = %e, "falling back to in-memory cache");
      Arc::new(MemoryStorage::default())
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // --url or OATRACK_STORE_URL alone is enough to run
  let config = config::Config::load(args.config.as_deref(), args.url.as_deref())?;

  let log_dir = args
    .log_dir
    .clone()
    .or_else(logging::default_log_dir)
    .ok_or_else(|| eyre!("Could not determine log directory; pass --log-dir"))?;
  let _log_guard = logging::init(&log_dir)?;
  info!(version = env!("CARGO_PKG_VERSION"), "starting oatrack");

  let schema = Arc::new(RecordSchema::from_config(&config.records));
  let client = StoreClient::new(&config.store, schema)?;
  let cache = CacheLayer::new(open_storage(args.no_cache)).with_freshness(config.freshness_window());
  let store = CachedStore::new(client, cache);

  let mut app = app::App::new(&config, store, args.record);
  app.run().await?;

  Ok(())
}
