use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;

use plus::config::Config;
use plus::counter::CounterStore;
use plus::offline::{CacheSource, HttpFetcher, OfflineCache, Request, SqliteCacheStore};
use plus::storage::{KeyValueStore, StorageBackend};

#[derive(Parser, Debug)]
#[command(name = "plus")]
#[command(about = "Count things, one named counter at a time")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/plus/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  #[command(flatten)]
  Counter(CounterCommand),
  /// Manage the offline cache
  Cache {
    #[command(subcommand)]
    action: CacheCommand,
  },
}

#[derive(Subcommand, Debug)]
enum CounterCommand {
  /// List counters in creation order
  List,
  /// Create a counter and print its id
  New { name: String },
  /// Show a counter (default: the first one)
  Show { id: Option<String> },
  /// Add one
  Add { id: Option<String> },
  /// Subtract one
  Minus { id: Option<String> },
  /// Rename a counter
  Rename {
    name: String,
    #[arg(long)]
    id: Option<String>,
  },
  /// Remove a counter from the list
  Delete {
    id: String,
    /// Also erase its total and name
    #[arg(long)]
    purge: bool,
  },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
  /// Precache the manifest for the configured version
  Install,
  /// Remove cache generations from other versions
  Activate,
  /// Request a path through the cache
  Fetch { path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  let _log_guard = plus::logging::init(&plus::logging::default_dirs());

  match args.command {
    Command::Counter(command) => {
      run_counter(command, &config);
      Ok(())
    }
    Command::Cache { action } => run_cache(action, &config).await,
  }
}

fn run_counter(command: CounterCommand, config: &Config) {
  let counters = CounterStore::new(StorageBackend::open(&config.storage));
  if !counters.storage().tier().is_durable() {
    eprintln!("warning: no durable storage available, changes will be lost");
  }

  match command {
    CounterCommand::List => {
      for counter in counters.counters() {
        println!("{}\t{}\t{}", counter.id, counter.total, counter.name);
      }
    }
    CounterCommand::New { name } => {
      println!("{}", counters.create(&name));
    }
    CounterCommand::Show { id } => {
      let id = counters.current(id.as_deref());
      counters.normalize_listed_name(&id);
      println!("{}: {}", counters.get_name(&id), counters.get_total(&id));
    }
    CounterCommand::Add { id } => {
      let id = counters.current(id.as_deref());
      counters.add(&id);
      println!("{}: {}", counters.get_name(&id), counters.get_total(&id));
    }
    CounterCommand::Minus { id } => {
      let id = counters.current(id.as_deref());
      counters.subtract(&id);
      println!("{}: {}", counters.get_name(&id), counters.get_total(&id));
    }
    CounterCommand::Rename { name, id } => {
      if name.is_empty() {
        return;
      }
      let id = counters.current(id.as_deref());
      counters.set_name(&id, &name);
      println!("{}: {}", counters.get_name(&id), counters.get_total(&id));
    }
    CounterCommand::Delete { id, purge } => {
      counters.delete(&id);
      if purge {
        counters.purge_data(&id);
      }
    }
  }
}

async fn run_cache(action: CacheCommand, config: &Config) -> Result<()> {
  let storage = SqliteCacheStore::open_at(&config.offline.cache_path()?)?;
  let fetcher = HttpFetcher::new(config.offline.origin.clone())?;
  let mut cache = OfflineCache::new(storage, fetcher, config.offline.manifest());

  match action {
    CacheCommand::Install => {
      let report = cache.install().await?;
      println!(
        "{}: cached {} of {}",
        cache.cache_name(),
        report.cached.len(),
        cache.manifest().assets().len()
      );
      for failure in &report.failed {
        println!("  failed {}: {}", failure.path, failure.reason);
      }
    }
    CacheCommand::Activate => {
      for name in cache.activate().await? {
        println!("removed {}", name);
      }
    }
    CacheCommand::Fetch { path } => {
      cache.resume()?;
      let result = cache
        .handle_fetch(&Request::get(path.as_str()))
        .await
        .ok_or_else(|| eyre!("Request for {} failed", path))?;

      let source = match result.source {
        CacheSource::Cache => "cache",
        CacheSource::Network => "network",
      };
      println!(
        "{} {} ({} bytes, from {})",
        result.data.status,
        result.data.content_type.as_deref().unwrap_or("-"),
        result.data.body.len(),
        source
      );
    }
  }

  Ok(())
}
