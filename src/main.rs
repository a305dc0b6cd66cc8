//! Clamber main entry point
//!
//! This is the command-line interface for the Clamber link-graph crawler.

use anyhow::{Context, Result};
use clamber::config::{load_config_with_hash, Config, DispatchMode};
use clamber::crawler::{run_worker, Crawler};
use clamber::output::{load_statistics, print_statistics};
use clamber::query::{Query, QueryResponse, Resolver};
use clamber::queue::{ConsumerSettings, SqliteQueue, WorkQueue};
use clamber::storage::{GraphStore, SqliteGraphStore};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Clamber: a distributed link-graph crawler
///
/// Clamber crawls a site from a root URL to a requested depth, stores every
/// page and link it finds in a graph store, and answers subgraph queries from
/// what it stored.
#[derive(Parser, Debug)]
#[command(name = "clamber")]
#[command(version)]
#[command(about = "A distributed link-graph crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl hops from the work queue until interrupted
    Worker,

    /// Resolve a crawl request and print the response as JSON
    Resolve {
        /// Root URL to crawl
        url: String,

        /// Hops to crawl; -1 crawls until nothing new is found
        #[arg(long, default_value = "1", allow_hyphen_values = true)]
        depth: String,

        /// Hops of the result to wait for and print
        #[arg(long)]
        display_depth: Option<String>,
    },

    /// Show statistics from the graph store and work queue
    Stats,

    /// Validate the configuration and show what would be used
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Worker => handle_worker(&config).await,
        Command::Resolve {
            url,
            depth,
            display_depth,
        } => handle_resolve(&config, &url, &depth, display_depth.as_deref()).await,
        Command::Stats => handle_stats(&config).await,
        Command::Check => {
            handle_check(&config);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("clamber=info,warn"),
            1 => EnvFilter::new("clamber=debug,info"),
            2 => EnvFilter::new("clamber=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(config: &Config) -> Result<Arc<dyn GraphStore>> {
    let store = SqliteGraphStore::from_config(&config.store)
        .with_context(|| format!("opening graph store at {}", config.store.database_path))?;
    Ok(Arc::new(store))
}

fn open_queue(config: &Config) -> Result<Arc<dyn WorkQueue>> {
    let queue = SqliteQueue::from_config(config)
        .with_context(|| format!("opening work queue at {}", config.queue_database_path()))?;
    Ok(Arc::new(queue))
}

/// Handles the worker command: consumes the queue until Ctrl-C
async fn handle_worker(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let queue = open_queue(config)?;
    let crawler = Crawler::from_config(config, store, Some(Arc::clone(&queue)))
        .context("building HTTP client")?;

    let settings = ConsumerSettings {
        consumers: config.queue.consumers,
        max_receive: config.queue.max_receive,
        wait: config.queue.wait_time(),
    };

    tokio::select! {
        _ = run_worker(crawler, queue, settings) => {
            tracing::warn!("Worker stopped on its own");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for Ctrl-C")?;
            tracing::info!("Interrupted, shutting down worker");
        }
    }

    Ok(())
}

/// Handles the resolve command: prints the query response JSON
async fn handle_resolve(
    config: &Config,
    url: &str,
    depth: &str,
    display_depth: Option<&str>,
) -> Result<()> {
    let query = Query::parse_with_default(url, depth, display_depth, config.query.default_display_depth)?;

    let store = open_store(config)?;
    let queue = match config.crawler.dispatch {
        DispatchMode::Queue => Some(open_queue(config)?),
        DispatchMode::InProcess => None,
    };
    let crawler = Crawler::from_config(config, store, queue).context("building HTTP client")?;
    let resolver = Resolver::from_config(crawler, config);

    let response = match resolver.resolve(&query).await {
        Ok(resolution) => QueryResponse::new(&query, resolution),
        Err(e) => {
            tracing::error!("Failed to resolve {}: {}", query.url, e);
            println!("{}", serde_json::to_string_pretty(&QueryResponse::from_error(&query, &e))?);
            return Err(e.into());
        }
    };

    println!("{}", serde_json::to_string_pretty(&response)?);

    tracing::info!("Waiting for background crawl and writes to finish");
    resolver.drain().await;

    Ok(())
}

/// Handles the stats command: shows statistics from the database
async fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.store.database_path);

    let store = open_store(config)?;
    let queue = match config.crawler.dispatch {
        DispatchMode::Queue => Some(open_queue(config)?),
        DispatchMode::InProcess => None,
    };

    let stats = load_statistics(store.as_ref(), queue.as_deref()).await?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the check command: validates config and shows what would be used
fn handle_check(config: &Config) {
    println!("=== Clamber Configuration ===\n");

    println!("Crawler:");
    println!("  Dispatch: {:?}", config.crawler.dispatch);
    println!("  Wait for crawl: {}", config.crawler.wait_crawl);
    println!("  Background depth: {}", config.crawler.background_depth());

    println!("\nHTTP:");
    println!("  Attempts per page: {}", config.http.max_attempts());
    println!("  Back-off: {}ms", config.http.back_off_ms);
    println!("  Timeout: {}s", config.http.timeout_secs);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nStore:");
    println!("  Database: {}", config.store.database_path);

    println!("\nQueue:");
    println!("  Database: {}", config.queue_database_path());
    println!("  Consumers: {}", config.queue.consumers);
    println!("  Publish delay: {}ms", config.queue.publish_delay_ms);

    println!("\nQuery:");
    println!("  Default display depth: {}", config.query.default_display_depth);
    println!("  Settle window: {}ms", config.query.settle_window_ms);

    println!("\n✓ Configuration is valid");
}
