//! Sitegraph main entry point
//!
//! This is the command-line interface for the Sitegraph link graph crawler.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sitegraph::config::{load_config_with_hash, Config};
use sitegraph::jobs::{JobDispatcher, JobId, JobStatus, ScanRequest};
use sitegraph::output::{
    load_statistics, print_json, print_neighborhood, print_report, print_roots, print_runs,
    print_statistics,
};
use sitegraph::storage::{GraphStore, SqliteGraphStore};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Sitegraph: a same-domain link graph crawler
///
/// Sitegraph crawls a site breadth-first from one or more seed URLs, stays
/// on each seed's host, and records every page and link in a SQLite graph
/// that can be queried afterwards.
#[derive(Parser, Debug)]
#[command(name = "sitegraph")]
#[command(version)]
#[command(about = "A same-domain link graph crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Print results and errors as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl from one or more seed URLs
    Scan {
        /// Seed URLs; each one runs as its own job
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,

        /// Maximum BFS depth (overrides the configured default)
        #[arg(long)]
        max_depth: Option<u32>,
    },

    /// List root pages (crawl seeds)
    Roots,

    /// Show a page with its incoming and outgoing links
    Show {
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Delete every page and link from the graph
    Reset,

    /// Show crawl run history
    Runs {
        /// Number of runs to show
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// Show graph statistics
    Stats,
}

#[derive(Serialize)]
struct JobOutput {
    job: JobId,
    url: String,
    status: JobStatus,
}

#[derive(Serialize)]
struct ErrorOutput {
    error: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            if cli.json {
                let payload = ErrorOutput {
                    error: format!("{:#}", e),
                };
                if print_json(&payload).is_err() {
                    eprintln!("Error: {:#}", e);
                }
            } else {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so stdout stays clean for `--json` output.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitegraph=info,warn"),
            1 => EnvFilter::new("sitegraph=debug,info"),
            2 => EnvFilter::new("sitegraph=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

async fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let (config, config_hash) = load_configuration(cli.config.as_deref())?;

    match &cli.command {
        Command::Scan { urls, max_depth } => {
            let max_depth = max_depth.unwrap_or(config.crawler.max_depth);
            return handle_scan(config, config_hash, urls, max_depth, cli.json).await;
        }
        Command::Roots => handle_roots(&config, cli.json)?,
        Command::Show { url } => handle_show(&config, url, cli.json)?,
        Command::Reset => handle_reset(&config, cli.json)?,
        Command::Runs { limit } => handle_runs(&config, *limit, cli.json)?,
        Command::Stats => handle_stats(&config, cli.json)?,
    }

    Ok(ExitCode::SUCCESS)
}

fn load_configuration(path: Option<&Path>) -> anyhow::Result<(Config, String)> {
    let Some(path) = path else {
        tracing::debug!("No configuration file given, using defaults");
        return Ok((Config::default(), String::new()));
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    Ok((config, hash))
}

fn open_store(config: &Config) -> anyhow::Result<SqliteGraphStore> {
    let store = SqliteGraphStore::open(Path::new(&config.store.database_path))?;
    Ok(store)
}

/// Handles `scan`: one job per seed, waits for all of them
///
/// Exits non-zero if any job failed; the failures are part of the printed
/// results rather than a separate error.
async fn handle_scan(
    config: Config,
    config_hash: String,
    urls: &[String],
    max_depth: u32,
    json: bool,
) -> anyhow::Result<ExitCode> {
    tracing::info!(
        "Scanning {} seed URL(s) with max depth {} into {}",
        urls.len(),
        max_depth,
        config.store.database_path
    );

    let dispatcher = JobDispatcher::new(config, config_hash);
    let jobs: Vec<(JobId, &String)> = urls
        .iter()
        .map(|url| (dispatcher.submit(ScanRequest::new(url.clone(), max_depth)), url))
        .collect();

    let mut outputs = Vec::with_capacity(jobs.len());
    let mut failed = 0usize;

    for (id, url) in jobs {
        let status = dispatcher
            .wait(id)
            .await
            .unwrap_or_else(|| JobStatus::Failed(format!("{} was not found", id)));

        match &status {
            JobStatus::Completed(report) => {
                if !json {
                    print_report(id, report);
                }
            }
            JobStatus::Failed(message) => {
                failed += 1;
                if !json {
                    eprintln!("{} {} failed: {}", id, url, message);
                }
            }
            JobStatus::Queued | JobStatus::Running => {}
        }

        outputs.push(JobOutput {
            job: id,
            url: url.clone(),
            status,
        });
    }

    if json {
        print_json(&outputs)?;
    }

    if failed > 0 {
        tracing::error!("{} of {} scan job(s) failed", failed, outputs.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_roots(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let roots = store.root_pages()?;

    if json {
        print_json(&roots)?;
    } else {
        print_roots(&roots);
    }
    Ok(())
}

fn handle_show(config: &Config, url: &str, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;

    // Error nodes for unparseable seeds are keyed by the raw string
    let key = sitegraph::canonicalize(url)
        .map(String::from)
        .unwrap_or_else(|_| url.to_string());

    let Some(neighborhood) = store.page_with_neighbors(&key)? else {
        bail!("Page not found: {}", key);
    };

    if json {
        print_json(&neighborhood)?;
    } else {
        print_neighborhood(&neighborhood);
    }
    Ok(())
}

fn handle_reset(config: &Config, json: bool) -> anyhow::Result<()> {
    let mut store = open_store(config)?;
    let pages = store.count_pages()?;
    let edges = store.count_edges()?;

    store.reset()?;
    tracing::info!("Graph reset: {} pages and {} links removed", pages, edges);

    if json {
        print_json(&serde_json::json!({
            "pages_removed": pages,
            "links_removed": edges,
        }))?;
    } else {
        println!("Removed {} pages and {} links", pages, edges);
    }
    Ok(())
}

fn handle_runs(config: &Config, limit: u32, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let runs = store.list_runs(limit)?;

    if json {
        print_json(&runs)?;
    } else {
        print_runs(&runs);
    }
    Ok(())
}

fn handle_stats(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let stats = load_statistics(&store)?;

    if json {
        print_json(&stats)?;
    } else {
        println!("Database: {}\n", config.store.database_path);
        print_statistics(&stats);
    }
    Ok(())
}
