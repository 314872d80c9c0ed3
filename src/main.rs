//! `dbpool` command line tool.
//!
//! Loads a pool configuration, initializes the pool and either reports endpoint
//! status, runs one statement, or keeps watching endpoint health until Ctrl+C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use dbpool::config::{load_config, DatabaseConfig};
use dbpool::driver::Driver;
use dbpool::lifecycle::signals;
use dbpool::observability::{logging, metrics};
use dbpool::pool::{Pool, PoolStatus};

#[derive(Parser)]
#[command(name = "dbpool")]
#[command(version, about = "Replicated database access layer: status and smoke tests", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = "dbpool.toml")]
    config: PathBuf,

    /// Log level override (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect every endpoint and print its status
    Check {
        /// Print status as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one statement through the pool
    Exec {
        /// SQL statement
        statement: String,

        /// Treat the statement as a query and print the rows
        #[arg(long)]
        query: bool,
    },
    /// Keep the pool open and log endpoint health periodically
    Watch {
        /// Seconds between status reports
        #[arg(long, default_value = "10")]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.observability.log_level.clone());
    logging::init_logging(&level);

    tracing::info!(
        config = %cli.config.display(),
        access_target = %config.access_target,
        endpoints = config.endpoints.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let pool = Pool::from_config(&config, driver()?).await?;

    let outcome = match cli.command {
        Commands::Check { json } => {
            print_status(&pool.status(), json)?;
            Ok(())
        }
        Commands::Exec { statement, query } => exec(&pool, &statement, query).await,
        Commands::Watch { interval } => {
            watch(&pool, &config, Duration::from_secs(interval.max(1))).await;
            Ok(())
        }
    };

    pool.close().await;
    outcome
}

#[cfg(feature = "postgres")]
fn driver() -> Result<Arc<dyn Driver>, Box<dyn std::error::Error>> {
    Ok(Arc::new(dbpool::driver::postgres::PostgresDriver::new()))
}

#[cfg(not(feature = "postgres"))]
fn driver() -> Result<Arc<dyn Driver>, Box<dyn std::error::Error>> {
    Err("built without a database driver; rebuild with `--features postgres`".into())
}

async fn exec(pool: &Pool, statement: &str, query: bool) -> Result<(), Box<dyn std::error::Error>> {
    if query {
        let rows = pool.query(statement, &[]).await?;
        for row in &rows {
            println!("{}", serde_json::to_string(row)?);
        }
        eprintln!("{} row(s)", rows.len());
    } else {
        let affected = pool.execute(statement, &[]).await?;
        println!("{} row(s) affected", affected);
    }
    Ok(())
}

async fn watch(pool: &Pool, config: &DatabaseConfig, interval: Duration) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        mode = %pool.mode(),
        endpoints = config.endpoints.len(),
        "Watching endpoint health, Ctrl+C to stop"
    );
    let mut ticker = tokio::time::interval(interval);
    let shutdown = signals::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for ep in pool.status().endpoints {
                    tracing::info!(
                        endpoint = %ep.name,
                        state = %ep.state,
                        probing = ep.probing,
                        in_flight = ep.in_flight,
                        connect_attempts = ep.connect_attempts,
                        "Endpoint status"
                    );
                }
            }
            _ = &mut shutdown => break,
        }
    }
}

fn print_status(status: &PoolStatus, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(status)?);
        return Ok(());
    }

    println!(
        "mode: {}  workable: {}/{}",
        status.mode,
        status.workable,
        status.endpoints.len()
    );
    for ep in &status.endpoints {
        println!(
            "  {:<16} {}:{:<6} {:<11} attempts={}{}",
            ep.name,
            ep.host,
            ep.port,
            ep.state.to_string(),
            ep.connect_attempts,
            if ep.probing { " (recovering)" } else { "" }
        );
    }
    Ok(())
}
