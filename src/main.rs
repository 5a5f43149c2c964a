//! healthcare-gateway command line.
//!
//! Subcommands:
//! - tools: list the available tools
//! - invoke: run one tool and print its envelope
//! - usage: print a monthly usage aggregate
//! - sweep: purge expired cache rows
//! - stdio: serve newline-delimited JSON requests

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

use healthcare_gateway::cache::spawn_sweeper;
use healthcare_gateway::{Config, PersistentCache, SessionId, ToolRegistry, UsageMeter};

#[derive(Debug, Parser)]
#[command(name = "healthcare-gateway", version, about)]
struct Cli {
    /// Cache database path.
    #[arg(long, global = true, env = "HEALTHCARE_CACHE_DB")]
    cache_db: Option<std::path::PathBuf>,

    /// Usage database path.
    #[arg(long, global = true, env = "HEALTHCARE_USAGE_DB")]
    usage_db: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List available tools.
    Tools,
    /// Invoke one tool and print the result envelope.
    Invoke {
        tool: String,
        /// Tool arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,
        /// Session id to meter the call against (random when omitted).
        #[arg(long)]
        session: Option<String>,
    },
    /// Print monthly usage; across all sessions when no session is given.
    Usage {
        #[arg(long)]
        session: Option<String>,
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Delete expired cache rows and print how many were removed.
    Sweep,
    /// Serve newline-delimited JSON requests on stdin/stdout.
    Stdio {
        /// Session id for requests that carry none.
        #[arg(long)]
        session: Option<String>,
    },
}

fn session_or_new(raw: Option<String>) -> Result<SessionId, Box<dyn std::error::Error>> {
    match raw {
        Some(id) => Ok(SessionId::from_string(id)?),
        None => Ok(SessionId::new()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(path) = cli.cache_db {
        config.storage.cache_path = path;
    }
    if let Some(path) = cli.usage_db {
        config.storage.usage_path = path;
    }

    healthcare_gateway::observability::init_tracing(&config.observability);

    let cache = Arc::new(PersistentCache::open(
        &config.storage.cache_path,
        config.cache.default_ttl,
    )?);
    let usage = Arc::new(UsageMeter::open(&config.storage.usage_path)?);

    match cli.command {
        Command::Tools => {
            let registry = ToolRegistry::with_default_tools(&config, cache, usage)?;
            println!("{}", registry.catalog().render_listing());
        }
        Command::Invoke {
            tool,
            args,
            session,
        } => {
            let args: Value = serde_json::from_str(&args)?;
            let session = session_or_new(session)?;
            let registry = ToolRegistry::with_default_tools(&config, cache, usage)?;
            let envelope = registry.invoke(&session, &tool, args).await?;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            registry.flush_usage().await;
        }
        Command::Usage {
            session,
            month,
            year,
        } => {
            let report = match session {
                Some(id) => {
                    let session = SessionId::from_string(id)?;
                    serde_json::to_string_pretty(&usage.monthly_usage(
                        session.as_str(),
                        month,
                        year,
                    )?)?
                }
                None => serde_json::to_string_pretty(&usage.overall_usage(month, year)?)?,
            };
            println!("{report}");
        }
        Command::Sweep => {
            let removed = cache.sweep()?;
            println!("Removed {removed} expired cache entries.");
        }
        Command::Stdio { session } => {
            let session = session_or_new(session)?;
            let shutdown = CancellationToken::new();
            let sweeper = spawn_sweeper(
                Arc::clone(&cache),
                config.cache.sweep_interval,
                shutdown.clone(),
            );
            let registry = ToolRegistry::with_default_tools(&config, cache, usage)?;

            tracing::info!(session = %session, tools = registry.catalog().len(), "serving stdio");
            let served = healthcare_gateway::stdio::serve_lines(
                &registry,
                &session,
                BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
            )
            .await;
            registry.flush_usage().await;

            shutdown.cancel();
            if let Err(e) = sweeper.await {
                tracing::warn!("cache sweeper task failed: {}", e);
            }
            let handled = served?;
            tracing::info!(handled, "stdin closed");
        }
    }

    Ok(())
}
