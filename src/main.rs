mod capabilities;
mod cli;
mod config;
mod daemon;
mod db;
mod embedding;
mod error;
mod memory;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "engram", version, about = "Local memory store for AI coding agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the server in the foreground (HTTP by default)
    Serve {
        /// Serve the MCP tool protocol on stdio instead of HTTP
        #[arg(long)]
        stdio: bool,
    },
    /// Start the HTTP server as a background daemon
    Start,
    /// Stop the background daemon
    Stop,
    /// Restart the background daemon
    Restart,
    /// Show daemon and database status
    Status,
    /// Show store counts and metrics summary
    Stats {
        /// Restrict metrics to one session
        #[arg(long)]
        session: Option<String>,
    },
    /// List recent memories
    Recent {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Search memories (semantic with keyword fallback)
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Show one memory in full
    Show { id: String },
    /// Delete a memory by id
    Forget {
        id: String,
        /// Scope guard (required to delete scoped memories when scopes are on)
        #[arg(long)]
        scope: Option<String>,
    },
    /// Preview time-decayed strengths, or persist them
    Decay {
        /// Persist the decayed strengths instead of previewing
        #[arg(long)]
        apply: bool,
    },
    /// Delete memories whose stored strength fell below a threshold
    Prune {
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to the data directory
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::EngramConfig::load()?;

    // Log to stderr so stdout stays clean for the stdio JSON-RPC transport.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { stdio } => {
            if stdio {
                server::serve_stdio(config).await?;
            } else {
                server::serve_http(config).await?;
            }
        }
        Command::Start => {
            let pid = daemon::start(&config)?;
            println!("Started daemon (pid {pid}).");
        }
        Command::Stop => {
            if daemon::stop(&config)? {
                println!("Daemon stopped.");
            } else {
                println!("Daemon was not running.");
            }
        }
        Command::Restart => {
            let pid = daemon::restart(&config)?;
            println!("Restarted daemon (pid {pid}).");
        }
        Command::Status => cli::status::status(&config)?,
        Command::Stats { session } => cli::stats::stats(&config, session.as_deref())?,
        Command::Recent { limit } => cli::recent::recent(&config, limit)?,
        Command::Search { query, limit } => cli::search::search(&config, &query, limit)?,
        Command::Show { id } => cli::show::show(&config, &id)?,
        Command::Forget { id, scope } => cli::forget::forget(&config, &id, scope.as_deref())?,
        Command::Decay { apply } => cli::maintenance::decay(&config, apply)?,
        Command::Prune { threshold } => cli::maintenance::prune(&config, threshold)?,
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await?,
        },
    }

    Ok(())
}
