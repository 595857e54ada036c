//! finrag CLI, the main entry point.
//!
//! Commands:
//! - `serve`     Start the HTTP gateway
//! - `ask`       Answer one question from the indexed documents
//! - `retrieve`  Show the chunks a question would be answered from
//! - `doctor`    Diagnose configuration, index, and provider health
//! - `config`    Print the default configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "finrag",
    about = "finrag: conversational RAG over personal-finance documents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Answer a single question
    Ask {
        /// The question
        #[arg(short, long)]
        message: String,

        /// JSON file holding prior turns: {"version":1,"turns":[{"role":"user","content":"..."}]}
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Retrieve context without generating an answer
    Retrieve {
        /// The search query
        #[arg(short, long)]
        query: String,

        /// Number of chunks to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Diagnose system health
    Doctor,

    /// Print the default config.toml
    Config {
        /// Print the config file location instead
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Ask { message, history } => commands::ask::run(message, history).await?,
        Commands::Retrieve { query, top_k } => commands::retrieve::run(query, top_k).await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Config { path } => {
            if path {
                commands::config_cmd::path()?
            } else {
                commands::config_cmd::show()?
            }
        }
    }

    Ok(())
}
