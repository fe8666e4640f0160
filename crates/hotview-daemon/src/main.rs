//! hotview daemon
//!
//! Compiles configured template pages and hot-reloads them when their
//! source files change.

mod daemon;
mod signals;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hotview_core::DaemonConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub use daemon::Daemon;

#[derive(Parser)]
#[command(name = "hotview")]
#[command(about = "hotview - hot-reloading template views")]
#[command(version)]
struct Cli {
    /// Configuration file (default: ./hotview.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile all pages and watch their sources (default)
    Watch,

    /// Compile all pages once and report errors
    Check,

    /// Render one page to stdout
    Render {
        /// Page name
        name: String,

        /// JSON object merged over the page's data
        #[arg(long)]
        data: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DaemonConfig::load_from(path)?,
        None => DaemonConfig::load(),
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_target(false)
        .init();

    let daemon = Daemon::new(config);

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Watch => {
            tracing::info!("Starting hotview v{}", env!("CARGO_PKG_VERSION"));

            // Run async runtime
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(daemon.run())
        }
        Commands::Check => {
            let pages = daemon.check()?;
            println!("{} page(s) OK", pages);
            Ok(())
        }
        Commands::Render { name, data } => {
            let output = daemon.render(&name, data.as_deref())?;
            println!("{}", output);
            Ok(())
        }
    }
}
