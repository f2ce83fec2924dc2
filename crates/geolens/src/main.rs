//! GeoLens CLI: group near-duplicate photos and suggest locations for photos
//! without GPS data.
//!
//! # Usage
//!
//! ```bash
//! # One-time setup
//! geolens models download
//! geolens locations init
//!
//! # Find near-duplicates in a folder
//! geolens similar ./photos --threshold 0.9
//!
//! # Suggest where a photo was taken
//! geolens locate trip/IMG_0042.jpg --top-k 3 --format json
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// GeoLens - photo similarity grouping and location suggestions.
#[derive(Parser, Debug)]
#[command(name = "geolens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Group visually similar images
    Similar(cli::similar::SimilarArgs),

    /// Suggest locations for images
    Locate(cli::locate::LocateArgs),

    /// Manage the candidate location database
    Locations(cli::locations::LocationsArgs),

    /// Manage ONNX models (download, list, verify)
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't up yet, so config problems go straight to stderr.
    let config = match geolens_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using defaults. Check your config file with `geolens config path`."
            );
            geolens_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("GeoLens v{}", geolens_core::VERSION);

    match cli.command {
        Commands::Similar(args) => cli::similar::execute(args).await,
        Commands::Locate(args) => cli::locate::execute(args).await,
        Commands::Locations(args) => cli::locations::execute(args).await,
        Commands::Models(args) => cli::models::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
