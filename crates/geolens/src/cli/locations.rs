//! The `geolens locations` command for the candidate location store.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use geolens_core::{Config, LocationCandidateStore};

use super::{output_writer, OutputFormat};

/// Bundled seed dataset installed by `locations init`.
const BUNDLED_SEED: &str = include_str!("../../../../data/world_locations.csv");

/// Arguments for the `locations` command.
#[derive(Args, Debug)]
pub struct LocationsArgs {
    #[command(subcommand)]
    pub command: LocationsCommand,
}

/// Subcommands for the candidate store.
#[derive(Subcommand, Debug)]
pub enum LocationsCommand {
    /// Install the bundled seed dataset and build the database
    Init {
        /// Replace an existing seed file and rebuild the database
        #[arg(long)]
        force: bool,
    },

    /// Print the number of stored candidates
    Count,

    /// List candidates inside a bounding box (inclusive)
    Search {
        #[arg(long, allow_hyphen_values = true)]
        min_lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        max_lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        min_lon: f64,
        #[arg(long, allow_hyphen_values = true)]
        max_lon: f64,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write results to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Execute the locations command.
pub async fn execute(args: LocationsArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let db_path = config.database_path();
    let seed_path = config.seed_path();

    match args.command {
        LocationsCommand::Init { force } => {
            if seed_path.exists() && !force {
                tracing::info!("Seed dataset already present at {}", seed_path.display());
            } else {
                if let Some(parent) = seed_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&seed_path, BUNDLED_SEED)?;
                tracing::info!("Installed seed dataset at {}", seed_path.display());
            }

            if force && db_path.exists() {
                std::fs::remove_file(&db_path)?;
                tracing::info!("Removed existing database {}", db_path.display());
            }

            let store = LocationCandidateStore::open(&db_path, &seed_path)?;
            println!(
                "Location database ready at {} ({} locations)",
                store.path().display(),
                store.location_count()?
            );
        }

        LocationsCommand::Count => {
            let store = LocationCandidateStore::open(&db_path, &seed_path)?;
            println!("{}", store.location_count()?);
        }

        LocationsCommand::Search {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
            format,
            output,
        } => {
            if min_lat > max_lat || min_lon > max_lon {
                anyhow::bail!("Bounding box minimums must not exceed maximums");
            }
            let store = LocationCandidateStore::open(&db_path, &seed_path)?;
            let found = store.search_by_region(min_lat, max_lat, min_lon, max_lon)?;
            tracing::info!("{} location(s) in region", found.len());

            let mut writer = output_writer(output.as_deref(), format)?;
            writer.write_all(&found)?;
            writer.flush()?;
        }
    }

    Ok(())
}
