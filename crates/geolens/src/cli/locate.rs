//! The `geolens locate` command: suggest locations for photos without GPS.

use std::fmt;
use std::path::PathBuf;

use clap::Args;
use geolens_core::metadata::read_gps;
use geolens_core::{
    ClipEmbedder, Config, FileDiscovery, GeoLensError, LocationPrediction, LocationRanker,
};
use serde::Serialize;

use super::{output_writer, OutputFormat};

/// Arguments for the `locate` command.
#[derive(Args, Debug)]
pub struct LocateArgs {
    /// Image files or directories to locate
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Number of suggestions per image [default: from config]
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Also predict for images that already carry GPS coordinates
    #[arg(long)]
    pub force: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write results to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Suggestions for one image.
#[derive(Debug, Serialize)]
struct LocateResult {
    image: PathBuf,
    predictions: Vec<LocationPrediction>,
}

impl fmt::Display for LocateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.image.display())?;
        if self.predictions.is_empty() {
            write!(f, "\n  (no prediction)")?;
        }
        for prediction in &self.predictions {
            write!(f, "\n  {prediction}")?;
        }
        Ok(())
    }
}

/// Execute the locate command.
pub async fn execute(args: LocateArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let top_k = args.top_k.unwrap_or(config.ranking.top_k);

    let images = FileDiscovery::default().discover_all(&args.paths);
    if images.is_empty() {
        anyhow::bail!("No supported images found");
    }

    let model_dir = config.model_dir();
    if !ClipEmbedder::model_exists(&config.joint, &model_dir) {
        tracing::warn!(
            "CLIP model not found in {}. Run `geolens models download`.",
            model_dir.join(&config.joint.model).display()
        );
    }

    let mut ranker = match LocationRanker::from_config(&config) {
        Ok(ranker) => ranker,
        Err(GeoLensError::Store(e)) => anyhow::bail!(
            "{e}\nRun `geolens locations init` to install the bundled dataset."
        ),
        Err(e) => return Err(e.into()),
    };
    let force = args.force;

    let results = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<LocateResult>> {
        let mut results = Vec::with_capacity(images.len());

        for image in images {
            if !force {
                if let Some((lat, lon)) = read_gps(&image) {
                    tracing::info!(
                        "Skipping {:?}: already geotagged at {lat:.5}, {lon:.5} (use --force)",
                        image
                    );
                    continue;
                }
            }
            let predictions = ranker.predict_location(&image, top_k)?;
            results.push(LocateResult {
                image,
                predictions,
            });
        }
        Ok(results)
    })
    .await??;

    if results.is_empty() {
        tracing::info!("Nothing to locate");
        return Ok(());
    }

    let mut writer = output_writer(args.output.as_deref(), args.format)?;
    writer.write_all(&results)?;
    writer.flush()?;
    Ok(())
}
