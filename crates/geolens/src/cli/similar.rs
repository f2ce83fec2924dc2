//! The `geolens similar` command: group near-duplicate photos.

use std::path::PathBuf;

use clap::Args;
use geolens_core::{Config, FileDiscovery, GroupingError, SimilarityGrouper, VisionEmbedder};
use tokio_util::sync::CancellationToken;

use super::{create_progress_bar, output_writer, OutputFormat};

/// Arguments for the `similar` command.
#[derive(Args, Debug)]
pub struct SimilarArgs {
    /// Image files or directories to compare
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Minimum similarity to a group's seed image, 0.0 - 1.0 [default: from config]
    #[arg(short, long)]
    pub threshold: Option<f32>,

    /// Do not descend into subdirectories
    #[arg(long)]
    pub no_recursive: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write results to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the similar command.
pub async fn execute(args: SimilarArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let threshold = args.threshold.unwrap_or(config.similarity.threshold);

    let images = FileDiscovery::new(!args.no_recursive).discover_all(&args.paths);
    if images.len() < 2 {
        anyhow::bail!(
            "Need at least two images to compare, found {}",
            images.len()
        );
    }

    let model_dir = config.model_dir();
    if !VisionEmbedder::model_exists(&config.vision, &model_dir) {
        anyhow::bail!(
            "Vision model not found at {}\nRun `geolens models download` first.",
            VisionEmbedder::model_path(&config.vision, &model_dir).display()
        );
    }

    tracing::info!(
        "Comparing {} images (threshold {:.2})",
        images.len(),
        threshold
    );

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping after the current image");
                cancel.cancel();
            }
        })
    };

    let progress = create_progress_bar(images.len() as u64);
    let bar = progress.clone();
    let embedder = VisionEmbedder::new(&config.vision, &config.limits, &model_dir);
    let start = std::time::Instant::now();

    let result = tokio::task::spawn_blocking(move || {
        let mut grouper = SimilarityGrouper::new(embedder);
        grouper.compute_similarity(
            &images,
            threshold,
            |current, total| {
                bar.set_position(current as u64);
                match images.get(current).and_then(|p| p.file_name()) {
                    Some(name) if current < total => {
                        bar.set_message(name.to_string_lossy().into_owned())
                    }
                    _ => bar.set_message("comparing"),
                }
            },
            &cancel,
        )
    })
    .await?;

    interrupt.abort();
    progress.finish_and_clear();

    let groups = match result {
        Ok(groups) => groups,
        Err(GroupingError::Cancelled) => anyhow::bail!("Cancelled"),
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        "{} group(s) found in {:.1}s",
        groups.len(),
        start.elapsed().as_secs_f64()
    );

    if groups.is_empty() && matches!(args.format, OutputFormat::Text) {
        println!("No similar images found.");
        return Ok(());
    }

    let mut writer = output_writer(args.output.as_deref(), args.format)?;
    writer.write_all(&groups)?;
    writer.flush()?;

    if let Some(path) = &args.output {
        tracing::info!("Results written to {}", path.display());
    }
    Ok(())
}
