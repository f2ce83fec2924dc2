//! The `geolens models` command for managing ONNX models.
//!
//! Each downloaded file gets a `<file>.blake3` sidecar holding the digest
//! computed while streaming, so `models verify` can detect later corruption.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use geolens_core::embedding::{clip, vision};
use geolens_core::Config;

use super::create_progress_bar;

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// Download the vision feature extractor and the CLIP model
    Download {
        /// Re-download files that already exist
        #[arg(long)]
        force: bool,

        /// Alternative URL for the vision feature extractor ONNX file.
        /// Must be a feature-extraction export matching `[vision]` settings.
        #[arg(long)]
        vision_url: Option<String>,
    },

    /// List installed model files
    List,

    /// Show model directory path
    Path,

    /// Re-hash installed files against their recorded digests
    Verify,
}

/// A file fetched from the Hugging Face hub.
struct RemoteFile {
    repo: &'static str,
    remote_path: &'static str,
    local_name: &'static str,
}

impl RemoteFile {
    fn url(&self) -> String {
        format!(
            "https://huggingface.co/{}/resolve/main/{}",
            self.repo, self.remote_path
        )
    }
}

/// CLIP ViT-B/32 image encoder exported for feature extraction (512-d).
const VISION_FILE: RemoteFile = RemoteFile {
    repo: "Qdrant/clip-ViT-B-32-vision",
    remote_path: "model.onnx",
    local_name: vision::VISUAL_MODEL_FILENAME,
};

const CLIP_FILES: &[RemoteFile] = &[
    RemoteFile {
        repo: "Xenova/clip-vit-base-patch32",
        remote_path: "onnx/vision_model.onnx",
        local_name: clip::VISION_MODEL_FILENAME,
    },
    RemoteFile {
        repo: "Xenova/clip-vit-base-patch32",
        remote_path: "onnx/text_model.onnx",
        local_name: clip::TEXT_MODEL_FILENAME,
    },
    RemoteFile {
        repo: "Xenova/clip-vit-base-patch32",
        remote_path: "tokenizer.json",
        local_name: clip::TOKENIZER_FILENAME,
    },
];

const DIGEST_EXTENSION: &str = "blake3";

/// Execute the models command.
pub async fn execute(args: ModelsArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let model_dir = config.model_dir();
    let vision_dir = model_dir.join(&config.vision.model);
    let clip_dir = model_dir.join(&config.joint.model);

    match args.command {
        ModelsCommand::Download { force, vision_url } => {
            let client = reqwest::Client::new();

            let vision_url = vision_url.unwrap_or_else(|| VISION_FILE.url());
            let dest = vision_dir.join(VISION_FILE.local_name);
            fetch(&client, &vision_url, &dest, force).await?;

            for file in CLIP_FILES {
                fetch(&client, &file.url(), &clip_dir.join(file.local_name), force).await?;
            }

            tracing::info!("All downloads complete");
        }

        ModelsCommand::List => {
            println!("Model directory: {}\n", model_dir.display());

            println!("  Vision feature extractor ({}):", config.vision.model);
            print_status(&vision_dir.join(VISION_FILE.local_name));

            println!("\n  Joint image/text model ({}):", config.joint.model);
            for file in CLIP_FILES {
                print_status(&clip_dir.join(file.local_name));
            }
        }

        ModelsCommand::Path => {
            println!("{}", model_dir.display());
        }

        ModelsCommand::Verify => {
            let files: Vec<PathBuf> = std::iter::once(vision_dir.join(VISION_FILE.local_name))
                .chain(CLIP_FILES.iter().map(|f| clip_dir.join(f.local_name)))
                .filter(|p| p.exists())
                .collect();
            if files.is_empty() {
                println!("No models installed. Run `geolens models download`.");
                return Ok(());
            }

            let mut failures = 0;
            for path in &files {
                match verify(path) {
                    Ok(true) => println!("  ok        {}", path.display()),
                    Ok(false) => {
                        failures += 1;
                        println!("  MISMATCH  {}", path.display());
                    }
                    Err(e) => {
                        failures += 1;
                        println!("  error     {}: {e}", path.display());
                    }
                }
            }
            if failures > 0 {
                anyhow::bail!("{failures} file(s) failed verification; re-run `geolens models download --force`");
            }
        }
    }

    Ok(())
}

fn print_status(path: &Path) {
    let status = match std::fs::metadata(path) {
        Ok(meta) => format!("ready ({:.1} MB)", meta.len() as f64 / (1024.0 * 1024.0)),
        Err(_) => "not installed".to_string(),
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    println!("    - {:24} {}", name, status);
}

fn digest_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(DIGEST_EXTENSION);
    PathBuf::from(name)
}

/// Download `url` to `dest` unless it already exists.
async fn fetch(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    force: bool,
) -> anyhow::Result<()> {
    if dest.exists() && !force {
        tracing::info!("{} already exists", dest.display());
        return Ok(());
    }
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!("Downloading {}", url);
    let digest = download_file(client, url, dest).await?;
    std::fs::write(digest_path(dest), &digest)?;
    tracing::debug!("  blake3 {}", digest);
    Ok(())
}

/// Stream `url` into `dest`, returning the BLAKE3 hex digest of the body.
///
/// Writes to a `.part` file first so an interrupted download never leaves a
/// truncated model in place.
async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> anyhow::Result<String> {
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    let response = client
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("Download failed: {e}"))?;

    let progress = create_progress_bar(response.content_length().unwrap_or(0));
    if let Some(name) = dest.file_name() {
        progress.set_message(name.to_string_lossy().into_owned());
    }

    let partial = dest.with_extension("part");
    let mut file = tokio::fs::File::create(&partial).await?;
    let mut hasher = blake3::Hasher::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        hasher.update(&chunk);
        file.write_all(&chunk).await?;
        progress.inc(chunk.len() as u64);
    }
    file.flush().await?;
    drop(file);
    progress.finish_and_clear();

    tokio::fs::rename(&partial, dest).await?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// BLAKE3 hex digest of a file on disk.
fn hash_file(path: &Path) -> anyhow::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; 1 << 16];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Compare a file against its sidecar digest.
///
/// Errors when the sidecar is missing.
fn verify(path: &Path) -> anyhow::Result<bool> {
    let sidecar = digest_path(path);
    let expected = std::fs::read_to_string(&sidecar)
        .map_err(|e| anyhow::anyhow!("no recorded digest at {}: {e}", sidecar.display()))?;
    Ok(hash_file(path)? == expected.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_path_appends_extension() {
        assert_eq!(
            digest_path(Path::new("/m/clip-vit-b32-vision/visual.onnx")),
            PathBuf::from("/m/clip-vit-b32-vision/visual.onnx.blake3")
        );
    }

    #[test]
    fn verify_matches_recorded_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visual.onnx");
        std::fs::write(&path, b"weights").unwrap();
        let digest = blake3::hash(b"weights").to_hex().to_string();
        std::fs::write(digest_path(&path), &digest).unwrap();

        assert_eq!(hash_file(&path).unwrap(), digest);
        assert!(verify(&path).unwrap());

        std::fs::write(&path, b"tampered").unwrap();
        assert!(!verify(&path).unwrap());
    }

    #[test]
    fn verify_without_sidecar_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("text_model.onnx");
        std::fs::write(&path, b"weights").unwrap();
        assert!(verify(&path).is_err());
    }

    #[test]
    fn huggingface_url_layout() {
        assert_eq!(
            CLIP_FILES[2].url(),
            "https://huggingface.co/Xenova/clip-vit-base-patch32/resolve/main/tokenizer.json"
        );
        assert_eq!(
            VISION_FILE.url(),
            "https://huggingface.co/Qdrant/clip-ViT-B-32-vision/resolve/main/model.onnx"
        );
    }
}
