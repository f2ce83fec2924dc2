//! Expands user-supplied paths into an ordered list of image files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions recognized as images, lowercase.
pub const SUPPORTED_FORMATS: &[&str] = &["jpg", "jpeg", "png", "webp", "tif", "tiff", "bmp"];

/// Finds image files under files and directories.
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    recursive: bool,
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self { recursive: true }
    }
}

impl FileDiscovery {
    pub fn new(recursive: bool) -> Self {
        Self { recursive }
    }

    /// Discover supported images at a single path.
    ///
    /// A file is returned as-is when its extension is supported. A directory
    /// is walked (one level deep unless recursive) and its images returned
    /// sorted by path.
    pub fn discover(&self, path: &Path) -> Vec<PathBuf> {
        if path.is_file() {
            return if is_supported(path) {
                vec![path.to_path_buf()]
            } else {
                vec![]
            };
        }

        let mut walker = WalkDir::new(path).follow_links(true);
        if !self.recursive {
            walker = walker.max_depth(1);
        }

        let mut files: Vec<PathBuf> = walker
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_supported(e.path()))
            .map(|e| e.into_path())
            .collect();

        files.sort();
        files
    }

    /// Discover images across several inputs, keeping input order and
    /// dropping repeats.
    pub fn discover_all<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                tracing::warn!("Path does not exist: {:?}", path);
                continue;
            }
            for file in self.discover(path) {
                if seen.insert(file.clone()) {
                    files.push(file);
                }
            }
        }
        files
    }
}

/// Check whether a path has a supported image extension (case-insensitive).
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            SUPPORTED_FORMATS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
