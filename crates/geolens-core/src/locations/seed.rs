//! Seed dataset parsing.
//!
//! The seed is a UTF-8 CSV with header
//! `latitude,longitude,description,country,city,category`. Only the first
//! three columns are required; quoted fields may contain commas.

use std::path::Path;

use serde::Deserialize;

use crate::error::StoreError;
use crate::types::LocationCandidate;

#[derive(Debug, Deserialize)]
struct SeedRow {
    latitude: f64,
    longitude: f64,
    description: String,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

/// Parse every row of the seed CSV at `path`.
///
/// Fails on a missing file, a malformed row, an out-of-range coordinate, an
/// empty description, or a file with no data rows.
pub fn read_seed(path: &Path) -> Result<Vec<LocationCandidate>, StoreError> {
    if !path.exists() {
        return Err(StoreError::SeedDatasetMissing(path.to_path_buf()));
    }

    let invalid = |message: String| StoreError::InvalidSeedData {
        path: path.to_path_buf(),
        message,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| invalid(e.to_string()))?;

    let mut candidates = Vec::new();
    for (i, result) in reader.deserialize::<SeedRow>().enumerate() {
        // Header is line 1.
        let line = i + 2;
        let row = result.map_err(|e| invalid(format!("line {line}: {e}")))?;
        candidates.push(validate_row(row).map_err(|msg| invalid(format!("line {line}: {msg}")))?);
    }

    if candidates.is_empty() {
        return Err(invalid("no locations found".to_string()));
    }

    tracing::debug!("Parsed {} seed locations from {:?}", candidates.len(), path);
    Ok(candidates)
}

fn validate_row(row: SeedRow) -> Result<LocationCandidate, String> {
    if !(-90.0..=90.0).contains(&row.latitude) {
        return Err(format!("latitude {} out of range", row.latitude));
    }
    if !(-180.0..=180.0).contains(&row.longitude) {
        return Err(format!("longitude {} out of range", row.longitude));
    }
    if row.description.is_empty() {
        return Err("empty description".to_string());
    }

    Ok(LocationCandidate {
        latitude: row.latitude,
        longitude: row.longitude,
        description: row.description,
        country: non_empty(row.country),
        city: non_empty(row.city),
        category: non_empty(row.category),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
