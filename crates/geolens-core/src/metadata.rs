//! EXIF GPS lookup.
//!
//! Used to skip location prediction for photos that are already geotagged.

use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Read the GPS position embedded in `path`, as `(latitude, longitude)` in
/// signed decimal degrees.
///
/// Returns `None` when the file cannot be read, carries no EXIF block, or is
/// missing either coordinate.
pub fn read_gps(path: &Path) -> Option<(f64, f64)> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = Reader::new().read_from_container(&mut reader).ok()?;

    let latitude = coordinate(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, 'S')?;
    let longitude = coordinate(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, 'W')?;

    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        tracing::debug!("Ignoring out-of-range GPS in {:?}", path);
        return None;
    }
    Some((latitude, longitude))
}

/// Whether `path` already carries GPS coordinates.
pub fn has_gps(path: &Path) -> bool {
    read_gps(path).is_some()
}

fn coordinate(exif: &exif::Exif, value_tag: Tag, ref_tag: Tag, negative: char) -> Option<f64> {
    let value = exif.get_field(value_tag, In::PRIMARY)?;
    let degrees = dms_to_degrees(&value.value)?;

    // A missing hemisphere reference is read as N/E.
    let sign = match exif.get_field(ref_tag, In::PRIMARY) {
        Some(r) if r.display_value().to_string().contains(negative) => -1.0,
        _ => 1.0,
    };
    Some(sign * degrees)
}

/// Degrees, minutes, seconds rationals to decimal degrees.
fn dms_to_degrees(value: &Value) -> Option<f64> {
    match value {
        Value::Rational(parts) if parts.len() >= 3 => {
            let d = parts[0].to_f64();
            let m = parts[1].to_f64();
            let s = parts[2].to_f64();
            let degrees = d + m / 60.0 + s / 3600.0;
            degrees.is_finite().then_some(degrees)
        }
        _ => None,
    }
}
