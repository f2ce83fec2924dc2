//! Result rendering as JSON, JSON Lines, or plain text.

use serde::Serialize;
use std::fmt;
use std::io::{self, Write};

use crate::types::{LocationCandidate, LocationPrediction, SimilarityGroup};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// Single JSON document
    Json,
    /// One JSON object per line
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Serializes result items in the chosen [`OutputFormat`].
///
/// Text output uses each item's `Display` impl.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// `pretty` only affects [`OutputFormat::Json`].
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    /// Write one item.
    pub fn write<T: Serialize + fmt::Display>(&mut self, item: &T) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(self.writer, "{item}")?,
            OutputFormat::Json => {
                self.write_json(item)?;
                writeln!(self.writer)?;
            }
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
                writeln!(self.writer)?;
            }
        }
        self.items_written += 1;
        Ok(())
    }

    /// Write a batch. JSON emits one array; the other formats write item by
    /// item.
    pub fn write_all<T: Serialize + fmt::Display>(&mut self, items: &[T]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                self.write_json(items)?;
                writeln!(self.writer)?;
                self.items_written += items.len();
            }
            OutputFormat::Text | OutputFormat::JsonLines => {
                for item in items {
                    self.write(item)?;
                }
            }
        }
        Ok(())
    }

    fn write_json<T: Serialize + ?Sized>(&mut self, value: &T) -> io::Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, value).map_err(io::Error::other)
        } else {
            serde_json::to_writer(&mut self.writer, value).map_err(io::Error::other)
        }
    }

    pub fn items_written(&self) -> usize {
        self.items_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl fmt::Display for SimilarityGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} images, avg similarity {:.3}",
            self.images.len(),
            self.avg_similarity
        )?;
        for image in &self.images {
            write!(f, "\n  {}", image.display())?;
        }
        Ok(())
    }
}

impl fmt::Display for LocationPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>6.2}%  {:>9.4}, {:>9.4}  {}",
            self.confidence * 100.0,
            self.latitude,
            self.longitude,
            self.description
        )
    }
}

impl fmt::Display for LocationCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>9.4}, {:>9.4}  {}",
            self.latitude, self.longitude, self.description
        )?;
        let place: Vec<&str> = [self.city.as_deref(), self.country.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !place.is_empty() {
            write!(f, " ({})", place.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn group() -> SimilarityGroup {
        SimilarityGroup {
            images: vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")],
            avg_similarity: 0.9512,
        }
    }

    fn prediction(confidence: f32) -> LocationPrediction {
        LocationPrediction {
            latitude: 48.8584,
            longitude: 2.2945,
            confidence,
            description: "Eiffel Tower".to_string(),
        }
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!(OutputFormat::parse("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("ndjson"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("text"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::parse("xml"), None);
    }

    #[test]
    fn test_write_all_json_array() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Json, false);
        writer.write_all(&[group(), group()]).unwrap();
        assert_eq!(writer.items_written(), 2);

        let output = String::from_utf8(buffer).unwrap();
        let parsed: Vec<SimilarityGroup> = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].images[1], PathBuf::from("b.jpg"));
    }

    #[test]
    fn test_write_jsonl_one_per_line() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::JsonLines, true);
        writer
            .write_all(&[prediction(0.7), prediction(0.2)])
            .unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.trim().split('\n').collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"description\":\"Eiffel Tower\""));
    }

    #[test]
    fn test_text_rendering() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Text, false);
        writer.write(&group()).unwrap();
        writer.write(&prediction(0.7054)).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("2 images, avg similarity 0.951"));
        assert!(output.contains("  a.jpg"));
        assert!(output.contains("70.54%"));
        assert!(output.contains("Eiffel Tower"));
    }

    #[test]
    fn test_candidate_text_includes_place() {
        let candidate = LocationCandidate {
            latitude: 35.3606,
            longitude: 138.7274,
            description: "Mount Fuji".to_string(),
            country: Some("Japan".to_string()),
            city: None,
            category: Some("nature".to_string()),
        };
        let text = candidate.to_string();
        assert!(text.ends_with("Mount Fuji (Japan)"));
    }
}
