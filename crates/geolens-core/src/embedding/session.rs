//! ONNX Runtime session management shared by the vision and CLIP towers.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;

use crate::error::EmbeddingError;

/// Wraps an ONNX Runtime session.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
pub(crate) struct OnnxSession {
    session: Mutex<Session>,
    /// Input tensor names, in graph order.
    input_names: Vec<String>,
    model_path: PathBuf,
}

impl OnnxSession {
    /// Load an ONNX graph from disk.
    pub fn load(model_path: &Path) -> Result<Self, EmbeddingError> {
        if !model_path.exists() {
            return Err(EmbeddingError::unavailable(format!(
                "Model not found at {:?}. Run `geolens models download` first.",
                model_path
            )));
        }

        let session = Session::builder()
            .map_err(|e| {
                EmbeddingError::unavailable(format!("Failed to create ONNX session builder: {e}"))
            })?
            .commit_from_file(model_path)
            .map_err(|e| {
                EmbeddingError::unavailable(format!(
                    "Failed to load ONNX model {:?}: {e}",
                    model_path
                ))
            })?;

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|i| i.name().to_string())
            .collect();

        tracing::debug!(
            "Loaded ONNX model {:?} (inputs: {:?}, outputs: {:?})",
            model_path,
            input_names,
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_names,
            model_path: model_path.to_path_buf(),
        })
    }

    /// Whether the graph declares an input with this name.
    pub fn has_input(&self, name: &str) -> bool {
        self.input_names.iter().any(|n| n == name)
    }

    /// Run a pixel tensor through the graph and return one vector per batch row.
    ///
    /// The first output whose name appears in `preferred` is used; otherwise
    /// the first output of the graph.
    pub fn run_pixels(
        &self,
        pixels: &Array4<f32>,
        preferred: &[&str],
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let batch = pixels.shape()[0];
        let shape: Vec<i64> = pixels.shape().iter().map(|&d| d as i64).collect();
        let flat: Vec<f32> = pixels.iter().copied().collect();

        let input_name = self
            .input_names
            .first()
            .map(String::as_str)
            .unwrap_or("pixel_values");

        let input_value = Value::from_array((shape, flat)).map_err(|e| {
            EmbeddingError::inference(format!("Failed to create input tensor: {e}"))
        })?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| EmbeddingError::inference(format!("Session lock poisoned: {e}")))?;

        let outputs = session
            .run(ort::inputs![input_name => input_value])
            .map_err(|e| EmbeddingError::inference(format!("ONNX inference failed: {e}")))?;

        let selected = preferred
            .iter()
            .find_map(|want| outputs.iter().find(|(name, _)| name == want))
            .or_else(|| outputs.iter().next())
            .ok_or_else(|| {
                EmbeddingError::inference(format!("{:?} produced no outputs", self.model_path))
            })?;

        let (_shape, data) = selected.1.try_extract_tensor::<f32>().map_err(|e| {
            EmbeddingError::inference(format!("Failed to extract output tensor: {e}"))
        })?;

        split_rows(data, batch)
    }

    /// Run token ids (and an attention mask, if the graph takes one) through
    /// the graph and return one vector per sequence.
    pub fn run_tokens(
        &self,
        input_ids: Vec<i64>,
        attention_mask: Vec<i64>,
        batch: usize,
        seq_len: usize,
        preferred: &[&str],
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let shape = vec![batch as i64, seq_len as i64];

        let ids_value = Value::from_array((shape.clone(), input_ids)).map_err(|e| {
            EmbeddingError::inference(format!("Failed to create input_ids tensor: {e}"))
        })?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| EmbeddingError::inference(format!("Session lock poisoned: {e}")))?;

        let outputs = if self.has_input("attention_mask") {
            let mask_value = Value::from_array((shape, attention_mask)).map_err(|e| {
                EmbeddingError::inference(format!("Failed to create attention_mask tensor: {e}"))
            })?;
            session.run(ort::inputs![
                "input_ids" => ids_value,
                "attention_mask" => mask_value
            ])
        } else {
            session.run(ort::inputs!["input_ids" => ids_value])
        }
        .map_err(|e| EmbeddingError::inference(format!("Text inference failed: {e}")))?;

        let selected = preferred
            .iter()
            .find_map(|want| outputs.iter().find(|(name, _)| name == want))
            .or_else(|| outputs.iter().next())
            .ok_or_else(|| {
                EmbeddingError::inference(format!("{:?} produced no outputs", self.model_path))
            })?;

        let (_shape, data) = selected.1.try_extract_tensor::<f32>().map_err(|e| {
            EmbeddingError::inference(format!("Failed to extract output tensor: {e}"))
        })?;

        split_rows(data, batch)
    }
}

/// Split a flat `[batch, ...]` output into one vector per batch row.
///
/// Trailing singleton dimensions (e.g. a pooled CNN output of shape
/// `[N, 512, 1, 1]`) collapse into the row.
fn split_rows(data: &[f32], batch: usize) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if batch == 0 {
        return Ok(vec![]);
    }
    if data.is_empty() || data.len() % batch != 0 {
        return Err(EmbeddingError::inference(format!(
            "Output of {} values cannot be split into {} rows",
            data.len(),
            batch
        )));
    }
    let dim = data.len() / batch;
    Ok(data.chunks(dim).map(<[f32]>::to_vec).collect())
}
