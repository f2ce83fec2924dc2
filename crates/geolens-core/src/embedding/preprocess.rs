//! Image preprocessing for the ONNX vision towers.
//!
//! Both models follow the same recipe:
//! - resize so the shorter side equals `resize_to` (aspect preserved)
//! - center crop `crop × crop`
//!
//! The crop window is located in source pixels first and only that window is
//! resampled, so panoramas and scanned strips never allocate a full-length
//! intermediate image.
//! - scale to [0, 1] and normalize per channel with the model's mean/std
//! - tensor layout NCHW [1, 3, crop, crop]

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::Array4;

/// Number of color channels (RGB).
const CHANNELS: usize = 3;

/// Per-channel normalization constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

/// ImageNet statistics used by torchvision-style CNN feature extractors.
pub const IMAGENET: Normalization = Normalization {
    mean: [0.485, 0.456, 0.406],
    std: [0.229, 0.224, 0.225],
};

/// OpenAI CLIP statistics.
pub const CLIP: Normalization = Normalization {
    mean: [0.481_454_66, 0.457_827_5, 0.408_210_73],
    std: [0.268_629_54, 0.261_302_58, 0.275_777_11],
};

/// Center-crop window `(left, top, width, height)` in source pixels.
///
/// Equivalent to resizing the shorter side to `resize_to` and cropping
/// `crop × crop` from the middle, mapped back onto the original image.
fn crop_window(width: u32, height: u32, resize_to: u32, crop: u32) -> (u32, u32, u32, u32) {
    let shorter = f64::from(width.min(height).max(1));
    let side = f64::from(crop) * shorter / f64::from(resize_to.max(1));

    let win_w = (side.round() as u32).clamp(1, width.max(1));
    let win_h = (side.round() as u32).clamp(1, height.max(1));
    let left = (width.saturating_sub(win_w)) / 2;
    let top = (height.saturating_sub(win_h)) / 2;
    (left, top, win_w, win_h)
}

/// Resize, center crop and normalize an image into an NCHW tensor.
pub fn preprocess(
    image: &DynamicImage,
    resize_to: u32,
    crop: u32,
    norm: &Normalization,
) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let (left, top, win_w, win_h) = crop_window(width, height, resize_to, crop);

    let rgb = image
        .crop_imm(left, top, win_w, win_h)
        .resize_exact(crop, crop, FilterType::CatmullRom)
        .to_rgb8();

    let size = crop as usize;
    let mut tensor = Array4::<f32>::zeros((1, CHANNELS, size, size));

    // Write straight into the contiguous buffer instead of 4D indexing.
    let plane = size * size;
    if let Some(tensor_data) = tensor.as_slice_mut() {
        for (i, pixel) in rgb.as_raw().chunks_exact(CHANNELS).enumerate() {
            for (c, &val) in pixel.iter().enumerate() {
                tensor_data[c * plane + i] = (val as f32 / 255.0 - norm.mean[c]) / norm.std[c];
            }
        }
    }

    tensor
}
