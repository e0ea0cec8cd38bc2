use image::{GrayImage, Luma};
use std::io::Cursor;
use thiserror::Error;

/// Ink is painted black, paper white.
const INK: Luma<u8> = Luma([0]);
const PAPER: Luma<u8> = Luma([255]);

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Not a decodable image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Decode a scanned bill (PNG / JPEG / WEBP / …), binarize it for OCR and
/// return PNG bytes. Fails if the bytes are not an image.
pub fn prepare_for_ocr(data: &[u8]) -> Result<Vec<u8>, PreprocessError> {
    let gray = image::load_from_memory(data)?.to_luma8();
    let page = match otsu_threshold(&gray) {
        Some(threshold) => binarize(gray, threshold),
        None => gray,
    };

    let mut png = Vec::new();
    page.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(png)
}

/// Gray level that best separates print from paper (Otsu's method: maximize
/// the between-class variance of the histogram). `None` for a page with a
/// single gray level.
pub fn otsu_threshold(gray: &GrayImage) -> Option<u8> {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    let level_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut below = 0u64;
    let mut below_sum = 0.0;
    let mut best: Option<(f64, u8)> = None;

    for (level, &count) in histogram.iter().enumerate() {
        below += count;
        below_sum += level as f64 * count as f64;
        if below == 0 {
            continue;
        }
        let above = total - below;
        if above == 0 {
            break;
        }

        let mean_below = below_sum / below as f64;
        let mean_above = (level_sum - below_sum) / above as f64;
        let spread = below as f64 * above as f64 * (mean_below - mean_above).powi(2);
        if best.map_or(true, |(s, _)| spread > s) {
            best = Some((spread, level as u8));
        }
    }

    best.map(|(_, threshold)| threshold)
}

fn binarize(mut gray: GrayImage, threshold: u8) -> GrayImage {
    for pixel in gray.pixels_mut() {
        *pixel = if pixel[0] <= threshold { INK } else { PAPER };
    }
    gray
}
