use thiserror::Error;
use tracing::debug;

use crate::preprocess::{self, PreprocessError};
use crate::recognizer::{OcrBackend, OcrError};

/// Confidence assigned to text supplied directly by the caller.
pub const PROVIDED_TEXT_CONFIDENCE: f64 = 0.95;

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("Image preprocessing failed: {0}")]
    Image(#[from] PreprocessError),
    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    Provided,
    Ocr,
}

/// Document text plus how much the acquisition step trusts it.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquiredText {
    pub text: String,
    pub confidence: f64,
    pub source: TextSource,
}

/// Obtain the document text. Caller-supplied text wins when it has any
/// content; otherwise the image goes through preprocessing and OCR. With
/// neither, the text is empty and token extraction reports it as too noisy.
pub fn acquire<R: OcrBackend + ?Sized>(
    recognizer: &R,
    text: Option<&str>,
    image: Option<&[u8]>,
) -> Result<AcquiredText, AcquisitionError> {
    let image = image.filter(|bytes| !bytes.is_empty());

    match (text, image) {
        (Some(t), _) if !t.trim().is_empty() => Ok(provided(t)),
        (_, Some(bytes)) => {
            let png = preprocess::prepare_for_ocr(bytes)?;
            let text = recognizer.recognize(&png)?;
            let confidence = ocr_confidence(&text);
            debug!(chars = text.len(), confidence, "OCR produced text");
            Ok(AcquiredText { text, confidence, source: TextSource::Ocr })
        }
        (text, None) => Ok(provided(text.unwrap_or_default())),
    }
}

fn provided(text: &str) -> AcquiredText {
    AcquiredText {
        text: text.to_string(),
        confidence: PROVIDED_TEXT_CONFIDENCE,
        source: TextSource::Provided,
    }
}

/// Length heuristic for OCR output: a page with more legible text earns more
/// trust, bounded to [0.5, 0.95].
pub fn ocr_confidence(text: &str) -> f64 {
    (text.trim().chars().count() as f64 / 100.0).clamp(0.5, 0.95)
}
