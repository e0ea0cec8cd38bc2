use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    /// The engine could not read the image it was handed.
    #[error("OCR could not read the image: {0}")]
    ImageDecode(String),
    #[error("OCR engine failed: {0}")]
    Engine(String),
    #[error("OCR not available (build with the `tesseract` feature)")]
    NotAvailable,
}

/// Turns a preprocessed PNG into text. Called from blocking context.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, png: &[u8]) -> Result<String, OcrError>;
}

impl<T: OcrBackend + ?Sized> OcrBackend for Box<T> {
    fn recognize(&self, png: &[u8]) -> Result<String, OcrError> {
        (**self).recognize(png)
    }
}

/// Reads every image as the same fixed text.
pub struct MockRecognizer {
    text: String,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _png: &[u8]) -> Result<String, OcrError> {
        Ok(self.text.clone())
    }
}

/// Stand-in used when no OCR engine is compiled in. Text input keeps working;
/// image input fails with [`OcrError::NotAvailable`].
pub struct UnavailableRecognizer;

impl OcrBackend for UnavailableRecognizer {
    fn recognize(&self, _png: &[u8]) -> Result<String, OcrError> {
        Err(OcrError::NotAvailable)
    }
}

/// Tesseract through `leptess`. Needs libtesseract and libleptonica at build time.
#[cfg(feature = "tesseract")]
pub struct TesseractRecognizer {
    data_path: Option<String>,
    lang: String,
}

#[cfg(feature = "tesseract")]
impl TesseractRecognizer {
    /// `data_path` is the tessdata directory; `None` lets Tesseract find its own.
    pub fn new(data_path: Option<String>, lang: impl Into<String>) -> Self {
        Self { data_path, lang: lang.into() }
    }
}

#[cfg(feature = "tesseract")]
impl OcrBackend for TesseractRecognizer {
    fn recognize(&self, png: &[u8]) -> Result<String, OcrError> {
        // LepTess is not Sync, so each call builds its own engine.
        let mut engine = leptess::LepTess::new(self.data_path.as_deref(), &self.lang)
            .map_err(|e| OcrError::Engine(e.to_string()))?;
        engine
            .set_image_from_mem(png)
            .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
        let text = engine.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))?;
        tracing::debug!(lang = %self.lang, chars = text.len(), "tesseract finished");
        Ok(text)
    }
}
