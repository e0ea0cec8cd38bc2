// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static regex::Regex {
            static R: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
            R.get_or_init(|| regex::Regex::new($pat).expect("invalid regex"))
        }
    };
}

pub mod acquire;
pub mod ai;
pub mod assemble;
pub mod classify;
pub mod fallback;
pub mod locate;
pub mod normalize;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod tokens;
pub mod types;

pub use acquire::{AcquiredText, AcquisitionError, TextSource};
pub use ai::{AiError, CompletionBackend, DisabledBackend, GeminiClient, MockCompletion};
pub use classify::ClassificationError;
pub use pipeline::AmountPipeline;
pub use preprocess::{prepare_for_ocr, PreprocessError};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError, UnavailableRecognizer};
#[cfg(feature = "tesseract")]
pub use recognizer::TesseractRecognizer;
pub use types::{
    Classification, ClassificationMethod, ExtractedTokens, Normalized, PipelineOutcome,
    TokenExtraction,
};
