use medbill_core::{Amount, ClassifiedAmount, Currency, ExtractionReport};
use tracing::info;

use crate::acquire::{self, AcquiredText, AcquisitionError};
use crate::ai::CompletionBackend;
use crate::assemble;
use crate::classify;
use crate::normalize;
use crate::recognizer::OcrBackend;
use crate::tokens;
use crate::types::{Classification, Normalized, PipelineOutcome, TokenExtraction};

/// Orchestrates: acquire text → extract tokens → normalize → classify → assemble.
///
/// Holds only its two collaborators; every call is independent, so one
/// pipeline can be shared across concurrent requests.
pub struct AmountPipeline<R: OcrBackend, C: CompletionBackend> {
    recognizer: R,
    completion: C,
}

impl<R: OcrBackend, C: CompletionBackend> AmountPipeline<R, C> {
    pub fn new(recognizer: R, completion: C) -> Self {
        Self { recognizer, completion }
    }

    pub fn completion(&self) -> &C {
        &self.completion
    }

    /// Obtain the document text, running OCR when only an image is given.
    /// OCR is blocking; async callers may want to run this off the executor.
    pub fn acquire(
        &self,
        text: Option<&str>,
        image: Option<&[u8]>,
    ) -> Result<AcquiredText, AcquisitionError> {
        acquire::acquire(&self.recognizer, text, image)
    }

    /// Acquire the document text and pull raw tokens from it.
    pub fn extract_tokens(
        &self,
        text: Option<&str>,
        image: Option<&[u8]>,
    ) -> Result<TokenExtraction, AcquisitionError> {
        let acquired = self.acquire(text, image)?;
        Ok(self.tokens(&acquired))
    }

    pub fn tokens(&self, acquired: &AcquiredText) -> TokenExtraction {
        tokens::extract_tokens(&acquired.text, acquired.confidence)
    }

    pub fn normalize<S: AsRef<str>>(&self, raw_tokens: &[S]) -> Normalized {
        normalize::normalize_tokens(raw_tokens)
    }

    pub async fn classify(&self, text: &str, amounts: &[Amount]) -> Classification {
        classify::classify_amounts(&self.completion, text, amounts).await
    }

    pub fn assemble(
        &self,
        text: &str,
        currency: Currency,
        classified: &[ClassifiedAmount],
    ) -> ExtractionReport {
        assemble::assemble(text, currency, classified)
    }

    /// Run every stage in order. A document with nothing to extract is a
    /// normal outcome, not an error.
    pub async fn process(
        &self,
        text: Option<&str>,
        image: Option<&[u8]>,
    ) -> Result<PipelineOutcome, AcquisitionError> {
        let acquired = self.acquire(text, image)?;
        Ok(self.process_acquired(&acquired).await)
    }

    /// Stages after acquisition: tokens → normalize → classify → assemble.
    pub async fn process_acquired(&self, acquired: &AcquiredText) -> PipelineOutcome {
        let extracted = match self.tokens(acquired) {
            TokenExtraction::Tokens(t) => t,
            TokenExtraction::NoAmounts(none) => {
                info!(reason = %none.reason, "no amounts found");
                return PipelineOutcome::NoAmounts(none);
            }
        };

        let normalized = normalize::normalize_tokens(&extracted.raw_tokens);
        let classification = self
            .classify(&acquired.text, &normalized.normalized_amounts)
            .await;

        let mut report = assemble::assemble(
            &acquired.text,
            extracted.currency_hint,
            &classification.amounts,
        );
        report.confidence_score = Some(classification.confidence);

        info!(
            currency = %report.currency,
            amounts = report.amounts.len(),
            method = ?classification.method,
            confidence = classification.confidence,
            "document processed"
        );
        PipelineOutcome::Report(report)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{DisabledBackend, MockCompletion};
    use crate::recognizer::{MockRecognizer, UnavailableRecognizer};
    use crate::types::ClassificationMethod;
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use medbill_core::{AmountCategory, FinalAmount, NoAmountsFound, NoAmountsReason, ReportStatus};
    use std::io::Cursor;

    const BILL: &str = "Doctor Consultation Fee: Rs 500\n\
                        Total Amount: Rs 2940\n\
                        Amount Paid: Rs 2000\n\
                        Balance Due: Rs 940";

    fn tiny_png() -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(4, 4, |_, y| Luma([(y * 50) as u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn report(outcome: PipelineOutcome) -> ExtractionReport {
        match outcome {
            PipelineOutcome::Report(r) => r,
            other => panic!("expected a report, got {other:?}"),
        }
    }

    fn find(report: &ExtractionReport, value: i64) -> &FinalAmount {
        report
            .amounts
            .iter()
            .find(|a| a.value == Amount::Whole(value))
            .unwrap_or_else(|| panic!("{value} missing from {:?}", report.amounts))
    }

    #[tokio::test]
    async fn bill_without_model_uses_fallback() {
        let pipeline = AmountPipeline::new(UnavailableRecognizer, DisabledBackend);
        let r = report(pipeline.process(Some(BILL), None).await.unwrap());

        assert_eq!(r.currency, Currency::Inr);
        assert_eq!(r.status, ReportStatus::Ok);
        assert_eq!(r.confidence_score, Some(0.70));

        let expected = [
            (500, AmountCategory::ConsultationFee, "Doctor Consultation Fee: Rs 500"),
            (2940, AmountCategory::TotalBill, "Total Amount: Rs 2940"),
            (2000, AmountCategory::Paid, "Amount Paid: Rs 2000"),
            (940, AmountCategory::Due, "Balance Due: Rs 940"),
        ];
        for (value, category, line) in expected {
            let a = find(&r, value);
            assert_eq!(a.category, category, "category of {value}");
            assert_eq!(a.source, format!("text: '{line}'"));
        }
    }

    #[tokio::test]
    async fn model_reply_drives_report() {
        let backend = MockCompletion::replying(
            r#"{"amounts":[{"type":"total_bill","value":2940},{"type":"due","value":940}],"confidence":0.88}"#,
        );
        let pipeline = AmountPipeline::new(UnavailableRecognizer, backend);
        let r = report(pipeline.process(Some(BILL), None).await.unwrap());

        assert_eq!(r.confidence_score, Some(0.88));
        assert_eq!(r.amounts.len(), 2);
        assert_eq!(find(&r, 940).category, AmountCategory::Due);
        assert_eq!(find(&r, 940).source, "text: 'Balance Due: Rs 940'");
    }

    #[tokio::test]
    async fn image_input_goes_through_ocr() {
        let pipeline = AmountPipeline::new(MockRecognizer::new("Total Amount: $ 120.50"), DisabledBackend);
        let r = report(pipeline.process(None, Some(tiny_png().as_slice())).await.unwrap());
        assert_eq!(r.currency, Currency::Usd);
        assert_eq!(r.amounts[0].category, AmountCategory::TotalBill);
        assert_eq!(r.amounts[0].value, Amount::parse("120.50").unwrap());
    }

    #[tokio::test]
    async fn noisy_document_short_circuits() {
        let backend = MockCompletion::replying("{}");
        let pipeline = AmountPipeline::new(UnavailableRecognizer, backend);
        let outcome = pipeline.process(Some(" 42 "), None).await.unwrap();
        assert_eq!(
            outcome,
            PipelineOutcome::NoAmounts(NoAmountsFound::new(NoAmountsReason::TooNoisy))
        );
        assert!(pipeline.completion().prompts().is_empty());
    }

    #[tokio::test]
    async fn text_without_numbers_short_circuits() {
        let pipeline = AmountPipeline::new(UnavailableRecognizer, DisabledBackend);
        let outcome = pipeline.process(Some("Get well soon!"), None).await.unwrap();
        assert_eq!(
            outcome,
            PipelineOutcome::NoAmounts(NoAmountsFound::new(NoAmountsReason::NoNumericValues))
        );
    }

    #[tokio::test]
    async fn only_percentages_gives_empty_report() {
        let pipeline = AmountPipeline::new(UnavailableRecognizer, DisabledBackend);
        let r = report(pipeline.process(Some("Discount 10% applied"), None).await.unwrap());
        assert!(r.amounts.is_empty());
        assert_eq!(r.confidence_score, Some(0.0));
    }

    #[tokio::test]
    async fn ocr_failure_is_fatal() {
        let pipeline = AmountPipeline::new(UnavailableRecognizer, DisabledBackend);
        assert!(pipeline.process(None, Some(tiny_png().as_slice())).await.is_err());
    }

    #[tokio::test]
    async fn stages_can_run_one_at_a_time() {
        let pipeline = AmountPipeline::new(UnavailableRecognizer, DisabledBackend);

        let TokenExtraction::Tokens(t) = pipeline.extract_tokens(Some(BILL), None).unwrap() else {
            panic!("expected tokens");
        };
        assert_eq!(t.raw_tokens, vec!["500", "2940", "2000", "940"]);
        assert_eq!(t.confidence, 0.95);

        let n = pipeline.normalize(&t.raw_tokens);
        assert_eq!(n.normalized_amounts.len(), 4);

        let c = pipeline.classify(BILL, &n.normalized_amounts).await;
        assert_eq!(c.method, ClassificationMethod::Fallback);

        let r = pipeline.assemble(BILL, t.currency_hint, &c.amounts);
        assert_eq!(r.amounts.len(), 4);
    }
}
