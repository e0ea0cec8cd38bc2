use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use medbill_core::{Amount, ClassifiedAmount, Currency, ExtractionReport};
use medbill_extract::{
    AcquiredText, AmountPipeline, Classification, CompletionBackend, Normalized, OcrBackend,
    PipelineOutcome, TokenExtraction,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;

pub type Pipeline = AmountPipeline<Box<dyn OcrBackend>, Box<dyn CompletionBackend>>;
pub type SharedPipeline = Arc<Pipeline>;

pub const SERVICE_NAME: &str = "medical-amount-detection";

pub fn router(pipeline: SharedPipeline, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/extract/step1", post(step1))
        .route("/api/extract/step2", post(step2))
        .route("/api/extract/step3", post(step3))
        .route("/api/extract/step4", post(step4))
        .route("/api/extract/complete", post(complete))
        .with_state(pipeline)
        // Enforced by the extractors, so an oversized body comes back as a
        // JSON 413 through `ApiError`.
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

// ── Request / response bodies ─────────────────────────────────────────────────

/// A document given as text, as a base64-encoded image, or both.
#[derive(Debug, Deserialize)]
pub struct DocumentRequest {
    pub text: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NormalizeRequest {
    #[serde(default)]
    pub raw_tokens: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub normalized_amounts: Vec<Amount>,
}

#[derive(Debug, Deserialize)]
pub struct AssembleRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub amounts: Vec<ClassifiedAmount>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub ai_model: String,
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// `GET /health`
async fn health(State(pipeline): State<SharedPipeline>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        ai_model: pipeline.completion().model_name().to_string(),
    })
}

/// `POST /api/extract/step1`: raw tokens and currency hint.
async fn step1(
    State(pipeline): State<SharedPipeline>,
    payload: Result<Json<DocumentRequest>, JsonRejection>,
) -> Result<Json<TokenExtraction>, ApiError> {
    let Json(req) = payload?;
    let acquired = acquire(&pipeline, req).await?;
    Ok(Json(pipeline.tokens(&acquired)))
}

/// `POST /api/extract/step2`: OCR repair and numeric conversion.
async fn step2(
    State(pipeline): State<SharedPipeline>,
    payload: Result<Json<NormalizeRequest>, JsonRejection>,
) -> Result<Json<Normalized>, ApiError> {
    let Json(req) = payload?;
    Ok(Json(pipeline.normalize(&req.raw_tokens)))
}

/// `POST /api/extract/step3`: classification by context.
async fn step3(
    State(pipeline): State<SharedPipeline>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<Classification>, ApiError> {
    let Json(req) = payload?;
    let amounts: Vec<Amount> = req.normalized_amounts.into_iter().map(Amount::normalized).collect();
    Ok(Json(pipeline.classify(&req.text, &amounts).await))
}

/// `POST /api/extract/step4`: provenance and final shape.
async fn step4(
    State(pipeline): State<SharedPipeline>,
    payload: Result<Json<AssembleRequest>, JsonRejection>,
) -> Result<Json<ExtractionReport>, ApiError> {
    let Json(req) = payload?;
    Ok(Json(pipeline.assemble(&req.text, req.currency, &req.amounts)))
}

/// `POST /api/extract/complete`: the whole pipeline.
async fn complete(
    State(pipeline): State<SharedPipeline>,
    payload: Result<Json<DocumentRequest>, JsonRejection>,
) -> Result<Json<PipelineOutcome>, ApiError> {
    let Json(req) = payload?;
    let acquired = acquire(&pipeline, req).await?;
    Ok(Json(pipeline.process_acquired(&acquired).await))
}

/// Decode the image and run acquisition on the blocking pool, since OCR
/// can take seconds.
async fn acquire(pipeline: &SharedPipeline, req: DocumentRequest) -> Result<AcquiredText, ApiError> {
    let image = decode_image(req.image.as_deref())?;
    let pipeline = Arc::clone(pipeline);
    let text = req.text;

    tokio::task::spawn_blocking(move || pipeline.acquire(text.as_deref(), image.as_deref()))
        .await
        .map_err(|e| ApiError::Internal(format!("OCR task failed: {e}")))?
        .map_err(ApiError::from_acquisition)
}

/// Accepts bare base64 or a `data:image/...;base64,` URL. Blank means absent.
fn decode_image(image: Option<&str>) -> Result<Option<Vec<u8>>, ApiError> {
    let Some(encoded) = image.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let payload = match encoded.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map_or(rest, |(_, data)| data),
        None => encoded,
    };
    let cleaned: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    STANDARD
        .decode(cleaned)
        .map(Some)
        .map_err(|e| ApiError::BadRequest(format!("Invalid base64 image: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use medbill_extract::{DisabledBackend, MockRecognizer, UnavailableRecognizer};
    use serde_json::{json, Value};
    use std::io::Cursor;
    use tower::ServiceExt;

    const BILL: &str = "Doctor Consultation Fee: Rs 500\n\
                        Total Amount: Rs 2940\n\
                        Amount Paid: Rs 2000\n\
                        Balance Due: Rs 940";

    fn app(recognizer: Box<dyn OcrBackend>) -> Router {
        app_with_limit(recognizer, 1024 * 1024)
    }

    fn app_with_limit(recognizer: Box<dyn OcrBackend>, max_body_bytes: usize) -> Router {
        let completion: Box<dyn CompletionBackend> = Box::new(DisabledBackend);
        router(Arc::new(AmountPipeline::new(recognizer, completion)), max_body_bytes)
    }

    fn text_app() -> Router {
        app(Box::new(UnavailableRecognizer))
    }

    fn png_base64() -> String {
        let img: GrayImage = ImageBuffer::from_fn(6, 6, |x, y| Luma([((x + y) * 20) as u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        STANDARD.encode(buf)
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(app, req).await
    }

    #[tokio::test]
    async fn health_reports_model() {
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(text_app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"status": "healthy", "service": SERVICE_NAME, "ai_model": "none"})
        );
    }

    #[tokio::test]
    async fn step1_from_text() {
        let (status, body) = post(text_app(), "/api/extract/step1", json!({"text": BILL})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"raw_tokens": ["500", "2940", "2000", "940"], "currency_hint": "INR", "confidence": 0.95})
        );
    }

    #[tokio::test]
    async fn step1_from_image() {
        let app = app(Box::new(MockRecognizer::new(
            "CITY HOSPITAL MEDICAL INVOICE\nX-Ray Charges   USD 900\nTotal Amount   USD 2940",
        )));
        let image = format!("data:image/png;base64,{}", png_base64());
        let (status, body) = post(app, "/api/extract/step1", json!({"image": image})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["raw_tokens"], json!(["900", "2940"]));
        assert_eq!(body["currency_hint"], "USD");
        assert_eq!(body["confidence"], 0.77);
    }

    #[tokio::test]
    async fn step1_noisy_text() {
        let (status, body) = post(text_app(), "/api/extract/step1", json!({"text": "ok"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "no_amounts_found", "reason": "document too noisy"}));
    }

    #[tokio::test]
    async fn step1_bad_base64_is_400() {
        let (status, body) = post(text_app(), "/api/extract/step1", json!({"image": "***"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("base64"));
    }

    #[tokio::test]
    async fn malformed_json_is_400_with_error_body() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/extract/step2")
            .header("content-type", "application/json")
            .body(Body::from("{\"raw_tokens\": [1, 2"))
            .unwrap();
        let (status, body) = send(text_app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn step2_normalizes() {
        let (status, body) = post(
            text_app(),
            "/api/extract/step2",
            json!({"raw_tokens": ["5OO", "l200", "5%", "12.50"]}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"normalized_amounts": [500, 1200, 12.5], "normalization_confidence": 0.82})
        );
    }

    #[tokio::test]
    async fn step3_falls_back_without_model() {
        let (status, body) = post(
            text_app(),
            "/api/extract/step3",
            json!({"text": "Total Amount Rs 2940", "normalized_amounts": [2940.0]}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"amounts": [{"type": "total_bill", "value": 2940}], "confidence": 0.7})
        );
    }

    #[tokio::test]
    async fn step4_attaches_provenance() {
        let (status, body) = post(
            text_app(),
            "/api/extract/step4",
            json!({
                "text": BILL,
                "currency": "INR",
                "amounts": [{"type": "due", "value": 940}, {"type": "other", "value": 77}]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "currency": "INR",
                "amounts": [
                    {"type": "due", "value": 940, "source": "text: 'Balance Due: Rs 940'"},
                    {"type": "other", "value": 77, "source": "unknown"}
                ],
                "status": "ok"
            })
        );
    }

    #[tokio::test]
    async fn complete_bill_without_model() {
        let (status, body) = post(text_app(), "/api/extract/complete", json!({"text": BILL})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "currency": "INR",
                "amounts": [
                    {"type": "consultation_fee", "value": 500, "source": "text: 'Doctor Consultation Fee: Rs 500'"},
                    {"type": "total_bill", "value": 2940, "source": "text: 'Total Amount: Rs 2940'"},
                    {"type": "paid", "value": 2000, "source": "text: 'Amount Paid: Rs 2000'"},
                    {"type": "due", "value": 940, "source": "text: 'Balance Due: Rs 940'"}
                ],
                "status": "ok",
                "confidence_score": 0.7
            })
        );
    }

    #[tokio::test]
    async fn missing_and_empty_text_are_both_too_noisy() {
        let noisy = json!({"status": "no_amounts_found", "reason": "document too noisy"});
        for request in [json!({}), json!({"text": ""}), json!({"text": null, "image": ""})] {
            let (status, body) = post(text_app(), "/api/extract/complete", request.clone()).await;
            assert_eq!(status, StatusCode::OK, "request {request}");
            assert_eq!(body, noisy, "request {request}");
        }
    }

    #[tokio::test]
    async fn complete_with_undecodable_image_is_400() {
        let image = STANDARD.encode(b"definitely not a png");
        let (status, _) = post(text_app(), "/api/extract/complete", json!({"image": image})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn complete_with_ocr_unavailable_is_500() {
        let (status, body) = post(text_app(), "/api/extract/complete", json!({"image": png_base64()})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("OCR"));
    }

    #[tokio::test]
    async fn oversized_body_is_413_with_error_body() {
        let app = app_with_limit(Box::new(UnavailableRecognizer), 64);
        let (status, body) =
            post(app, "/api/extract/complete", json!({"text": "Total Rs 2940 ".repeat(15)})).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn oversized_body_with_declared_length_is_413_with_error_body() {
        let app = app_with_limit(Box::new(UnavailableRecognizer), 64);
        let payload = json!({"raw_tokens": vec!["2940"; 40]}).to_string();
        let req = Request::builder()
            .method("POST")
            .uri("/api/extract/step2")
            .header("content-type", "application/json")
            .header("content-length", payload.len())
            .body(Body::from(payload))
            .unwrap();
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body["error"].is_string());
    }

    #[test]
    fn decode_image_variants() {
        assert_eq!(decode_image(None).unwrap(), None);
        assert_eq!(decode_image(Some("  ")).unwrap(), None);
        assert_eq!(decode_image(Some("aGk=")).unwrap(), Some(b"hi".to_vec()));
        assert_eq!(decode_image(Some("data:image/png;base64,aG\nk=")).unwrap(), Some(b"hi".to_vec()));
        assert!(decode_image(Some("not base64!")).is_err());
    }
}
