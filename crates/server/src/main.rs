use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use medbill_extract::{AmountPipeline, CompletionBackend, DisabledBackend, GeminiClient, OcrBackend};

mod config;
mod error;
mod routes;
mod telemetry;

use config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load().context("failed to load configuration")?;
    telemetry::init(config.log_format);
    tracing::debug!(?config, "configuration loaded");

    let recognizer = build_recognizer(&config);
    let completion = build_completion(&config)?;
    let ai_model = completion.model_name().to_string();
    let pipeline = Arc::new(AmountPipeline::new(recognizer, completion));

    let app = routes::router(pipeline, config.max_body_bytes);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, %ai_model, "medbill server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shut down");
    Ok(())
}

#[cfg(feature = "tesseract")]
fn build_recognizer(config: &ServerConfig) -> Box<dyn OcrBackend> {
    Box::new(medbill_extract::TesseractRecognizer::new(
        config.ocr.data_path.clone(),
        config.ocr.lang.clone(),
    ))
}

#[cfg(not(feature = "tesseract"))]
fn build_recognizer(_config: &ServerConfig) -> Box<dyn OcrBackend> {
    tracing::warn!("built without the `tesseract` feature; image input will be rejected");
    Box::new(medbill_extract::UnavailableRecognizer)
}

fn build_completion(config: &ServerConfig) -> anyhow::Result<Box<dyn CompletionBackend>> {
    match &config.ai.api_key {
        Some(key) => {
            let client = GeminiClient::new(
                key.clone(),
                config.ai.model.clone(),
                Duration::from_secs(config.ai.timeout_secs),
            )
            .context("failed to build Gemini client")?;
            Ok(Box::new(client))
        }
        None => {
            tracing::warn!("GEMINI_API_KEY not set; classifying with keyword rules only");
            Ok(Box::new(DisabledBackend))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
