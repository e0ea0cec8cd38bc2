use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "MEDBILL_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on request bodies; base64 scans are large.
    pub max_body_bytes: usize,
    pub log_format: LogFormat,
    pub ai: AiConfig,
    pub ocr: OcrConfig,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Gemini API key. Without one, classification runs on keywords only.
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub data_path: Option<String>,
    pub lang: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_body_bytes: 10 * 1024 * 1024,
            log_format: LogFormat::default(),
            ai: AiConfig::default(),
            ocr: OcrConfig::default(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: medbill_extract::ai::DEFAULT_GEMINI_MODEL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self { data_path: None, lang: "eng".to_string() }
    }
}

// Keep the key out of startup logs.
impl fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ServerConfig {
    /// Defaults, then the TOML file named by `MEDBILL_CONFIG` (if set), then
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay environment variables read through `get`.
    pub fn apply_env<F>(&mut self, get: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = get("MEDBILL_HOST") {
            self.host = host;
        }
        if let Some(port) = get("MEDBILL_PORT") {
            self.port = parse_value("MEDBILL_PORT", port)?;
        }
        if let Some(bytes) = get("MEDBILL_MAX_BODY_BYTES") {
            self.max_body_bytes = parse_value("MEDBILL_MAX_BODY_BYTES", bytes)?;
        }
        if let Some(format) = get("MEDBILL_LOG_FORMAT") {
            self.log_format = match format.to_ascii_lowercase().as_str() {
                "pretty" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                _ => return Err(ConfigError::InvalidValue { key: "MEDBILL_LOG_FORMAT", value: format }),
            };
        }
        if let Some(key) = get("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.ai.api_key = Some(key);
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.ai.model = model;
        }
        if let Some(secs) = get("MEDBILL_AI_TIMEOUT_SECS") {
            self.ai.timeout_secs = parse_value("MEDBILL_AI_TIMEOUT_SECS", secs)?;
        }
        if let Some(path) = get("TESSERACT_DATA_PATH") {
            self.ocr.data_path = Some(path);
        }
        if let Some(lang) = get("TESSERACT_LANG") {
            self.ocr.lang = lang;
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}
