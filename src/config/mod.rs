use std::path::PathBuf;
use std::time::Duration;

use crate::constants;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    /// Hugging Face Space id (`owner/name`) or a full base URL.
    pub hf_space: String,
    pub hf_token: Option<String>,
    pub ocr_timeout: Duration,
    /// Answer failed OCR results with 502 instead of 200.
    pub failure_as_bad_gateway: bool,
    /// Largest accepted multipart field, in bytes.
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);
        let timeout_secs: u64 = std::env::var("OCR_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(120);
        let max_upload_mb: usize = std::env::var("MAX_UPLOAD_MB")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(constants::MAX_UPLOAD_MB);

        Self {
            host,
            port,
            upload_dir: PathBuf::from(
                std::env::var("UPLOAD_DIR").unwrap_or_else(|_| constants::UPLOAD_DIR.to_string()),
            ),
            hf_space: std::env::var("HF_SPACE")
                .unwrap_or_else(|_| constants::DEFAULT_HF_SPACE.to_string()),
            hf_token: std::env::var("HF_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            ocr_timeout: Duration::from_secs(timeout_secs),
            failure_as_bad_gateway: std::env::var("OCR_FAILURE_AS_502")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            max_upload_bytes: max_upload_mb * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
