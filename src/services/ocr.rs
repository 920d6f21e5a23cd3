use async_trait::async_trait;
use log::{error, info};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::models::{GatewayError, OcrRequest, OcrResult};
use crate::services::GradioBackend;

/// A remote model that answers an OCR request with its raw output tuple.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    async fn predict(&self, request: &OcrRequest) -> Result<Vec<Value>, GatewayError>;
    fn backend_id(&self) -> &'static str;
}

/// Turns local OCR requests into one remote call and normalizes the answer.
///
/// Never returns an error: every failure becomes [`OcrResult::Failure`].
#[derive(Clone)]
pub struct OcrGateway {
    backend: Arc<dyn OcrBackend>,
}

impl OcrGateway {
    pub fn new(backend: Arc<dyn OcrBackend>) -> Self {
        Self { backend }
    }

    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        let backend = GradioBackend::from_config(config)?;
        info!(
            "OCR gateway using {} at {}",
            backend.backend_id(),
            backend.base_url()
        );
        Ok(Self::new(Arc::new(backend)))
    }

    pub async fn process(&self, request: &OcrRequest) -> OcrResult {
        let started = Instant::now();
        match self.try_process(request).await {
            Ok(result) => {
                info!(
                    "OCR for {:?} via {} done in {:?} ({} chars)",
                    request.file_path,
                    self.backend.backend_id(),
                    started.elapsed(),
                    result.text().map_or(0, str::len)
                );
                result
            }
            Err(e) => {
                error!("OCR for {:?} failed: {}", request.file_path, e);
                OcrResult::failure(e.to_string())
            }
        }
    }

    async fn try_process(&self, request: &OcrRequest) -> Result<OcrResult, GatewayError> {
        let meta = tokio::fs::metadata(&request.file_path)
            .await
            .map_err(|source| GatewayError::File {
                path: request.file_path.display().to_string(),
                source,
            })?;
        if !meta.is_file() {
            return Err(GatewayError::File {
                path: request.file_path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            });
        }

        let raw_output = self.backend.predict(request).await?;
        OcrResult::from_raw(raw_output, &request.mode, &request.task)
    }
}
