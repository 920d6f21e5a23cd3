mod bench;
pub use bench::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::constants;

/// Failure while talking to the remote OCR service.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("cannot read {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("request to remote OCR service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote OCR service returned {status}: {body}")]
    Status { status: u16, body: String },
    /// Error reported by the remote service itself, passed through verbatim.
    #[error("{0}")]
    Remote(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone)]
pub struct OcrRequest {
    pub file_path: PathBuf,
    pub mode: String,
    pub task: String,
    pub custom_prompt: String,
}

impl OcrRequest {
    /// Request with the default mode, task and prompt.
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            mode: constants::DEFAULT_MODE.to_string(),
            task: constants::DEFAULT_TASK.to_string(),
            custom_prompt: constants::DEFAULT_PROMPT.to_string(),
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = task.into();
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_prompt = prompt.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrExtra {
    pub status: String,
    pub mode: String,
    pub task: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrSuccess {
    pub raw_output: Vec<Value>,
    pub text: String,
    pub extra: OcrExtra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrFailure {
    pub error: String,
    pub status: String,
}

/// Normalized outcome of one gateway call. Serializes without a tag, so the
/// JSON shape is either the success or the failure object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OcrResult {
    Success(OcrSuccess),
    Failure(OcrFailure),
}

impl OcrResult {
    /// Builds a success record from the remote tuple; index 1 carries the text.
    pub fn from_raw(raw_output: Vec<Value>, mode: &str, task: &str) -> Result<Self, GatewayError> {
        let text = match raw_output.get(1) {
            Some(value) => value_to_text(value),
            None => {
                return Err(GatewayError::Malformed(format!(
                    "expected at least 2 fields, got {}",
                    raw_output.len()
                )));
            }
        };

        Ok(OcrResult::Success(OcrSuccess {
            raw_output,
            text,
            extra: OcrExtra {
                status: "ok".to_string(),
                mode: mode.to_string(),
                task: task.to_string(),
            },
        }))
    }

    pub fn failure(error: impl Into<String>) -> Self {
        OcrResult::Failure(OcrFailure {
            error: error.into(),
            status: "failed".to_string(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OcrResult::Success(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            OcrResult::Success(s) => Some(&s.text),
            OcrResult::Failure(_) => None,
        }
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
