use async_trait::async_trait;
use log::{debug, info};
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;

use crate::config::Config;
use crate::constants;
use crate::models::{GatewayError, OcrRequest};
use crate::services::OcrBackend;

/// Client for a Gradio app (typically a Hugging Face Space) exposing the
/// OCR endpoint over Gradio's HTTP API.
pub struct GradioBackend {
    client: reqwest::Client,
    base_url: String,
    api_name: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventHandle {
    event_id: String,
}

impl GradioBackend {
    pub fn new(space: &str, token: Option<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: space_base_url(space),
            api_name: constants::GRADIO_API_NAME.to_string(),
            token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        Self::new(&config.hf_space, config.hf_token.clone(), config.ocr_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Uploads the file and returns the server-side path Gradio assigned to it.
    async fn upload(&self, path: &Path) -> Result<String, GatewayError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| GatewayError::File {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("files", part);

        let resp = self
            .authorize(self.client.post(format!("{}/gradio_api/upload", self.base_url)))
            .multipart(form)
            .send()
            .await?;
        let paths: Vec<String> = ensure_success(resp).await?.json().await?;

        paths
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::Malformed("upload returned no file path".to_string()))
    }

    async fn submit(&self, data: Value) -> Result<String, GatewayError> {
        let resp = self
            .authorize(
                self.client
                    .post(format!("{}/gradio_api/call/{}", self.base_url, self.api_name)),
            )
            .json(&json!({ "data": data }))
            .send()
            .await?;
        let handle: EventHandle = ensure_success(resp).await?.json().await?;
        Ok(handle.event_id)
    }

    async fn fetch_result(&self, event_id: &str) -> Result<Vec<Value>, GatewayError> {
        let resp = self
            .authorize(self.client.get(format!(
                "{}/gradio_api/call/{}/{}",
                self.base_url, self.api_name, event_id
            )))
            .send()
            .await?;
        let body = ensure_success(resp).await?.text().await?;
        parse_event_stream(&body)
    }
}

#[async_trait]
impl OcrBackend for GradioBackend {
    async fn predict(&self, request: &OcrRequest) -> Result<Vec<Value>, GatewayError> {
        let remote_path = self.upload(&request.file_path).await?;
        debug!("Uploaded {:?} as {}", request.file_path, remote_path);

        // Inputs of the `run` endpoint: image, file_path, mode, task, custom_prompt.
        let data = json!([
            null,
            { "path": remote_path, "meta": { "_type": "gradio.FileData" } },
            request.mode,
            request.task,
            request.custom_prompt,
        ]);

        let event_id = self.submit(data).await?;
        info!("Submitted OCR job {} to {}", event_id, self.base_url);
        self.fetch_result(&event_id).await
    }

    fn backend_id(&self) -> &'static str {
        "gradio"
    }
}

async fn ensure_success(resp: Response) -> Result<Response, GatewayError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(GatewayError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Maps a Space id such as `owner/My_Space.v2` to `https://owner-my-space-v2.hf.space`.
/// Full URLs are used as given.
pub fn space_base_url(space: &str) -> String {
    let space = space.trim();
    if space.starts_with("http://") || space.starts_with("https://") {
        return space.trim_end_matches('/').to_string();
    }

    let subdomain: String = space
        .chars()
        .map(|c| match c {
            '/' | '_' | '.' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect();
    format!("https://{}.hf.space", subdomain)
}

/// Extracts the output tuple from a Gradio server-sent-event body.
fn parse_event_stream(body: &str) -> Result<Vec<Value>, GatewayError> {
    let mut event = "";

    for line in body.lines() {
        if let Some(name) = line.strip_prefix("event:") {
            event = name.trim();
            continue;
        }
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();

        match event {
            "complete" => {
                return match serde_json::from_str::<Value>(data) {
                    Ok(Value::Array(items)) => Ok(items),
                    Ok(other) => Err(GatewayError::Malformed(format!(
                        "expected an output list, got {}",
                        other
                    ))),
                    Err(e) => Err(GatewayError::Malformed(format!("invalid result data: {}", e))),
                };
            }
            "error" => {
                let message = match serde_json::from_str::<Value>(data) {
                    Ok(Value::String(s)) => s,
                    Ok(Value::Null) => "remote error".to_string(),
                    Ok(other) => other.to_string(),
                    Err(_) if data.is_empty() => "remote error".to_string(),
                    Err(_) => data.to_string(),
                };
                return Err(GatewayError::Remote(message));
            }
            _ => {}
        }
    }

    Err(GatewayError::Malformed(
        "event stream ended without a result".to_string(),
    ))
}
