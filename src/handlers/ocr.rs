use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::{HttpRequest, HttpResponse, web};
use futures::StreamExt;
use log::{info, warn};

use crate::config::Config;
use crate::constants;
use crate::error::{AppError, AppResult};
use crate::models::OcrRequest;
use crate::services::{OcrGateway, UploadStore};

struct UploadedFile {
    filename: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct OcrForm {
    file: Option<UploadedFile>,
    mode: Option<String>,
    task: Option<String>,
    prompt: Option<String>,
}

/// `POST /api/ocr`: stores the uploaded document and relays it to the gateway.
///
/// Gateway failures still answer 200 with the failure payload unless
/// `OCR_FAILURE_AS_502` is set.
pub async fn api_ocr(
    req: HttpRequest,
    body: web::Payload,
    gateway: web::Data<OcrGateway>,
    store: web::Data<UploadStore>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    if !is_multipart(&req) {
        warn!("OCR request without multipart body");
        return Err(AppError::NoFile);
    }

    let mut payload = Multipart::new(req.headers(), body);
    let form = read_form(&mut payload, config.max_upload_bytes).await?;
    let file = form.file.ok_or(AppError::NoFile)?;
    let filename = file
        .filename
        .filter(|name| !name.trim().is_empty())
        .ok_or(AppError::InvalidFilename)?;

    let path = store
        .save(&filename, &file.bytes)
        .await?
        .ok_or(AppError::InvalidFilename)?;

    let request = OcrRequest::new(path)
        .with_mode(form.mode.unwrap_or_else(|| constants::DEFAULT_MODE.to_string()))
        .with_task(form.task.unwrap_or_else(|| constants::DEFAULT_TASK.to_string()))
        .with_prompt(form.prompt.unwrap_or_else(|| constants::DEFAULT_PROMPT.to_string()));
    info!(
        "OCR request for {:?}: mode={} task={}",
        filename, request.mode, request.task
    );

    let result = gateway.process(&request).await;
    let status = if !result.is_success() && config.failure_as_bad_gateway {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };

    Ok(HttpResponse::build(status).json(result))
}

fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Collects the form fields. A stream that fails before its first field
/// (empty body, missing boundary) carries no file.
async fn read_form(payload: &mut Multipart, max_field_bytes: usize) -> AppResult<OcrForm> {
    let mut form = OcrForm::default();
    let mut fields_seen = 0usize;

    while let Some(field) = payload.next().await {
        let mut field = match field {
            Ok(field) => field,
            Err(e) if fields_seen == 0 => {
                warn!("Multipart body without fields: {}", e);
                return Err(AppError::NoFile);
            }
            Err(e) => return Err(e.into()),
        };
        fields_seen += 1;

        let name = field.name().unwrap_or_default().to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if bytes.len() + chunk.len() > max_field_bytes {
                warn!("Field {:?} exceeds {} bytes", name, max_field_bytes);
                return Err(AppError::TooLarge(max_field_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "file" if form.file.is_none() => form.file = Some(UploadedFile { filename, bytes }),
            "mode" => form.mode = Some(String::from_utf8_lossy(&bytes).into_owned()),
            "task" => form.task = Some(String::from_utf8_lossy(&bytes).into_owned()),
            "prompt" => form.prompt = Some(String::from_utf8_lossy(&bytes).into_owned()),
            _ => {}
        }
    }

    Ok(form)
}
