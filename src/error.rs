use actix_web::{HttpResponse, ResponseError};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    NoFile,
    InvalidFilename,
    BadRequest(String),
    TooLarge(usize),
    Io(std::io::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NoFile => write!(f, "no file provided"),
            AppError::InvalidFilename => write!(f, "invalid filename"),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::TooLarge(limit) => write!(f, "upload exceeds the {} byte limit", limit),
            AppError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = serde_json::json!({ "error": self.to_string() });
        match self {
            AppError::NoFile | AppError::InvalidFilename | AppError::BadRequest(_) => {
                HttpResponse::BadRequest().json(body)
            }
            AppError::TooLarge(_) => HttpResponse::PayloadTooLarge().json(body),
            AppError::Io(_) => HttpResponse::InternalServerError().json(body),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
