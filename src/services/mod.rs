pub mod ocr;
pub use ocr::{OcrBackend, OcrGateway};

mod gradio;
pub use gradio::*;

mod file;
pub use file::*;

mod samples;
pub use samples::*;

pub mod benchmark;
pub mod readiness;
