// src/constants.rs

pub const UPLOAD_DIR: &str = "./uploads";
pub const MAX_UPLOAD_MB: usize = 20;
pub const DEFAULT_HF_SPACE: &str = "merterbak/DeepSeek-OCR-Demo";
pub const GRADIO_API_NAME: &str = "run";

// Gateway defaults, shared with the upload form
pub const DEFAULT_MODE: &str = "Gundam";
pub const DEFAULT_TASK: &str = "🔍 Describe";
pub const DEFAULT_PROMPT: &str = "Extract text";

// Benchmark harness
pub const SAMPLES_DIR: &str = "./bench/samples";
pub const RESULTS_DIR: &str = "./bench/results";
pub const BENCH_API_URL: &str = "http://127.0.0.1:5000/api/ocr";
pub const SAMPLE_COUNT: usize = 10;
pub const SAMPLE_WIDTH: u32 = 800;
pub const SAMPLE_HEIGHT: u32 = 600;
pub const SAMPLE_JPEG_QUALITY: u8 = 85;
pub const SAMPLE_FILE_PATTERN: &str = "sample_{index}.jpg";
pub const SUMMARY_CSV: &str = "summary.csv";
pub const SUMMARY_JSON: &str = "summary.json";
