use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::constants;
use crate::models::OcrRequest;
use crate::services::benchmark::{BenchConfig, Benchmark};
use crate::services::{OcrGateway, SampleGenerator};

#[derive(Parser)]
#[command(name = "ocr-relay")]
#[command(author, version, about = "HTTP relay to a hosted OCR model", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve,

    /// Run OCR on a local image or PDF and print the JSON result
    Ocr {
        /// Path to the document
        file: PathBuf,
        #[arg(long, default_value = constants::DEFAULT_MODE)]
        mode: String,
        #[arg(long, default_value = constants::DEFAULT_TASK)]
        task: String,
        #[arg(long, default_value = constants::DEFAULT_PROMPT)]
        prompt: String,
    },

    /// Generate sample images and benchmark the /api/ocr endpoint
    Bench {
        /// Number of sample images to generate and send
        #[arg(long, default_value_t = constants::SAMPLE_COUNT)]
        count: usize,
        /// Start the server as a child process before sending requests
        #[arg(long)]
        start_server: bool,
        /// OCR endpoint to benchmark
        #[arg(long, default_value = constants::BENCH_API_URL)]
        url: String,
        #[arg(long, default_value = constants::SAMPLES_DIR)]
        samples_dir: PathBuf,
        #[arg(long, default_value = constants::RESULTS_DIR)]
        results_dir: PathBuf,
        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 120)]
        timeout_secs: u64,
    },
}

pub async fn handle_ocr(file: PathBuf, mode: String, task: String, prompt: String) -> anyhow::Result<()> {
    let config = Config::new();
    let gateway = OcrGateway::from_config(&config)?;

    let request = OcrRequest::new(file)
        .with_mode(mode)
        .with_task(task)
        .with_prompt(prompt);
    let result = gateway.process(&request).await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.is_success() {
        anyhow::bail!("OCR failed for {:?}", request.file_path);
    }
    Ok(())
}

pub async fn handle_bench(
    count: usize,
    start_server: bool,
    url: String,
    samples_dir: PathBuf,
    results_dir: PathBuf,
    timeout_secs: u64,
) -> anyhow::Result<()> {
    let generator = SampleGenerator::new(samples_dir)?;
    let paths = generator.generate_samples(count)?;

    let bench = Benchmark::new(BenchConfig {
        api_url: url,
        results_dir,
        request_timeout: Duration::from_secs(timeout_secs),
        ..BenchConfig::default()
    })?;

    if start_server {
        info!("Starting OCR server for the benchmark...");
    }
    let summary = bench.run(&paths, start_server).await?;

    println!("\n--- Benchmark complete ---");
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
