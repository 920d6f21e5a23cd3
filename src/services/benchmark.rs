use log::{error, info, warn};
use reqwest::Url;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};

use crate::constants;
use crate::models::{BenchError, BenchmarkRecord, BenchmarkReport, BenchmarkSummary, SummaryRow};
use crate::services::readiness::{ReadinessPolicy, wait_until_ready};

#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub api_url: String,
    pub results_dir: PathBuf,
    pub request_timeout: Duration,
    pub readiness: ReadinessPolicy,
    /// Executable started with `serve` when the benchmark hosts the server itself.
    pub server_program: Option<PathBuf>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            api_url: constants::BENCH_API_URL.to_string(),
            results_dir: PathBuf::from(constants::RESULTS_DIR),
            request_timeout: Duration::from_secs(120),
            readiness: ReadinessPolicy::default(),
            server_program: None,
        }
    }
}

/// Child process running the OCR server for the duration of a benchmark.
pub struct ServerProcess {
    child: Child,
}

impl ServerProcess {
    pub fn spawn(program: &Path, api_url: &Url) -> Result<Self, BenchError> {
        let host = api_url.host_str().unwrap_or("127.0.0.1");
        let port = api_url.port_or_known_default().unwrap_or(5000);

        let child = Command::new(program)
            .arg("serve")
            .env("HOST", host)
            .env("PORT", port.to_string())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(BenchError::Spawn)?;

        info!("Started server {:?} (PID {:?})", program, child.id());
        Ok(Self { child })
    }

    pub async fn stop(mut self) {
        info!("Stopping server started for the benchmark");
        if let Err(e) = self.child.kill().await {
            warn!("Failed to stop server process: {}", e);
        }
    }
}

/// Sequential driver that posts every sample to the OCR endpoint and records
/// what came back.
pub struct Benchmark {
    config: BenchConfig,
    client: reqwest::Client,
}

impl Benchmark {
    pub fn new(config: BenchConfig) -> Result<Self, BenchError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { config, client })
    }

    pub async fn run(&self, paths: &[PathBuf], start_server: bool) -> Result<BenchmarkSummary, BenchError> {
        let server = if start_server {
            Some(self.start_server().await?)
        } else {
            None
        };

        let summary = self.run_batch(paths).await;

        if let Some(server) = server {
            server.stop().await;
        }
        summary
    }

    async fn start_server(&self) -> Result<ServerProcess, BenchError> {
        let api_url = Url::parse(&self.config.api_url).map_err(|e| BenchError::InvalidUrl {
            url: self.config.api_url.clone(),
            message: e.to_string(),
        })?;
        let program = match &self.config.server_program {
            Some(program) => program.clone(),
            None => std::env::current_exe().map_err(BenchError::Spawn)?,
        };

        let server = ServerProcess::spawn(&program, &api_url)?;
        let health_url = health_url(&api_url);
        if let Err(e) = wait_until_ready(&self.client, &health_url, &self.config.readiness).await {
            error!("{}", e);
            server.stop().await;
            return Err(e);
        }
        Ok(server)
    }

    /// Sends every sample in order. Each record is written as soon as it exists;
    /// the CSV and JSON summaries follow the last one.
    pub async fn run_batch(&self, paths: &[PathBuf]) -> Result<BenchmarkSummary, BenchError> {
        let results_dir = &self.config.results_dir;
        tokio::fs::create_dir_all(results_dir)
            .await
            .map_err(|source| BenchError::Write {
                path: results_dir.clone(),
                source,
            })?;

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            info!("Processing {} ...", display_name(path));
            let record = self.send_sample(path).await;
            match (&record.status_code, &record.error) {
                (Some(status), _) => info!(" -> {}, {:.2}s", status, record.time_s),
                (None, Some(e)) => warn!(" -> ERROR: {}", e),
                (None, None) => {}
            }

            self.write_record(path, &record).await?;
            records.push(record);
        }

        self.write_csv(&records)?;

        let summary = BenchmarkSummary::from_records(&records);
        let report = BenchmarkReport {
            summary: summary.clone(),
            results_count: records.len(),
        };
        write_json(&results_dir.join(constants::SUMMARY_JSON), &report).await?;

        Ok(summary)
    }

    async fn send_sample(&self, path: &Path) -> BenchmarkRecord {
        let image = path.display().to_string();

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return BenchmarkRecord {
                    image,
                    status_code: None,
                    time_s: 0.0,
                    payload: None,
                    error: Some(format!("cannot read sample: {}", e)),
                    response_size: 0,
                };
            }
        };

        let started = Instant::now();
        let outcome = self.post_sample(display_name(path), bytes).await;
        let time_s = started.elapsed().as_secs_f64();

        match outcome {
            Ok((status, body)) => {
                let payload = serde_json::from_slice::<Value>(&body)
                    .unwrap_or_else(|_| json!({ "raw_text": String::from_utf8_lossy(&body) }));
                BenchmarkRecord {
                    image,
                    status_code: Some(status),
                    time_s,
                    payload: Some(payload),
                    error: None,
                    response_size: body.len(),
                }
            }
            Err(e) => BenchmarkRecord {
                image,
                status_code: None,
                time_s,
                payload: None,
                error: Some(error_chain(&e)),
                response_size: 0,
            },
        }
    }

    async fn post_sample(&self, file_name: String, bytes: Vec<u8>) -> Result<(u16, Vec<u8>), reqwest::Error> {
        let part = Part::bytes(bytes).file_name(file_name).mime_str("image/jpeg")?;
        let form = Form::new()
            .part("file", part)
            .text("mode", constants::DEFAULT_MODE)
            .text("task", constants::DEFAULT_TASK)
            .text("prompt", "");

        let resp = self
            .client
            .post(&self.config.api_url)
            .multipart(form)
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        Ok((status, body.to_vec()))
    }

    async fn write_record(&self, path: &Path, record: &BenchmarkRecord) -> Result<(), BenchError> {
        let out = self
            .config
            .results_dir
            .join(format!("{}.json", display_name(path)));
        write_json(&out, record).await
    }

    fn write_csv(&self, records: &[BenchmarkRecord]) -> Result<(), BenchError> {
        let csv_path = self.config.results_dir.join(constants::SUMMARY_CSV);
        let encode_err = |e: csv::Error| BenchError::Encode(format!("{}: {}", csv_path.display(), e));

        let mut writer = csv::Writer::from_path(&csv_path).map_err(encode_err)?;
        for record in records {
            writer.serialize(SummaryRow::from(record)).map_err(encode_err)?;
        }
        // Header is only emitted with the first row.
        if records.is_empty() {
            writer
                .write_record(["image", "status_code", "time_s", "response_size"])
                .map_err(encode_err)?;
        }
        writer.flush().map_err(|source| BenchError::Write {
            path: csv_path.clone(),
            source,
        })
    }
}

async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), BenchError> {
    let data = serde_json::to_vec_pretty(value).map_err(|e| BenchError::Encode(e.to_string()))?;
    tokio::fs::write(path, data)
        .await
        .map_err(|source| BenchError::Write {
            path: path.to_path_buf(),
            source,
        })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn health_url(api_url: &Url) -> String {
    api_url
        .join("/healthz")
        .map(|u| u.to_string())
        .unwrap_or_else(|_| api_url.to_string())
}

/// Flattens an error and its sources, e.g. "error sending request: connection refused".
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !message.contains(&cause_msg) {
            message.push_str(": ");
            message.push_str(&cause_msg);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::SampleGenerator;
    use actix_web::{App, HttpResponse, HttpServer, dev::ServerHandle, web};
    use std::fs;

    async fn stub_ocr(_body: web::Bytes) -> HttpResponse {
        HttpResponse::Ok().json(json!({ "text": "x", "extra": { "status": "ok" } }))
    }

    async fn plain_text(_body: web::Bytes) -> HttpResponse {
        HttpResponse::Ok().content_type("text/plain").body("not json")
    }

    fn spawn_stub(route: &'static str, plain: bool) -> (String, ServerHandle) {
        let server = HttpServer::new(move || {
            let app = App::new().route("/healthz", web::get().to(|| async { "OK" }));
            if plain {
                app.route(route, web::post().to(plain_text))
            } else {
                app.route(route, web::post().to(stub_ocr))
            }
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);
        (format!("http://{}{}", addr, route), handle)
    }

    fn bench_config(api_url: String, results_dir: PathBuf) -> BenchConfig {
        BenchConfig {
            api_url,
            results_dir,
            request_timeout: Duration::from_secs(5),
            ..BenchConfig::default()
        }
    }

    #[actix_web::test]
    async fn three_samples_against_stub_handler() {
        let (url, handle) = spawn_stub("/api/ocr", false);
        let dir = tempfile::tempdir().unwrap();
        let paths = SampleGenerator::new(dir.path().join("samples"))
            .unwrap()
            .generate_samples(3)
            .unwrap();
        let results_dir = dir.path().join("results");

        let bench = Benchmark::new(bench_config(url, results_dir.clone())).unwrap();
        let summary = bench.run(&paths, false).await.unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.successes, 3);
        let avg = summary.avg_time_s.unwrap();
        let min = summary.min_time_s.unwrap();
        let max = summary.max_time_s.unwrap();
        assert!(avg > 0.0 && avg < 5.0);
        assert!(min <= avg && avg <= max);

        for name in ["sample_1.jpg", "sample_2.jpg", "sample_3.jpg"] {
            let data = fs::read_to_string(results_dir.join(format!("{}.json", name))).unwrap();
            let record: BenchmarkRecord = serde_json::from_str(&data).unwrap();
            assert_eq!(record.status_code, Some(200));
            assert_eq!(record.payload.unwrap()["text"], "x");
            assert!(record.response_size > 0);
            assert!(record.error.is_none());
        }

        let csv = fs::read_to_string(results_dir.join("summary.csv")).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("image,status_code,time_s,response_size"));
        assert_eq!(lines.count(), 3);

        let report: Value =
            serde_json::from_str(&fs::read_to_string(results_dir.join("summary.json")).unwrap())
                .unwrap();
        assert_eq!(report["results_count"], 3);
        assert_eq!(report["summary"]["successes"], 3);

        handle.stop(true).await;
    }

    #[actix_web::test]
    async fn non_json_body_is_kept_as_raw_text() {
        let (url, handle) = spawn_stub("/api/ocr", true);
        let dir = tempfile::tempdir().unwrap();
        let paths = SampleGenerator::new(dir.path()).unwrap().generate_samples(1).unwrap();
        let results_dir = dir.path().join("results");

        let bench = Benchmark::new(bench_config(url, results_dir.clone())).unwrap();
        bench.run_batch(&paths).await.unwrap();

        let record: BenchmarkRecord = serde_json::from_str(
            &fs::read_to_string(results_dir.join("sample_1.jpg.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(record.payload, Some(json!({ "raw_text": "not json" })));
        assert_eq!(record.response_size, "not json".len());

        handle.stop(true).await;
    }

    #[tokio::test]
    async fn transport_errors_do_not_abort_batch() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let dir = tempfile::tempdir().unwrap();
        let paths = SampleGenerator::new(dir.path()).unwrap().generate_samples(2).unwrap();
        let results_dir = dir.path().join("results");

        let bench = Benchmark::new(bench_config(
            format!("http://127.0.0.1:{}/api/ocr", port),
            results_dir.clone(),
        ))
        .unwrap();
        let summary = bench.run(&paths, false).await.unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.successes, 0);
        let avg = summary.avg_time_s.unwrap();
        assert!(avg.is_finite() && avg >= 0.0);

        let record: Value = serde_json::from_str(
            &fs::read_to_string(results_dir.join("sample_2.jpg.json")).unwrap(),
        )
        .unwrap();
        assert!(record["status_code"].is_null());
        assert!(record["payload"].is_null());
        assert_eq!(record["response_size"], 0);
        assert!(!record["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_batch_writes_header_and_null_stats() {
        let dir = tempfile::tempdir().unwrap();
        let results_dir = dir.path().join("results");
        let bench = Benchmark::new(bench_config(
            "http://127.0.0.1:9/api/ocr".to_string(),
            results_dir.clone(),
        ))
        .unwrap();

        let summary = bench.run_batch(&[]).await.unwrap();

        assert_eq!(summary.total, 0);
        assert!(summary.avg_time_s.is_none());
        let csv = fs::read_to_string(results_dir.join("summary.csv")).unwrap();
        assert_eq!(csv.trim(), "image,status_code,time_s,response_size");
    }

    #[tokio::test]
    async fn missing_server_program_is_a_startup_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = BenchConfig {
            server_program: Some(dir.path().join("no-such-server")),
            ..bench_config("http://127.0.0.1:5000/api/ocr".to_string(), dir.path().join("results"))
        };
        let bench = Benchmark::new(config).unwrap();

        let err = bench.run(&[], true).await.unwrap_err();

        assert!(matches!(err, BenchError::Spawn(_)));
        assert!(!dir.path().join("results").exists());
    }

    #[test]
    fn health_url_replaces_path() {
        let url = Url::parse("http://127.0.0.1:5000/api/ocr").unwrap();
        assert_eq!(health_url(&url), "http://127.0.0.1:5000/healthz");
    }
}
