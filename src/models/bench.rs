use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("server at {url} did not become ready after {attempts} attempts")]
    Startup { url: String, attempts: u32 },
    #[error("invalid API URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("failed to start server process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("failed to generate sample {path}: {message}")]
    Sample { path: PathBuf, message: String },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode results: {0}")]
    Encode(String),
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Outcome of one benchmark request. Written once to the results directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub image: String,
    pub status_code: Option<u16>,
    pub time_s: f64,
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub response_size: usize,
}

impl BenchmarkRecord {
    pub fn is_success(&self) -> bool {
        self.status_code == Some(200)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSummary {
    pub total: usize,
    pub successes: usize,
    pub avg_time_s: Option<f64>,
    pub min_time_s: Option<f64>,
    pub max_time_s: Option<f64>,
}

impl BenchmarkSummary {
    pub fn from_records(records: &[BenchmarkRecord]) -> Self {
        let times: Vec<f64> = records.iter().map(|r| r.time_s).collect();
        let successes = records.iter().filter(|r| r.is_success()).count();

        let (avg, min, max) = if times.is_empty() {
            (None, None, None)
        } else {
            let sum: f64 = times.iter().sum();
            let min = times.iter().copied().fold(f64::INFINITY, f64::min);
            let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (Some(sum / times.len() as f64), Some(min), Some(max))
        };

        Self {
            total: records.len(),
            successes,
            avg_time_s: avg,
            min_time_s: min,
            max_time_s: max,
        }
    }
}

/// Contents of `summary.json`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub summary: BenchmarkSummary,
    pub results_count: usize,
}

/// One line of `summary.csv`.
#[derive(Debug, Serialize)]
pub struct SummaryRow<'a> {
    pub image: &'a str,
    pub status_code: Option<u16>,
    pub time_s: f64,
    pub response_size: usize,
}

impl<'a> From<&'a BenchmarkRecord> for SummaryRow<'a> {
    fn from(record: &'a BenchmarkRecord) -> Self {
        Self {
            image: &record.image,
            status_code: record.status_code,
            time_s: record.time_s,
            response_size: record.response_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: Option<u16>, time_s: f64) -> BenchmarkRecord {
        BenchmarkRecord {
            image: "sample_1.jpg".to_string(),
            status_code: status,
            time_s,
            payload: None,
            error: status.is_none().then(|| "connection refused".to_string()),
            response_size: 0,
        }
    }

    #[test]
    fn empty_batch_has_no_statistics() {
        let summary = BenchmarkSummary::from_records(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.successes, 0);
        assert!(summary.avg_time_s.is_none());
        assert!(summary.min_time_s.is_none());
        assert!(summary.max_time_s.is_none());

        let value = serde_json::to_value(&summary).unwrap();
        assert!(value["avg_time_s"].is_null());
    }

    #[test]
    fn counts_only_200_as_success() {
        let records = vec![
            record(Some(200), 0.5),
            record(Some(400), 0.1),
            record(None, 0.3),
            record(Some(200), 0.9),
        ];
        let summary = BenchmarkSummary::from_records(&records);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.successes, 2);
        assert_eq!(summary.min_time_s, Some(0.1));
        assert_eq!(summary.max_time_s, Some(0.9));
        let avg = summary.avg_time_s.unwrap();
        assert!((avg - 0.45).abs() < 1e-9);
    }

    #[test]
    fn error_field_only_present_on_failure() {
        let ok = serde_json::to_value(record(Some(200), 0.2)).unwrap();
        assert!(ok.get("error").is_none());
        assert!(ok["payload"].is_null());

        let failed = serde_json::to_value(record(None, 0.2)).unwrap();
        assert_eq!(failed["error"], "connection refused");
        assert!(failed["status_code"].is_null());
    }
}
