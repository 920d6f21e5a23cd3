use std::time::Duration;
use tokio::time::{Instant, sleep};

use crate::models::BenchError;

/// Bounded polling budget for a service readiness check. The whole wait
/// never exceeds `max_attempts * interval`; each request timeout is
/// clipped to what is left of that window.
#[derive(Debug, Clone)]
pub struct ReadinessPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
    pub check_timeout: Duration,
}

impl ReadinessPolicy {
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_millis(500),
            check_timeout: Duration::from_secs(1),
        }
    }
}

/// Polls `url` until it answers 200 or the time budget runs out.
///
/// Works for any way of hosting the service; it only needs a URL.
pub async fn wait_until_ready(
    client: &reqwest::Client,
    url: &str,
    policy: &ReadinessPolicy,
) -> Result<(), BenchError> {
    let deadline = Instant::now() + policy.budget();
    let mut attempts = 0;

    while attempts < policy.max_attempts {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if attempts > 0 && remaining.is_zero() {
            break;
        }
        attempts += 1;

        let timeout = policy.check_timeout.min(remaining).max(Duration::from_millis(1));
        match client.get(url).timeout(timeout).send().await {
            Ok(resp) if resp.status().is_success() => {
                log::info!("{} ready after {} attempt(s)", url, attempts);
                return Ok(());
            }
            Ok(resp) => {
                log::debug!(
                    "Readiness check {}/{} for {}: status {}",
                    attempts,
                    policy.max_attempts,
                    url,
                    resp.status()
                );
            }
            Err(e) => {
                log::debug!(
                    "Readiness check {}/{} for {} failed: {}",
                    attempts,
                    policy.max_attempts,
                    url,
                    e
                );
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if attempts < policy.max_attempts && !remaining.is_zero() {
            sleep(policy.interval.min(remaining)).await;
        }
    }

    Err(BenchError::Startup {
        url: url.to_string(),
        attempts,
    })
}
