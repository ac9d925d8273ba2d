//! Health-check pings around a backup run.
//!
//! A round sends one GET per URL. The timeout bounds each request and the
//! round as a whole: once the round deadline passes, every URL not yet
//! answered counts as failed.

use std::time::Duration;

use tokio::time::Instant;

use common::errors::{AppError, AppResult};

/// Sends ping rounds with a shared timeout.
#[derive(Debug, Clone)]
pub struct Pinger {
    timeout: Duration,
}

impl Pinger {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Pings every non-blank URL once.
    ///
    /// Returns a single `Ping` error listing all failing URLs.
    pub async fn ping_all(&self, urls: &[String]) -> AppResult<()> {
        let urls: Vec<&str> = urls.iter().map(|u| u.trim()).filter(|u| !u.is_empty()).collect();
        if urls.is_empty() {
            return Ok(());
        }

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| AppError::Ping(format!("creating HTTP client: {}", e)))?;
        let deadline = Instant::now() + self.timeout;

        let mut failures = Vec::new();
        for url in urls {
            match tokio::time::timeout_at(deadline, ping_url(&client, url)).await {
                Ok(Ok(())) => tracing::debug!(url = %url, "ping ok"),
                Ok(Err(reason)) => failures.push(format!("{}: {}", url, reason)),
                Err(_) => failures.push(format!("{}: round deadline exceeded", url)),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(AppError::Ping(failures.join("; ")))
        }
    }
}

/// Success is any 2xx or 3xx status; the body is ignored.
async fn ping_url(client: &reqwest::Client, url: &str) -> Result<(), String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| format!("request failed: {}", e))?;

    let status = response.status();
    if status.is_success() || status.is_redirection() {
        Ok(())
    } else {
        Err(format!("unexpected status {}", status.as_u16()))
    }
}
