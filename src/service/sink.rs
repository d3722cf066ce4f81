// Copyright 2025 OpenObserve Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use std::time::Duration;

use config::metrics;
use thiserror::Error as ThisError;

use crate::common::meta::alert::Alert;

const CANNED_STATUS_ERROR: &str = r#"{"error":"alertmanager unreachable"}"#;

#[derive(ThisError, Debug)]
pub enum SendError {
    /// 4xx, the batch will never be accepted
    #[error("alertmanager rejected the batch with status {0}")]
    Rejected(u16),
    /// 5xx, the aggregator may recover
    #[error("alertmanager returned server error {0}")]
    Server(u16),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl SendError {
    fn is_retryable(&self) -> bool {
        !matches!(self, SendError::Rejected(_))
    }
}

/// Pushes alert batches to the alertmanager v2 ingest endpoint. Failed
/// batches are retried with exponential backoff and dropped after
/// `max_attempts`; the pipeline never stalls on the aggregator.
pub struct AlertSink {
    client: reqwest::Client,
    push_url: String,
    status_url: String,
    enabled: bool,
    max_attempts: u32,
    backoff: Duration,
}

impl AlertSink {
    pub fn new(am: &config::Alertmanager) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(am.connect_timeout))
            .timeout(Duration::from_secs(am.read_timeout))
            .build()?;
        Ok(Self {
            client,
            push_url: format!("{}{}", am.url, am.api_path),
            status_url: format!("{}/api/v2/status", am.url),
            enabled: am.enabled,
            max_attempts: am.retry_max_attempts.max(1),
            backoff: Duration::from_secs(am.retry_backoff),
        })
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// POST one batch. An empty batch, or a disabled sink, is a no-op.
    pub async fn send(&self, alerts: &[Alert]) -> Result<(), SendError> {
        if alerts.is_empty() || !self.enabled {
            return Ok(());
        }
        let _timer = metrics::ALERT_SEND_DURATION.start_timer();
        let mut backoff = self.backoff;
        let mut attempt = 1u32;
        loop {
            match self.post_once(alerts).await {
                Ok(()) => {
                    metrics::ALERTS_SENT.inc_by(alerts.len() as u64);
                    log::debug!("[ALERT_SINK] sent batch of {}", alerts.len());
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    log::warn!(
                        "[ALERT_SINK] send attempt {attempt}/{} failed, retrying in {backoff:?}: {e}",
                        self.max_attempts
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => {
                    metrics::ALERTS_FAILED.inc_by(alerts.len() as u64);
                    match &e {
                        SendError::Rejected(status) => log::warn!(
                            "[ALERT_SINK] batch of {} rejected with {status}, not retrying",
                            alerts.len()
                        ),
                        _ => log::error!(
                            "[ALERT_SINK] dropping batch of {} after {attempt} attempts: {e}",
                            alerts.len()
                        ),
                    }
                    return Err(e);
                }
            }
        }
    }

    async fn post_once(&self, alerts: &[Alert]) -> Result<(), SendError> {
        let resp = self
            .client
            .post(&self.push_url)
            .header("Content-Type", "application/json")
            .json(alerts)
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else if status.is_client_error() {
            Err(SendError::Rejected(status.as_u16()))
        } else {
            Err(SendError::Server(status.as_u16()))
        }
    }

    /// Liveness probe against the aggregator's status endpoint.
    pub async fn healthy(&self) -> bool {
        match self.client.get(&self.status_url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// The aggregator's status body for the admin proxy endpoint, or a
    /// canned error document when it is unreachable.
    pub async fn status_body(&self) -> String {
        match self.client.get(&self.status_url).send().await {
            Ok(resp) => resp
                .text()
                .await
                .unwrap_or_else(|_| CANNED_STATUS_ERROR.to_string()),
            Err(e) => {
                log::debug!("[ALERT_SINK] status probe failed: {e}");
                CANNED_STATUS_ERROR.to_string()
            }
        }
    }
}
