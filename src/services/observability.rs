use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::core::config::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum CheckInStatus {
    InProgress,
    Ok,
    Error,
}

impl CheckInStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CheckIn {
    pub(crate) id: Uuid,
    pub(crate) monitor: String,
}

/// Error and liveness sink. Callers log and drop failures from these
/// methods; they never stop a listener.
#[async_trait]
pub(crate) trait Observability: Send + Sync {
    async fn report_error(&self, err: &anyhow::Error, tags: &[(&str, &str)]) -> Result<()>;

    /// Opens an `in_progress` check-in.
    async fn report_check_in(&self, check_in: &CheckIn) -> Result<()>;

    async fn resolve_check_in(&self, check_in: &CheckIn, outcome: CheckInStatus) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct CheckInPayload<'a> {
    check_in_id: Uuid,
    monitor_slug: &'a str,
    status: CheckInStatus,
    timestamp: String,
}

/// Reports through tracing and metrics, and forwards check-ins to an HTTP
/// cron monitor when `CHECK_IN_URL` is set.
#[derive(Debug, Clone)]
pub(crate) struct TelemetryObserver {
    client: Client,
    check_in_url: Option<String>,
}

impl TelemetryObserver {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build check-in HTTP client")?;

        Ok(Self { client, check_in_url: settings.heartbeat().check_in_url.clone() })
    }

    async fn send_check_in(&self, check_in: &CheckIn, status: CheckInStatus) -> Result<()> {
        metrics::counter!(
            "heartbeat_check_ins_total",
            "monitor" => check_in.monitor.clone(),
            "status" => status.as_str()
        )
        .increment(1);

        let Some(url) = &self.check_in_url else {
            tracing::debug!(
                monitor = %check_in.monitor,
                check_in_id = %check_in.id,
                status = status.as_str(),
                "Heartbeat check-in"
            );
            return Ok(());
        };

        let payload = CheckInPayload {
            check_in_id: check_in.id,
            monitor_slug: &check_in.monitor,
            status,
            timestamp: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .context("Failed to format check-in timestamp")?,
        };

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .context("Failed to send heartbeat check-in")?;

        let code = response.status();
        if !code.is_success() {
            return Err(anyhow!("Heartbeat check-in rejected (status {code})"));
        }

        Ok(())
    }
}

#[async_trait]
impl Observability for TelemetryObserver {
    async fn report_error(&self, err: &anyhow::Error, tags: &[(&str, &str)]) -> Result<()> {
        let tag = |name: &str| {
            tags.iter().find(|(key, _)| *key == name).map(|(_, value)| value.to_string())
        };
        let queue = tag("queue").unwrap_or_else(|| "unknown".to_string());
        let stage = tag("stage").unwrap_or_else(|| "unknown".to_string());

        metrics::counter!("listener_errors_total", "queue" => queue.clone(), "stage" => stage.clone())
            .increment(1);
        tracing::error!(
            queue = %queue,
            stage = %stage,
            tags = ?tags,
            error = %format!("{err:#}"),
            "Listener error"
        );

        Ok(())
    }

    async fn report_check_in(&self, check_in: &CheckIn) -> Result<()> {
        self.send_check_in(check_in, CheckInStatus::InProgress).await
    }

    async fn resolve_check_in(&self, check_in: &CheckIn, outcome: CheckInStatus) -> Result<()> {
        self.send_check_in(check_in, outcome).await
    }
}
