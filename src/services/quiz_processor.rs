use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::core::config::Settings;

/// Domain side of the listener. An `Err` from either method keeps the queue
/// message for redelivery, so both must be safe to repeat.
#[async_trait]
pub(crate) trait QuizProcessor: Send + Sync {
    /// Flags the quiz image stored under `key` as uploaded.
    async fn mark_item_ready(&self, key: &str) -> Result<()>;

    /// Runs AI question extraction for a quiz.
    async fn run_deferred_processing(&self, quiz_id: &str) -> Result<()>;
}

/// Calls back into the quiz API service over its internal HTTP routes.
#[derive(Debug, Clone)]
pub(crate) struct HttpQuizProcessor {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpQuizProcessor {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(settings.processor().timeout())
            .build()
            .context("Failed to build processor HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.processor().base_url.trim_end_matches('/').to_string(),
            api_key: settings.processor().api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<String> {
        if self.base_url.is_empty() {
            return Err(anyhow!("PROCESSOR_BASE_URL is not configured"));
        }
        Ok(format!("{}{}", self.base_url, path))
    }

    async fn post(&self, url: String, body: serde_json::Value) -> Result<()> {
        let mut request = self.client.post(&url).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response =
            request.send().await.with_context(|| format!("Failed to call processor at {url}"))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let raw_body = response.text().await.unwrap_or_default();
        Err(anyhow!("Processor call {url} failed (status {status}): {raw_body}"))
    }
}

#[async_trait]
impl QuizProcessor for HttpQuizProcessor {
    async fn mark_item_ready(&self, key: &str) -> Result<()> {
        let url = self.endpoint("/internal/quiz-images/ready")?;
        self.post(url, json!({ "key": key })).await
    }

    async fn run_deferred_processing(&self, quiz_id: &str) -> Result<()> {
        let url = self.endpoint("/internal/quizzes/ai-processing")?;
        self.post(url, json!({ "quizId": quiz_id })).await
    }
}
