use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_sqs::Client;

use crate::core::config::Settings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QueueMessage {
    pub(crate) message_id: Option<String>,
    pub(crate) body: String,
    pub(crate) receipt_handle: String,
}

/// Request/response view of a message queue. Implementations are shared
/// across concurrent message tasks, so they must not hold per-call state.
#[async_trait]
pub(crate) trait QueueTransport: Send + Sync {
    /// Long-polls `queue_url`, returning as soon as messages arrive or `wait`
    /// elapses. An empty batch is a successful poll.
    async fn receive(&self, queue_url: &str, wait: Duration) -> Result<Vec<QueueMessage>>;

    async fn delete(&self, queue_url: &str, receipt_handle: &str) -> Result<()>;

    async fn send(&self, queue_url: &str, body: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub(crate) struct SqsTransport {
    client: Client,
    max_messages: i32,
}

impl SqsTransport {
    pub(crate) async fn from_settings(settings: &Settings) -> Self {
        let sqs = settings.sqs();
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(sqs.region.clone()));

        if let Some(endpoint) = &sqs.endpoint {
            loader = loader.endpoint_url(endpoint.clone());
        }

        if !sqs.access_key.is_empty() && !sqs.secret_key.is_empty() {
            let creds = Credentials::new(
                sqs.access_key.clone(),
                sqs.secret_key.clone(),
                None,
                None,
                "quiz-listener-static",
            );
            loader = loader.credentials_provider(creds);
        }

        let config = loader.load().await;
        let max_messages = i32::try_from(settings.queues().max_messages).unwrap_or(10);

        Self { client: Client::new(&config), max_messages }
    }
}

#[async_trait]
impl QueueTransport for SqsTransport {
    async fn receive(&self, queue_url: &str, wait: Duration) -> Result<Vec<QueueMessage>> {
        let wait_seconds = i32::try_from(wait.as_secs()).unwrap_or(20);
        let output = self
            .client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(self.max_messages)
            .wait_time_seconds(wait_seconds)
            .send()
            .await
            .with_context(|| format!("Failed to receive messages from {queue_url}"))?;

        let mut batch = Vec::new();
        for message in output.messages() {
            let Some(receipt_handle) = message.receipt_handle() else {
                tracing::warn!(
                    queue_url,
                    message_id = message.message_id().unwrap_or_default(),
                    "Received message without receipt handle; skipping"
                );
                continue;
            };

            batch.push(QueueMessage {
                message_id: message.message_id().map(str::to_string),
                body: message.body().unwrap_or_default().to_string(),
                receipt_handle: receipt_handle.to_string(),
            });
        }

        Ok(batch)
    }

    async fn delete(&self, queue_url: &str, receipt_handle: &str) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .with_context(|| format!("Failed to delete message from {queue_url}"))?;

        Ok(())
    }

    async fn send(&self, queue_url: &str, body: &str) -> Result<()> {
        self.client
            .send_message()
            .queue_url(queue_url)
            .message_body(body)
            .send()
            .await
            .with_context(|| format!("Failed to send message to {queue_url}"))?;

        Ok(())
    }
}
