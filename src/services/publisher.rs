use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

use crate::schemas::envelope::AiProcessingRequest;
use crate::services::queue::QueueTransport;

/// Producer side of the AI processing queue.
pub(crate) struct AiProcessingPublisher {
    transport: Arc<dyn QueueTransport>,
    queue_url: String,
}

impl AiProcessingPublisher {
    pub(crate) fn new(transport: Arc<dyn QueueTransport>, queue_url: String) -> Result<Self> {
        if queue_url.is_empty() {
            return Err(anyhow!("AI_PROCESSING_QUEUE_URL is not configured"));
        }
        Ok(Self { transport, queue_url })
    }

    pub(crate) async fn publish(&self, quiz_id: &str) -> Result<()> {
        let quiz_id = quiz_id.trim();
        if quiz_id.is_empty() {
            return Err(anyhow!("quiz id must not be empty"));
        }

        let body = serde_json::to_string(&AiProcessingRequest { quiz_id: quiz_id.to_string() })
            .context("Failed to encode AI processing request")?;
        self.transport.send(&self.queue_url, &body).await?;

        tracing::info!(quiz_id, "AI processing request queued");
        Ok(())
    }
}
