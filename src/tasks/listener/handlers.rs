use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::schemas::envelope::{
    parse_ai_processing_request, parse_upload_notification, Decoded, EnvelopeError,
};
use crate::services::queue::QueueMessage;
use crate::services::quiz_processor::QuizProcessor;

#[derive(Debug, Error)]
pub(crate) enum HandleError {
    #[error(transparent)]
    Decode(#[from] EnvelopeError),
    #[error("quiz processor failed")]
    Processor(#[source] anyhow::Error),
}

impl HandleError {
    pub(crate) fn stage(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::Processor(_) => "process",
        }
    }
}

/// Turns one queue message into processor calls. `Ok` means the message is
/// done with and may be deleted, including when it held nothing to do.
#[async_trait]
pub(crate) trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &QueueMessage) -> Result<(), HandleError>;
}

pub(crate) struct ImageUploadHandler {
    processor: Arc<dyn QuizProcessor>,
}

impl ImageUploadHandler {
    pub(crate) fn new(processor: Arc<dyn QuizProcessor>) -> Self {
        Self { processor }
    }
}

#[async_trait]
impl MessageHandler for ImageUploadHandler {
    async fn handle(&self, message: &QueueMessage) -> Result<(), HandleError> {
        let message_id = message.message_id.as_deref().unwrap_or_default();

        let notification = match parse_upload_notification(&message.body)? {
            Decoded::Payload(notification) => notification,
            Decoded::Empty(reason) => {
                tracing::warn!(message_id, reason = reason.as_str(), "No upload records in message");
                return Ok(());
            }
        };

        if notification.skipped > 0 {
            tracing::warn!(
                message_id,
                skipped = notification.skipped,
                "Upload records without object key were ignored"
            );
        }

        for record in &notification.records {
            if !record.is_object_created_put() {
                tracing::warn!(
                    message_id,
                    event_name = %record.event_name,
                    key = %record.object_key,
                    "Unexpected upload event; processing anyway"
                );
            }

            self.processor
                .mark_item_ready(&record.object_key)
                .await
                .map_err(HandleError::Processor)?;

            tracing::info!(
                message_id,
                key = %record.object_key,
                size_bytes = record.object_size_bytes,
                "Quiz image marked ready"
            );
        }

        Ok(())
    }
}

pub(crate) struct AiProcessingHandler {
    processor: Arc<dyn QuizProcessor>,
}

impl AiProcessingHandler {
    pub(crate) fn new(processor: Arc<dyn QuizProcessor>) -> Self {
        Self { processor }
    }
}

#[async_trait]
impl MessageHandler for AiProcessingHandler {
    async fn handle(&self, message: &QueueMessage) -> Result<(), HandleError> {
        let message_id = message.message_id.as_deref().unwrap_or_default();

        let request = match parse_ai_processing_request(&message.body)? {
            Decoded::Payload(request) => request,
            Decoded::Empty(reason) => {
                tracing::warn!(message_id, reason = reason.as_str(), "No quiz id in message");
                return Ok(());
            }
        };

        self.processor
            .run_deferred_processing(&request.quiz_id)
            .await
            .map_err(HandleError::Processor)?;

        tracing::info!(message_id, quiz_id = %request.quiz_id, "AI processing finished");
        Ok(())
    }
}
