use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::config::Settings;
use crate::services::observability::{Observability, TelemetryObserver};
use crate::services::queue::{QueueTransport, SqsTransport};
use crate::services::quiz_processor::{HttpQuizProcessor, QuizProcessor};
use crate::tasks::listener::{
    AiProcessingHandler, BackoffPolicy, ConsumerOptions, ImageUploadHandler, QueueConsumer,
};

pub(crate) async fn run(settings: &Settings) -> Result<()> {
    let transport: Arc<dyn QueueTransport> = Arc::new(SqsTransport::from_settings(settings).await);
    let processor: Arc<dyn QuizProcessor> = Arc::new(HttpQuizProcessor::from_settings(settings)?);
    let observer: Arc<dyn Observability> = Arc::new(TelemetryObserver::from_settings(settings)?);

    let consumers = build_consumers(settings, transport, processor, observer);
    if consumers.is_empty() {
        return Err(anyhow!(
            "No queue configured; set IMAGE_UPLOAD_QUEUE_URL and/or AI_PROCESSING_QUEUE_URL"
        ));
    }

    let listeners = Listeners::spawn(consumers);
    crate::core::shutdown::cancel_on_signal(listeners.shutdown_token()).await;
    listeners.shutdown();
    listeners.join().await;

    Ok(())
}

/// One consumer per configured queue. Queues with an empty URL are skipped.
pub(crate) fn build_consumers(
    settings: &Settings,
    transport: Arc<dyn QueueTransport>,
    processor: Arc<dyn QuizProcessor>,
    observer: Arc<dyn Observability>,
) -> Vec<QueueConsumer> {
    let queues = settings.queues();
    let heartbeat = settings.heartbeat();
    let backoff = BackoffPolicy::from_settings(settings.backoff());

    let mut consumers = Vec::with_capacity(2);

    if queues.image_upload_queue_url.is_empty() {
        tracing::warn!("IMAGE_UPLOAD_QUEUE_URL not set; image upload listener disabled");
    } else {
        consumers.push(QueueConsumer::new(
            ConsumerOptions {
                name: "image-upload",
                queue_url: queues.image_upload_queue_url.clone(),
                wait: queues.wait(),
                backoff,
                monitor: heartbeat.image_upload_monitor.clone(),
                heartbeat_every: heartbeat.every_iterations,
            },
            transport.clone(),
            Arc::new(ImageUploadHandler::new(processor.clone())),
            observer.clone(),
        ));
    }

    if queues.ai_processing_queue_url.is_empty() {
        tracing::warn!("AI_PROCESSING_QUEUE_URL not set; AI processing listener disabled");
    } else {
        consumers.push(QueueConsumer::new(
            ConsumerOptions {
                name: "ai-processing",
                queue_url: queues.ai_processing_queue_url.clone(),
                wait: queues.wait(),
                backoff,
                monitor: heartbeat.ai_processing_monitor.clone(),
                heartbeat_every: heartbeat.every_iterations,
            },
            transport,
            Arc::new(AiProcessingHandler::new(processor)),
            observer,
        ));
    }

    consumers
}

/// Running listeners sharing one cancellation token.
pub(crate) struct Listeners {
    shutdown: CancellationToken,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Listeners {
    pub(crate) fn spawn(consumers: Vec<QueueConsumer>) -> Self {
        let shutdown = CancellationToken::new();
        let handles = consumers
            .into_iter()
            .map(|consumer| (consumer.name(), tokio::spawn(consumer.run(shutdown.clone()))))
            .collect();

        Self { shutdown, handles }
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Asks every listener to stop after its current wait, sleep or batch.
    pub(crate) fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub(crate) async fn join(self) {
        for (name, handle) in self.handles {
            if let Err(err) = handle.await {
                tracing::error!(queue = name, error = %err, "Listener task join failed");
            }
        }
    }
}
