use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::services::observability::{CheckInStatus, Observability};
use crate::services::queue::{QueueMessage, QueueTransport};

use super::backoff::BackoffPolicy;
use super::handlers::MessageHandler;
use super::heartbeat::HeartbeatReporter;

pub(crate) struct ConsumerOptions {
    /// Short label used in logs, metrics and error tags.
    pub(crate) name: &'static str,
    pub(crate) queue_url: String,
    pub(crate) wait: Duration,
    pub(crate) backoff: BackoffPolicy,
    pub(crate) monitor: String,
    pub(crate) heartbeat_every: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IterationOutcome {
    Processed { received: usize, deleted: usize },
    Failed { consecutive_errors: u32, delay: Duration },
    Cancelled,
}

/// Drains one queue until cancelled. A message is deleted only after its
/// handler succeeds; anything else is left for the queue to redeliver.
pub(crate) struct QueueConsumer {
    name: &'static str,
    queue_url: String,
    wait: Duration,
    backoff: BackoffPolicy,
    consecutive_errors: u32,
    heartbeat: HeartbeatReporter,
    transport: Arc<dyn QueueTransport>,
    handler: Arc<dyn MessageHandler>,
    observer: Arc<dyn Observability>,
}

impl QueueConsumer {
    pub(crate) fn new(
        options: ConsumerOptions,
        transport: Arc<dyn QueueTransport>,
        handler: Arc<dyn MessageHandler>,
        observer: Arc<dyn Observability>,
    ) -> Self {
        let heartbeat =
            HeartbeatReporter::new(options.monitor, options.heartbeat_every, observer.clone());

        Self {
            name: options.name,
            queue_url: options.queue_url,
            wait: options.wait,
            backoff: options.backoff,
            consecutive_errors: 0,
            heartbeat,
            transport,
            handler,
            observer,
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!(queue = self.name, queue_url = %self.queue_url, "Queue listener started");

        while !shutdown.is_cancelled() {
            let check_in = self.heartbeat.begin_iteration().await;

            match self.poll_once(&shutdown).await {
                IterationOutcome::Processed { .. } => {
                    self.heartbeat.finish_iteration(check_in, CheckInStatus::Ok).await;
                }
                IterationOutcome::Cancelled => {
                    self.heartbeat.finish_iteration(check_in, CheckInStatus::Ok).await;
                    break;
                }
                IterationOutcome::Failed { consecutive_errors, delay } => {
                    self.heartbeat.finish_iteration(check_in, CheckInStatus::Error).await;
                    tracing::warn!(
                        queue = self.name,
                        consecutive_errors,
                        delay_secs = delay.as_secs(),
                        "Backing off before next poll"
                    );

                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = sleep(delay) => {}
                    }
                }
            }
        }

        tracing::info!(queue = self.name, "Queue listener stopped");
    }

    /// One receive plus processing of whatever it returned. Cancellation is
    /// only observed while waiting on the receive; a received batch is always
    /// processed to completion.
    pub(crate) async fn poll_once(&mut self, shutdown: &CancellationToken) -> IterationOutcome {
        let received = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return IterationOutcome::Cancelled,
            result = self.transport.receive(&self.queue_url, self.wait) => result,
        };

        match received {
            Ok(batch) => {
                self.consecutive_errors = 0;
                let received = batch.len();
                metrics::histogram!("queue_batch_size", "queue" => self.name).record(received as f64);

                let deleted = self.process_batch(&batch).await;
                if received > 0 {
                    tracing::debug!(queue = self.name, received, deleted, "Batch processed");
                }
                IterationOutcome::Processed { received, deleted }
            }
            Err(err) => {
                self.consecutive_errors = self.consecutive_errors.saturating_add(1);
                let delay = self.backoff.delay(self.consecutive_errors);
                metrics::counter!("queue_poll_errors_total", "queue" => self.name).increment(1);
                tracing::error!(
                    queue = self.name,
                    consecutive_errors = self.consecutive_errors,
                    error = %format!("{err:#}"),
                    "Failed to poll queue"
                );
                self.report(&err, "poll").await;

                IterationOutcome::Failed { consecutive_errors: self.consecutive_errors, delay }
            }
        }
    }

    async fn process_batch(&self, batch: &[QueueMessage]) -> usize {
        let results = join_all(batch.iter().map(|message| self.process_message(message))).await;
        results.into_iter().filter(|deleted| *deleted).count()
    }

    async fn process_message(&self, message: &QueueMessage) -> bool {
        let message_id = message.message_id.as_deref().unwrap_or_default();

        if let Err(err) = self.handler.handle(message).await {
            let stage = err.stage();
            metrics::counter!("queue_messages_total", "queue" => self.name, "status" => "failed")
                .increment(1);
            tracing::warn!(
                queue = self.name,
                message_id,
                stage,
                error = %err,
                "Message left in queue for redelivery"
            );
            self.report(&anyhow::Error::new(err), stage).await;
            return false;
        }

        if let Err(err) = self.transport.delete(&self.queue_url, &message.receipt_handle).await {
            metrics::counter!(
                "queue_messages_total",
                "queue" => self.name,
                "status" => "delete_failed"
            )
            .increment(1);
            self.report(&err, "delete").await;
            return false;
        }

        metrics::counter!("queue_messages_total", "queue" => self.name, "status" => "deleted")
            .increment(1);
        true
    }

    async fn report(&self, err: &anyhow::Error, stage: &str) {
        let tags = [("queue", self.name), ("stage", stage)];
        if let Err(report_err) = self.observer.report_error(err, &tags).await {
            tracing::warn!(queue = self.name, error = %report_err, "Failed to report error");
        }
    }
}
