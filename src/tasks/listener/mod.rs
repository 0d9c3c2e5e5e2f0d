mod backoff;
mod consumer;
mod handlers;
mod heartbeat;

pub(crate) use backoff::BackoffPolicy;
pub(crate) use consumer::{ConsumerOptions, QueueConsumer};
pub(crate) use handlers::{AiProcessingHandler, ImageUploadHandler};
