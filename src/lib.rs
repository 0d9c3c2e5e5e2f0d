pub(crate) mod core;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::{config::Settings, telemetry};
use crate::services::publisher::AiProcessingPublisher;
use crate::services::queue::SqsTransport;

pub use crate::services::pagination::{
    overfetch_size, slice, PageRequest, PageResult, MAX_PAGE_LIMIT,
};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    crate::core::metrics::init(&settings)?;

    tracing::info!(
        environment = %settings.runtime().environment.as_str(),
        image_upload_queue = %settings.queues().image_upload_queue_url,
        ai_processing_queue = %settings.queues().ai_processing_queue_url,
        wait_seconds = settings.queues().wait_seconds,
        "Quiz listener starting"
    );

    tasks::scheduler::run(&settings).await?;

    tracing::info!("Quiz listener shut down cleanly");
    Ok(())
}

pub async fn enqueue_ai_processing(quiz_ids: &[String]) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;

    let transport = Arc::new(SqsTransport::from_settings(&settings).await);
    let publisher =
        AiProcessingPublisher::new(transport, settings.queues().ai_processing_queue_url.clone())?;

    for quiz_id in quiz_ids {
        publisher.publish(quiz_id).await?;
    }

    Ok(())
}
