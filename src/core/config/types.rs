use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(super) runtime: RuntimeSettings,
    pub(super) sqs: SqsSettings,
    pub(super) queues: QueueSettings,
    pub(super) backoff: BackoffSettings,
    pub(super) heartbeat: HeartbeatSettings,
    pub(super) processor: ProcessorSettings,
    pub(super) telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub(crate) struct SqsSettings {
    pub(crate) region: String,
    pub(crate) endpoint: Option<String>,
    pub(crate) access_key: String,
    pub(crate) secret_key: String,
}

#[derive(Debug, Clone)]
pub(crate) struct QueueSettings {
    pub(crate) image_upload_queue_url: String,
    pub(crate) ai_processing_queue_url: String,
    pub(crate) wait_seconds: u64,
    pub(crate) max_messages: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct BackoffSettings {
    pub(crate) initial_seconds: u64,
    pub(crate) max_seconds: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct HeartbeatSettings {
    pub(crate) every_iterations: u64,
    pub(crate) image_upload_monitor: String,
    pub(crate) ai_processing_monitor: String,
    pub(crate) check_in_url: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct ProcessorSettings {
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct TelemetrySettings {
    pub(crate) log_level: String,
    pub(crate) json: bool,
    pub(crate) prometheus_enabled: bool,
    pub(crate) prometheus_addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub(crate) struct RuntimeSettings {
    pub(crate) environment: Environment,
    pub(crate) strict_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

impl Environment {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Test => "test",
        }
    }

    pub(super) fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("missing required setting {0}")]
    MissingSetting(&'static str),
}

impl QueueSettings {
    pub(crate) fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_seconds)
    }
}

impl BackoffSettings {
    pub(crate) fn initial(&self) -> Duration {
        Duration::from_secs(self.initial_seconds)
    }

    pub(crate) fn max(&self) -> Duration {
        Duration::from_secs(self.max_seconds)
    }
}

impl ProcessorSettings {
    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
