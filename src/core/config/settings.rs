use super::parsing::{
    env_optional, env_or_default, is_http_url, parse_bool, parse_environment, parse_socket_addr,
    parse_u32, parse_u64,
};
use super::types::{
    BackoffSettings, ConfigError, HeartbeatSettings, ProcessorSettings, QueueSettings,
    RuntimeSettings, Settings, SqsSettings, TelemetrySettings,
};

const MAX_SQS_WAIT_SECONDS: u64 = 20;
const MAX_SQS_BATCH: u32 = 10;

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let environment = parse_environment(
            env_optional("QUIZ_LISTENER_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("QUIZ_LISTENER_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let region = env_or_default("AWS_REGION", "eu-west-1");
        let endpoint = env_optional("SQS_ENDPOINT");
        let access_key = env_or_default("AWS_ACCESS_KEY_ID", "");
        let secret_key = env_or_default("AWS_SECRET_ACCESS_KEY", "");

        let image_upload_queue_url = env_or_default("IMAGE_UPLOAD_QUEUE_URL", "");
        let ai_processing_queue_url = env_or_default("AI_PROCESSING_QUEUE_URL", "");
        let wait_seconds =
            parse_u64("QUEUE_WAIT_SECONDS", env_or_default("QUEUE_WAIT_SECONDS", "10"))?;
        let max_messages =
            parse_u32("QUEUE_MAX_MESSAGES", env_or_default("QUEUE_MAX_MESSAGES", "10"))?;

        let initial_seconds =
            parse_u64("BACKOFF_INITIAL_SECONDS", env_or_default("BACKOFF_INITIAL_SECONDS", "5"))?;
        let max_seconds =
            parse_u64("BACKOFF_MAX_SECONDS", env_or_default("BACKOFF_MAX_SECONDS", "60"))?;

        let every_iterations = parse_u64(
            "HEARTBEAT_EVERY_ITERATIONS",
            env_or_default("HEARTBEAT_EVERY_ITERATIONS", "6"),
        )?;
        let image_upload_monitor =
            env_or_default("IMAGE_UPLOAD_MONITOR_SLUG", "image-upload-listener");
        let ai_processing_monitor =
            env_or_default("AI_PROCESSING_MONITOR_SLUG", "ai-processing-listener");
        let check_in_url = env_optional("CHECK_IN_URL");

        let processor_base_url = env_or_default("PROCESSOR_BASE_URL", "");
        let processor_api_key = env_or_default("PROCESSOR_API_KEY", "");
        let processor_timeout_seconds = parse_u64(
            "PROCESSOR_TIMEOUT_SECONDS",
            env_or_default("PROCESSOR_TIMEOUT_SECONDS", "600"),
        )?;

        let log_level = env_or_default("QUIZ_LISTENER_LOG_LEVEL", "info");
        let json =
            env_optional("QUIZ_LISTENER_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_addr =
            parse_socket_addr("PROMETHEUS_ADDR", env_or_default("PROMETHEUS_ADDR", "0.0.0.0:9100"))?;

        let settings = Self {
            runtime: RuntimeSettings { environment, strict_config },
            sqs: SqsSettings { region, endpoint, access_key, secret_key },
            queues: QueueSettings {
                image_upload_queue_url,
                ai_processing_queue_url,
                wait_seconds,
                max_messages,
            },
            backoff: BackoffSettings { initial_seconds, max_seconds },
            heartbeat: HeartbeatSettings {
                every_iterations,
                image_upload_monitor,
                ai_processing_monitor,
                check_in_url,
            },
            processor: ProcessorSettings {
                base_url: processor_base_url,
                api_key: processor_api_key,
                timeout_seconds: processor_timeout_seconds,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled, prometheus_addr },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    pub(crate) fn sqs(&self) -> &SqsSettings {
        &self.sqs
    }

    pub(crate) fn queues(&self) -> &QueueSettings {
        &self.queues
    }

    pub(crate) fn backoff(&self) -> &BackoffSettings {
        &self.backoff
    }

    pub(crate) fn heartbeat(&self) -> &HeartbeatSettings {
        &self.heartbeat
    }

    pub(crate) fn processor(&self) -> &ProcessorSettings {
        &self.processor
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.queues.wait_seconds == 0 || self.queues.wait_seconds > MAX_SQS_WAIT_SECONDS {
            return Err(ConfigError::InvalidValue {
                field: "QUEUE_WAIT_SECONDS",
                value: self.queues.wait_seconds.to_string(),
            });
        }

        if self.queues.max_messages == 0 || self.queues.max_messages > MAX_SQS_BATCH {
            return Err(ConfigError::InvalidValue {
                field: "QUEUE_MAX_MESSAGES",
                value: self.queues.max_messages.to_string(),
            });
        }

        if self.backoff.initial_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "BACKOFF_INITIAL_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.backoff.max_seconds < self.backoff.initial_seconds {
            return Err(ConfigError::InvalidValue {
                field: "BACKOFF_MAX_SECONDS",
                value: self.backoff.max_seconds.to_string(),
            });
        }

        if self.heartbeat.every_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "HEARTBEAT_EVERY_ITERATIONS",
                value: "0".to_string(),
            });
        }

        if let Some(url) = &self.heartbeat.check_in_url {
            if !is_http_url(url) {
                return Err(ConfigError::InvalidValue { field: "CHECK_IN_URL", value: url.clone() });
            }
        }

        if !self.processor.base_url.is_empty() && !is_http_url(&self.processor.base_url) {
            return Err(ConfigError::InvalidValue {
                field: "PROCESSOR_BASE_URL",
                value: self.processor.base_url.clone(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.queues.image_upload_queue_url.is_empty() {
            return Err(ConfigError::MissingSetting("IMAGE_UPLOAD_QUEUE_URL"));
        }
        if self.queues.ai_processing_queue_url.is_empty() {
            return Err(ConfigError::MissingSetting("AI_PROCESSING_QUEUE_URL"));
        }
        if self.processor.base_url.is_empty() {
            return Err(ConfigError::MissingSetting("PROCESSOR_BASE_URL"));
        }
        if self.processor.api_key.is_empty() {
            return Err(ConfigError::MissingSetting("PROCESSOR_API_KEY"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::types::Environment;
    use crate::test_support;

    #[tokio::test]
    async fn load_applies_defaults() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();

        let settings = Settings::load().expect("settings");

        assert_eq!(settings.runtime().environment, Environment::Test);
        assert_eq!(settings.queues().wait_seconds, 10);
        assert_eq!(settings.queues().max_messages, 10);
        assert_eq!(settings.backoff().initial_seconds, 5);
        assert_eq!(settings.backoff().max_seconds, 60);
        assert_eq!(settings.heartbeat().every_iterations, 6);
        assert_eq!(settings.heartbeat().image_upload_monitor, "image-upload-listener");
        assert!(settings.heartbeat().check_in_url.is_none());
    }

    #[tokio::test]
    async fn load_rejects_wait_above_sqs_limit() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("QUEUE_WAIT_SECONDS", "30");

        let err = Settings::load().expect_err("wait too long");
        std::env::remove_var("QUEUE_WAIT_SECONDS");

        assert!(matches!(err, ConfigError::InvalidValue { field: "QUEUE_WAIT_SECONDS", .. }));
    }

    #[tokio::test]
    async fn load_rejects_max_backoff_below_initial() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("BACKOFF_INITIAL_SECONDS", "30");
        std::env::set_var("BACKOFF_MAX_SECONDS", "10");

        let err = Settings::load().expect_err("max below initial");
        std::env::remove_var("BACKOFF_INITIAL_SECONDS");
        std::env::remove_var("BACKOFF_MAX_SECONDS");

        assert!(matches!(err, ConfigError::InvalidValue { field: "BACKOFF_MAX_SECONDS", .. }));
    }

    #[tokio::test]
    async fn strict_mode_requires_queue_urls() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("QUIZ_LISTENER_STRICT_CONFIG", "1");

        let err = Settings::load().expect_err("strict config");
        std::env::set_var("QUIZ_LISTENER_STRICT_CONFIG", "0");

        assert!(matches!(err, ConfigError::MissingSetting("IMAGE_UPLOAD_QUEUE_URL")));
    }
}
