use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{Barrier, Mutex as AsyncMutex, Notify, OwnedMutexGuard};
use uuid::Uuid;

use crate::services::observability::{CheckIn, CheckInStatus, Observability};
use crate::services::queue::{QueueMessage, QueueTransport};
use crate::services::quiz_processor::QuizProcessor;

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<AsyncMutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(AsyncMutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("QUIZ_LISTENER_ENV", "test");
    std::env::set_var("QUIZ_LISTENER_STRICT_CONFIG", "0");
    std::env::set_var("AWS_REGION", "eu-west-1");
    std::env::set_var("SQS_ENDPOINT", "http://localhost:4566");
    std::env::set_var("AWS_ACCESS_KEY_ID", "test-access-key");
    std::env::set_var("AWS_SECRET_ACCESS_KEY", "test-secret-key");
    std::env::set_var("AWS_EC2_METADATA_DISABLED", "true");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    for key in [
        "IMAGE_UPLOAD_QUEUE_URL",
        "AI_PROCESSING_QUEUE_URL",
        "QUEUE_WAIT_SECONDS",
        "QUEUE_MAX_MESSAGES",
        "BACKOFF_INITIAL_SECONDS",
        "BACKOFF_MAX_SECONDS",
        "HEARTBEAT_EVERY_ITERATIONS",
        "IMAGE_UPLOAD_MONITOR_SLUG",
        "AI_PROCESSING_MONITOR_SLUG",
        "CHECK_IN_URL",
        "PROCESSOR_BASE_URL",
        "PROCESSOR_API_KEY",
        "PROCESSOR_TIMEOUT_SECONDS",
    ] {
        std::env::remove_var(key);
    }
}

pub(crate) fn message(id: &str, body: &str) -> QueueMessage {
    QueueMessage {
        message_id: Some(id.to_string()),
        body: body.to_string(),
        receipt_handle: format!("receipt-{id}"),
    }
}

/// Topic-wrapped object-storage notification with one record per
/// `(event_name, key)` pair.
pub(crate) fn upload_body(records: &[(&str, &str)]) -> String {
    let records: Vec<_> = records
        .iter()
        .map(|(event_name, key)| {
            json!({
                "eventName": event_name,
                "s3": { "object": { "key": key, "size": 1024 } }
            })
        })
        .collect();
    let inner = json!({ "Records": records });
    json!({ "Type": "Notification", "Message": inner.to_string() }).to_string()
}

type Script = Vec<Result<Vec<QueueMessage>, String>>;

/// Scripted queue. Each `receive` pops the next scripted result for its
/// queue URL (or the shared script); once that runs out it behaves like a
/// long poll that never returns.
#[derive(Default)]
pub(crate) struct FakeTransport {
    script: Mutex<VecDeque<Result<Vec<QueueMessage>, String>>>,
    per_queue: Mutex<HashMap<String, VecDeque<Result<Vec<QueueMessage>, String>>>>,
    receives: Mutex<usize>,
    receive_notify: Notify,
    deleted: Mutex<Vec<String>>,
    sent: Mutex<Vec<(String, String)>>,
    fail_deletes: bool,
}

impl FakeTransport {
    pub(crate) fn with_script(script: Script) -> Self {
        Self { script: Mutex::new(script.into()), ..Self::default() }
    }

    pub(crate) fn with_queues(queues: Vec<(&str, Script)>) -> Self {
        let per_queue =
            queues.into_iter().map(|(url, script)| (url.to_string(), script.into())).collect();
        Self { per_queue: Mutex::new(per_queue), ..Self::default() }
    }

    pub(crate) fn failing_deletes(script: Script) -> Self {
        Self { fail_deletes: true, ..Self::with_script(script) }
    }

    pub(crate) fn receive_calls(&self) -> usize {
        *self.receives.lock().expect("receives lock")
    }

    pub(crate) fn deleted(&self) -> Vec<String> {
        self.deleted.lock().expect("deleted lock").clone()
    }

    pub(crate) fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("sent lock").clone()
    }

    pub(crate) async fn wait_for_receives(&self, count: usize) {
        let wait = async {
            while self.receive_calls() < count {
                self.receive_notify.notified().await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait).await.expect("receive calls");
    }
}

#[async_trait]
impl QueueTransport for FakeTransport {
    async fn receive(&self, queue_url: &str, _wait: Duration) -> Result<Vec<QueueMessage>> {
        let scripted = self
            .per_queue
            .lock()
            .expect("per-queue lock")
            .get_mut(queue_url)
            .map(|script| script.pop_front());
        let next = match scripted {
            Some(next) => next,
            None => self.script.lock().expect("script lock").pop_front(),
        };
        *self.receives.lock().expect("receives lock") += 1;
        self.receive_notify.notify_one();

        match next {
            Some(Ok(batch)) => Ok(batch),
            Some(Err(reason)) => Err(anyhow!(reason)),
            None => std::future::pending().await,
        }
    }

    async fn delete(&self, _queue_url: &str, receipt_handle: &str) -> Result<()> {
        if self.fail_deletes {
            return Err(anyhow!("delete rejected"));
        }
        self.deleted.lock().expect("deleted lock").push(receipt_handle.to_string());
        Ok(())
    }

    async fn send(&self, queue_url: &str, body: &str) -> Result<()> {
        self.sent.lock().expect("sent lock").push((queue_url.to_string(), body.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProcessorCall {
    MarkItemReady(String),
    RunDeferredProcessing(String),
}

/// Parks a processor call: `entered` fires when a call arrives, and the call
/// returns only after `release` is notified.
#[derive(Default)]
pub(crate) struct ProcessorGate {
    pub(crate) entered: Notify,
    pub(crate) release: Notify,
}

/// Records calls; fails any call whose argument equals `fail_on`.
#[derive(Default)]
pub(crate) struct RecordingProcessor {
    calls: Mutex<Vec<ProcessorCall>>,
    fail_on: Option<String>,
    barrier: Option<Arc<Barrier>>,
    gate: Option<Arc<ProcessorGate>>,
}

impl RecordingProcessor {
    pub(crate) fn failing_on(value: &str) -> Self {
        Self { fail_on: Some(value.to_string()), ..Self::default() }
    }

    /// Every call waits on `barrier` before it is recorded.
    pub(crate) fn meeting_at(barrier: Arc<Barrier>) -> Self {
        Self { barrier: Some(barrier), ..Self::default() }
    }

    pub(crate) fn gated(gate: Arc<ProcessorGate>) -> Self {
        Self { gate: Some(gate), ..Self::default() }
    }

    async fn wait_turn(&self) {
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
    }

    pub(crate) fn calls(&self) -> Vec<ProcessorCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: ProcessorCall, value: &str) -> Result<()> {
        self.calls.lock().expect("calls lock").push(call);
        if self.fail_on.as_deref() == Some(value) {
            return Err(anyhow!("processor rejected {value}"));
        }
        Ok(())
    }
}

#[async_trait]
impl QuizProcessor for RecordingProcessor {
    async fn mark_item_ready(&self, key: &str) -> Result<()> {
        self.wait_turn().await;
        self.record(ProcessorCall::MarkItemReady(key.to_string()), key)
    }

    async fn run_deferred_processing(&self, quiz_id: &str) -> Result<()> {
        self.wait_turn().await;
        self.record(ProcessorCall::RunDeferredProcessing(quiz_id.to_string()), quiz_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ObservedEvent {
    ErrorReported { queue: String, stage: String },
    CheckInOpened { id: Uuid, monitor: String },
    CheckInResolved { id: Uuid, status: CheckInStatus },
}

#[derive(Default)]
pub(crate) struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
    failing: bool,
}

impl RecordingObserver {
    /// Records nothing and fails every call.
    pub(crate) fn failing() -> Self {
        Self { failing: true, ..Self::default() }
    }

    pub(crate) fn events(&self) -> Vec<ObservedEvent> {
        self.events.lock().expect("events lock").clone()
    }

    pub(crate) fn errors(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::ErrorReported { queue, stage } => Some((queue, stage)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn check_ins_opened(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, ObservedEvent::CheckInOpened { .. }))
            .count()
    }

    pub(crate) fn check_ins_resolved(&self, status: CheckInStatus) -> usize {
        self.events()
            .iter()
            .filter(|event| {
                matches!(event, ObservedEvent::CheckInResolved { status: resolved, .. } if *resolved == status)
            })
            .count()
    }

    fn push(&self, event: ObservedEvent) -> Result<()> {
        if self.failing {
            return Err(anyhow!("observer unavailable"));
        }
        self.events.lock().expect("events lock").push(event);
        Ok(())
    }
}

#[async_trait]
impl Observability for RecordingObserver {
    async fn report_error(&self, _err: &anyhow::Error, tags: &[(&str, &str)]) -> Result<()> {
        let tag = |name: &str| {
            tags.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
                .unwrap_or_default()
        };
        self.push(ObservedEvent::ErrorReported { queue: tag("queue"), stage: tag("stage") })
    }

    async fn report_check_in(&self, check_in: &CheckIn) -> Result<()> {
        self.push(ObservedEvent::CheckInOpened {
            id: check_in.id,
            monitor: check_in.monitor.clone(),
        })
    }

    async fn resolve_check_in(&self, check_in: &CheckIn, outcome: CheckInStatus) -> Result<()> {
        self.push(ObservedEvent::CheckInResolved { id: check_in.id, status: outcome })
    }
}
