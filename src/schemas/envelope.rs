use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub(crate) const OBJECT_CREATED_PUT: &str = "ObjectCreated:Put";

#[derive(Debug, Error)]
pub(crate) enum EnvelopeError {
    #[error("message body is not valid JSON")]
    InvalidBody(#[source] serde_json::Error),
    #[error("notification Message is not valid JSON")]
    InvalidNotification(#[source] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UploadRecord {
    pub(crate) event_name: String,
    pub(crate) object_key: String,
    pub(crate) object_size_bytes: Option<u64>,
}

impl UploadRecord {
    pub(crate) fn is_object_created_put(&self) -> bool {
        self.event_name == OBJECT_CREATED_PUT
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct UploadNotification {
    pub(crate) records: Vec<UploadRecord>,
    /// Records dropped because they carried no object key.
    pub(crate) skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct AiProcessingRequest {
    #[serde(rename = "quizId")]
    pub(crate) quiz_id: String,
}

/// Why a well-formed body produced nothing to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EmptyReason {
    MissingMessage,
    MissingRecords,
    MissingQuizId,
}

impl EmptyReason {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::MissingMessage => "missing Message field",
            Self::MissingRecords => "missing Records field",
            Self::MissingQuizId => "missing quizId field",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Decoded<T> {
    Payload(T),
    Empty(EmptyReason),
}

/// Decodes an object-storage notification forwarded through a topic:
/// `{"Message": "<json>"}` wrapping `{"Records": [...]}`.
pub(crate) fn parse_upload_notification(
    body: &str,
) -> Result<Decoded<UploadNotification>, EnvelopeError> {
    let outer: Value = serde_json::from_str(body).map_err(EnvelopeError::InvalidBody)?;

    let inner = match field(&outer, "Message", "message") {
        Some(Value::String(raw)) => {
            serde_json::from_str::<Value>(raw).map_err(EnvelopeError::InvalidNotification)?
        }
        // Raw notifications delivered without the topic wrapper.
        Some(value) if value.is_object() => value.clone(),
        _ => return Ok(Decoded::Empty(EmptyReason::MissingMessage)),
    };

    let Some(records) = field(&inner, "Records", "records").and_then(Value::as_array) else {
        return Ok(Decoded::Empty(EmptyReason::MissingRecords));
    };

    let mut notification = UploadNotification::default();
    for record in records {
        match parse_record(record) {
            Some(parsed) => notification.records.push(parsed),
            None => notification.skipped += 1,
        }
    }

    Ok(Decoded::Payload(notification))
}

/// Decodes `{"quizId": "..."}`. Blank ids count as missing; any other id
/// is passed on exactly as sent.
pub(crate) fn parse_ai_processing_request(
    body: &str,
) -> Result<Decoded<AiProcessingRequest>, EnvelopeError> {
    let payload: Value = serde_json::from_str(body).map_err(EnvelopeError::InvalidBody)?;

    let quiz_id = payload
        .get("quizId")
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty());

    Ok(match quiz_id {
        Some(quiz_id) => Decoded::Payload(AiProcessingRequest { quiz_id: quiz_id.to_string() }),
        None => Decoded::Empty(EmptyReason::MissingQuizId),
    })
}

fn parse_record(record: &Value) -> Option<UploadRecord> {
    let object = record.get("s3").and_then(|s3| s3.get("object"))?;
    let raw_key = object.get("key").and_then(Value::as_str)?;
    let object_key = decode_object_key(raw_key);
    if object_key.is_empty() {
        return None;
    }

    Some(UploadRecord {
        event_name: record.get("eventName").and_then(Value::as_str).unwrap_or_default().to_string(),
        object_key,
        object_size_bytes: object.get("size").and_then(Value::as_u64),
    })
}

/// Object keys in notifications are form-encoded (`+` for space, `%XX`).
/// A key never contains a raw `&` or `=` after encoding, so the whole key
/// parses as a single form name.
fn decode_object_key(raw: &str) -> String {
    url::form_urlencoded::parse(raw.as_bytes())
        .next()
        .map(|(name, _)| name.into_owned())
        .unwrap_or_default()
}

fn field<'a>(value: &'a Value, name: &str, fallback: &str) -> Option<&'a Value> {
    value.get(name).or_else(|| value.get(fallback))
}
