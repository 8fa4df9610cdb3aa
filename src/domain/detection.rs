// Live face-detection snapshot domain model
use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;

/// Presentation tag for a detection status label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionTag {
    Success,
    Error,
    Warning,
    Processing,
    Default,
}

/// Latest value of the `face_detection` node. `current_status` is
/// free text from the detection server; `last_updated` arrives either
/// as epoch millis or as a `YYYY-MM-DD HH:mm:ss` string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionSnapshot {
    pub current_status: Option<String>,
    pub last_updated_ms: Option<i64>,
}

impl DetectionSnapshot {
    pub fn from_value(value: &Value) -> Self {
        let current_status = value
            .get("current_status")
            .and_then(Value::as_str)
            .map(str::to_string);
        let last_updated_ms = value.get("last_updated").and_then(parse_last_updated);
        Self {
            current_status,
            last_updated_ms,
        }
    }

    pub fn tag(&self) -> DetectionTag {
        detection_tag(self.current_status.as_deref())
    }
}

/// Case-insensitive mapping from the detection server's status labels
/// to presentation tags; anything unrecognized falls through to
/// Default.
pub fn detection_tag(status: Option<&str>) -> DetectionTag {
    let Some(status) = status else {
        return DetectionTag::Default;
    };
    match status.to_lowercase().as_str() {
        "mask" => DetectionTag::Success,
        "no mask" => DetectionTag::Error,
        "no one here" => DetectionTag::Warning,
        "starting detection..." => DetectionTag::Processing,
        _ => DetectionTag::Default,
    }
}

fn parse_last_updated(value: &Value) -> Option<i64> {
    if let Some(ms) = value.as_i64() {
        return Some(ms);
    }
    let text = value.as_str()?;
    if let Ok(parsed) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(parsed.and_utc().timestamp_millis());
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|t| t.timestamp_millis())
}
