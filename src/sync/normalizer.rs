use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::error::RecordError;

/// Candidate field names per canonical attribute, in lookup order.
/// Device firmware is not under our control and names drift across
/// vendors and versions; new variants are added here, not as code.
static IDENTIFIER_FIELDS: &[&str] = &[
    "personUUID",
    "PersonUUID",
    "personId",
    "PersonId",
    "deviceId",
    "IdCard",
    "id",
];

static CARD_FIELDS: &[&str] = &[
    "RFIDCard",
    "rfidCard",
    "IdCard",
    "idCard",
    "cardId",
    "cardNumber",
];

static NAME_FIELDS: &[&str] = &["Name", "name", "personName", "PersonName", "userName"];

static TIMESTAMP_FIELDS: &[&str] = &["Time", "time", "timestamp", "checkTime", "datetime"];

static NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

/// Canonical view of one raw device record.
#[derive(Debug, Clone)]
pub struct CanonicalEvent {
    pub identifier: Option<String>,
    pub card_id: Option<String>,
    pub name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub raw: Value,
}

pub fn normalize(record: &Value) -> Result<CanonicalEvent, RecordError> {
    let identifier = first_string(record, IDENTIFIER_FIELDS);
    let card_id = first_string(record, CARD_FIELDS);
    let name = first_string(record, NAME_FIELDS);

    if identifier.is_none() && card_id.is_none() {
        return Err(RecordError::Normalization(format!(
            "missing identification fields; available keys: {}",
            available_keys(record)
        )));
    }

    let Some(ts_value) = TIMESTAMP_FIELDS.iter().find_map(|f| record.get(*f)) else {
        return Err(RecordError::Normalization(format!(
            "missing timestamp field; available keys: {}",
            available_keys(record)
        )));
    };

    let timestamp = parse_timestamp(ts_value).ok_or_else(|| {
        RecordError::Normalization(format!("unparseable timestamp: {ts_value}"))
    })?;

    Ok(CanonicalEvent {
        identifier,
        card_id,
        name,
        timestamp,
        raw: record.clone(),
    })
}

fn first_string(record: &Value, candidates: &[&str]) -> Option<String> {
    for field in candidates {
        match record.get(*field) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

fn available_keys(record: &Value) -> String {
    record
        .as_object()
        .map(|o| o.keys().cloned().collect::<Vec<_>>().join(", "))
        .unwrap_or_else(|| "<not an object>".into())
}

/// Accepts RFC3339, a handful of naive formats (read as UTC), and
/// epoch seconds or milliseconds, either numeric or as a digit string.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            for fmt in NAIVE_FORMATS {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Some(Utc.from_utc_datetime(&naive));
                }
            }
            s.parse::<i64>().ok().and_then(from_epoch)
        }
        Value::Number(n) => n.as_i64().and_then(from_epoch),
        _ => None,
    }
}

fn from_epoch(v: i64) -> Option<DateTime<Utc>> {
    // Values past ~5138 AD in seconds are taken as milliseconds.
    if v > 99_999_999_999 {
        Utc.timestamp_millis_opt(v).single()
    } else {
        Utc.timestamp_opt(v, 0).single()
    }
}
