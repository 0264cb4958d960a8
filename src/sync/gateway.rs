use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use std::time::Duration;

use crate::error::FacilityError;
use crate::model::facility::Facility;

/// One gateway response: the record list plus whatever device identity
/// the firmware volunteered alongside it.
#[derive(Debug, Clone, Default)]
pub struct DeviceBatch {
    pub records: Vec<Value>,
    pub device_id: Option<String>,
    pub device_model: Option<String>,
}

/// Seam between the sync pipeline and the facility's device endpoint,
/// so the scheduler can be driven by a scripted fake in tests.
#[async_trait]
pub trait DeviceGateway: Send + Sync {
    /// Attendance punches in the window `[from, to]`.
    async fn fetch_events(
        &self,
        facility: &Facility,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<DeviceBatch, FacilityError>;

    /// The device's registered-user directory.
    async fn fetch_directory(&self, facility: &Facility) -> Result<DeviceBatch, FacilityError>;
}

pub struct HttpDeviceGateway {
    client: reqwest::Client,
}

impl HttpDeviceGateway {
    pub fn new(timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(HttpDeviceGateway { client })
    }

    async fn post(
        &self,
        facility: &Facility,
        url: &str,
        body: Value,
    ) -> Result<Value, FacilityError> {
        let mut request = self.client.post(url).json(&body);
        if let Some(key) = &facility.device_api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl DeviceGateway for HttpDeviceGateway {
    async fn fetch_events(
        &self,
        facility: &Facility,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<DeviceBatch, FacilityError> {
        let body = json!({
            "from": from.to_rfc3339(),
            "to": to.to_rfc3339(),
        });
        let payload = self.post(facility, &facility.device_api_url, body).await?;
        extract_batch(&payload, &["SearchInfo"])
    }

    async fn fetch_directory(&self, facility: &Facility) -> Result<DeviceBatch, FacilityError> {
        let url = facility
            .user_api_url
            .as_deref()
            .ok_or_else(|| FacilityError::BadPayload("no user_api_url configured".into()))?;
        let payload = self.post(facility, url, json!({})).await?;
        // Some firmware answers the directory call in the attendance
        // shape, so both list keys are accepted here.
        extract_batch(&payload, &["List", "SearchInfo"])
    }
}

/// Unwraps `{ device_response: { info: { <key>: [...] } } }`, taking the
/// first of `list_keys` that holds an array.
pub fn extract_batch(payload: &Value, list_keys: &[&str]) -> Result<DeviceBatch, FacilityError> {
    let info = payload
        .get("device_response")
        .and_then(|r| r.get("info"))
        .ok_or_else(|| {
            FacilityError::BadPayload(format!(
                "missing device_response.info; top-level keys: {}",
                top_keys(payload)
            ))
        })?;

    let records = list_keys
        .iter()
        .find_map(|k| info.get(*k).and_then(Value::as_array))
        .cloned()
        .ok_or_else(|| {
            FacilityError::BadPayload(format!(
                "no record list under device_response.info; keys: {}",
                top_keys(info)
            ))
        })?;

    Ok(DeviceBatch {
        records,
        device_id: info
            .get("DeviceID")
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())),
        device_model: info
            .get("DeviceModel")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn top_keys(v: &Value) -> String {
    v.as_object()
        .map(|o| o.keys().cloned().collect::<Vec<_>>().join(", "))
        .unwrap_or_else(|| "<not an object>".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_search_info_batches() {
        let payload = json!({
            "device_response": { "info": {
                "DeviceID": 90211,
                "SearchInfo": [ {"personUUID": "a"}, {"personUUID": "b"} ]
            }}
        });
        let batch = extract_batch(&payload, &["SearchInfo"]).unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.device_id.as_deref(), Some("90211"));
    }

    #[test]
    fn directory_accepts_list_format() {
        let payload = json!({
            "device_response": { "info": {
                "DeviceModel": "XO5",
                "List": [ {"Name": "Victor"} ]
            }}
        });
        let batch = extract_batch(&payload, &["List", "SearchInfo"]).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.device_model.as_deref(), Some("XO5"));
        assert!(batch.device_id.is_none());
    }

    #[test]
    fn missing_envelope_is_a_bad_payload() {
        let err = extract_batch(&json!({"ok": true}), &["SearchInfo"]).unwrap_err();
        assert!(matches!(err, FacilityError::BadPayload(_)));
    }

    #[test]
    fn missing_list_is_a_bad_payload() {
        let payload = json!({"device_response": {"info": {"Unrelated": 1}}});
        assert!(extract_batch(&payload, &["SearchInfo"]).is_err());
    }
}
