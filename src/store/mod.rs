//! Remote state: the realtime database holding sensor readings, user
//! feedback and the prediction written back by each run.
//!
//! `/sensor_data` is read for the indoor reading and later patched with the
//! enrichment fields. `/user_feedback` is read only.

pub mod credentials;
pub mod firebase;

use crate::error::{Result, SetpointError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub use credentials::{ServiceAccountKey, ServiceAccountTokenSource, StaticToken, TokenSource};
pub use firebase::FirebaseClient;

pub const SENSOR_PATH: &str = "/sensor_data";
pub const FEEDBACK_PATH: &str = "/user_feedback";

/// Key-value document store addressed by slash-separated paths.
pub trait RealtimeStore {
    /// Fetch the document at `path`; `None` when nothing is stored there.
    fn get_document(&self, path: &str) -> Result<Option<Value>>;

    /// Overwrite the given children of `path`, leaving its other children intact.
    fn update_fields(&self, path: &str, fields: &Map<String, Value>) -> Result<()>;
}

/// Latest indoor reading.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SensorSnapshot {
    #[serde(default, deserialize_with = "lenient_number")]
    pub indoor_temp: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub indoor_humidity: Option<f64>,
}

/// What the occupant reported about their activity and comfort.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserFeedback {
    #[serde(default, deserialize_with = "lenient_label")]
    pub activity_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub status: Option<String>,
}

/// Fields written under `/sensor_data` after a prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enrichment {
    /// Set-point command, e.g. `cool_24`.
    pub ai_set_temp: String,
    pub outdoor_humidity: f64,
    pub outdoor_temp: f64,
    pub weather: String,
    pub time_of_day: u32,
    /// Local time of the run, ISO-8601 without offset.
    pub timestamp: String,
}

/// Read `/sensor_data`. An absent document aborts the run.
pub fn read_sensor_snapshot(store: &dyn RealtimeStore) -> Result<SensorSnapshot> {
    let doc = store
        .get_document(SENSOR_PATH)?
        .ok_or(SetpointError::NoSensorData)?;
    decode(SENSOR_PATH, doc)
}

/// Read `/user_feedback`. An absent document reads as empty feedback.
pub fn read_user_feedback(store: &dyn RealtimeStore) -> Result<UserFeedback> {
    match store.get_document(FEEDBACK_PATH)? {
        Some(doc) => decode(FEEDBACK_PATH, doc),
        None => {
            tracing::warn!("no user feedback found, categorical feedback features stay zero");
            Ok(UserFeedback::default())
        }
    }
}

/// Patch the enrichment fields into `/sensor_data`. Last write wins.
pub fn write_enrichment(store: &dyn RealtimeStore, enrichment: &Enrichment) -> Result<()> {
    let fields = match serde_json::to_value(enrichment) {
        Ok(Value::Object(fields)) => fields,
        other => {
            return Err(SetpointError::MalformedDocument {
                path: SENSOR_PATH.into(),
                reason: format!("enrichment is not a JSON object: {other:?}"),
            })
        }
    };
    store.update_fields(SENSOR_PATH, &fields)
}

fn decode<T: DeserializeOwned>(path: &str, doc: Value) -> Result<T> {
    serde_json::from_value(doc).map_err(|e| SetpointError::MalformedDocument {
        path: path.into(),
        reason: e.to_string(),
    })
}

/// Accept `24.5`, `"24.5"` or `null`. Devices are not consistent about it.
/// `"NaN"` and `"inf"` parse as floats but are not readings.
fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => Some(
            s.trim()
                .parse::<f64>()
                .map_err(|_| serde::de::Error::custom(format!("{s:?} is not a number")))?,
        ),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected a number, got {other}"
            )))
        }
    };
    match value {
        Some(v) if !v.is_finite() => Err(serde::de::Error::custom(format!(
            "{v} is not a finite reading"
        ))),
        other => Ok(other),
    }
}

/// Category labels: strings as-is, other scalars stringified (`1`, `true`).
fn lenient_label<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a label, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryStore {
        docs: HashMap<String, Value>,
        writes: RefCell<Vec<(String, Map<String, Value>)>>,
    }

    impl RealtimeStore for MemoryStore {
        fn get_document(&self, path: &str) -> Result<Option<Value>> {
            Ok(self.docs.get(path).cloned())
        }

        fn update_fields(&self, path: &str, fields: &Map<String, Value>) -> Result<()> {
            self.writes
                .borrow_mut()
                .push((path.to_string(), fields.clone()));
            Ok(())
        }
    }

    #[test]
    fn absent_sensor_document_is_no_sensor_data() {
        let store = MemoryStore::default();
        assert!(matches!(
            read_sensor_snapshot(&store),
            Err(SetpointError::NoSensorData)
        ));
    }

    #[test]
    fn sensor_document_ignores_enrichment_siblings() {
        let mut store = MemoryStore::default();
        store.docs.insert(
            SENSOR_PATH.into(),
            json!({
                "indoor_temp": 24,
                "indoor_humidity": "60.5",
                "ai_set_temp": "cool_23",
                "weather": "Rain"
            }),
        );
        let snapshot = read_sensor_snapshot(&store).unwrap();
        assert_eq!(snapshot.indoor_temp, Some(24.0));
        assert_eq!(snapshot.indoor_humidity, Some(60.5));
    }

    #[test]
    fn null_and_missing_readings_are_none() {
        let mut store = MemoryStore::default();
        store
            .docs
            .insert(SENSOR_PATH.into(), json!({"indoor_temp": null}));
        let snapshot = read_sensor_snapshot(&store).unwrap();
        assert_eq!(snapshot, SensorSnapshot::default());
    }

    #[test]
    fn non_numeric_reading_is_malformed() {
        let mut store = MemoryStore::default();
        store
            .docs
            .insert(SENSOR_PATH.into(), json!({"indoor_temp": "warm"}));
        assert!(matches!(
            read_sensor_snapshot(&store),
            Err(SetpointError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn non_finite_reading_is_malformed() {
        for reading in ["NaN", "inf", "infinity", " -inf "] {
            let mut store = MemoryStore::default();
            store
                .docs
                .insert(SENSOR_PATH.into(), json!({"indoor_humidity": reading}));
            assert!(matches!(
                read_sensor_snapshot(&store),
                Err(SetpointError::MalformedDocument { .. })
            ));
        }
    }

    #[test]
    fn scalar_feedback_labels_are_stringified() {
        let mut store = MemoryStore::default();
        store.docs.insert(
            FEEDBACK_PATH.into(),
            json!({"activity_type": true, "status": 1}),
        );
        let feedback = read_user_feedback(&store).unwrap();
        assert_eq!(feedback.activity_type.as_deref(), Some("true"));
        assert_eq!(feedback.status.as_deref(), Some("1"));
    }

    #[test]
    fn absent_feedback_reads_as_empty() {
        let store = MemoryStore::default();
        assert_eq!(read_user_feedback(&store).unwrap(), UserFeedback::default());
    }

    #[test]
    fn writes_six_fields_under_sensor_path() {
        let store = MemoryStore::default();
        let enrichment = Enrichment {
            ai_set_temp: "cool_24".into(),
            outdoor_humidity: 70.0,
            outdoor_temp: 30.0,
            weather: "Clouds".into(),
            time_of_day: 14,
            timestamp: "2026-10-19T14:00:00.000000".into(),
        };
        write_enrichment(&store, &enrichment).unwrap();

        let writes = store.writes.borrow();
        assert_eq!(writes.len(), 1);
        let (path, fields) = &writes[0];
        assert_eq!(path, SENSOR_PATH);
        assert_eq!(fields.len(), 6);
        assert_eq!(fields["ai_set_temp"], "cool_24");
        assert_eq!(fields["time_of_day"], 14);
        assert_eq!(fields["outdoor_temp"], 30.0);
    }
}
