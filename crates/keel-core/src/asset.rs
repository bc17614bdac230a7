//! The asset record and the event shapes that flow through it.
//!
//! An [`Asset`] is built fresh for every operation, populated from the store
//! and the incoming event, mutated in memory, then persisted and dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{class::AssetClass, document::Document};

// ─── Events ──────────────────────────────────────────────────────────────────

/// A named event with a nested payload. Used for outbound notifications set
/// by a rules hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  pub name:    String,
  #[serde(default)]
  pub payload: Document,
}

/// A forced assignment applied to the merged state before rules run.
/// Injected values always win over event-supplied values at the same path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualifiedPropertyValue {
  #[serde(rename = "qprop")]
  pub path:  String,
  pub value: Value,
}

impl QualifiedPropertyValue {
  pub fn new(path: impl Into<String>, value: impl Into<Value>) -> Self {
    Self { path: path.into(), value: value.into() }
  }
}

// ─── Asset ───────────────────────────────────────────────────────────────────

/// The persisted unit of storage: class metadata, merged state, audit fields
/// and the outcome of the most recent rules evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
  #[serde(rename = "assetclass")]
  pub class:       AssetClass,
  /// `class.prefix` + identifier; fixed at creation.
  #[serde(rename = "assetkey")]
  pub key:         String,
  /// Current merged document.
  #[serde(default)]
  pub state:       Document,
  /// Payload of the most recently applied event.
  #[serde(rename = "eventin", default)]
  pub event_in:    Option<Document>,
  /// Operation that produced this version.
  #[serde(rename = "functionin", default)]
  pub function_in: String,
  #[serde(rename = "txnid", default)]
  pub txn_id:      String,
  #[serde(rename = "txnts", default)]
  pub txn_ts:      Option<DateTime<Utc>>,
  #[serde(rename = "eventout", default)]
  pub event_out:   Option<Event>,
  /// Active alert names in the order they were raised.
  #[serde(default)]
  pub alerts:      Option<Vec<String>>,
  #[serde(default = "compliant_by_default")]
  pub compliant:   bool,
}

fn compliant_by_default() -> bool { true }

impl Asset {
  /// Add `name` to the active alerts unless it is already present.
  pub fn raise_alert(&mut self, name: impl Into<String>) {
    let name = name.into();
    let alerts = self.alerts.get_or_insert_with(Vec::new);
    if !alerts.contains(&name) {
      alerts.push(name);
    }
  }

  /// Remove `name` from the active alerts. Returns whether it was active.
  pub fn clear_alert(&mut self, name: &str) -> bool {
    let Some(alerts) = self.alerts.as_mut() else {
      return false;
    };
    let before = alerts.len();
    alerts.retain(|a| a != name);
    before != alerts.len()
  }

  pub fn has_alert(&self, name: &str) -> bool {
    self
      .alerts
      .as_ref()
      .is_some_and(|alerts| alerts.iter().any(|a| a == name))
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use serde_json::json;

  use super::*;

  fn asset() -> Asset {
    AssetClass::new("thermostat", "THERM", "id").new_asset()
  }

  #[test]
  fn alerts_behave_as_ordered_set() {
    let mut a = asset();
    a.raise_alert("OVERTEMP");
    a.raise_alert("DOOR_OPEN");
    a.raise_alert("OVERTEMP");
    assert_eq!(
      a.alerts.as_deref(),
      Some(&["OVERTEMP".to_owned(), "DOOR_OPEN".to_owned()][..])
    );

    assert!(a.clear_alert("OVERTEMP"));
    assert!(!a.clear_alert("OVERTEMP"));
    assert!(!a.has_alert("OVERTEMP"));
    assert!(a.has_alert("DOOR_OPEN"));
  }

  #[test]
  fn optional_fields_serialise_as_null() {
    let value = serde_json::to_value(asset()).unwrap();
    assert_eq!(value["eventout"], Value::Null);
    assert_eq!(value["alerts"], Value::Null);
    assert_eq!(value["eventin"], Value::Null);
    assert_eq!(value["compliant"], json!(true));
    assert_eq!(value["assetclass"]["assetIDpath"], json!("id"));
  }

  #[test]
  fn absent_optional_fields_stay_absent() {
    let stored = json!({
      "assetclass": { "name": "thermostat", "prefix": "THERM", "assetIDpath": "id" },
      "assetkey": "THERMT1",
      "state": { "id": "T1" }
    });
    let a: Asset = serde_json::from_value(stored).unwrap();
    assert_eq!(a.key, "THERMT1");
    assert!(a.alerts.is_none());
    assert!(a.event_out.is_none());
    assert!(a.txn_ts.is_none());
    assert!(a.compliant);
  }

  #[test]
  fn populated_record_survives_storage() {
    let mut a = asset();
    a.key = "THERMT1".into();
    a.state = json!({ "id": "T1", "temp": 20 }).as_object().unwrap().clone();
    a.txn_id = "tx-1".into();
    a.txn_ts = Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    a.compliant = false;
    a.raise_alert("OVERTEMP");
    a.event_out = Some(Event {
      name:    "overtemp".into(),
      payload: json!({ "temp": 20 }).as_object().unwrap().clone(),
    });

    let bytes = serde_json::to_vec(&a).unwrap();
    let back: Asset = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(back, a);
  }
}
