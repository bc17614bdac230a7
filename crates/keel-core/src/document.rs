//! Nested documents and the deep merge that produces every asset state.
//!
//! An asset's state is never assigned directly from an event payload; it is
//! always the result of merging the payload onto whatever was stored before.

use serde_json::{Map, Value};

/// A nested mapping of string keys to JSON values. Event payloads and asset
/// state are both documents.
pub type Document = Map<String, Value>;

/// Merge `incoming` onto `base` and return the combined document.
///
/// - Nested mappings present on both sides are merged recursively.
/// - Any other incoming value (scalar, array, or a mapping with nothing to
///   merge into) replaces the base value outright. Arrays are never merged
///   element-wise.
/// - Keys present only in `base` survive unchanged.
///
/// Neither argument is modified.
pub fn deep_merge(incoming: &Document, base: &Document) -> Document {
  let mut merged = base.clone();
  for (key, value) in incoming {
    let next = match (value, merged.get(key)) {
      (Value::Object(sub), Some(Value::Object(existing))) => {
        Value::Object(deep_merge(sub, existing))
      }
      _ => value.clone(),
    };
    merged.insert(key.clone(), next);
  }
  merged
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn doc(value: Value) -> Document {
    match value {
      Value::Object(map) => map,
      other => panic!("not a mapping: {other}"),
    }
  }

  #[test]
  fn nested_siblings_survive() {
    let base = doc(json!({ "a": { "x": 1, "y": 2 } }));
    let event = doc(json!({ "a": { "x": 9 } }));

    let merged = deep_merge(&event, &base);
    assert_eq!(Value::Object(merged), json!({ "a": { "x": 9, "y": 2 } }));
  }

  #[test]
  fn disjoint_events_accumulate() {
    let base = doc(json!({ "id": "T1", "site": { "room": 4 } }));
    let first = doc(json!({ "temp": 20 }));
    let second = doc(json!({ "humidity": 55, "site": { "floor": 2 } }));

    let merged = deep_merge(&second, &deep_merge(&first, &base));
    assert_eq!(
      Value::Object(merged),
      json!({
        "id": "T1",
        "temp": 20,
        "humidity": 55,
        "site": { "room": 4, "floor": 2 }
      })
    );
  }

  #[test]
  fn merge_is_idempotent() {
    let base = doc(json!({ "a": { "b": [1, 2], "c": "keep" }, "d": true }));
    let event = doc(json!({ "a": { "b": [3] }, "e": null }));

    let once = deep_merge(&event, &base);
    let twice = deep_merge(&event, &once);
    assert_eq!(once, twice);
  }

  #[test]
  fn arrays_are_replaced_wholesale() {
    let base = doc(json!({ "readings": [1, 2, 3] }));
    let event = doc(json!({ "readings": [7] }));

    let merged = deep_merge(&event, &base);
    assert_eq!(merged["readings"], json!([7]));
  }

  #[test]
  fn mapping_replaces_scalar() {
    let base = doc(json!({ "location": "unknown" }));
    let event = doc(json!({ "location": { "lat": 1.5 } }));

    let merged = deep_merge(&event, &base);
    assert_eq!(merged["location"], json!({ "lat": 1.5 }));
  }

  #[test]
  fn scalar_replaces_mapping() {
    let base = doc(json!({ "location": { "lat": 1.5 } }));
    let event = doc(json!({ "location": "in transit" }));

    let merged = deep_merge(&event, &base);
    assert_eq!(merged["location"], json!("in transit"));
  }

  #[test]
  fn inputs_are_untouched() {
    let base = doc(json!({ "a": { "x": 1 } }));
    let event = doc(json!({ "a": { "y": 2 } }));
    let base_before = base.clone();
    let event_before = event.clone();

    let _ = deep_merge(&event, &base);
    assert_eq!(base, base_before);
    assert_eq!(event, event_before);
  }

  #[test]
  fn merge_into_empty_copies_event() {
    let event = doc(json!({ "id": "T1", "temp": 20 }));
    assert_eq!(deep_merge(&event, &Document::new()), event);
  }
}
