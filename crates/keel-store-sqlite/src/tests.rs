//! Integration tests for `SqliteWorldState` against an in-memory database.

use bytes::Bytes;
use chrono::Utc;
use keel_core::{
  asset::Asset,
  class::{AssetClass, ClassRegistry},
  engine::AssetEngine,
  filter::{FilterEntry, StateFilter},
  store::{NoRules, TxnContext, WorldState},
};
use serde_json::{Value, json};

use crate::SqliteWorldState;

async fn store() -> SqliteWorldState {
  SqliteWorldState::open_in_memory()
    .await
    .expect("in-memory store")
}

// ─── Key-value primitives ────────────────────────────────────────────────────

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get("THERMT1").await.unwrap().is_none());
}

#[tokio::test]
async fn put_and_get() {
  let s = store().await;
  s.put("THERMT1".into(), Bytes::from_static(b"{\"a\":1}"))
    .await
    .unwrap();

  let value = s.get("THERMT1").await.unwrap();
  assert_eq!(value, Some(Bytes::from_static(b"{\"a\":1}")));
  assert_eq!(s.len().await.unwrap(), 1);
}

#[tokio::test]
async fn put_overwrites_existing_value() {
  let s = store().await;
  s.put("k".into(), Bytes::from_static(b"old")).await.unwrap();
  s.put("k".into(), Bytes::from_static(b"new")).await.unwrap();

  assert_eq!(s.get("k").await.unwrap(), Some(Bytes::from_static(b"new")));
  assert_eq!(s.len().await.unwrap(), 1);
}

#[tokio::test]
async fn values_are_binary_safe() {
  let s = store().await;
  let raw = Bytes::from_static(&[0, 159, 146, 150, 255]);
  s.put("bin".into(), raw.clone()).await.unwrap();
  assert_eq!(s.get("bin").await.unwrap(), Some(raw));
}

#[tokio::test]
async fn range_query_is_half_open_and_prefix_scoped() {
  let s = store().await;
  for key in ["CONC1", "THERMA", "THERMB", "THERN1"] {
    s.put(key.into(), Bytes::from_static(b"{}")).await.unwrap();
  }

  let (start, end) = AssetClass::new("thermostat", "THERM", "id").key_range();
  let mut keys: Vec<_> = s
    .range_query(&start, &end)
    .await
    .unwrap()
    .into_iter()
    .map(|(k, _)| k)
    .collect();
  keys.sort();
  assert_eq!(keys, ["THERMA", "THERMB"]);

  assert!(s.range_query("THERMB", "THERMB").await.unwrap().is_empty());
}

// ─── Engine over SQLite ──────────────────────────────────────────────────────

fn engine(s: SqliteWorldState) -> AssetEngine<SqliteWorldState, NoRules> {
  let registry =
    ClassRegistry::new([AssetClass::new("thermostat", "THERM", "id")]).unwrap();
  AssetEngine::new(s, NoRules, registry)
}

fn txn() -> TxnContext { TxnContext::new("tx", Utc::now()) }

fn event(value: Value) -> Vec<u8> { serde_json::to_vec(&value).unwrap() }

#[tokio::test]
async fn thermostat_scenario() {
  let e = engine(store().await);

  e.create(
    "thermostat",
    &event(json!({ "id": "T1", "temp": 20 })),
    "createAsset",
    &[],
    &txn(),
  )
  .await
  .unwrap();
  e.update(
    "thermostat",
    &event(json!({ "id": "T1", "humidity": 55 })),
    "updateAsset",
    &[],
    &txn(),
  )
  .await
  .unwrap();

  let bytes = e.read("thermostat", "T1").await.unwrap();
  let asset: Asset = serde_json::from_slice(&bytes).unwrap();
  assert_eq!(asset.key, "THERMT1");
  assert_eq!(
    Value::Object(asset.state),
    json!({ "id": "T1", "temp": 20, "humidity": 55 })
  );
}

#[tokio::test]
async fn read_all_orders_and_filters() {
  let e = engine(store().await);
  for (id, mode) in [("B", "heat"), ("A", "cool"), ("C", "heat")] {
    e.create(
      "thermostat",
      &event(json!({ "id": id, "mode": mode })),
      "createAsset",
      &[],
      &txn(),
    )
    .await
    .unwrap();
  }

  let all = e.read_all("thermostat", &StateFilter::default()).await.unwrap();
  let keys: Vec<_> = all.iter().map(|a| a.key.as_str()).collect();
  assert_eq!(keys, ["THERMA", "THERMB", "THERMC"]);

  let heating = e
    .read_all("thermostat", &StateFilter::all([FilterEntry::new("mode", "heat")]))
    .await
    .unwrap();
  let keys: Vec<_> = heating.iter().map(|a| a.key.as_str()).collect();
  assert_eq!(keys, ["THERMB", "THERMC"]);
}
