//! Handlers for asset endpoints under `/classes/{class}`.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/classes/{class}/assets` | Create; body: [`InvokeBody`]; 201 |
//! | `PATCH` | `/classes/{class}/assets` | Update; body: [`InvokeBody`]; 204 |
//! | `POST`  | `/classes/{class}/delete-properties` | Body: [`InvokeBody`] with `event.qprops` |
//! | `GET`   | `/classes/{class}/assets/{id}` | Stored record, unmodified |
//! | `POST`  | `/classes/{class}/query` | Body: optional [`StateFilter`] |
//!
//! Operation endpoints stay off the `assets/{id}` segment so every id can be
//! read back.
//!
//! Mutating calls take their caller label from the `x-keel-caller` header and
//! default to the operation name.

use std::sync::Arc;

use axum::{
  Json,
  body::Bytes,
  extract::{Path, State},
  http::{HeaderMap, StatusCode, header},
  response::IntoResponse,
};
use chrono::Utc;
use keel_core::{
  asset::{Asset, QualifiedPropertyValue},
  engine::{AssetEngine, PropertyRemoval},
  error::Operation,
  filter::StateFilter,
  store::{RulesHook, TxnContext, WorldState},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Header naming the function recorded in an asset's `functionin` field.
pub const CALLER_HEADER: &str = "x-keel-caller";

/// JSON body accepted by the mutating endpoints.
#[derive(Debug, Deserialize)]
pub struct InvokeBody {
  /// The event payload; must be a JSON object.
  pub event:  serde_json::Value,
  /// Properties force-set after the merge.
  #[serde(default)]
  pub inject: Vec<QualifiedPropertyValue>,
}

impl InvokeBody {
  fn event_bytes(&self) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec(&self.event)
      .map_err(|e| ApiError::BadRequest(format!("unencodable event: {e}")))
  }
}

fn caller(headers: &HeaderMap, operation: Operation) -> String {
  headers
    .get(CALLER_HEADER)
    .and_then(|v| v.to_str().ok())
    .filter(|v| !v.is_empty())
    .map_or_else(|| operation.to_string(), str::to_owned)
}

/// One ledger context per request.
fn new_txn() -> TxnContext {
  let txn = TxnContext::new(Uuid::new_v4().to_string(), Utc::now());
  tracing::debug!(txn_id = %txn.txn_id, "transaction opened");
  txn
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /classes/{class}/assets`
pub async fn create<S, R>(
  State(engine): State<Arc<AssetEngine<S, R>>>,
  Path(class): Path<String>,
  headers: HeaderMap,
  Json(body): Json<InvokeBody>,
) -> Result<StatusCode, ApiError>
where
  S: WorldState,
  R: RulesHook,
{
  let caller = caller(&headers, Operation::Create);
  let event = body.event_bytes()?;
  engine
    .create(&class, &event, &caller, &body.inject, &new_txn())
    .await?;
  Ok(StatusCode::CREATED)
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PATCH /classes/{class}/assets`
pub async fn update<S, R>(
  State(engine): State<Arc<AssetEngine<S, R>>>,
  Path(class): Path<String>,
  headers: HeaderMap,
  Json(body): Json<InvokeBody>,
) -> Result<StatusCode, ApiError>
where
  S: WorldState,
  R: RulesHook,
{
  let caller = caller(&headers, Operation::Update);
  let event = body.event_bytes()?;
  engine
    .update(&class, &event, &caller, &body.inject, &new_txn())
    .await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Delete properties ────────────────────────────────────────────────────────

/// `POST /classes/{class}/delete-properties`: returns which of the
/// requested paths were removed.
pub async fn delete_properties<S, R>(
  State(engine): State<Arc<AssetEngine<S, R>>>,
  Path(class): Path<String>,
  headers: HeaderMap,
  Json(body): Json<InvokeBody>,
) -> Result<Json<Vec<PropertyRemoval>>, ApiError>
where
  S: WorldState,
  R: RulesHook,
{
  let caller = caller(&headers, Operation::DeleteProperties);
  let event = body.event_bytes()?;
  let removals = engine
    .delete_properties(&class, &event, &caller, &body.inject, &new_txn())
    .await?;
  Ok(Json(removals))
}

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /classes/{class}/assets/{id}`
pub async fn get_one<S, R>(
  State(engine): State<Arc<AssetEngine<S, R>>>,
  Path((class, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError>
where
  S: WorldState,
  R: RulesHook,
{
  let bytes = engine.read(&class, &id).await?;
  Ok(([(header::CONTENT_TYPE, "application/json")], bytes))
}

// ─── Query ────────────────────────────────────────────────────────────────────

/// `POST /classes/{class}/query`: an empty body matches everything.
pub async fn query<S, R>(
  State(engine): State<Arc<AssetEngine<S, R>>>,
  Path(class): Path<String>,
  body: Bytes,
) -> Result<Json<Vec<Asset>>, ApiError>
where
  S: WorldState,
  R: RulesHook,
{
  let filter: StateFilter = if body.iter().all(u8::is_ascii_whitespace) {
    StateFilter::default()
  } else {
    serde_json::from_slice(&body)
      .map_err(|e| ApiError::BadRequest(format!("invalid filter: {e}")))?
  };
  let assets = engine.read_all(&class, &filter).await?;
  Ok(Json(assets))
}
