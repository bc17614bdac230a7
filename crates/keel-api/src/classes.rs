//! Handler for `GET /classes`.

use std::sync::Arc;

use axum::{Json, extract::State};
use keel_core::{
  class::AssetClass,
  engine::AssetEngine,
  store::{RulesHook, WorldState},
};

/// `GET /classes`: every registered class, in name order.
pub async fn list<S, R>(
  State(engine): State<Arc<AssetEngine<S, R>>>,
) -> Json<Vec<AssetClass>>
where
  S: WorldState,
  R: RulesHook,
{
  Json(engine.registry().classes().cloned().collect())
}
