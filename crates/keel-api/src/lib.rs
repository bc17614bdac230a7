//! JSON REST API for Keel.
//!
//! Exposes an axum [`Router`] backed by an [`AssetEngine`] over any
//! [`WorldState`]. Auth, TLS, and transport concerns are the caller's
//! responsibility. Each request is treated as one transaction: it receives a
//! fresh transaction id and timestamp.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", keel_api::api_router(engine.clone()))
//! ```

pub mod assets;
pub mod classes;
pub mod error;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use keel_core::{
  engine::AssetEngine,
  store::{RulesHook, WorldState},
};

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, R>(engine: Arc<AssetEngine<S, R>>) -> Router<()>
where
  S: WorldState + 'static,
  R: RulesHook + 'static,
{
  Router::new()
    .route("/classes", get(classes::list::<S, R>))
    .route(
      "/classes/{class}/assets",
      post(assets::create::<S, R>).patch(assets::update::<S, R>),
    )
    .route(
      "/classes/{class}/delete-properties",
      post(assets::delete_properties::<S, R>),
    )
    .route("/classes/{class}/query", post(assets::query::<S, R>))
    .route("/classes/{class}/assets/{id}", get(assets::get_one::<S, R>))
    .with_state(engine)
}

// ─── Integration tests ────────────────────────────────────────────────────────
