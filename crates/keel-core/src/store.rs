//! External collaborators: the world-state store, the rules hook and the
//! per-invocation transaction context.
//!
//! Storage backends (e.g. `keel-store-sqlite`) implement [`WorldState`].
//! The engine depends on these abstractions, never on a concrete backend.

use std::future::Future;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::{asset::Asset, error::BoxError};

// ─── World state ─────────────────────────────────────────────────────────────

/// A key-value store holding one serialised document per key.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes. Implementations are expected to give
/// read-your-writes consistency within one invocation and to serialise
/// conflicting writes to the same key; a conflict surfaces as an error.
pub trait WorldState: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch the value stored under `key`, or `None` if there is none.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<Bytes>, Self::Error>> + Send + 'a;

  /// Store `value` under `key`, replacing any previous value.
  fn put(
    &self,
    key: String,
    value: Bytes,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All `(key, value)` pairs with `start <= key < end`, in no particular
  /// order.
  fn range_query<'a>(
    &'a self,
    start: &'a str,
    end: &'a str,
  ) -> impl Future<Output = Result<Vec<(String, Bytes)>, Self::Error>> + Send + 'a;
}

// ─── Rules ───────────────────────────────────────────────────────────────────

/// Inspects a merged asset before it is persisted.
///
/// A hook may set `alerts`, `compliant` and `event_out`. Returning an error
/// aborts the operation and nothing is written.
pub trait RulesHook: Send + Sync {
  fn evaluate(&self, asset: &mut Asset) -> Result<(), BoxError>;
}

/// A hook that accepts every asset unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRules;

impl RulesHook for NoRules {
  fn evaluate(&self, _asset: &mut Asset) -> Result<(), BoxError> { Ok(()) }
}

impl<F> RulesHook for F
where
  F: Fn(&mut Asset) -> Result<(), BoxError> + Send + Sync,
{
  fn evaluate(&self, asset: &mut Asset) -> Result<(), BoxError> { self(asset) }
}

// ─── Transaction context ─────────────────────────────────────────────────────

/// Identifier and timestamp of the invocation, supplied by the ledger layer
/// and stamped onto every asset written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnContext {
  pub txn_id:    String,
  pub timestamp: DateTime<Utc>,
}

impl TxnContext {
  pub fn new(txn_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
    Self { txn_id: txn_id.into(), timestamp }
  }
}
