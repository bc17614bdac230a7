//! [`AssetEngine`]: the create, update, delete-properties and read
//! operations over a [`WorldState`] and a [`RulesHook`].
//!
//! Every mutating operation follows the same outline: parse the event,
//! derive the key, check existence, merge or mutate, inject forced
//! properties, run the rules hook, persist. The first failure aborts the
//! operation; persistence is always the last step, so nothing is written
//! unless everything before it succeeded.

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::{
  Error, Result,
  asset::{Asset, QualifiedPropertyValue},
  class::{AssetClass, ClassRegistry},
  document::{Document, deep_merge},
  error::{ErrorContext, Operation},
  filter::StateFilter,
  path::{delete_path, get_path_as_string_array, set_path},
  store::{RulesHook, TxnContext, WorldState},
};

/// Event field listing the qualified paths to remove in
/// [`AssetEngine::delete_properties`].
pub const QPROPS_FIELD: &str = "qprops";

/// Whether one requested path was present and removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyRemoval {
  pub path:    String,
  pub removed: bool,
}

/// Explicit context for every operation: the store handle, the rules hook
/// and the class registry. Holds no per-invocation state.
pub struct AssetEngine<S, R> {
  store:    S,
  rules:    R,
  registry: ClassRegistry,
}

impl<S, R> AssetEngine<S, R>
where
  S: WorldState,
  R: RulesHook,
{
  pub fn new(store: S, rules: R, registry: ClassRegistry) -> Self {
    Self { store, rules, registry }
  }

  pub fn registry(&self) -> &ClassRegistry { &self.registry }

  pub fn store(&self) -> &S { &self.store }

  // ── Mutating operations ───────────────────────────────────────────────

  /// Create a new asset from `event`. Fails if an asset with the same key
  /// already exists.
  pub async fn create(
    &self,
    class: &str,
    event: &[u8],
    caller: &str,
    inject: &[QualifiedPropertyValue],
    txn: &TxnContext,
  ) -> Result<()> {
    self
      .create_inner(class, event, caller, inject, txn)
      .await
      .inspect_err(log_failure)
  }

  /// Merge `event` into an existing asset. Fields absent from the event are
  /// left as they were.
  pub async fn update(
    &self,
    class: &str,
    event: &[u8],
    caller: &str,
    inject: &[QualifiedPropertyValue],
    txn: &TxnContext,
  ) -> Result<()> {
    self
      .update_inner(class, event, caller, inject, txn)
      .await
      .inspect_err(log_failure)
  }

  /// Remove the qualified paths listed in the event's `qprops` array from an
  /// existing asset's state. Missing paths are not an error; the returned
  /// list records which paths were actually removed.
  pub async fn delete_properties(
    &self,
    class: &str,
    event: &[u8],
    caller: &str,
    inject: &[QualifiedPropertyValue],
    txn: &TxnContext,
  ) -> Result<Vec<PropertyRemoval>> {
    self
      .delete_properties_inner(class, event, caller, inject, txn)
      .await
      .inspect_err(log_failure)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// The stored document for identifier `id`, byte for byte.
  pub async fn read(&self, class: &str, id: &str) -> Result<Bytes> {
    self.read_inner(class, id).await.inspect_err(log_failure)
  }

  /// Every asset in the class's namespace whose state passes `filter`,
  /// sorted by key. No matches is an empty list, not an error.
  pub async fn read_all(
    &self,
    class: &str,
    filter: &StateFilter,
  ) -> Result<Vec<Asset>> {
    self.read_all_inner(class, filter).await.inspect_err(log_failure)
  }

  /// [`Self::read_all`], serialised as one JSON array.
  pub async fn read_all_json(
    &self,
    class: &str,
    filter: &StateFilter,
  ) -> Result<Vec<u8>> {
    let assets = self.read_all(class, filter).await?;
    serde_json::to_vec(&assets)
      .map_err(|source| Error::Serialization {
        ctx: ErrorContext::new(Operation::ReadAll, class),
        source,
      })
      .inspect_err(log_failure)
  }

  // ── Operation bodies ──────────────────────────────────────────────────

  async fn create_inner(
    &self,
    class: &str,
    event: &[u8],
    caller: &str,
    inject: &[QualifiedPropertyValue],
    txn: &TxnContext,
  ) -> Result<()> {
    let class = self.class(Operation::Create, class)?;
    let mut ctx = ErrorContext::new(Operation::Create, &class.name);
    let mut asset = class.new_asset();

    let payload = parse_event(&ctx, event)?;
    asset.key = derive_key(class, &ctx, &payload)?;
    ctx.key = Some(asset.key.clone());

    let existing = self.fetch(&ctx, &asset.key).await?;
    if existing.is_some() {
      return Err(Error::AlreadyExists { ctx });
    }

    asset.state = deep_merge(&payload, &Document::new());
    asset.event_in = Some(payload);

    self.commit(&ctx, asset, caller, inject, txn).await
  }

  async fn update_inner(
    &self,
    class: &str,
    event: &[u8],
    caller: &str,
    inject: &[QualifiedPropertyValue],
    txn: &TxnContext,
  ) -> Result<()> {
    let class = self.class(Operation::Update, class)?;
    let mut ctx = ErrorContext::new(Operation::Update, &class.name);

    let payload = parse_event(&ctx, event)?;
    let key = derive_key(class, &ctx, &payload)?;
    ctx.key = Some(key.clone());

    let mut asset = self.load_existing(&ctx, class, &key).await?;
    asset.state = deep_merge(&payload, &asset.state);
    asset.event_in = Some(payload);
    tracing::debug!(%key, "event merged into state");

    self.commit(&ctx, asset, caller, inject, txn).await
  }

  async fn delete_properties_inner(
    &self,
    class: &str,
    event: &[u8],
    caller: &str,
    inject: &[QualifiedPropertyValue],
    txn: &TxnContext,
  ) -> Result<Vec<PropertyRemoval>> {
    let class = self.class(Operation::DeleteProperties, class)?;
    let mut ctx = ErrorContext::new(Operation::DeleteProperties, &class.name);

    let payload = parse_event(&ctx, event)?;
    let key = derive_key(class, &ctx, &payload)?;
    ctx.key = Some(key.clone());

    let mut asset = self.load_existing(&ctx, class, &key).await?;

    let Some(qprops) = get_path_as_string_array(&payload, QPROPS_FIELD) else {
      return Err(malformed(
        &ctx,
        format!("{QPROPS_FIELD:?} is missing or not an array of strings"),
      ));
    };

    let removals: Vec<PropertyRemoval> = qprops
      .into_iter()
      .map(|path| {
        let removed = delete_path(&mut asset.state, &path);
        PropertyRemoval { path, removed }
      })
      .collect();
    asset.event_in = Some(payload);
    tracing::debug!(%key, ?removals, "properties removed from state");

    self.commit(&ctx, asset, caller, inject, txn).await?;
    Ok(removals)
  }

  async fn read_inner(&self, class: &str, id: &str) -> Result<Bytes> {
    let class = self.class(Operation::Read, class)?;
    let mut ctx = ErrorContext::new(Operation::Read, &class.name);
    if id.is_empty() {
      return Err(malformed(&ctx, "empty asset identifier"));
    }
    let key = class.key_for(id);
    ctx.key = Some(key.clone());

    let bytes = self.fetch(&ctx, &key).await?;
    bytes.ok_or(Error::NotFound { ctx })
  }

  async fn read_all_inner(
    &self,
    class: &str,
    filter: &StateFilter,
  ) -> Result<Vec<Asset>> {
    let class = self.class(Operation::ReadAll, class)?;
    let ctx = ErrorContext::new(Operation::ReadAll, &class.name);

    let (start, end) = class.key_range();
    let rows = self
      .store
      .range_query(&start, &end)
      .await
      .map_err(|e| storage(&ctx, e))?;

    let mut assets = Vec::new();
    for (key, bytes) in rows {
      let asset: Asset =
        serde_json::from_slice(&bytes).map_err(|source| Error::Serialization {
          ctx: ErrorContext { key: Some(key.clone()), ..ctx.clone() },
          source,
        })?;
      if filter.matches(&asset.state) {
        assets.push(asset);
      } else {
        tracing::trace!(%key, "asset rejected by filter");
      }
    }

    assets.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(assets)
  }

  // ── Shared steps ──────────────────────────────────────────────────────

  fn class(&self, operation: Operation, name: &str) -> Result<&AssetClass> {
    self.registry.get(name).ok_or_else(|| Error::UnknownClass {
      operation,
      name: name.to_owned(),
    })
  }

  async fn fetch(&self, ctx: &ErrorContext, key: &str) -> Result<Option<Bytes>> {
    self.store.get(key).await.map_err(|e| storage(ctx, e))
  }

  /// Load and decode the asset stored under `key`. The decoded record must
  /// carry the key it was stored under.
  async fn load_existing(
    &self,
    ctx: &ErrorContext,
    class: &AssetClass,
    key: &str,
  ) -> Result<Asset> {
    let bytes = self
      .fetch(ctx, key)
      .await?
      .ok_or_else(|| Error::NotFound { ctx: ctx.clone() })?;

    let mut asset: Asset = serde_json::from_slice(&bytes).map_err(|source| {
      Error::Serialization { ctx: ctx.clone(), source }
    })?;

    if asset.key != key {
      return Err(Error::KeyMismatch { ctx: ctx.clone(), stored: asset.key });
    }
    asset.class = class.clone();
    Ok(asset)
  }

  /// Stamp, inject, evaluate rules and persist. The key is fixed before the
  /// rules hook runs and cannot be changed by it.
  async fn commit(
    &self,
    ctx: &ErrorContext,
    mut asset: Asset,
    caller: &str,
    inject: &[QualifiedPropertyValue],
    txn: &TxnContext,
  ) -> Result<()> {
    asset.txn_id = txn.txn_id.clone();
    asset.txn_ts = Some(txn.timestamp);
    asset.function_in = caller.to_owned();

    for prop in inject {
      set_path(&mut asset.state, &prop.path, prop.value.clone()).map_err(
        |source| Error::Injection {
          ctx: ctx.clone(),
          path: prop.path.clone(),
          source,
        },
      )?;
    }

    let key = asset.key.clone();
    self
      .rules
      .evaluate(&mut asset)
      .map_err(|source| Error::Rules { ctx: ctx.clone(), source })?;
    asset.key.clone_from(&key);

    let bytes = serde_json::to_vec(&asset)
      .map_err(|source| Error::Serialization { ctx: ctx.clone(), source })?;
    self
      .store
      .put(key, Bytes::from(bytes))
      .await
      .map_err(|e| storage(ctx, e))?;

    tracing::debug!(
      operation = %ctx.operation,
      key = %asset.key,
      compliant = asset.compliant,
      "asset persisted"
    );
    Ok(())
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn parse_event(ctx: &ErrorContext, event: &[u8]) -> Result<Document> {
  match serde_json::from_slice::<Value>(event) {
    Ok(Value::Object(payload)) => Ok(payload),
    Ok(_) => Err(malformed(ctx, "event payload must be a JSON object")),
    Err(e) => Err(malformed(ctx, format!("event payload is not JSON: {e}"))),
  }
}

fn derive_key(
  class: &AssetClass,
  ctx: &ErrorContext,
  payload: &Document,
) -> Result<String> {
  class.derive_key(payload).ok_or_else(|| {
    malformed(
      ctx,
      format!("no non-empty string identifier at {:?}", class.id_path),
    )
  })
}

fn malformed(ctx: &ErrorContext, reason: impl Into<String>) -> Error {
  Error::MalformedRequest { ctx: ctx.clone(), reason: reason.into() }
}

fn storage<E>(ctx: &ErrorContext, e: E) -> Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  Error::Storage { ctx: ctx.clone(), source: Box::new(e) }
}

fn log_failure(err: &Error) {
  match err.context() {
    Some(ctx) => tracing::error!(
      operation = %ctx.operation,
      class = %ctx.class,
      key = ctx.key.as_deref().unwrap_or_default(),
      "{err}"
    ),
    None => tracing::error!("{err}"),
  }
}
