//! [`MemoryWorldState`]: an in-process [`WorldState`] over a sorted map.
//!
//! Useful for testing and for embedding the engine without a database.

use std::{
  collections::BTreeMap,
  ops::Bound,
  sync::{PoisonError, RwLock},
};

use bytes::Bytes;
use thiserror::Error;

use crate::store::WorldState;

#[derive(Debug, Error)]
#[error("world state lock poisoned")]
pub struct PoisonedError;

impl<T> From<PoisonError<T>> for PoisonedError {
  fn from(_: PoisonError<T>) -> Self { Self }
}

#[derive(Debug, Default)]
pub struct MemoryWorldState {
  entries: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryWorldState {
  pub fn new() -> Self { Self::default() }

  pub fn len(&self) -> Result<usize, PoisonedError> {
    Ok(self.entries.read()?.len())
  }

  pub fn is_empty(&self) -> Result<bool, PoisonedError> {
    Ok(self.len()? == 0)
  }
}

impl WorldState for MemoryWorldState {
  type Error = PoisonedError;

  async fn get(&self, key: &str) -> Result<Option<Bytes>, PoisonedError> {
    Ok(self.entries.read()?.get(key).cloned())
  }

  async fn put(&self, key: String, value: Bytes) -> Result<(), PoisonedError> {
    self.entries.write()?.insert(key, value);
    Ok(())
  }

  async fn range_query(
    &self,
    start: &str,
    end: &str,
  ) -> Result<Vec<(String, Bytes)>, PoisonedError> {
    if start >= end {
      return Ok(Vec::new());
    }
    let entries = self.entries.read()?;
    Ok(
      entries
        .range::<str, _>((Bound::Included(start), Bound::Excluded(end)))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect(),
    )
  }
}
