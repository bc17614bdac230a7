//! [`SqliteWorldState`]: the SQLite implementation of [`WorldState`].

use std::path::Path;

use bytes::Bytes;
use keel_core::store::WorldState;
use rusqlite::OptionalExtension as _;

use crate::{Result, error::Error, schema::SCHEMA};

/// A world state backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteWorldState {
  conn: tokio_rusqlite::Connection,
}

impl SqliteWorldState {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of keys currently stored.
  pub async fn len(&self) -> Result<usize> {
    let count: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM world_state", [], |r| r.get(0))?)
      })
      .await?;
    Ok(usize::try_from(count).unwrap_or_default())
  }
}

// ─── WorldState impl ─────────────────────────────────────────────────────────

impl WorldState for SqliteWorldState {
  type Error = Error;

  async fn get(&self, key: &str) -> Result<Option<Bytes>> {
    let key = key.to_owned();

    let value: Option<Vec<u8>> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT value FROM world_state WHERE key = ?1",
            rusqlite::params![key],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    Ok(value.map(Bytes::from))
  }

  async fn put(&self, key: String, value: Bytes) -> Result<()> {
    let value = value.to_vec();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO world_state (key, value) VALUES (?1, ?2)
           ON CONFLICT (key) DO UPDATE SET value = excluded.value",
          rusqlite::params![key, value],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn range_query(
    &self,
    start: &str,
    end: &str,
  ) -> Result<Vec<(String, Bytes)>> {
    let start = start.to_owned();
    let end = end.to_owned();

    let rows: Vec<(String, Vec<u8>)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT key, value FROM world_state WHERE key >= ?1 AND key < ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![start, end], |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(key, value)| (key, Bytes::from(value)))
        .collect(),
    )
  }
}
