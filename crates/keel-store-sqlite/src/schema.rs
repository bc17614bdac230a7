//! SQL schema for the Keel SQLite world state.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Keys use the default `BINARY` collation, so range scans order keys
/// byte-wise, the same way Rust orders `String`s.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One serialised asset record per key. Keys carry their class prefix.
CREATE TABLE IF NOT EXISTS world_state (
    key    TEXT PRIMARY KEY,
    value  BLOB NOT NULL
);

PRAGMA user_version = 1;
";
