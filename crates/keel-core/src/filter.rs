//! State filters for multi-asset reads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{document::Document, path::get_path};

/// How the entries of a [`StateFilter`] combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
  /// Every entry must match.
  #[default]
  All,
  /// At least one entry must match.
  Any,
  /// No entry may match.
  None,
}

/// One `(qualified path, expected value)` test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterEntry {
  #[serde(rename = "qprop")]
  pub path:  String,
  pub value: Value,
}

impl FilterEntry {
  pub fn new(path: impl Into<String>, value: impl Into<Value>) -> Self {
    Self { path: path.into(), value: value.into() }
  }

  /// The value at `path` must exist and equal `value`. Numbers compare by
  /// value, so `20` matches `20.0`.
  pub fn matches(&self, state: &Document) -> bool {
    get_path(state, &self.path).is_some_and(|found| same_value(found, &self.value))
  }
}

/// JSON equality with numbers compared numerically, at any depth.
fn same_value(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Number(x), Value::Number(y)) => x == y || x.as_f64() == y.as_f64(),
    (Value::Array(xs), Value::Array(ys)) => {
      xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same_value(x, y))
    }
    (Value::Object(xm), Value::Object(ym)) => {
      xm.len() == ym.len()
        && xm.iter().all(|(k, x)| ym.get(k).is_some_and(|y| same_value(x, y)))
    }
    _ => a == b,
  }
}

/// A set of entries selecting assets by their state. An empty filter
/// matches everything, whatever its mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateFilter {
  #[serde(rename = "match", default)]
  pub mode:    MatchMode,
  #[serde(default)]
  pub entries: Vec<FilterEntry>,
}

impl StateFilter {
  /// A filter requiring every entry to match.
  pub fn all(entries: impl IntoIterator<Item = FilterEntry>) -> Self {
    Self { mode: MatchMode::All, entries: entries.into_iter().collect() }
  }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  pub fn matches(&self, state: &Document) -> bool {
    if self.entries.is_empty() {
      return true;
    }
    let mut hits = self.entries.iter().map(|e| e.matches(state));
    match self.mode {
      MatchMode::All => hits.all(|hit| hit),
      MatchMode::Any => hits.any(|hit| hit),
      MatchMode::None => !hits.any(|hit| hit),
    }
  }
}
