//! Qualified property paths.
//!
//! A qualified path is a `.`-delimited list of segments, e.g. `site.room` or
//! `readings.0.value`. Each segment indexes into a mapping by key, or into an
//! array by a decimal index when reading.

use serde_json::Value;
use thiserror::Error;

use crate::document::Document;

/// Separator between the segments of a qualified path.
pub const SEPARATOR: char = '.';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
  #[error("qualified path is empty")]
  Empty,

  #[error("qualified path {0:?} contains an empty segment")]
  EmptySegment(String),
}

fn segments(path: &str) -> Result<Vec<&str>, PathError> {
  if path.is_empty() {
    return Err(PathError::Empty);
  }
  let segs: Vec<&str> = path.split(SEPARATOR).collect();
  if segs.iter().any(|s| s.is_empty()) {
    return Err(PathError::EmptySegment(path.to_owned()));
  }
  Ok(segs)
}

fn step<'a>(value: &'a Value, seg: &str) -> Option<&'a Value> {
  match value {
    Value::Object(map) => map.get(seg),
    Value::Array(items) => items.get(seg.parse::<usize>().ok()?),
    _ => None,
  }
}

fn step_mut<'a>(value: &'a mut Value, seg: &str) -> Option<&'a mut Value> {
  match value {
    Value::Object(map) => map.get_mut(seg),
    Value::Array(items) => items.get_mut(seg.parse::<usize>().ok()?),
    _ => None,
  }
}

/// Look up the value at `path`. Missing segments, out-of-range array
/// indices and malformed paths all yield `None`.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
  let segs = segments(path).ok()?;
  let (first, rest) = segs.split_first()?;
  rest
    .iter()
    .try_fold(doc.get(*first)?, |value, seg| step(value, seg))
}

/// Set `value` at `path`, creating intermediate mappings as needed.
///
/// Any non-mapping value found part-way along the path (including arrays) is
/// replaced by an empty mapping before descending. This is destructive.
pub fn set_path(
  doc: &mut Document,
  path: &str,
  value: Value,
) -> Result<(), PathError> {
  let segs = segments(path)?;
  let (leaf, parents) = segs.split_last().ok_or(PathError::Empty)?;
  set_in(doc, parents, leaf, value);
  Ok(())
}

fn set_in(map: &mut Document, parents: &[&str], leaf: &str, value: Value) {
  let Some((seg, rest)) = parents.split_first() else {
    map.insert(leaf.to_owned(), value);
    return;
  };
  match map.entry(*seg).or_insert_with(|| Value::Object(Document::new())) {
    Value::Object(child) => set_in(child, rest, leaf, value),
    other => {
      let mut child = Document::new();
      set_in(&mut child, rest, leaf, value);
      *other = Value::Object(child);
    }
  }
}

/// Remove the key at `path`. Returns whether anything was removed.
///
/// Ancestor mappings are left in place even when the removal empties them.
pub fn delete_path(doc: &mut Document, path: &str) -> bool {
  let Ok(segs) = segments(path) else {
    return false;
  };
  let Some((leaf, parents)) = segs.split_last() else {
    return false;
  };

  let parent = match parents.split_first() {
    None => Some(doc),
    Some((first, rest)) => {
      let mut current = doc.get_mut(*first);
      for seg in rest {
        current = current.and_then(|value| step_mut(value, seg));
      }
      current.and_then(Value::as_object_mut)
    }
  };

  parent.is_some_and(|map| map.remove(*leaf).is_some())
}

/// Read the array of strings at `path`.
///
/// Returns `None` when the path is absent, the value is not an array, or any
/// element is not a string. Callers that require the list must treat `None`
/// as an invalid request.
pub fn get_path_as_string_array(
  doc: &Document,
  path: &str,
) -> Option<Vec<String>> {
  match get_path(doc, path)? {
    Value::Array(items) => items
      .iter()
      .map(|item| item.as_str().map(str::to_owned))
      .collect(),
    _ => None,
  }
}
