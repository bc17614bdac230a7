//! Asset classes and the registry that holds them.
//!
//! A class fixes the key namespace (`prefix`) and the qualified path of the
//! identifier inside event payloads (`id_path`). Both are set once at startup;
//! changing either after assets exist orphans the old keys.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  Error, Result,
  asset::Asset,
  document::Document,
  path::get_path,
};

/// Name of the pseudo-class whose namespace spans the whole store.
pub const ALL_CLASS_NAME: &str = "All";

/// Upper bound appended to a prefix to form an exclusive range end.
const RANGE_END: char = '\u{10FFFF}';

/// Schema descriptor for one kind of asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetClass {
  pub name:    String,
  /// Prepended to every key in this class's namespace.
  pub prefix:  String,
  /// Qualified path of the asset identifier inside an event payload.
  // Lowercase alias: the config crate folds keys read from files.
  #[serde(rename = "assetIDpath", alias = "assetidpath")]
  pub id_path: String,
}

impl AssetClass {
  pub fn new(
    name: impl Into<String>,
    prefix: impl Into<String>,
    id_path: impl Into<String>,
  ) -> Self {
    Self {
      name:    name.into(),
      prefix:  prefix.into(),
      id_path: id_path.into(),
    }
  }

  /// The class of all assets: empty prefix, no identifier. Only usable for
  /// reads.
  pub fn all() -> Self { Self::new(ALL_CLASS_NAME, "", "") }

  /// A fresh, empty asset of this class. Assets are compliant until a rules
  /// hook says otherwise.
  pub fn new_asset(&self) -> Asset {
    Asset {
      class:       self.clone(),
      key:         String::new(),
      state:       Document::new(),
      event_in:    None,
      function_in: String::new(),
      txn_id:      String::new(),
      txn_ts:      None,
      event_out:   None,
      alerts:      None,
      compliant:   true,
    }
  }

  /// The world-state key for the asset with identifier `id`.
  pub fn key_for(&self, id: &str) -> String { format!("{}{id}", self.prefix) }

  /// Extract the identifier from an event payload and build the key.
  ///
  /// Returns `None` if the class has no identifier path, or the payload has
  /// no non-empty string at that path.
  pub fn derive_key(&self, payload: &Document) -> Option<String> {
    if self.id_path.is_empty() {
      return None;
    }
    match get_path(payload, &self.id_path)? {
      Value::String(id) if !id.is_empty() => Some(self.key_for(id)),
      _ => None,
    }
  }

  /// Half-open `[start, end)` key range covering this class's namespace.
  pub fn key_range(&self) -> (String, String) {
    (self.prefix.clone(), format!("{}{RANGE_END}", self.prefix))
  }
}

impl fmt::Display for AssetClass {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "CLS={} | PRF={} | ID={}",
      self.name, self.prefix, self.id_path
    )
  }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Read-only map from class name to [`AssetClass`], built once at startup.
#[derive(Debug, Clone)]
pub struct ClassRegistry {
  classes: BTreeMap<String, AssetClass>,
  all:     AssetClass,
}

impl ClassRegistry {
  /// Build a registry, rejecting duplicate names, classes without a prefix
  /// or identifier path, and prefixes that overlap another class's
  /// namespace.
  pub fn new(classes: impl IntoIterator<Item = AssetClass>) -> Result<Self> {
    let mut map: BTreeMap<String, AssetClass> = BTreeMap::new();

    for class in classes {
      if class.name.is_empty() || class.name == ALL_CLASS_NAME {
        return Err(Error::InvalidClass {
          name:   class.name,
          reason: "reserved or empty name".into(),
        });
      }
      if class.prefix.is_empty() {
        return Err(Error::InvalidClass {
          name:   class.name,
          reason: "empty prefix".into(),
        });
      }
      if class.id_path.is_empty() {
        return Err(Error::InvalidClass {
          name:   class.name,
          reason: "empty id path".into(),
        });
      }
      if map.contains_key(&class.name) {
        return Err(Error::DuplicateClass(class.name));
      }
      if let Some(other) = map.values().find(|other| {
        other.prefix.starts_with(&class.prefix)
          || class.prefix.starts_with(&other.prefix)
      }) {
        return Err(Error::OverlappingPrefix {
          first:  other.name.clone(),
          second: class.name,
        });
      }
      map.insert(class.name.clone(), class);
    }

    Ok(Self { classes: map, all: AssetClass::all() })
  }

  /// Look up a class by name. [`ALL_CLASS_NAME`] always resolves.
  pub fn get(&self, name: &str) -> Option<&AssetClass> {
    if name == ALL_CLASS_NAME {
      return Some(&self.all);
    }
    self.classes.get(name)
  }

  /// Registered classes in name order, excluding the class of all assets.
  pub fn classes(&self) -> impl Iterator<Item = &AssetClass> {
    self.classes.values()
  }

  pub fn len(&self) -> usize { self.classes.len() }

  pub fn is_empty(&self) -> bool { self.classes.is_empty() }
}
