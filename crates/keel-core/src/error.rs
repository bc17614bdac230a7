//! Error types for `keel-core`.

use std::fmt;

use strum::{AsRefStr, Display};
use thiserror::Error;

use crate::path::PathError;

/// A boxed error from an external collaborator (store or rules hook).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The engine operation that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum Operation {
  #[strum(serialize = "CreateAsset")]
  Create,
  #[strum(serialize = "UpdateAsset")]
  Update,
  #[strum(serialize = "DeletePropertiesFromAsset")]
  DeleteProperties,
  #[strum(serialize = "ReadAsset")]
  Read,
  #[strum(serialize = "ReadAllAssets")]
  ReadAll,
}

/// Where an error happened: enough for a caller to log and decide on retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
  pub operation: Operation,
  pub class:     String,
  /// Unknown until the key has been derived.
  pub key:       Option<String>,
}

impl ErrorContext {
  pub fn new(operation: Operation, class: impl Into<String>) -> Self {
    Self { operation, class: class.into(), key: None }
  }
}

impl fmt::Display for ErrorContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} for class {}", self.operation, self.class)?;
    if let Some(key) = &self.key {
      write!(f, " asset {key}")?;
    }
    Ok(())
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{ctx}: malformed request: {reason}")]
  MalformedRequest { ctx: ErrorContext, reason: String },

  #[error("{ctx}: asset already exists")]
  AlreadyExists { ctx: ErrorContext },

  #[error("{ctx}: asset does not exist")]
  NotFound { ctx: ErrorContext },

  #[error("{ctx}: serialization failed: {source}")]
  Serialization {
    ctx:    ErrorContext,
    #[source]
    source: serde_json::Error,
  },

  #[error("{ctx}: stored asset carries key {stored:?}")]
  KeyMismatch { ctx: ErrorContext, stored: String },

  #[error("{ctx}: failed to inject property {path:?}: {source}")]
  Injection {
    ctx:    ErrorContext,
    path:   String,
    #[source]
    source: PathError,
  },

  #[error("{ctx}: rules evaluation failed: {source}")]
  Rules {
    ctx:    ErrorContext,
    #[source]
    source: BoxError,
  },

  #[error("{ctx}: world state error: {source}")]
  Storage {
    ctx:    ErrorContext,
    #[source]
    source: BoxError,
  },

  #[error("{operation}: unknown asset class {name:?}")]
  UnknownClass { operation: Operation, name: String },

  #[error("asset class {0:?} is registered twice")]
  DuplicateClass(String),

  #[error("asset class {second:?} has a prefix overlapping class {first:?}")]
  OverlappingPrefix { first: String, second: String },

  #[error("asset class {name:?} is invalid: {reason}")]
  InvalidClass { name: String, reason: String },
}

impl Error {
  /// The operation context, for errors raised by an engine operation.
  pub fn context(&self) -> Option<&ErrorContext> {
    match self {
      Self::MalformedRequest { ctx, .. }
      | Self::AlreadyExists { ctx }
      | Self::NotFound { ctx }
      | Self::Serialization { ctx, .. }
      | Self::KeyMismatch { ctx, .. }
      | Self::Injection { ctx, .. }
      | Self::Rules { ctx, .. }
      | Self::Storage { ctx, .. } => Some(ctx),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn messages_carry_context() {
    let mut ctx = ErrorContext::new(Operation::Update, "thermostat");
    let err = Error::NotFound { ctx: ctx.clone() };
    assert_eq!(err.to_string(), "UpdateAsset for class thermostat: asset does not exist");

    ctx.key = Some("THERMT1".into());
    let err = Error::AlreadyExists { ctx };
    assert_eq!(
      err.to_string(),
      "UpdateAsset for class thermostat asset THERMT1: asset already exists"
    );
    assert_eq!(err.context().and_then(|c| c.key.as_deref()), Some("THERMT1"));
  }

  #[test]
  fn registry_errors_have_no_context() {
    assert!(Error::DuplicateClass("x".into()).context().is_none());
  }
}
