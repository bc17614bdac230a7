//! Core types and the update engine for the Keel asset store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::WorldState`]; rule engines implement
//! [`store::RulesHook`]. Everything else depends on the abstractions here.

pub mod asset;
pub mod class;
pub mod document;
pub mod engine;
pub mod error;
pub mod filter;
pub mod memory;
pub mod path;
pub mod store;

pub use error::{Error, Result};
