//! # unifile-core
//!
//! Core crate for Unifile. Contains the provider, processor, metadata,
//! cache and queue traits, configuration schemas, typed identifiers,
//! file lifecycle events, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Unifile crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
