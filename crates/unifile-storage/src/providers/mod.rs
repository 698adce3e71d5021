//! Storage provider implementations.

pub mod local;
#[cfg(feature = "object-storage")]
pub mod object;
