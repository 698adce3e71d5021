//! Convenience result type alias for Unifile.

use crate::error::AppError;

/// A specialized `Result` type for Unifile operations.
pub type AppResult<T> = Result<T, AppError>;
