//! Batch operation results.

use serde::{Deserialize, Serialize};

use super::id::FileId;
use crate::error::ErrorKind;

/// Outcome of a batch operation over several files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOperationResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub failures: Vec<BatchFailure>,
}

/// One failed item of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub file_id: FileId,
    pub kind: ErrorKind,
    pub error: String,
}
