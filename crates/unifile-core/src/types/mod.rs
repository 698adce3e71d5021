//! Shared domain types.

pub mod batch;
pub mod file;
pub mod id;
pub mod progress;
pub mod task;

pub use batch::{BatchFailure, BatchOperationResult};
pub use file::{
    AccessKind, CdnType, DEFAULT_MIME_TYPE, DerivedArtifact, FileMetadata, Permission,
    ProcessingOptions, StorageType, UploadFileInfo,
};
pub use id::{FileId, TaskId};
pub use progress::{UploadProgress, UploadStatus};
pub use task::ProcessingTask;
