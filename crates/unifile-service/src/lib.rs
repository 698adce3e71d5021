//! # unifile-service
//!
//! The file lifecycle engine. [`FileService`] validates and stores uploads,
//! serves downloads and access URLs behind the [`AccessController`],
//! soft-deletes files, hands post-upload work to the processing worker and
//! reports every step on the [`EventBus`].
//!
//! All collaborators live in one explicitly built [`ServiceContext`], so
//! several isolated engines can run in the same process.

pub mod access;
pub mod context;
pub mod events;
pub mod file;
pub mod progress;
pub mod store;

pub use access::AccessController;
pub use context::{ServiceContext, ServiceContextBuilder};
pub use events::{EventBus, ListenerId};
pub use file::{FileService, HealthReport};
pub use progress::{ProgressCallback, ProgressTracker};
pub use store::{InMemoryMetadataStore, ModuleUsage};
