//! # unifile-worker
//!
//! Post-upload processing for Unifile: a bounded in-process task queue, a
//! single worker that drains it strictly sequentially, and the processors
//! it dispatches to.

pub mod observer;
pub mod processors;
pub mod queue;
pub mod registry;
pub mod worker;

pub use observer::ProcessingObserver;
pub use processors::{AudioProcessor, ImageProcessor};
pub use queue::InMemoryTaskQueue;
pub use registry::ProcessorRegistry;
pub use worker::ProcessingWorker;
