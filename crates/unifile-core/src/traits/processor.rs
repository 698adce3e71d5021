//! Post-upload processor trait.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;
use crate::types::ProcessingOptions;

/// Output of one processor run.
#[derive(Debug, Clone)]
pub struct ProcessedOutput {
    pub data: Bytes,
    pub mime_type: String,
    /// Processor-specific details stored with the derived artifact.
    pub details: serde_json::Value,
}

/// Transforms a stored object into a derived artifact.
#[async_trait]
pub trait FileProcessor: Send + Sync + std::fmt::Debug + 'static {
    /// Stable processor name, e.g. `"image"`.
    fn processor_type(&self) -> &str;

    /// Whether this processor can handle the given MIME type.
    fn supports(&self, mime_type: &str) -> bool;

    /// Extension (with leading dot) of the artifact for these options.
    fn output_extension(&self, options: &ProcessingOptions) -> String;

    /// One-time setup.
    async fn initialize(&self) -> AppResult<()> {
        Ok(())
    }

    /// Run the transformation. Failures are `Processing` errors.
    async fn process(&self, input: Bytes, options: &ProcessingOptions) -> AppResult<ProcessedOutput>;
}
