//! Processor registry: dispatches by processor type name or MIME type.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use unifile_core::error::AppError;
use unifile_core::result::AppResult;
use unifile_core::traits::FileProcessor;
use unifile_core::types::ProcessingOptions;

/// Registered processors in registration order.
#[derive(Debug, Clone, Default)]
pub struct ProcessorRegistry {
    processors: Arc<RwLock<Vec<Arc<dyn FileProcessor>>>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a processor, replacing one with the same type name.
    pub async fn register(&self, processor: Arc<dyn FileProcessor>) {
        let processor_type = processor.processor_type().to_string();
        let mut processors = self.processors.write().await;
        processors.retain(|p| p.processor_type() != processor_type);
        processors.push(processor);
        info!(processor = %processor_type, "Registered processor");
    }

    /// Processor registered under `processor_type`.
    pub async fn get(&self, processor_type: &str) -> Option<Arc<dyn FileProcessor>> {
        self.processors
            .read()
            .await
            .iter()
            .find(|p| p.processor_type() == processor_type)
            .cloned()
    }

    /// First processor that supports `mime_type`.
    pub async fn processor_for_mime(&self, mime_type: &str) -> Option<Arc<dyn FileProcessor>> {
        self.processors
            .read()
            .await
            .iter()
            .find(|p| p.supports(mime_type))
            .cloned()
    }

    /// Pick the processor for a request: by name when the options give one,
    /// otherwise by MIME type.
    pub async fn resolve(
        &self,
        options: &ProcessingOptions,
        mime_type: &str,
    ) -> AppResult<Arc<dyn FileProcessor>> {
        match options.processor.as_deref() {
            Some(name) => {
                let processor = self.get(name).await.ok_or_else(|| {
                    AppError::validation(format!("Unknown processor '{name}'"))
                })?;
                if !processor.supports(mime_type) {
                    return Err(AppError::validation(format!(
                        "Processor '{name}' does not support '{mime_type}'"
                    )));
                }
                Ok(processor)
            }
            None => self.processor_for_mime(mime_type).await.ok_or_else(|| {
                AppError::validation(format!("No processor supports '{mime_type}'"))
            }),
        }
    }

    /// Initialize every registered processor.
    pub async fn initialize_all(&self) -> AppResult<()> {
        let processors: Vec<_> = self.processors.read().await.clone();
        for processor in processors {
            processor.initialize().await?;
        }
        Ok(())
    }

    /// Type names of the registered processors.
    pub async fn list_types(&self) -> Vec<String> {
        self.processors
            .read()
            .await
            .iter()
            .map(|p| p.processor_type().to_string())
            .collect()
    }
}
