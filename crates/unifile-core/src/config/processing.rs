//! Post-upload processing configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Processing queue and processor defaults.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Whether uploads may request processing at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum number of tasks waiting in the queue.
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1, max = 100000))]
    pub queue_capacity: usize,
    /// Default thumbnail edge length in pixels.
    #[serde(default = "default_thumbnail_size")]
    #[validate(range(min = 16, max = 4096))]
    pub default_thumbnail_size: u32,
    /// Default JPEG quality for generated thumbnails.
    #[serde(default = "default_jpeg_quality")]
    #[validate(range(min = 1, max = 100))]
    pub jpeg_quality: u8,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_capacity: default_queue_capacity(),
            default_thumbnail_size: default_thumbnail_size(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    100
}

fn default_thumbnail_size() -> u32 {
    256
}

fn default_jpeg_quality() -> u8 {
    80
}
