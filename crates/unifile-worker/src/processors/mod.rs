//! Built-in post-upload processors.

pub mod audio;
pub mod thumbnail;

pub use self::audio::AudioProcessor;
pub use self::thumbnail::ImageProcessor;
