//! Image thumbnail processor.

use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use serde_json::json;

use unifile_core::config::ProcessingConfig;
use unifile_core::error::{AppError, ErrorKind};
use unifile_core::result::AppResult;
use unifile_core::traits::{FileProcessor, ProcessedOutput};
use unifile_core::types::ProcessingOptions;

/// Thumbnail encodings the processor can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    fn parse(format: Option<&str>) -> Option<Self> {
        match format.map(str::to_ascii_lowercase).as_deref() {
            None | Some("jpeg") | Some("jpg") => Some(Self::Jpeg),
            Some("png") => Some(Self::Png),
            Some("webp") => Some(Self::WebP),
            Some(_) => None,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => ".jpg",
            Self::Png => ".png",
            Self::WebP => ".webp",
        }
    }

    fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }
}

/// Generates a thumbnail that fits a square bounding box, keeping the
/// aspect ratio.
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    default_size: u32,
    default_quality: u8,
}

impl ImageProcessor {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            default_size: config.default_thumbnail_size,
            default_quality: config.jpeg_quality,
        }
    }

    fn render(
        data: &[u8],
        size: u32,
        format: OutputFormat,
        quality: u8,
    ) -> AppResult<(Vec<u8>, serde_json::Value)> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| AppError::with_source(ErrorKind::Processing, "Failed to read image", e))?;
        let source_format = reader.format().map(|f| format!("{f:?}").to_lowercase());
        let img = reader.decode().map_err(|e| {
            AppError::with_source(ErrorKind::Processing, format!("Failed to decode image: {e}"), e)
        })?;

        let (source_width, source_height) = img.dimensions();
        let thumb = img.thumbnail(size, size);
        let mut out = Cursor::new(Vec::new());
        let written = match format {
            OutputFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut out, quality);
                DynamicImage::ImageRgb8(thumb.to_rgb8()).write_with_encoder(encoder)
            }
            OutputFormat::Png => {
                DynamicImage::ImageRgba8(thumb.to_rgba8()).write_to(&mut out, ImageFormat::Png)
            }
            OutputFormat::WebP => {
                DynamicImage::ImageRgba8(thumb.to_rgba8()).write_to(&mut out, ImageFormat::WebP)
            }
        };
        written.map_err(|e| {
            AppError::with_source(ErrorKind::Processing, format!("Failed to encode thumbnail: {e}"), e)
        })?;

        let details = json!({
            "width": thumb.width(),
            "height": thumb.height(),
            "source_width": source_width,
            "source_height": source_height,
            "source_format": source_format,
            "format": format.mime_type(),
        });
        Ok((out.into_inner(), details))
    }
}

#[async_trait]
impl FileProcessor for ImageProcessor {
    fn processor_type(&self) -> &str {
        "image"
    }

    fn supports(&self, mime_type: &str) -> bool {
        matches!(
            mime_type,
            "image/jpeg" | "image/png" | "image/gif" | "image/webp" | "image/bmp" | "image/tiff"
        )
    }

    fn output_extension(&self, options: &ProcessingOptions) -> String {
        OutputFormat::parse(options.format.as_deref())
            .unwrap_or(OutputFormat::Jpeg)
            .extension()
            .to_string()
    }

    async fn process(&self, input: Bytes, options: &ProcessingOptions) -> AppResult<ProcessedOutput> {
        if input.is_empty() {
            return Err(AppError::processing("Empty image data"));
        }
        let format = OutputFormat::parse(options.format.as_deref()).ok_or_else(|| {
            AppError::processing(format!(
                "Unsupported thumbnail format '{}'",
                options.format.as_deref().unwrap_or_default()
            ))
        })?;
        let size = options.thumbnail_size.unwrap_or(self.default_size).max(1);
        let quality = options.quality.unwrap_or(self.default_quality).clamp(1, 100);

        let (data, details) =
            tokio::task::spawn_blocking(move || Self::render(&input, size, format, quality))
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Internal, "Thumbnail task panicked", e)
                })??;

        tracing::debug!(size, bytes = data.len(), "Generated thumbnail");

        Ok(ProcessedOutput {
            data: Bytes::from(data),
            mime_type: format.mime_type().to_string(),
            details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png(width: u32, height: u32) -> Bytes {
        let img = RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        Bytes::from(buffer.into_inner())
    }

    #[tokio::test]
    async fn test_thumbnail_keeps_aspect_ratio() {
        let processor = ImageProcessor::new(&ProcessingConfig::default());
        let opts = ProcessingOptions {
            thumbnail_size: Some(32),
            ..Default::default()
        };
        let out = processor.process(png(100, 50), &opts).await.unwrap();

        assert_eq!(out.mime_type, "image/jpeg");
        assert_eq!(out.details["width"], 32);
        assert_eq!(out.details["height"], 16);
        assert_eq!(out.details["source_width"], 100);

        let decoded = image::load_from_memory(&out.data).unwrap();
        assert_eq!(decoded.dimensions(), (32, 16));
    }

    #[tokio::test]
    async fn test_png_output() {
        let processor = ImageProcessor::new(&ProcessingConfig::default());
        let opts = ProcessingOptions {
            format: Some("png".into()),
            ..Default::default()
        };
        assert_eq!(processor.output_extension(&opts), ".png");
        let out = processor.process(png(10, 10), &opts).await.unwrap();
        assert_eq!(out.mime_type, "image/png");
        assert_eq!(
            image::guess_format(&out.data).unwrap(),
            ImageFormat::Png
        );
    }

    #[tokio::test]
    async fn test_garbage_input_is_processing_error() {
        let processor = ImageProcessor::new(&ProcessingConfig::default());
        let err = processor
            .process(Bytes::from_static(b"not an image"), &ProcessingOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Processing);
    }

    #[test]
    fn test_supports() {
        let processor = ImageProcessor::new(&ProcessingConfig::default());
        assert!(processor.supports("image/png"));
        assert!(!processor.supports("image/svg+xml"));
        assert!(!processor.supports("audio/mpeg"));
    }
}
