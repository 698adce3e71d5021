//! Audio probe processor.
//!
//! Identifies the container from its magic bytes and, for WAV and FLAC,
//! reads the stream parameters from the header. The report is stored as a
//! JSON sidecar next to the original.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Value, json};

use unifile_core::error::AppError;
use unifile_core::result::AppResult;
use unifile_core::traits::{FileProcessor, ProcessedOutput};
use unifile_core::types::ProcessingOptions;

#[derive(Debug, Clone, Copy, Default)]
pub struct AudioProcessor;

impl AudioProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Build the probe report for `data`.
    pub fn probe(data: &[u8]) -> AppResult<Value> {
        let mut report = if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE" {
            probe_wav(data)?
        } else if data.starts_with(b"fLaC") {
            probe_flac(data)?
        } else if data.starts_with(b"OggS") {
            json!({ "container": "ogg" })
        } else if data.starts_with(b"ID3") {
            json!({ "container": "mp3", "id3": true })
        } else if data.len() >= 2 && data[0] == 0xFF && data[1] & 0xE0 == 0xE0 {
            json!({ "container": "mp3", "id3": false })
        } else if data.len() >= 8 && &data[4..8] == b"ftyp" {
            json!({ "container": "mp4" })
        } else {
            return Err(AppError::processing("Unrecognized audio container"));
        };

        report["size_bytes"] = json!(data.len());
        Ok(report)
    }
}

fn u16_le(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn u32_le(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn probe_wav(data: &[u8]) -> AppResult<Value> {
    let mut offset = 12;
    let mut format: Option<(u16, u32, u32, u16)> = None;
    let mut data_len: Option<u32> = None;

    while offset + 8 <= data.len() {
        let id = &data[offset..offset + 4];
        let len = u32_le(data, offset + 4);
        let body = offset + 8;
        if id == b"fmt " && body + 16 <= data.len() {
            format = Some((
                u16_le(data, body + 2),
                u32_le(data, body + 4),
                u32_le(data, body + 8),
                u16_le(data, body + 14),
            ));
        } else if id == b"data" {
            data_len = Some(len);
            break;
        }
        // Chunks are word aligned.
        offset = body + len as usize + (len as usize & 1);
    }

    let (channels, sample_rate, byte_rate, bits) =
        format.ok_or_else(|| AppError::processing("WAV file has no fmt chunk"))?;
    let duration = match (data_len, byte_rate) {
        (Some(len), rate) if rate > 0 => Some(f64::from(len) / f64::from(rate)),
        _ => None,
    };

    Ok(json!({
        "container": "wav",
        "channels": channels,
        "sample_rate": sample_rate,
        "bits_per_sample": bits,
        "duration_seconds": duration,
    }))
}

fn probe_flac(data: &[u8]) -> AppResult<Value> {
    // STREAMINFO is always the first metadata block.
    if data.len() < 42 || data[4] & 0x7F != 0 {
        return Err(AppError::processing("FLAC file has no STREAMINFO block"));
    }
    let info = &data[8..42];
    let sample_rate =
        (u32::from(info[10]) << 12) | (u32::from(info[11]) << 4) | (u32::from(info[12]) >> 4);
    let channels = ((info[12] >> 1) & 0x07) + 1;
    let bits = (((info[12] & 0x01) << 4) | (info[13] >> 4)) + 1;
    let total_samples = (u64::from(info[13] & 0x0F) << 32)
        | u64::from(u32::from_be_bytes([info[14], info[15], info[16], info[17]]));
    let duration = (sample_rate > 0 && total_samples > 0)
        .then(|| total_samples as f64 / f64::from(sample_rate));

    Ok(json!({
        "container": "flac",
        "channels": channels,
        "sample_rate": sample_rate,
        "bits_per_sample": bits,
        "duration_seconds": duration,
    }))
}

#[async_trait]
impl FileProcessor for AudioProcessor {
    fn processor_type(&self) -> &str {
        "audio"
    }

    fn supports(&self, mime_type: &str) -> bool {
        mime_type.starts_with("audio/")
    }

    fn output_extension(&self, _options: &ProcessingOptions) -> String {
        ".json".to_string()
    }

    async fn process(&self, input: Bytes, _options: &ProcessingOptions) -> AppResult<ProcessedOutput> {
        let report = Self::probe(&input)?;
        let data = serde_json::to_vec_pretty(&report)?;
        Ok(ProcessedOutput {
            data: Bytes::from(data),
            mime_type: "application/json".to_string(),
            details: report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unifile_core::error::ErrorKind;

    fn wav(channels: u16, sample_rate: u32, bits: u16, data_len: u32) -> Vec<u8> {
        let byte_rate = sample_rate * u32::from(channels) * u32::from(bits) / 8;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&(channels * bits / 8).to_le_bytes());
        out.extend_from_slice(&bits.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        out.resize(out.len() + data_len as usize, 0);
        out
    }

    #[test]
    fn test_probe_wav() {
        let report = AudioProcessor::probe(&wav(1, 8000, 16, 16000)).unwrap();
        assert_eq!(report["container"], "wav");
        assert_eq!(report["channels"], 1);
        assert_eq!(report["sample_rate"], 8000);
        assert_eq!(report["bits_per_sample"], 16);
        assert_eq!(report["duration_seconds"], 1.0);
    }

    #[test]
    fn test_probe_flac_streaminfo() {
        let mut data = b"fLaC".to_vec();
        data.extend_from_slice(&[0x80, 0x00, 0x00, 34]);
        let mut info = [0u8; 34];
        // 44100 Hz, 2 channels, 16 bits, 44100 samples.
        info[10] = 0x0A;
        info[11] = 0xC4;
        info[12] = 0x42;
        info[13] = 0xF0;
        info[14..18].copy_from_slice(&44100u32.to_be_bytes());
        data.extend_from_slice(&info);

        let report = AudioProcessor::probe(&data).unwrap();
        assert_eq!(report["container"], "flac");
        assert_eq!(report["sample_rate"], 44100);
        assert_eq!(report["channels"], 2);
        assert_eq!(report["bits_per_sample"], 16);
        assert_eq!(report["duration_seconds"], 1.0);
    }

    #[test]
    fn test_probe_signatures() {
        assert_eq!(AudioProcessor::probe(b"ID3\x03\x00\x00\x00").unwrap()["container"], "mp3");
        assert_eq!(AudioProcessor::probe(b"OggS\x00\x00").unwrap()["container"], "ogg");
        let err = AudioProcessor::probe(b"hello world").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Processing);
    }

    #[tokio::test]
    async fn test_process_writes_json_sidecar() {
        let out = AudioProcessor::new()
            .process(Bytes::from(wav(2, 44100, 16, 4)), &ProcessingOptions::default())
            .await
            .unwrap();
        assert_eq!(out.mime_type, "application/json");
        let parsed: Value = serde_json::from_slice(&out.data).unwrap();
        assert_eq!(parsed["channels"], 2);
    }
}
