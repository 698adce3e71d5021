//! Part planning for chunked transfers.
//!
//! A payload above a provider's multipart threshold is split into
//! fixed-size parts (the last one shorter) that the provider writes with
//! bounded parallelism.

use bytes::Bytes;
use uuid::Uuid;

/// Directory under the local root that holds in-flight parts.
pub const CHUNK_ROOT: &str = "_chunks";

/// One part of a chunked transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartRange {
    /// 1-based part number.
    pub number: u32,
    /// Byte offset within the payload.
    pub offset: u64,
    /// Length in bytes.
    pub len: u64,
}

impl PartRange {
    /// Zero-copy slice of the payload covered by this part.
    pub fn slice(&self, data: &Bytes) -> Bytes {
        let start = self.offset as usize;
        data.slice(start..start + self.len as usize)
    }
}

/// Split `total` bytes into parts of at most `part_size` bytes.
pub fn plan_parts(total: u64, part_size: u64) -> Vec<PartRange> {
    let part_size = part_size.max(1);
    let mut parts = Vec::with_capacity(total.div_ceil(part_size) as usize);
    let mut offset = 0u64;
    let mut number = 1u32;
    while offset < total {
        let len = part_size.min(total - offset);
        parts.push(PartRange {
            number,
            offset,
            len,
        });
        offset += len;
        number += 1;
    }
    parts
}

/// Temporary path of one part of a local chunked write.
pub fn chunk_path(upload_id: Uuid, part_number: u32) -> String {
    format!("{CHUNK_ROOT}/{upload_id}/{part_number:06}")
}

/// Temporary directory of a local chunked write.
pub fn upload_dir(upload_id: Uuid) -> String {
    format!("{CHUNK_ROOT}/{upload_id}")
}
