//! Storage path derivation.
//!
//! Objects live at `{module_id}/{yyyy}/{mm}/{dd}/{file_id}{ext}`, which
//! bounds per-directory object counts and lets lifecycle rules target
//! whole days.

use chrono::{DateTime, Datelike, Utc};

use unifile_core::types::FileId;

/// Lower-cased extension of a file name including the dot, or empty.
pub fn extension_of(file_name: &str) -> String {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            format!(".{}", ext.to_lowercase())
        }
        _ => String::new(),
    }
}

/// `{file_id}{extension}`.
pub fn storage_name(file_id: FileId, extension: &str) -> String {
    format!("{file_id}{extension}")
}

/// Date-partitioned object key for an upload.
pub fn storage_path(module_id: &str, at: DateTime<Utc>, storage_name: &str) -> String {
    let module = sanitize_segment(module_id);
    format!(
        "{module}/{:04}/{:02}/{:02}/{storage_name}",
        at.year(),
        at.month(),
        at.day()
    )
}

/// Key of a processor output next to its source:
/// `{path without extension}_processed{ext}`.
pub fn processed_output_path(storage_path: &str, output_extension: &str) -> String {
    let (dir, file) = match storage_path.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, storage_path),
    };
    let stem = match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file,
    };
    match dir {
        Some(dir) => format!("{dir}/{stem}_processed{output_extension}"),
        None => format!("{stem}_processed{output_extension}"),
    }
}

/// Keep module ids from escaping their directory.
fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match cleaned.trim_matches('.') {
        "" => "default".to_string(),
        s => s.to_string(),
    }
}
