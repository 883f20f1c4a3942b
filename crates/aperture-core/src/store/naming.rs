//! Capture filename generation and parsing.
//!
//! Generated names look like `IMG_20240601_103000_123456.jpg`: prefix, local
//! date, local time, microseconds.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Timelike, Utc};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};

use crate::types::MediaType;

pub const PHOTO_PREFIX: &str = "IMG";
pub const VIDEO_PREFIX: &str = "VID";

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
/// `YYYYMMDD_HHMMSS`
const STAMP_LEN: usize = 15;
const MICROS_LEN: usize = 6;

/// Attempts at a random suffix before giving up on uniqueness.
const MAX_SUFFIX_ATTEMPTS: usize = 16;

/// Build a filename for a capture taken at `at`.
pub fn generate_file_name(prefix: &str, extension: &str, at: DateTime<Local>) -> String {
    format!(
        "{prefix}_{}_{:06}.{extension}",
        at.format(STAMP_FORMAT),
        at.nanosecond() % 1_000_000_000 / 1_000
    )
}

/// Recover the capture time from a generated filename.
///
/// Trailing collision suffixes are ignored. Returns `None` for names that do
/// not follow the pattern, or whose local time is ambiguous.
pub fn parse_captured_at(file_name: &str) -> Option<DateTime<Utc>> {
    let stem = Path::new(file_name).file_stem()?.to_str()?;
    let rest = stem
        .strip_prefix(PHOTO_PREFIX)
        .or_else(|| stem.strip_prefix(VIDEO_PREFIX))?
        .strip_prefix('_')?;

    let stamp = rest.get(..STAMP_LEN)?;
    let micros = rest
        .get(STAMP_LEN..STAMP_LEN + 1 + MICROS_LEN)?
        .strip_prefix('_')?;
    if !micros.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let micros: u32 = micros.parse().ok()?;

    let naive = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT)
        .ok()?
        .with_nanosecond(micros * 1_000)?;
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

/// Lowercase extension of `path` if `media_type` keeps it, else its default.
///
/// Capture temp files (`capture_123.tmp`) therefore land as `.jpg`/`.mp4`.
pub fn extension_for(path: &Path, media_type: MediaType) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .and_then(|ext| {
            media_type
                .extensions()
                .iter()
                .copied()
                .find(|known| *known == ext)
        })
        .unwrap_or_else(|| media_type.default_extension())
}

/// Reduce a caller-supplied name to a bare, visible filename of `media_type`.
///
/// A trailing `.tmp` is dropped, and the default extension is appended when
/// the remaining name has none the store keeps.
pub fn sanitize_file_name(name: &str, media_type: MediaType) -> Option<String> {
    let name = Path::new(name).file_name()?.to_str()?.trim();
    let name = strip_suffix_ignore_case(name, ".tmp").unwrap_or(name);
    if name.is_empty() || name.starts_with('.') {
        return None;
    }

    let kept = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| media_type.extensions().contains(&ext.to_ascii_lowercase().as_str()));
    if kept {
        Some(name.to_string())
    } else {
        Some(format!("{name}.{}", media_type.default_extension()))
    }
}

fn strip_suffix_ignore_case<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    let split = name.len().checked_sub(suffix.len())?;
    let tail = name.get(split..)?;
    tail.eq_ignore_ascii_case(suffix).then(|| &name[..split])
}

/// Create `dir/name` exclusively, or a sibling with a random hex suffix if
/// that name is taken.
///
/// The returned handle is the only one that created the file; an existing
/// file is never opened or truncated.
pub async fn claim_path(dir: &Path, name: &str) -> io::Result<(PathBuf, File)> {
    let path = Path::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
    let extension = path.extension().and_then(|e| e.to_str());

    let mut candidate = dir.join(name);
    for _ in 0..=MAX_SUFFIX_ATTEMPTS {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let suffix: u16 = rand::random();
                let file_name = match extension {
                    Some(ext) => format!("{stem}_{suffix:04x}.{ext}"),
                    None => format!("{stem}_{suffix:04x}"),
                };
                candidate = dir.join(file_name);
            }
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free name for {name} in {}", dir.display()),
    ))
}
