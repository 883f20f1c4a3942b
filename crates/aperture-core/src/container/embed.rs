//! Splicing a rebuilt tag directory into image bytes, and the atomic file swap.
//!
//! The rewrite never touches the original path until the new bytes are fully
//! written and synced to `<path>.tmp`; the final step is a same-directory
//! `rename`, so readers see either the old file or the new one.

use exif::{Field, Reader};
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::{Bytes, ImageEXIF};
use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::encode;
use crate::error::{ContainerError, ContainerResult};
use crate::types::MetadataSnapshot;

/// Image containers whose metadata we can rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Jpeg,
    Png,
}

impl ContainerFormat {
    /// Detect the container from the file extension.
    pub fn from_path(path: &Path) -> ContainerResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "jpg" | "jpeg" => Ok(ContainerFormat::Jpeg),
            "png" => Ok(ContainerFormat::Png),
            _ => Err(ContainerError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: if ext.is_empty() { "<none>".into() } else { ext },
            }),
        }
    }
}

/// Sibling temporary path used during the rewrite: `<path>.tmp`.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Rewrite the metadata container of an in-memory image.
///
/// `path` is only used for error context.
pub fn rewrite_container(
    path: &Path,
    format: ContainerFormat,
    bytes: Vec<u8>,
    snapshot: &MetadataSnapshot,
) -> ContainerResult<Vec<u8>> {
    let decode_err = |e: img_parts::Error| ContainerError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    match format {
        ContainerFormat::Jpeg => {
            let mut jpeg = Jpeg::from_bytes(Bytes::from(bytes)).map_err(decode_err)?;
            let tiff = rebuild_directory(path, jpeg.exif(), snapshot)?;
            jpeg.set_exif(Some(Bytes::from(tiff)));
            Ok(jpeg.encoder().bytes().to_vec())
        }
        ContainerFormat::Png => {
            let mut png = Png::from_bytes(Bytes::from(bytes)).map_err(decode_err)?;
            let tiff = rebuild_directory(path, png.exif(), snapshot)?;
            png.set_exif(Some(Bytes::from(tiff)));
            Ok(png.encoder().bytes().to_vec())
        }
    }
}

/// Decode the existing directory (if any), merge in the snapshot, re-encode.
fn rebuild_directory(
    path: &Path,
    existing: Option<Bytes>,
    snapshot: &MetadataSnapshot,
) -> ContainerResult<Vec<u8>> {
    let existing_fields: Vec<Field> = match existing {
        Some(raw) => {
            let exif = Reader::new()
                .read_raw(raw.to_vec())
                .map_err(|e| ContainerError::Decode {
                    path: path.to_path_buf(),
                    message: format!("existing EXIF unreadable: {e}"),
                })?;
            exif.fields()
                .map(|f| Field {
                    tag: f.tag,
                    ifd_num: f.ifd_num,
                    value: f.value.clone(),
                })
                .collect()
        }
        None => Vec::new(),
    };

    let fresh = encode::snapshot_fields(snapshot).map_err(|e| ContainerError::Encode {
        path: path.to_path_buf(),
        message: format!("application block: {e}"),
    })?;
    let merged = encode::merge_fields(existing_fields, fresh, snapshot.location.is_none());

    encode::encode_tiff(&merged).map_err(|e| ContainerError::Encode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Embed a snapshot into the file at `path`, replacing it atomically.
///
/// On any failure the temporary file is removed and the original is left
/// byte-for-byte untouched.
pub fn embed_snapshot(path: &Path, snapshot: &MetadataSnapshot) -> ContainerResult<()> {
    embed_with_commit(path, snapshot, |tmp, path| std::fs::rename(tmp, path))
}

/// `embed_snapshot` with the final `tmp -> path` swap supplied by the caller.
fn embed_with_commit<F>(
    path: &Path,
    snapshot: &MetadataSnapshot,
    commit: F,
) -> ContainerResult<()>
where
    F: FnOnce(&Path, &Path) -> std::io::Result<()>,
{
    let format = ContainerFormat::from_path(path)?;
    let tmp = temp_path(path);

    let result = replace_via_temp(path, &tmp, format, snapshot, commit);
    if result.is_err() {
        remove_temp(path);
    }
    result
}

fn replace_via_temp<F>(
    path: &Path,
    tmp: &Path,
    format: ContainerFormat,
    snapshot: &MetadataSnapshot,
    commit: F,
) -> ContainerResult<()>
where
    F: FnOnce(&Path, &Path) -> std::io::Result<()>,
{
    std::fs::copy(path, tmp).map_err(|e| ContainerError::io(tmp, e))?;
    let bytes = std::fs::read(tmp).map_err(|e| ContainerError::io(tmp, e))?;

    let rewritten = rewrite_container(path, format, bytes, snapshot)?;

    let mut file = File::create(tmp).map_err(|e| ContainerError::io(tmp, e))?;
    file.write_all(&rewritten)
        .and_then(|_| file.sync_all())
        .map_err(|e| ContainerError::io(tmp, e))?;
    drop(file);

    commit(tmp, path).map_err(|e| ContainerError::io(path, e))
}

/// Best-effort removal of `<path>.tmp`.
pub(crate) fn remove_temp(path: &Path) {
    let tmp = temp_path(path);
    if !tmp.is_file() {
        return;
    }
    if let Err(e) = std::fs::remove_file(&tmp) {
        tracing::warn!("Failed to remove temporary file {:?}: {}", tmp, e);
    }
}
