//! Discovery of persisted captures in the storage directory.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::naming::parse_captured_at;
use crate::types::{MediaItem, MediaType};

/// Lists captures directly under a storage root.
#[derive(Debug, Clone)]
pub struct MediaDiscovery {
    thumbnail_dir: String,
}

impl MediaDiscovery {
    pub fn new(thumbnail_dir: impl Into<String>) -> Self {
        Self {
            thumbnail_dir: thumbnail_dir.into(),
        }
    }

    /// Every recognizable capture in `dir`, newest first.
    ///
    /// Only top-level regular files are considered. Hidden files, temp
    /// leftovers from interrupted writes and unknown extensions are skipped.
    pub fn discover(&self, dir: &Path) -> Vec<MediaItem> {
        let mut items: Vec<MediaItem> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| self.parse(dir, entry.path(), entry.metadata().ok()?))
            .collect();

        items.sort_by(|a, b| {
            b.captured_at
                .cmp(&a.captured_at)
                .then_with(|| a.path.cmp(&b.path))
        });
        items
    }

    /// Where the thumbnail for `path` would live.
    pub fn thumbnail_path(&self, dir: &Path, path: &Path) -> Option<PathBuf> {
        let stem = path.file_stem()?;
        let mut name = stem.to_os_string();
        name.push(".jpg");
        Some(dir.join(&self.thumbnail_dir).join(name))
    }

    fn parse(&self, dir: &Path, path: &Path, metadata: std::fs::Metadata) -> Option<MediaItem> {
        let file_name = path.file_name()?.to_str()?;
        if file_name.starts_with('.') || is_temp_leftover(path) {
            return None;
        }

        let extension = path.extension()?.to_str()?;
        let media_type = MediaType::from_extension(extension)?;

        let captured_at = parse_captured_at(file_name).or_else(|| {
            metadata
                .modified()
                .ok()
                .map(DateTime::<Utc>::from)
        })?;

        let thumbnail_path = self
            .thumbnail_path(dir, path)
            .filter(|thumbnail| thumbnail.is_file());

        Some(MediaItem {
            path: path.to_path_buf(),
            media_type,
            captured_at,
            thumbnail_path,
            duration_ms: None,
            file_size: metadata.len(),
        })
    }
}

fn is_temp_leftover(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "tmp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_discover_sorts_newest_first() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "IMG_20240101_090000_000000.jpg", b"old");
        write(dir.path(), "IMG_20240601_090000_000000.jpg", b"new");
        write(dir.path(), "VID_20240301_090000_000000.mp4", b"middle");

        let items = MediaDiscovery::new(".thumbnails").discover(dir.path());
        let names: Vec<&str> = items.iter().map(|i| i.file_name()).collect();
        assert_eq!(
            names,
            vec![
                "IMG_20240601_090000_000000.jpg",
                "VID_20240301_090000_000000.mp4",
                "IMG_20240101_090000_000000.jpg",
            ]
        );
        assert_eq!(items[1].media_type, MediaType::Video);
        assert_eq!(items[0].file_size, 3);
    }

    #[test]
    fn test_discover_skips_unrecognized_entries() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "IMG_20240601_090000_000000.jpg", b"keep");
        write(dir.path(), "IMG_20240601_090000_000000.jpg.tmp", b"partial");
        write(dir.path(), ".DS_Store", b"hidden");
        write(dir.path(), "notes.txt", b"text");
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        write(&dir.path().join("nested"), "IMG_20240601_090000_000001.jpg", b"deep");

        let items = MediaDiscovery::new(".thumbnails").discover(dir.path());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].file_name(), "IMG_20240601_090000_000000.jpg");
    }

    #[test]
    fn test_foreign_names_fall_back_to_mtime() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "holiday.png", b"png");

        let items = MediaDiscovery::new(".thumbnails").discover(dir.path());
        assert_eq!(items.len(), 1);
        let age = Utc::now() - items[0].captured_at;
        assert!(age.num_seconds().abs() < 60);
    }

    #[test]
    fn test_thumbnail_attached_when_present() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "IMG_20240601_090000_000000.jpg", b"a");
        write(dir.path(), "IMG_20240601_090000_000001.jpg", b"b");
        std::fs::create_dir(dir.path().join(".thumbnails")).unwrap();
        let thumb = write(
            &dir.path().join(".thumbnails"),
            "IMG_20240601_090000_000000.jpg",
            b"t",
        );

        let items = MediaDiscovery::new(".thumbnails").discover(dir.path());
        let with_thumb = items
            .iter()
            .find(|i| i.file_name() == "IMG_20240601_090000_000000.jpg")
            .unwrap();
        assert_eq!(with_thumb.thumbnail_path.as_ref(), Some(&thumb));
        assert!(items
            .iter()
            .find(|i| i.file_name() == "IMG_20240601_090000_000001.jpg")
            .unwrap()
            .thumbnail_path
            .is_none());
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let items = MediaDiscovery::new(".thumbnails").discover(&dir.path().join("absent"));
        assert!(items.is_empty());
    }
}
