//! The media store: file namespace, saves, deletes and accounting.
//!
//! Saves return as soon as the bytes are on disk. When a snapshot is supplied
//! the metadata write is queued and lands later; callers must not assume a
//! file's tags are final when a save returns.

use chrono::Local;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use walkdir::WalkDir;

use super::discovery::MediaDiscovery;
use super::format;
use super::naming::{
    claim_path, extension_for, generate_file_name, sanitize_file_name, PHOTO_PREFIX, VIDEO_PREFIX,
};
use crate::config::Config;
use crate::error::StoreError;
use crate::queue::MetadataWriteQueue;
use crate::types::{MediaItem, MediaType, MetadataSnapshot};

/// Owns the storage directory and hands metadata writes to the queue.
pub struct MediaStore {
    custom_dir: Option<PathBuf>,
    folder_name: String,
    discovery: MediaDiscovery,
    queue: Arc<MetadataWriteQueue>,
}

impl MediaStore {
    pub fn new(config: &Config, queue: Arc<MetadataWriteQueue>) -> Self {
        Self {
            custom_dir: config.custom_storage_dir(),
            folder_name: config.storage.folder_name.clone(),
            discovery: MediaDiscovery::new(config.storage.thumbnail_dir.clone()),
            queue,
        }
    }

    /// A store rooted at an explicit directory.
    pub fn with_directory(dir: impl Into<PathBuf>, queue: Arc<MetadataWriteQueue>) -> Self {
        let mut config = Config::default();
        config.storage.custom_dir = Some(dir.into());
        Self::new(&config, queue)
    }

    pub fn queue(&self) -> &Arc<MetadataWriteQueue> {
        &self.queue
    }

    /// Resolve the storage root, creating it if needed.
    ///
    /// The custom directory wins; otherwise a folder in the user's documents
    /// area, falling back to the application data directory.
    pub fn directory(&self) -> Result<PathBuf, StoreError> {
        let dir = match &self.custom_dir {
            Some(dir) => dir.clone(),
            None => default_root()?.join(&self.folder_name),
        };

        std::fs::create_dir_all(&dir).map_err(|source| StoreError::StorageUnavailable {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    /// All captures in the storage directory, newest first.
    pub fn discover(&self) -> Result<Vec<MediaItem>, StoreError> {
        let dir = self.directory()?;
        Ok(self.discovery.discover(&dir))
    }

    /// Write encoded photo bytes under a fresh name.
    ///
    /// Returns `None` if the write failed. A metadata write is queued only
    /// when `snapshot` is given.
    pub async fn save_photo_bytes(
        &self,
        bytes: &[u8],
        file_name: Option<&str>,
        snapshot: Option<MetadataSnapshot>,
    ) -> Result<Option<PathBuf>, StoreError> {
        let dir = self.directory()?;
        let name = target_name(file_name, MediaType::Photo, PHOTO_PREFIX, None);
        let Some((path, file)) = claim(&dir, &name).await else {
            return Ok(None);
        };

        if let Err(e) = write_and_sync(file, bytes).await {
            tracing::warn!("Failed to write photo {:?}: {}", path, e);
            remove_partial(&path).await;
            return Ok(None);
        }

        tracing::debug!("Saved photo {:?} ({} bytes)", path, bytes.len());
        self.enqueue_metadata(&path, snapshot);
        Ok(Some(path))
    }

    /// Copy a photo the camera already wrote to a temporary file.
    ///
    /// Returns `None` if the source is missing or the copy did not land intact.
    pub async fn save_photo_file(
        &self,
        source: &Path,
        file_name: Option<&str>,
        snapshot: Option<MetadataSnapshot>,
    ) -> Result<Option<PathBuf>, StoreError> {
        let dir = self.directory()?;
        let name = target_name(file_name, MediaType::Photo, PHOTO_PREFIX, Some(source));
        let Some(path) = copy_verified(source, &dir, &name).await else {
            return Ok(None);
        };

        tracing::debug!("Saved photo {:?} from {:?}", path, source);
        self.enqueue_metadata(&path, snapshot);
        Ok(Some(path))
    }

    /// Copy a recorded video into the store. No metadata is written.
    pub async fn save_video(
        &self,
        source: &Path,
        file_name: Option<&str>,
    ) -> Result<Option<PathBuf>, StoreError> {
        let dir = self.directory()?;
        let name = target_name(file_name, MediaType::Video, VIDEO_PREFIX, Some(source));
        let Some(path) = copy_verified(source, &dir, &name).await else {
            return Ok(None);
        };

        tracing::debug!("Saved video {:?} from {:?}", path, source);
        Ok(Some(path))
    }

    /// Remove a capture and its thumbnail.
    ///
    /// Returns false if the capture was already gone or could not be removed.
    pub async fn delete(&self, item: &MediaItem) -> bool {
        match tokio::fs::remove_file(&item.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return false,
            Err(e) => {
                tracing::warn!("Failed to delete {:?}: {}", item.path, e);
                return false;
            }
        }

        let thumbnail = item.thumbnail_path.clone().or_else(|| {
            let dir = item.path.parent()?;
            self.discovery.thumbnail_path(dir, &item.path)
        });
        if let Some(thumbnail) = thumbnail {
            match tokio::fs::remove_file(&thumbnail).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to delete thumbnail {:?}: {}", thumbnail, e),
            }
        }

        tracing::debug!("Deleted {:?}", item.path);
        true
    }

    /// Delete each item, counting only the ones actually removed.
    pub async fn delete_many(&self, items: &[MediaItem]) -> usize {
        let mut deleted = 0;
        for item in items {
            if self.delete(item).await {
                deleted += 1;
            }
        }
        deleted
    }

    /// Sum of discovered capture sizes in bytes.
    pub fn total_storage_used(&self) -> Result<u64, StoreError> {
        Ok(self.discover()?.iter().map(|item| item.file_size).sum())
    }

    pub fn format_size(bytes: u64) -> String {
        format::format_size(bytes)
    }

    /// Delete every file under the storage directory, thumbnails included.
    ///
    /// Individual failures are logged and skipped. Returns the number of files removed.
    pub async fn clear_all(&self) -> Result<usize, StoreError> {
        let dir = self.directory()?;
        let files: Vec<PathBuf> = WalkDir::new(&dir)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();

        let mut removed = 0;
        for file in files {
            match tokio::fs::remove_file(&file).await {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!("Failed to delete {:?}: {}", file, e),
            }
        }

        tracing::info!("Cleared {} files from {:?}", removed, dir);
        Ok(removed)
    }

    fn enqueue_metadata(&self, path: &Path, snapshot: Option<MetadataSnapshot>) {
        if let Some(snapshot) = snapshot {
            self.queue.enqueue(path, snapshot);
        }
    }
}

fn default_root() -> Result<PathBuf, StoreError> {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(Path::to_path_buf))
        .or_else(|| {
            directories::ProjectDirs::from("com", "aperture", "aperture")
                .map(|dirs| dirs.data_dir().to_path_buf())
        })
        .ok_or(StoreError::NoDefaultLocation)
}

/// Supplied name if usable, else a generated one. The extension is always
/// one `media_type` keeps, never the source's `.tmp`.
fn target_name(
    file_name: Option<&str>,
    media_type: MediaType,
    prefix: &str,
    source: Option<&Path>,
) -> String {
    file_name
        .and_then(|name| sanitize_file_name(name, media_type))
        .unwrap_or_else(|| {
            let extension = source
                .map(|source| extension_for(source, media_type))
                .unwrap_or_else(|| media_type.default_extension());
            generate_file_name(prefix, extension, Local::now())
        })
}

async fn claim(dir: &Path, name: &str) -> Option<(PathBuf, File)> {
    match claim_path(dir, name).await {
        Ok(claimed) => Some(claimed),
        Err(e) => {
            tracing::warn!("Could not create {name} in {:?}: {}", dir, e);
            None
        }
    }
}

async fn write_and_sync(mut file: File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.sync_all().await
}

/// Copy `source` into a freshly claimed file and confirm the full length arrived.
async fn copy_verified(source: &Path, dir: &Path, name: &str) -> Option<PathBuf> {
    let expected = match tokio::fs::metadata(source).await {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) | Err(_) => {
            tracing::warn!("Source {:?} is missing, nothing saved", source);
            return None;
        }
    };

    let mut reader = match File::open(source).await {
        Ok(reader) => reader,
        Err(e) => {
            tracing::warn!("Failed to open {:?}: {}", source, e);
            return None;
        }
    };
    let (target, mut writer) = claim(dir, name).await?;

    let copied = match tokio::io::copy(&mut reader, &mut writer).await {
        Ok(copied) => copied,
        Err(e) => {
            tracing::warn!("Failed to copy {:?} to {:?}: {}", source, target, e);
            drop(writer);
            remove_partial(&target).await;
            return None;
        }
    };
    if let Err(e) = writer.sync_all().await {
        tracing::warn!("Failed to flush {:?}: {}", target, e);
        drop(writer);
        remove_partial(&target).await;
        return None;
    }
    drop(writer);

    let landed = tokio::fs::metadata(&target).await.map(|meta| meta.len());
    match landed {
        Ok(len) if copied == expected && len == expected => Some(target),
        Ok(len) => {
            tracing::warn!(
                "Copy of {:?} is {} bytes, expected {}; discarding",
                source,
                len,
                expected
            );
            remove_partial(&target).await;
            None
        }
        Err(e) => {
            tracing::warn!("Copied file {:?} is not readable: {}", target, e);
            remove_partial(&target).await;
            None
        }
    }
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!("Failed to remove partial file {:?}: {}", path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::embed::tests::{sample_snapshot, write_jpeg};
    use crate::container::read_metadata;
    use crate::queue::ThreadExecutor;
    use crate::types::{LocationFix, MediaType};
    use tempfile::TempDir;

    fn store(dir: &Path) -> MediaStore {
        let queue = Arc::new(MetadataWriteQueue::new(Arc::new(ThreadExecutor::default())));
        MediaStore::with_directory(dir.join("media"), queue)
    }

    fn jpeg_bytes(dir: &Path) -> Vec<u8> {
        let path = dir.join("fixture.jpg");
        write_jpeg(&path);
        std::fs::read(path).unwrap()
    }

    #[tokio::test]
    async fn test_directory_is_created_and_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path());

        let first = store.directory().unwrap();
        assert!(first.is_dir());
        assert_eq!(store.directory().unwrap(), first);
    }

    #[tokio::test]
    async fn test_uncreatable_directory_is_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();

        let queue = Arc::new(MetadataWriteQueue::new(Arc::new(ThreadExecutor::default())));
        let store = MediaStore::with_directory(blocker.join("media"), queue);

        assert!(matches!(
            store.directory(),
            Err(StoreError::StorageUnavailable { .. })
        ));
        assert!(store.save_photo_bytes(b"x", None, None).await.is_err());
    }

    #[tokio::test]
    async fn test_save_bytes_without_snapshot_skips_queue() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path());
        let bytes = jpeg_bytes(dir.path());

        let path = store.save_photo_bytes(&bytes, None, None).await.unwrap().unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("IMG_"));
        assert!(name.ends_with(".jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
        assert_eq!(store.queue().queue_depth(), 0);
    }

    #[tokio::test]
    async fn test_save_bytes_with_snapshot_writes_metadata_eventually() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path());
        let bytes = jpeg_bytes(dir.path());
        let snapshot = sample_snapshot(Some(LocationFix::new(48.8566, 2.3522)));

        let path = store
            .save_photo_bytes(&bytes, None, Some(snapshot))
            .await
            .unwrap()
            .unwrap();
        store.queue().wait_idle().await;

        let written = read_metadata(&path).unwrap();
        assert!((written.latitude.unwrap() - 48.8566).abs() < 1e-4);
        assert!((written.longitude.unwrap() - 2.3522).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_supplied_names_never_collide() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path());

        let first = store
            .save_photo_bytes(b"one", Some("sub/shot.jpg"), None)
            .await
            .unwrap()
            .unwrap();
        let second = store
            .save_photo_bytes(b"two", Some("shot.jpg"), None)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first, store.directory().unwrap().join("shot.jpg"));
        assert_ne!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), b"one");
        assert_eq!(std::fs::read(&second).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_save_photo_file_copies_and_queues() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path());
        let source = dir.path().join("capture.jpg");
        write_jpeg(&source);

        let path = store
            .save_photo_file(&source, None, Some(sample_snapshot(None)))
            .await
            .unwrap()
            .unwrap();
        store.queue().wait_idle().await;

        assert!(source.exists());
        let written = read_metadata(&path).unwrap();
        assert_eq!(written.model.as_deref(), Some("Pixel 8"));
    }

    #[tokio::test]
    async fn test_temp_capture_file_saved_as_photo() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path());
        let source = dir.path().join("capture_123.tmp");
        write_jpeg(&dir.path().join("fixture.jpg"));
        std::fs::copy(dir.path().join("fixture.jpg"), &source).unwrap();

        let path = store
            .save_photo_file(&source, None, Some(sample_snapshot(None)))
            .await
            .unwrap()
            .unwrap();
        store.queue().wait_idle().await;

        assert_eq!(path.extension().unwrap(), "jpg");
        assert_eq!(read_metadata(&path).unwrap().model.as_deref(), Some("Pixel 8"));
        let items = store.discover().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].path, path);
        assert!(store.total_storage_used().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_supplied_name_without_extension_gets_metadata() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path());
        let bytes = jpeg_bytes(dir.path());

        let path = store
            .save_photo_bytes(&bytes, Some("shot"), Some(sample_snapshot(None)))
            .await
            .unwrap()
            .unwrap();
        store.queue().wait_idle().await;

        assert_eq!(path.file_name().unwrap(), "shot.jpg");
        assert!(read_metadata(&path).is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_saves_never_share_a_file() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path());

        for round in 0..25 {
            let name = format!("race_{round}.jpg");
            let (first, second) = tokio::join!(
                store.save_photo_bytes(b"first", Some(&name), None),
                store.save_photo_bytes(b"second", Some(&name), None),
            );
            let first = first.unwrap().unwrap();
            let second = second.unwrap().unwrap();

            assert_ne!(first, second);
            assert_eq!(std::fs::read(&first).unwrap(), b"first");
            assert_eq!(std::fs::read(&second).unwrap(), b"second");
        }
        assert_eq!(store.discover().unwrap().len(), 50);
    }

    #[tokio::test]
    async fn test_save_photo_file_missing_source() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path());

        let saved = store
            .save_photo_file(&dir.path().join("nope.jpg"), None, Some(sample_snapshot(None)))
            .await
            .unwrap();

        assert!(saved.is_none());
        assert_eq!(store.queue().queue_depth(), 0);
        assert!(store.discover().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_video_copies_only() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path());
        let source = dir.path().join("clip.mov");
        std::fs::write(&source, b"moov").unwrap();

        let path = store.save_video(&source, None).await.unwrap().unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("VID_"));
        assert!(name.ends_with(".mov"));
        assert_eq!(store.queue().queue_depth(), 0);

        let items = store.discover().unwrap();
        assert_eq!(items[0].media_type, MediaType::Video);
    }

    #[tokio::test]
    async fn test_delete_reports_absence() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path());
        store.save_photo_bytes(b"one", Some("a.jpg"), None).await.unwrap();

        let root = store.directory().unwrap();
        std::fs::create_dir(root.join(".thumbnails")).unwrap();
        std::fs::write(root.join(".thumbnails").join("a.jpg"), b"thumb").unwrap();

        let item = store.discover().unwrap().remove(0);
        assert!(item.thumbnail_path.is_some());

        assert!(store.delete(&item).await);
        assert!(!item.path.exists());
        assert!(!root.join(".thumbnails").join("a.jpg").exists());
        assert!(!store.delete(&item).await);
    }

    #[tokio::test]
    async fn test_delete_many_counts_successes() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path());
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            store.save_photo_bytes(b"x", Some(name), None).await.unwrap();
        }

        let items = store.discover().unwrap();
        std::fs::remove_file(&items[1].path).unwrap();

        assert_eq!(store.delete_many(&items).await, 2);
        assert!(store.discover().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_storage_accounting() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path());
        store.save_photo_bytes(&[0u8; 1000], Some("a.jpg"), None).await.unwrap();
        store.save_photo_bytes(&[0u8; 536], Some("b.png"), None).await.unwrap();

        let used = store.total_storage_used().unwrap();
        assert_eq!(used, 1536);
        assert_eq!(MediaStore::format_size(used), "1.5 KB");
    }

    #[tokio::test]
    async fn test_clear_all_removes_everything() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path());
        store.save_photo_bytes(b"x", Some("a.jpg"), None).await.unwrap();
        let root = store.directory().unwrap();
        std::fs::write(root.join("notes.txt"), b"stray").unwrap();
        std::fs::create_dir(root.join(".thumbnails")).unwrap();
        std::fs::write(root.join(".thumbnails").join("a.jpg"), b"thumb").unwrap();

        assert_eq!(store.clear_all().await.unwrap(), 3);
        assert!(store.discover().unwrap().is_empty());
        assert!(!root.join(".thumbnails").join("a.jpg").exists());
    }
}
