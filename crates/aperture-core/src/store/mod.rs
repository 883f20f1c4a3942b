//! Durable media namespace.
//!
//! - **naming**: collision-resistant capture filenames
//! - **discovery**: directory listing into [`MediaItem`](crate::types::MediaItem)s
//! - **format**: human-readable sizes
//! - **media_store**: save/delete/accounting, enqueuing metadata writes

pub mod discovery;
pub mod format;
pub mod media_store;
pub mod naming;

pub use discovery::MediaDiscovery;
pub use format::format_size;
pub use media_store::MediaStore;
pub use naming::{generate_file_name, parse_captured_at, PHOTO_PREFIX, VIDEO_PREFIX};
