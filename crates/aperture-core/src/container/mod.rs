//! The binary metadata container embedded in image files.
//!
//! - **encode**: snapshot → EXIF fields (DMS rationals, hemisphere refs, timestamps)
//! - **app_block**: versioned JSON block carried in `UserComment`
//! - **embed**: splice a rebuilt tag directory into JPEG/PNG bytes and replace the file atomically
//! - **read**: decode the tags back into a [`WrittenMetadata`] view

pub mod app_block;
pub mod embed;
pub mod encode;
pub mod read;

pub use app_block::{AppBlock, APP_BLOCK_VERSION};
pub use embed::{embed_snapshot, rewrite_container, temp_path, ContainerFormat};
pub use encode::{decimal_to_dms, dms_to_decimal};
pub use read::{read_metadata, WrittenMetadata};
