//! Command handlers.

pub mod config;
pub mod import;
pub mod inspect;
pub mod media;
pub mod theme;
