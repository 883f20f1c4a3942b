//! Capture-time snapshot assembly.

pub mod assembler;

pub use assembler::MetadataAssembler;
