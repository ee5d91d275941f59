//! Shared helpers

pub mod fs;

pub use fs::move_file;
