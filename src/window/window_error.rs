//! Error types for windowed readers.

use std::io;
use thiserror;

/// Represents errors that can occur while opening a window over a seekable source.
#[derive(thiserror::Error, Debug)]
pub enum WindowError {
    /// The window is empty or inverted.
    #[error("Invalid window [{base}, {limit}): the base offset must be below the limit")]
    InvertedRange { base: u64, limit: u64 },
    /// A nested window would reach past the end of its parent window.
    #[error("Nested window ending at {limit} exceeds the {parent_size}-byte parent window")]
    ExceedsParent { limit: u64, parent_size: u64 },
    /// Wraps an I/O error raised while probing the underlying source.
    #[error("I/O error: {0}")]
    Io(io::Error),
}

/// Converts standard I/O errors into WindowError.
impl From<io::Error> for WindowError {
    fn from(err: io::Error) -> Self {
        WindowError::Io(err)
    }
}
