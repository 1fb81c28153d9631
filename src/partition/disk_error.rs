//! Error types for disk and partition operations.
//!
//! This module provides error handling for disk-level operations, including I/O errors,
//! boot signature verification, partition selection and volume mounting.

use std::io;
use thiserror;

use crate::filesystem::fat_error::FATError;
use crate::window::WindowError;

/// Represents errors that can occur while opening a disk or mounting one of its volumes.
#[derive(thiserror::Error, Debug)]
pub enum DiskError {
    /// Wraps an I/O error that occurred during disk operations.
    #[error("I/O error: {0}")]
    Io(io::Error),
    /// Indicates that the boot signature is not valid.
    /// Contains the invalid signature value that was found.
    #[error("Invalid MBR signature: 0x{0:04X}. Expected signature: 0xAA55")]
    InvalidSignature(u16),
    /// The disk has no partition table to select a partition from.
    #[error("The disk has no partition table")]
    NoPartitionTable,
    /// The partition index is out of range or designates an empty entry.
    #[error("Invalid partition index: {0}")]
    InvalidPartitionIndex(usize),
    /// The partition window could not be opened.
    #[error("Window error: {0}")]
    Window(WindowError),
    /// The volume could not be mounted.
    #[error("Volume error: {0}")]
    Volume(FATError),
}

/// Converts standard I/O errors into DiskError.
impl From<io::Error> for DiskError {
    fn from(err: io::Error) -> Self {
        DiskError::Io(err)
    }
}

/// Converts window errors into DiskError.
impl From<WindowError> for DiskError {
    fn from(err: WindowError) -> Self {
        DiskError::Window(err)
    }
}

/// Converts volume errors into DiskError.
impl From<FATError> for DiskError {
    fn from(err: FATError) -> Self {
        DiskError::Volume(err)
    }
}
