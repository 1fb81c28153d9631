//! Error types for FAT32 volume parsing and chain reconstruction.
//!
//! Format errors come from the on-disk structures (BPB, EBR, FSInfo), bounds errors from
//! invalid cluster or window requests, and internal errors from the reconstruction and
//! walking logic itself. Internal errors never describe user data: the chains are built
//! from the same table they are checked against.

use std::io;
use thiserror::Error;

use crate::window::WindowError;

/// Errors that can occur while mounting or reading a FAT32 volume.
#[derive(Error, Debug)]
pub enum FATError {
    /// The only supported sector size is 512 bytes.
    #[error("Unsupported count of bytes per sector: `{actual}`. Expected: {expected}")]
    UnsupportedSectorSize { expected: u16, actual: u16 },

    /// One of the three FSInfo signatures does not hold its fixed value.
    #[error("Invalid FSInfo {name}: `0x{actual:08X}`. Expected: 0x{expected:08X}")]
    InvalidFsInfoSignature {
        name: &'static str,
        expected: u32,
        actual: u32,
    },

    /// The first three bytes of a FAT volume must contain a valid x86 jump instruction.
    #[error("Invalid jump instruction `{0}`")]
    InvalidJmp(String),

    /// Sectors per cluster must be a power of 2: 1, 2, 4, 8, 16, 32, 64, or 128.
    #[error(
        "Invalid number of sector per cluster: `{0}`. Legal values: 1, 2, 4, 8, 16, 32, 64, 128"
    )]
    InvalidSecPerClus(u8),

    /// Total cluster size (bytes per sector × sectors per cluster) must not exceed 32 KiB.
    #[error("Invalid cluster size: `{0}`. Any value greater than 32K is invalid.")]
    InvalidClusSz(u32),

    /// The count of reserved sectors must be greater than 0.
    #[error("Invalid count of reserved sectors: `{0}`. Any value greater than 0 is valid.")]
    InvalidRsvdSecCnt(u16),

    /// The number of File Allocation Tables must be at least 1.
    #[error("Invalid number of FATs on this volume: `{0}`.")]
    InvalidNumFat(u8),

    /// For FAT32 volumes, the root directory entries count must be 0.
    #[error(
        "Invalid count of directory entries in the root directory: `{0}`. It should be 0 for a FAT32 volume. "
    )]
    InvalidRootEntCnt(u16),

    /// The FAT size in sectors must be valid and consistent with the volume layout.
    #[error("Invalid FAT size:`{0}`")]
    InvalidFatSz(String),

    /// Clusters 0 and 1 are reserved, and the data area starts at cluster 2.
    #[error(
        "Invalid cluster number of the first cluster of the root directory: `{0}`. This value should be greater than 2."
    )]
    InvalidRootClus(u32),

    /// The boot sector signature must be 0x55AA.
    #[error("Invalid BPB signature: `{0}`. Expected signature: 0x55AA")]
    InvalidSignature(String),

    /// The cluster number cannot reference the data region.
    #[error("Invalid cluster number: `{0}`")]
    InvalidCluster(u32),

    /// A window over the volume could not be opened.
    #[error("Window error: {0}")]
    Window(WindowError),

    /// Underlying I/O errors.
    #[error("IO Error: `{0}`")]
    IOError(io::Error),

    /// Parsing error occured during structure initialization
    #[error("BinRead Error: `{0}`")]
    BinReadError(binread::Error),

    /// A logic defect in chain reconstruction or walking.
    #[error("Internal error: {0}")]
    Internal(InternalError),
}

/// Consistency failures of the chain logic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InternalError {
    /// A cluster selected as a chain tail links to another cluster.
    #[error("Cluster {cluster} was taken as a chain tail but links to 0x{entry:08X}")]
    TailIsMidChain { cluster: u32, entry: u32 },

    /// Walking a chain visited more clusters than the table holds.
    #[error("Chain through cluster {cluster} does not terminate")]
    ChainCycle { cluster: u32 },

    /// A chain ran out of clusters before its recorded size was read.
    #[error("Chain broke at cluster {cluster} (link 0x{link:08X}) with {remaining} bytes left")]
    ChainExhausted {
        cluster: u32,
        link: u32,
        remaining: u64,
    },
}

/// Converts standard I/O errors into FATError.
impl From<io::Error> for FATError {
    fn from(err: io::Error) -> Self {
        FATError::IOError(err)
    }
}

/// Converts BinRead errors into FATError.
impl From<binread::Error> for FATError {
    fn from(err: binread::Error) -> Self {
        FATError::BinReadError(err)
    }
}

/// Converts window errors into FATError.
impl From<WindowError> for FATError {
    fn from(err: WindowError) -> Self {
        FATError::Window(err)
    }
}

/// Converts internal errors into FATError.
impl From<InternalError> for FATError {
    fn from(err: InternalError) -> Self {
        FATError::Internal(err)
    }
}

/// Internal errors crossing an `io::Read` boundary travel inside an `io::Error`.
impl From<InternalError> for io::Error {
    fn from(err: InternalError) -> Self {
        io::Error::other(err)
    }
}
