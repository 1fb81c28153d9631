//!
//! FATRecovery: A library and CLI for recovering data from FAT32 volumes and disk images.
//!
//! This crate provides tools for:
//! - Viewing a disk image through bounded, offset-remapping windows
//! - Parsing the Master Boot Record (MBR) to locate partitions
//! - Parsing the FAT32 BPB, EBR and FSInfo structures
//! - Reconstructing cluster chains from the File Allocation Table alone
//! - Reading and exporting the content of every reconstructed chain
//!
//! Directory entries are never consulted: chains are rebuilt from the FAT, which is
//! what remains usable when the directory metadata is damaged.
//!
//! # Re-exports
//! - [`FATVol`]: FAT32 volume abstraction
//! - [`Disk`]: Disk abstraction with partition table and volume mounting
//! - [`WindowedReader`]: Bounded view over a shared seekable source

pub mod commands;
pub mod filesystem;
pub mod partition;
pub mod recovery;
pub mod traits;
pub mod utils;
pub mod window;

/// FAT32 volume abstraction (see [`filesystem::fat::FATVol`]).
pub use crate::filesystem::fat::FATVol;
/// Disk abstraction with partition table management (see [`partition::disk::Disk`]).
pub use crate::partition::disk::Disk;
/// Bounded view over a shared seekable source (see [`window::WindowedReader`]).
pub use crate::window::{SharedSource, WindowedReader};

/// The size of a sector in bytes. It is the only sector size supported.
pub const SECTOR_SIZE: usize = 512;
