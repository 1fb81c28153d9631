//! Disk image parsing and analysis.
//!
//! This module provides functionality for:
//! - Opening disk images, with or without a partition table
//! - Exposing partitions as windows over the shared image
//! - Mounting FAT32 volumes on those windows
//! - Displaying disk layout information

use getset::Getters;
use log::{info, warn};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::disk_error::DiskError;
use super::mbr::Mbr;
use crate::filesystem::fat::FATVol;
use crate::traits::LayoutDisplay;
use crate::window::{self, SharedSource, WindowedReader};

/// Represents a disk image with its optional partition table.
#[derive(Getters)]
pub struct Disk<S> {
    /// The disk image file path, when the disk was opened from a file.
    #[get = "pub"]
    file_path: Option<PathBuf>,
    /// The partition table found on the disk
    #[get = "pub"]
    part_table: Option<Mbr>,
    /// Size of the image in bytes
    #[get = "pub"]
    size: u64,
    source: SharedSource<S>,
}

impl Disk<File> {
    /// Opens a disk image file read-only and analyzes its structure.
    ///
    /// # Errors
    /// - Returns `DiskError::Io` if the file cannot be opened or read
    pub fn from_file(path: &Path) -> Result<Self, DiskError> {
        let file = File::open(path)?;
        let mut disk = Disk::new(file)?;
        disk.file_path = Some(path.to_path_buf());
        Ok(disk)
    }
}

impl<S: Read + Seek> Disk<S> {
    /// Takes ownership of a disk image and looks for an MBR in its first sector.
    ///
    /// A missing MBR signature is not an error: the image may hold a bare volume.
    ///
    /// # Errors
    /// - Returns `DiskError::Io` if the image cannot be read
    pub fn new(mut source: S) -> Result<Self, DiskError> {
        let size = source.seek(SeekFrom::End(0))?;

        let part_table = match Mbr::from(&mut source) {
            Ok(mbr) => Some(mbr),
            Err(DiskError::InvalidSignature(sig)) => {
                info!("No MBR found (signature 0x{sig:04X}), expecting a bare volume");
                None
            }
            Err(err) => return Err(err),
        };

        Ok(Disk {
            file_path: None,
            part_table,
            size,
            source: window::share(source),
        })
    }

    /// Opens a window over the partition at `index` (0-based) of the partition table.
    ///
    /// # Errors
    /// - `DiskError::NoPartitionTable` if the image has no MBR
    /// - `DiskError::InvalidPartitionIndex` if the entry is missing or empty
    pub fn partition_window(&self, index: usize) -> Result<WindowedReader<S>, DiskError> {
        let mbr = self
            .part_table
            .as_ref()
            .ok_or(DiskError::NoPartitionTable)?;

        let entry = mbr
            .entry(index)
            .filter(|entry| !entry.is_empty())
            .ok_or(DiskError::InvalidPartitionIndex(index))?;

        let start = entry.start_byte();
        let limit = start + entry.size_bytes();
        if limit > self.size {
            warn!(
                "Partition #{} ends at byte {limit}, beyond the {}-byte image",
                index + 1,
                self.size
            );
        }
        if !entry.pt_type().is_fat32() {
            warn!(
                "Partition #{} has type {}, not FAT32",
                index + 1,
                entry.pt_type()
            );
        }

        Ok(WindowedReader::open(self.source.clone(), start, limit)?)
    }

    /// Opens a window over the whole image.
    ///
    /// # Errors
    /// - `DiskError::Window` if the image is empty
    pub fn raw_window(&self) -> Result<WindowedReader<S>, DiskError> {
        Ok(WindowedReader::open(self.source.clone(), 0, self.size)?)
    }

    /// Mounts the FAT32 volume of the partition at `index` (0-based).
    ///
    /// # Parameters
    /// - `index`: The partition table entry holding the volume
    /// - `validate`: Whether to apply the strict Bpb validation
    ///
    /// # Errors
    /// - The errors of [`Disk::partition_window`]
    /// - `DiskError::Volume` if the volume cannot be mounted
    pub fn mount(&self, index: usize, validate: bool) -> Result<FATVol<S>, DiskError> {
        Self::mount_window(self.partition_window(index)?, validate)
    }

    /// Mounts a FAT32 volume starting at byte 0 of the image.
    ///
    /// # Errors
    /// - `DiskError::Volume` if the volume cannot be mounted
    pub fn mount_raw(&self, validate: bool) -> Result<FATVol<S>, DiskError> {
        Self::mount_window(self.raw_window()?, validate)
    }

    fn mount_window(view: WindowedReader<S>, validate: bool) -> Result<FATVol<S>, DiskError> {
        let vol = if validate {
            FATVol::open_validated(view)?
        } else {
            FATVol::open(view)?
        };
        Ok(vol)
    }

    /// Indices of the partition table entries announcing a FAT32 volume.
    pub fn fat32_partitions(&self) -> Vec<usize> {
        match &self.part_table {
            Some(mbr) => (0..super::mbr::PART_CNT)
                .filter(|i| {
                    mbr.entry(*i)
                        .is_some_and(|entry| !entry.is_empty() && entry.pt_type().is_fat32())
                })
                .collect(),
            None => vec![],
        }
    }

    /// Prints a hierarchical layout of the disk structure.
    ///
    /// # Parameters
    /// - `indent`: Number of spaces to indent the layout
    ///
    /// # Returns
    /// - `Ok(())` if the layout is printed successfully
    /// - `Err(std::fmt::Error)` if formatting fails
    pub fn print_layout(&self, indent: u8) -> Result<(), std::fmt::Error> {
        print!("{}", self.display_layout(indent)?);
        Ok(())
    }
}

impl<S: Read + Seek> LayoutDisplay for Disk<S> {
    fn display_layout(&self, indent: u8) -> Result<String, std::fmt::Error> {
        match &self.part_table {
            Some(mbr) => mbr.display_layout(indent),
            None => Ok(format!(
                "{}No partition table ({} bytes)\n",
                " ".repeat(indent.into()),
                self.size
            )),
        }
    }
}
