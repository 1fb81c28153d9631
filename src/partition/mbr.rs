//! This module provides functionality for parsing the Master Boot Record (MBR).
//!
//! It defines structures and methods to interpret partition table entries, check the
//! partition table and locate partitions in disk images. Layout anomalies are only
//! reported: a damaged table may still point at recoverable volumes.
use getset::Getters;
use log::warn;
use std::fmt::Write;
use std::fmt::{self, Display};
use std::io::{Read, Seek};

use super::disk_error::DiskError;
use crate::SECTOR_SIZE;
use crate::traits::LayoutDisplay;
use crate::utils;

/// The number of primary partitions supported by MBR.
pub const PART_CNT: usize = 4;

/// Offset of the partition table in the MBR sector.
const PT_OFFSET: usize = 446;

/// Size of a partition table entry.
const PT_ENTRY_SIZE: usize = 16;

/// Represents the type of a partition table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PTType {
    /// Unused entry.
    Empty,
    /// CHS-addressed FAT32 partition type.
    Fat32,
    /// Logical Block Addressing (LBA) FAT32 partition type.
    LBAFat32,
    /// Unsupported partition type, encapsulating the raw type byte.
    Unsupported(u8),
}

impl Display for PTType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PTType::Empty => write!(f, "Empty"),
            PTType::Fat32 => write!(f, "FAT32"),
            PTType::LBAFat32 => write!(f, "LBA FAT32"),
            PTType::Unsupported(b) => write!(f, "Unsupported: 0x{:02X}", b),
        }
    }
}

impl PTType {
    /// Creates a `PTType` instance from a raw byte.
    ///
    /// # Parameters
    /// - `byte`: A single byte representing the partition type.
    ///
    /// # Returns
    /// - `PTType::Empty` for 0x00.
    /// - `PTType::Fat32` for 0x0B.
    /// - `PTType::LBAFat32` for 0x0C.
    /// - `PTType::Unsupported(byte)` for any other value.
    fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => PTType::Empty,
            0x0B => PTType::Fat32,
            0x0C => PTType::LBAFat32,
            _ => PTType::Unsupported(byte),
        }
    }

    /// Whether the type announces a FAT32 volume.
    pub fn is_fat32(&self) -> bool {
        matches!(self, PTType::Fat32 | PTType::LBAFat32)
    }
}

/// Represents a single partition table entry.
#[derive(Debug, Getters)]
pub struct PTEntry {
    /// Status flags; bit 7 marks the active partition.
    #[get = "pub"]
    attributes: u8,
    /// The type of the partition.
    #[get = "pub"]
    pt_type: PTType,
    /// The starting Logical Block Address (LBA) of the partition.
    #[get = "pub"]
    lba_start: u32,
    /// The number of sectors in the partition.
    #[get = "pub"]
    sector_cnt: u32,
}

impl PTEntry {
    fn from_slice(buf: &[u8]) -> Self {
        PTEntry {
            attributes: buf[0x00],
            pt_type: PTType::from_byte(buf[0x04]),
            lba_start: utils::u32_at(buf, 0x08),
            sector_cnt: utils::u32_at(buf, 0x0C),
        }
    }

    /// Whether the entry describes no partition.
    pub fn is_empty(&self) -> bool {
        self.sector_cnt == 0
    }

    /// Whether the entry is flagged as the active partition.
    pub fn is_active(&self) -> bool {
        self.attributes & 0x80 != 0
    }

    /// First byte of the partition in the disk image.
    pub fn start_byte(&self) -> u64 {
        self.lba_start as u64 * SECTOR_SIZE as u64
    }

    /// Size of the partition in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.sector_cnt as u64 * SECTOR_SIZE as u64
    }

    fn end_sector(&self) -> u64 {
        self.lba_start as u64 + self.sector_cnt as u64
    }
}

impl Display for PTEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} partition starting at sector {}: {}",
            if self.is_active() { "Active" } else { "Inactive" },
            self.pt_type,
            self.lba_start,
            utils::human_size(self.size_bytes())
        )
    }
}

/// Represents a Master Boot Record (MBR), including partition table entries
/// and the boot signature.
#[derive(Debug)]
pub struct Mbr {
    /// The partition table entries in the MBR.
    pt_entries: [PTEntry; PART_CNT],
    /// The boot signature of the MBR, as stored on disk (0xAA55 when valid).
    boot_signature: u16,
    /// Size of the disk image in sectors.
    sector_cnt: u64,
}

impl Mbr {
    /// Reads and parses an MBR from the first sector of a disk image.
    ///
    /// # Parameters
    /// - `reader`: The disk image.
    ///
    /// # Returns
    /// - `Ok(Mbr)` if the MBR is successfully parsed.
    /// - `Err(DiskError)` if the sector cannot be read or the boot signature is invalid.
    pub fn from<T: Read + Seek>(reader: &mut T) -> Result<Mbr, DiskError> {
        let disk_len = reader.seek(std::io::SeekFrom::End(0))?;

        let mut buffer = vec![0; SECTOR_SIZE];
        utils::read_sector(reader, 0, SECTOR_SIZE, &mut buffer)?;

        let pt_entries: [PTEntry; PART_CNT] = core::array::from_fn(|i| {
            let offset = PT_OFFSET + i * PT_ENTRY_SIZE;
            PTEntry::from_slice(&buffer[offset..offset + PT_ENTRY_SIZE])
        });

        let mbr = Mbr {
            pt_entries,
            // The signature 0x55AA is stored on disk in little-endian byte order.
            boot_signature: utils::u16_at(&buffer, 510),
            sector_cnt: disk_len / SECTOR_SIZE as u64,
        };

        mbr.check_signature()?;
        mbr.check_partition_table_sorted();
        mbr.check_partitions_non_overlapping();

        Ok(mbr)
    }

    /// Returns the entry at `index`, empty or not.
    pub fn entry(&self, index: usize) -> Option<&PTEntry> {
        self.pt_entries.get(index)
    }

    /// Returns a vector of references to non-empty partition table entries.
    ///
    /// This method filters the partition table entries to exclude any entries
    /// with a sector count of zero, as these entries are considered empty.
    ///
    /// # Returns
    /// - A `Vec` containing references to `PTEntry` instances that have a non-zero sector count.
    pub fn pt_entries(&self) -> Vec<&PTEntry> {
        self.pt_entries
            .iter()
            .filter(|entry| !entry.is_empty())
            .collect()
    }

    /// Size of the disk image in sectors.
    pub fn sector_cnt(&self) -> u64 {
        self.sector_cnt
    }

    /// Checks if the boot signature is valid.
    ///
    /// # Returns
    /// - `Ok(())` if the boot signature is valid.
    /// - `Err(DiskError::InvalidSignature)` otherwise.
    fn check_signature(&self) -> Result<(), DiskError> {
        match self.boot_signature {
            0xAA55 => Ok(()),
            sig => Err(DiskError::InvalidSignature(sig)),
        }
    }

    /// Reports partition table entries that are not sorted by their starting LBA.
    fn check_partition_table_sorted(&self) {
        if !self
            .pt_entries()
            .windows(2)
            .all(|pair| pair[0].lba_start <= pair[1].lba_start)
        {
            warn!("The partition table is not sorted");
        }
    }

    /// Reports overlapping partition table entries.
    fn check_partitions_non_overlapping(&self) {
        let mut entries = self.pt_entries();
        entries.sort_by_key(|entry| entry.lba_start);

        if entries
            .windows(2)
            .any(|pair| pair[0].end_sector() > pair[1].lba_start as u64)
        {
            warn!("Some partitions are overlapping");
        }
    }
}

/// Prints the layout of the disk based on the Master Boot Record (MBR).
///
/// # Behavior
/// - Prints the disk size and boot signature.
/// - Iterates through the partition table entries and prints their sector ranges,
///   along with the unallocated gaps between them.
impl LayoutDisplay for Mbr {
    fn display_layout(&self, indent: u8) -> Result<String, fmt::Error> {
        let mut out = String::from("");
        let indent = " ".repeat(indent.into());

        let mut last_end = 1;
        let disk_end = self.sector_cnt;

        writeln!(out, "{}┌{:─^55}┐", indent, " Master Boot Record Layout ")?;
        writeln!(out, "{}├{:<45}{:>10}┤", indent, "Disk Size", disk_end)?;
        writeln!(
            out,
            "{}├{:<45}{:>10}┤",
            indent,
            "Boot Signature",
            format!("0x{:04X}", self.boot_signature)
        )?;
        writeln!(out, "{}├{:─^55}┤", indent, "")?;

        writeln!(
            out,
            "{}├{:^12}┬{:^12}┬{:^12}┬{:^16}┤",
            indent, "Region", "Start", "End", "Description"
        )?;
        writeln!(
            out,
            "{}├{:─<12}┼{:─<12}┼{:─<12}┼{:─<16}┤",
            indent, "", "", "", ""
        )?;
        writeln!(
            out,
            "{}│{:^12}│{:>12}│{:>12}│{:^16}│",
            indent, "MBR", 0, 1, "Partition Table"
        )?;

        for (i, entry) in self.pt_entries.iter().enumerate() {
            if entry.is_empty() {
                continue;
            }
            let start = u64::from(entry.lba_start);
            let end = entry.end_sector();

            if start > last_end {
                writeln!(
                    out,
                    "{}│{:^12}│{:>12}│{:>12}│{:^16}│",
                    indent, "", last_end, start, "Unallocated"
                )?;
            }

            writeln!(
                out,
                "{}│{:^12}│{:>12}│{:>12}│{:^16}│",
                indent,
                format!("Part #{}", i + 1),
                start,
                end,
                format!("{:}", entry.pt_type())
            )?;

            last_end = last_end.max(end);
        }

        if last_end < disk_end {
            writeln!(
                out,
                "{}│{:^12}│{:>12}│{:>12}│{:^16}│",
                indent, "", last_end, disk_end, "Unallocated"
            )?;
        }

        writeln!(
            out,
            "{}└{:─<12}┴{:─<12}┴{:─<12}┴{:─<16}┘",
            indent, "", "", "", ""
        )?;

        Ok(out)
    }
}
