//! In-memory copy of the File Allocation Table.
//!
//! The first FAT copy is loaded once at mount time and never written back. Entries are
//! classified permissively: any value at or beyond the table length ends a chain, so a
//! damaged end-of-chain marker still terminates the chain it belongs to.

use log::warn;
use std::io;

use super::bpb::Bpb;
use super::fat_error::FATError;
use crate::SECTOR_SIZE;
use crate::utils;

/// Only the low 28 bits of an entry are meaningful.
pub const ENTRY_MASK: u32 = 0x0FFFFFFF;

/// Number of the first cluster of the data region.
pub const FIRST_DATA_CLUSTER: u32 = 2;

/// Cluster numbers from this value upwards (bad cluster and end-of-chain markers) never
/// reference data.
pub const FIRST_RESERVED_CLUSTER: u32 = 0x0FFFFFF7;

/// FAT sizes above this threshold are reported as suspicious.
const SIZE_WARNING_THRESHOLD: u64 = 1 << 30;

/// Meaning of a single allocation table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// The cluster is not allocated.
    Free,
    /// The entry holds 1, which is never a valid link.
    Invalid,
    /// The chain continues with the given cluster.
    Next(u32),
    /// The chain ends at this cluster.
    End,
}

/// The allocation table: one 32-bit entry per cluster, indexed from 0.
///
/// Entries 0 and 1 are reserved; the table length is the cluster count used to classify
/// every other entry.
#[derive(Debug, Clone)]
pub struct AllocationTable {
    entries: Vec<u32>,
}

impl AllocationTable {
    /// Builds a table from raw entries.
    pub fn from_entries(entries: Vec<u32>) -> Self {
        Self { entries }
    }

    /// Loads the first FAT copy described by the Bpb.
    ///
    /// A FAT larger than 1 GiB is most likely the product of a damaged header. It is
    /// reported but still loaded. A table cut short by the end of the source keeps the
    /// entries that could be read.
    ///
    /// # Errors
    /// - `FATError::IOError` if reading fails or no entry at all can be read
    pub fn load<T: io::Read + io::Seek>(reader: &mut T, bpb: &Bpb) -> Result<Self, FATError> {
        let offset = *bpb.rsvd_sec_cnt() as u64 * SECTOR_SIZE as u64;
        let size = *bpb.fat_sz_32() as u64 * SECTOR_SIZE as u64;

        if size > SIZE_WARNING_THRESHOLD {
            warn!(
                "The FAT spans {} ({} sectors). The header may be corrupted.",
                utils::human_size(size),
                bpb.fat_sz_32()
            );
        }

        let buf = utils::read_at(reader, offset, size)?;
        if buf.len() < 4 {
            return Err(FATError::IOError(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("No FAT entry found at offset {offset}"),
            )));
        }
        if (buf.len() as u64) < size {
            warn!(
                "The FAT is cut short: {} of {} could be read",
                utils::human_size(buf.len() as u64),
                utils::human_size(size)
            );
        }

        Ok(Self::from_entries(utils::le_u32_values(&buf)))
    }

    /// Number of entries, which bounds every valid link.
    pub fn cluster_count(&self) -> u32 {
        u32::try_from(self.entries.len()).unwrap_or(u32::MAX)
    }

    /// Raw entries, reserved bits included.
    pub fn entries(&self) -> &[u32] {
        &self.entries
    }

    /// Masked value of the entry for `cluster`, if the table holds one.
    pub fn entry(&self, cluster: u32) -> Option<u32> {
        self.entries
            .get(cluster as usize)
            .map(|entry| entry & ENTRY_MASK)
    }

    /// Classifies the entry for `cluster`.
    pub fn link(&self, cluster: u32) -> Option<Link> {
        self.entry(cluster).map(|value| self.classify(value))
    }

    /// Classifies a masked entry value against this table's length.
    pub fn classify(&self, value: u32) -> Link {
        match value {
            0 => Link::Free,
            1 => Link::Invalid,
            v if v >= self.cluster_count() => Link::End,
            v => Link::Next(v),
        }
    }

    /// Iterates over the data clusters of the table with their classified entries.
    pub fn links(&self) -> impl Iterator<Item = (u32, Link)> + '_ {
        (FIRST_DATA_CLUSTER..self.cluster_count()).map(move |cluster| {
            let value = self.entries[cluster as usize] & ENTRY_MASK;
            (cluster, self.classify(value))
        })
    }
}
