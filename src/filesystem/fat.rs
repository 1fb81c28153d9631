//! FAT32 volume structure and operations.
//!
//! This module implements the composition root of the recovery core:
//! - Mounting a volume over a window (header, FSInfo, allocation table)
//! - Mapping clusters to byte offsets
//! - Reconstructing the cluster chains of the volume
//! - Opening readers over chains
//! - Displaying the volume layout and metadata summaries

use log::{info, warn};
use std::fmt::Write as FmtWrite;
use std::io::{Read, Seek};

use super::allocation_table::{AllocationTable, FIRST_DATA_CLUSTER, FIRST_RESERVED_CLUSTER};
use super::bpb::Bpb;
use super::chain::{self, FATChain};
use super::chain_reader::{ChainReader, ClusterWalker};
use super::fat_error::FATError;
use super::fs_info::FsInfo;
use crate::SECTOR_SIZE;
use crate::traits::{BoundedRead, LayoutDisplay};
use crate::window::WindowedReader;

/// Number of leading FAT entries shown in the metadata summary.
const SUMMARY_FAT_ENTRIES: u32 = 10;

/// Structure for a mounted FAT32 volume.
///
/// The volume reads through a window whose offset 0 is the boot sector. The window shares
/// the underlying image, which must stay unchanged while the volume is in use.
pub struct FATVol<S> {
    view: WindowedReader<S>,
    bpb: Bpb,
    fs_info: Option<FsInfo>,
    allocation_table: AllocationTable,
    cluster_size: u32,
    first_data_sector: u64,
}

impl<S: Read + Seek> FATVol<S> {
    /// Mounts the volume, checking only what reading it requires.
    ///
    /// # Errors
    /// - `FATError::UnsupportedSectorSize` if the sector size is not 512 bytes
    /// - `FATError::IOError` if the header or the allocation table cannot be read
    pub fn open(view: WindowedReader<S>) -> Result<Self, FATError> {
        Self::mount(view, false)
    }

    /// Mounts the volume after the strict validation of its Bpb.
    ///
    /// # Errors
    /// Same as [`FATVol::open`], plus the validation errors of the Bpb.
    pub fn open_validated(view: WindowedReader<S>) -> Result<Self, FATError> {
        Self::mount(view, true)
    }

    fn mount(view: WindowedReader<S>, validate: bool) -> Result<Self, FATError> {
        let mut reader = view.clone();
        let bpb = Bpb::from(&mut reader, validate)?;

        let fs_info = match FsInfo::from(&mut reader, &bpb) {
            Ok(fs_info) => Some(fs_info),
            Err(err) => {
                warn!("Continuing without FSInfo: {err}");
                None
            }
        };

        let allocation_table = AllocationTable::load(&mut reader, &bpb)?;

        info!(
            "Mounted FAT32 volume {:?} ({} FAT entries, {}-byte clusters)",
            bpb.volume_label(),
            allocation_table.cluster_count(),
            bpb.cluster_size()
        );

        Ok(Self {
            view,
            cluster_size: bpb.cluster_size(),
            first_data_sector: bpb.first_data_sector(),
            bpb,
            fs_info,
            allocation_table,
        })
    }

    /// The BPB and EBR of the volume.
    pub fn header(&self) -> &Bpb {
        &self.bpb
    }

    /// The FSInfo sector, if it could be read and validated.
    pub fn fs_info(&self) -> Option<&FsInfo> {
        self.fs_info.as_ref()
    }

    /// The allocation table loaded at mount time.
    pub fn allocation_table(&self) -> &AllocationTable {
        &self.allocation_table
    }

    /// Size of a cluster in bytes.
    pub fn cluster_size(&self) -> u32 {
        self.cluster_size
    }

    /// First sector of the data region, relative to the volume.
    pub fn first_data_sector(&self) -> u64 {
        self.first_data_sector
    }

    /// Size of the volume window in bytes.
    pub fn size(&self) -> u64 {
        self.view.size()
    }

    /// Byte offset, relative to the volume, of a position inside a cluster.
    ///
    /// `offset_in_cluster` is taken modulo the cluster size.
    ///
    /// # Errors
    /// - `FATError::InvalidCluster` for clusters 0 and 1, reserved values from
    ///   `0x0FFFFFF7` upwards, and clusters the allocation table does not cover
    pub fn cluster_offset(&self, cluster: u32, offset_in_cluster: u64) -> Result<u64, FATError> {
        self.check_cluster(cluster)?;
        Ok(self.data_offset(cluster, offset_in_cluster))
    }

    fn check_cluster(&self, cluster: u32) -> Result<(), FATError> {
        if cluster < FIRST_DATA_CLUSTER
            || cluster >= FIRST_RESERVED_CLUSTER
            || cluster >= self.allocation_table.cluster_count()
        {
            return Err(FATError::InvalidCluster(cluster));
        }
        Ok(())
    }

    /// Unchecked version of [`FATVol::cluster_offset`].
    pub(super) fn data_offset(&self, cluster: u32, offset_in_cluster: u64) -> u64 {
        let cluster_size = self.cluster_size as u64;
        self.first_data_sector * SECTOR_SIZE as u64
            + (cluster - FIRST_DATA_CLUSTER) as u64 * cluster_size
            + offset_in_cluster % cluster_size
    }

    /// Discovers every cluster chain of the volume from its allocation table.
    ///
    /// # Errors
    /// - `FATError::Internal` if the reconstruction logic contradicts itself
    pub fn reconstruct_chains(&self) -> Result<Vec<FATChain>, FATError> {
        Ok(chain::reconstruct(&self.allocation_table, self.cluster_size)?)
    }

    /// Opens a reader over a chain, through a single window when the chain is contiguous.
    ///
    /// # Errors
    /// - `FATError::InvalidCluster` if the chain does not start on a data cluster
    /// - `FATError::Window` if a contiguous chain reaches past the end of the volume
    pub fn open_chain_reader(&self, chain: &FATChain) -> Result<ChainReader<'_, S>, FATError> {
        if !*chain.contiguous() {
            return self.open_cluster_walker(chain);
        }

        let offset = self.cluster_offset(*chain.start_cluster(), 0)?;
        let window = self.view.sub_window(offset, offset + *chain.size_bytes())?;

        Ok(ChainReader::Contiguous(window))
    }

    /// Opens a reader that follows the chain cluster by cluster, whatever its layout.
    ///
    /// # Errors
    /// - `FATError::InvalidCluster` if the chain does not start on a data cluster
    pub fn open_cluster_walker(&self, chain: &FATChain) -> Result<ChainReader<'_, S>, FATError> {
        self.check_cluster(*chain.start_cluster())?;

        Ok(ChainReader::Fragmented(ClusterWalker::new(
            self,
            self.view.clone(),
            chain,
        )))
    }

    /// Summarises the BPB, EBR and FSInfo along with the first FAT entries.
    ///
    /// The output is meant for people and is not a stable format.
    pub fn format_human_readable(&self) -> Result<String, std::fmt::Error> {
        let mut out = String::new();

        write!(out, "{}", self.bpb)?;
        writeln!(out)?;
        match &self.fs_info {
            Some(fs_info) => write!(out, "{fs_info}")?,
            None => writeln!(out, "FSInfo: unavailable")?,
        }
        writeln!(out)?;

        writeln!(out, "First FAT entries:")?;
        let shown = SUMMARY_FAT_ENTRIES.min(self.allocation_table.cluster_count());
        for (i, entry) in self.allocation_table.entries()[..shown as usize]
            .iter()
            .enumerate()
        {
            writeln!(out, "  {i}: 0x{entry:08x}")?;
        }

        Ok(out)
    }

    /// Returns the starting sector of the first FAT.
    fn fat_start(&self) -> u64 {
        u64::from(*self.bpb.rsvd_sec_cnt())
    }

    /// Returns the ending sector of the data region.
    fn data_end(&self) -> u64 {
        self.first_data_sector
            + self.bpb.cluster_count() as u64 * *self.bpb.sec_per_clus() as u64
    }

    /// Returns the ending sector of the volume window.
    fn end(&self) -> u64 {
        self.view.size() / SECTOR_SIZE as u64
    }
}

/// Implements the LayoutDisplay trait for FATVol
impl<S: Read + Seek> LayoutDisplay for FATVol<S> {
    fn display_layout(&self, indent: u8) -> Result<String, std::fmt::Error> {
        let mut out = String::from("");
        let indent = " ".repeat(indent.into());

        writeln!(out, "{}┌{:─^55}┐", indent, " FAT32 Volume Layout ")?;
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
            "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
            indent,
            "Reserved",
            0,
            self.fat_start(),
            "Boot + Reserved"
        )?;
        let fat_sz = u64::from(*self.bpb.fat_sz_32());
        for i in 0..u64::from(*self.bpb.num_fat()) {
            let fat_i_start = self.fat_start() + i * fat_sz;
            writeln!(
                out,
                "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
                indent,
                format!("FAT #{}", i),
                fat_i_start,
                fat_i_start + fat_sz,
                "FAT Tables"
            )?;
        }
        writeln!(
            out,
            "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
            indent,
            "Data",
            self.first_data_sector,
            self.data_end(),
            "Cluster Data"
        )?;
        if self.data_end() < self.end() {
            writeln!(
                out,
                "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
                indent,
                "",
                self.data_end(),
                self.end(),
                "Volume Slack"
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
