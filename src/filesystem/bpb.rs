//! FAT32 volume header.
//!
//! This module implements:
//! - BIOS Parameter Block (Bpb) and FAT32 Extended Boot Record decoding
//! - The mandatory geometry checks (512-byte sectors, at least one sector per cluster)
//! - Optional strict validation according to Microsoft's FAT specification
//!
//! Recovery often deals with damaged headers, so apart from the geometry every check is
//! opt-in.

use binread::{BinRead, BinReaderExt};
use getset::Getters;
use std::fmt;
use std::io;

use super::fat_error::FATError;
use crate::SECTOR_SIZE;
use crate::utils;

/// BIOS Parameter Block followed by the FAT32 Extended Boot Record.
///
/// The structure covers the whole boot sector and follows Microsoft's FAT32 specification.
#[derive(BinRead, Debug, Getters)]
#[br(little)]
pub struct Bpb {
    /// Jump instruction to boot code (must be 0xEB ?? 0x90 or 0xE9 ?? ??)
    jmp: [u8; 3],
    /// OEM identifier (e.g., "MSWIN4.1")
    oem_name: [u8; 8],
    /// Number of bytes per sector (only 512 is supported)
    #[get = "pub"]
    bytes_per_sec: u16,
    /// Number of sectors per cluster (power of 2: 1, 2, 4, 8, 16, 32, 64, or 128)
    #[get = "pub"]
    sec_per_clus: u8,
    /// Number of reserved sectors from start of volume
    #[get = "pub"]
    rsvd_sec_cnt: u16,
    /// Number of FAT copies (typically 2 for redundancy)
    #[get = "pub"]
    num_fat: u8,
    /// Maximum number of root directory entries (0 for FAT32)
    #[get = "pub"]
    root_ent_cnt: u16,
    /// Total sectors for volumes < 32MB (0 for FAT32)
    tot_sec_16: u16,
    /// Media descriptor (0xF8 for fixed disk)
    media: u8,
    /// Sectors per FAT for FAT12/FAT16 (0 for FAT32)
    fat_sz_16: u16,
    /// Sectors per track
    sec_per_trk: u16,
    /// Number of heads
    num_heads: u16,
    /// Number of hidden sectors preceding the partition
    #[get = "pub"]
    hidd_sec: u32,
    /// Total sectors for volumes >= 32MB
    #[get = "pub"]
    tot_sec_32: u32,

    // FAT32-specific fields
    /// Sectors per FAT
    #[get = "pub"]
    fat_sz_32: u32,
    /// FAT flags (mirroring, active FAT)
    ext_flags: u16,
    /// Filesystem version (should be 0:0)
    fs_ver: u16,
    /// First cluster of root directory (typically 2)
    #[get = "pub"]
    root_clus: u32,
    /// Sector number of FSINFO structure
    #[get = "pub"]
    fs_info: u16,
    /// Sector number of backup boot sector
    #[get = "pub"]
    bk_boot_sec: u16,
    /// Reserved for future expansion
    reserved: [u8; 12],
    /// Drive number (0x80 for hard disk)
    drv_num: u8,
    /// Reserved (used by Windows NT)
    reserved_1: u8,
    /// Extended boot signature (0x29)
    boot_sig: u8,
    /// Volume serial number
    #[get = "pub"]
    vol_id: u32,
    /// Volume label (11 bytes)
    vol_lab: [u8; 11],
    /// Filesystem type label ("FAT32   ")
    fil_sys_type: [u8; 8],

    /// Boot code (not part of Bpb specification)
    #[br(count = 420)]
    boot_code: Vec<u8>,
    /// Boot sector signature (0x55 0xAA)
    sig: [u8; 2],
}

impl Bpb {
    /// Reads the boot sector at offset 0 of the reader and decodes it.
    ///
    /// # Parameters
    /// - `reader`: The source containing the filesystem, positioned anywhere
    /// - `validate`: Whether to perform the strict validation checks on the Bpb
    ///
    /// # Returns
    /// - `Ok(Bpb)`: The parsed and optionally validated Bpb structure
    /// - `Err(FATError)`: If reading fails or validation fails
    ///
    /// # Errors
    /// - Returns `FATError::IOError` if reading from the source fails
    /// - Returns `FATError::UnsupportedSectorSize` if the sector size is not 512 bytes
    /// - Returns `FATError::InvalidSecPerClus` if a cluster holds no sector
    /// - Returns various `FATError` variants if validation fails and `validate` is true
    pub fn from<T: io::Read + io::Seek>(reader: &mut T, validate: bool) -> Result<Bpb, FATError> {
        let mut buf = vec![0; SECTOR_SIZE];
        utils::read_sector(reader, 0, SECTOR_SIZE, &mut buf)?;

        let bpb: Bpb = io::Cursor::new(buf).read_le()?;

        if bpb.bytes_per_sec as usize != SECTOR_SIZE {
            return Err(FATError::UnsupportedSectorSize {
                expected: SECTOR_SIZE as u16,
                actual: bpb.bytes_per_sec,
            });
        }

        // Every cluster offset divides by the cluster size.
        if bpb.sec_per_clus == 0 {
            return Err(FATError::InvalidSecPerClus(0));
        }

        if validate { bpb.validate() } else { Ok(bpb) }
    }

    /// Size of a cluster in bytes.
    pub fn cluster_size(&self) -> u32 {
        self.sec_per_clus as u32 * SECTOR_SIZE as u32
    }

    /// Total count of sectors, whichever field carries it.
    pub fn tot_sec(&self) -> u32 {
        if self.tot_sec_16 != 0 {
            self.tot_sec_16.into()
        } else {
            self.tot_sec_32
        }
    }

    /// First sector of the data region (cluster 2).
    pub fn first_data_sector(&self) -> u64 {
        self.rsvd_sec_cnt as u64 + self.num_fat as u64 * self.fat_sz_32 as u64
    }

    /// Determines the number of clusters the header declares in the data region.
    ///
    /// A damaged header may declare fewer sectors than the metadata regions need; the
    /// count is then 0.
    pub fn cluster_count(&self) -> u32 {
        let data_sec = (self.tot_sec() as u64).saturating_sub(self.first_data_sector());
        match self.sec_per_clus {
            0 => 0,
            sec_per_clus => (data_sec / sec_per_clus as u64) as u32,
        }
    }

    /// The volume label with its space padding removed.
    pub fn volume_label(&self) -> String {
        String::from_utf8_lossy(&self.vol_lab).trim_end().to_string()
    }

    /// Applies the strict FAT32 rules to a decoded header.
    ///
    /// The checks run in on-disk order, so the first damaged field is the one reported.
    fn validate(self) -> Result<Self, FATError> {
        let jmp = self.jmp;
        if !matches!(jmp, [0xEB, _, 0x90] | [0xE9, _, _]) {
            return Err(FATError::InvalidJmp(format!(
                "0x{:02X}{:02X}{:02X}",
                jmp[0], jmp[1], jmp[2]
            )));
        }
        if !self.sec_per_clus.is_power_of_two() {
            return Err(FATError::InvalidSecPerClus(self.sec_per_clus));
        }
        if self.cluster_size() > 32 * 1024 {
            return Err(FATError::InvalidClusSz(self.cluster_size()));
        }
        if self.rsvd_sec_cnt == 0 {
            return Err(FATError::InvalidRsvdSecCnt(self.rsvd_sec_cnt));
        }
        if self.num_fat == 0 {
            return Err(FATError::InvalidNumFat(self.num_fat));
        }
        if self.root_ent_cnt != 0 {
            return Err(FATError::InvalidRootEntCnt(self.root_ent_cnt));
        }
        match (self.fat_sz_16, self.fat_sz_32) {
            (0, 0) => {
                return Err(FATError::InvalidFatSz(
                    "FAT32 volumes need a non-zero 32-bit FAT size".to_string(),
                ));
            }
            (0, _) => {}
            (sz, _) => {
                return Err(FATError::InvalidFatSz(format!(
                    "16-bit FAT size {sz} on a FAT32 volume"
                )));
            }
        }
        if self.root_clus < 2 {
            return Err(FATError::InvalidRootClus(self.root_clus));
        }
        if self.sig != [0x55, 0xAA] {
            return Err(FATError::InvalidSignature(format!(
                "0x{:02X}{:02X}",
                self.sig[0], self.sig[1]
            )));
        }

        Ok(self)
    }
}

/// Implements the Display trait for Bpb
impl fmt::Display for Bpb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut offset = 0;

        macro_rules! field {
            ($name:expr, $val:expr, $size:expr) => {{
                writeln!(f, "  {:<20} 0x{:>04X}: {}", $name, offset, $val)?;
                offset += $size;
            }};
        }

        writeln!(f, "BIOS Parameter Block (Bpb):")?;

        field!("jmp", format!("{:02X?}", self.jmp), 3);
        field!("oem_name", String::from_utf8_lossy(&self.oem_name), 8);
        field!("bytes_per_sec", self.bytes_per_sec, 2);
        field!("sec_per_clus", self.sec_per_clus, 1);
        field!("rsvd_sec_cnt", self.rsvd_sec_cnt, 2);
        field!("num_fat", self.num_fat, 1);
        field!("root_ent_cnt", self.root_ent_cnt, 2);
        field!("tot_sec_16", self.tot_sec_16, 2);
        field!("media", format!("0x{:X}", self.media), 1);
        field!("fat_sz_16", self.fat_sz_16, 2);
        field!("sec_per_trk", self.sec_per_trk, 2);
        field!("num_heads", self.num_heads, 2);
        field!("hidd_sec", self.hidd_sec, 4);
        field!("tot_sec_32", self.tot_sec_32, 4);

        writeln!(f, "\nFAT32 Extended Boot Record (EBR):")?;

        field!("fat_sz_32", self.fat_sz_32, 4);
        field!("ext_flags", format!("0x{:04X}", self.ext_flags), 2);
        field!("fs_ver", self.fs_ver, 2);
        field!("root_clus", self.root_clus, 4);
        field!("fs_info", self.fs_info, 2);
        field!("bk_boot_sec", self.bk_boot_sec, 2);
        field!("reserved", format!("{:02X?}", &self.reserved[..]), 12);
        field!("drv_num", format!("0x{:X}", self.drv_num), 1);
        field!("reserved_1", self.reserved_1, 1);
        field!("boot_sig", format!("0x{:X}", self.boot_sig), 1);
        field!("vol_id", format!("0x{:08X}", self.vol_id), 4);
        field!("vol_lab", String::from_utf8_lossy(&self.vol_lab), 11);
        field!(
            "fil_sys_type",
            String::from_utf8_lossy(&self.fil_sys_type),
            8
        );

        writeln!(
            f,
            "\n  Boot code            0x{:04X}: {} bytes",
            offset,
            self.boot_code.len()
        )?;
        offset += self.boot_code.len();
        writeln!(f, "  Signature            0x{:04X}: {:02X?}", offset, self.sig)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::testing::{Geometry, boot_sector};
    use std::io::Cursor;

    fn parse(sector: [u8; 512], validate: bool) -> Result<Bpb, FATError> {
        Bpb::from(&mut Cursor::new(sector.to_vec()), validate)
    }

    #[test]
    fn decodes_geometry() {
        let bpb = parse(boot_sector(&Geometry::default()), true).unwrap();

        assert_eq!(*bpb.bytes_per_sec(), 512);
        assert_eq!(*bpb.sec_per_clus(), 1);
        assert_eq!(*bpb.rsvd_sec_cnt(), 4);
        assert_eq!(*bpb.num_fat(), 2);
        assert_eq!(*bpb.fat_sz_32(), 1);
        assert_eq!(*bpb.root_clus(), 2);
        assert_eq!(*bpb.fs_info(), 1);
        assert_eq!(*bpb.vol_id(), 0x1234ABCD);
        assert_eq!(bpb.volume_label(), "RECOVERY");
        assert_eq!(bpb.cluster_size(), 512);
        assert_eq!(bpb.first_data_sector(), 6);
        assert_eq!(bpb.cluster_count(), 126);
    }

    #[test]
    fn rejects_other_sector_sizes() {
        let mut sector = boot_sector(&Geometry::default());
        sector[11..13].copy_from_slice(&4096u16.to_le_bytes());

        match parse(sector, false) {
            Err(FATError::UnsupportedSectorSize { expected, actual }) => {
                assert_eq!(expected, 512);
                assert_eq!(actual, 4096);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_clusters_without_validation() {
        let mut sector = boot_sector(&Geometry::default());
        sector[13] = 0;

        assert!(matches!(
            parse(sector, false),
            Err(FATError::InvalidSecPerClus(0))
        ));
    }

    #[test]
    fn strict_validation_is_optional() {
        let mut sector = boot_sector(&Geometry::default());
        sector[510] = 0;

        assert!(matches!(
            parse(sector, true),
            Err(FATError::InvalidSignature(_))
        ));
        assert!(parse(sector, false).is_ok());
    }

    #[test]
    fn strict_validation_checks_fat32_fields() {
        let mut sector = boot_sector(&Geometry::default());
        sector[13] = 3;
        assert!(matches!(
            parse(sector, true),
            Err(FATError::InvalidSecPerClus(3))
        ));

        let mut sector = boot_sector(&Geometry::default());
        sector[44..48].copy_from_slice(&1u32.to_le_bytes());
        assert!(matches!(
            parse(sector, true),
            Err(FATError::InvalidRootClus(1))
        ));

        let mut sector = boot_sector(&Geometry::default());
        sector[22..24].copy_from_slice(&8u16.to_le_bytes());
        assert!(matches!(parse(sector, true), Err(FATError::InvalidFatSz(_))));
        assert!(parse(sector, false).is_ok());
    }

    #[test]
    fn display_lists_both_records() {
        let bpb = parse(boot_sector(&Geometry::default()), false).unwrap();
        let text = bpb.to_string();

        assert!(text.contains("BIOS Parameter Block"));
        assert!(text.contains("Extended Boot Record"));
        assert!(text.contains("RECOVERY"));
    }

    #[test]
    fn truncated_sector_is_an_io_error() {
        let result = Bpb::from(&mut Cursor::new(vec![0u8; 100]), false);
        assert!(matches!(result, Err(FATError::IOError(_))));
    }
}
