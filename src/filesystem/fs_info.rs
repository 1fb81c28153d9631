//! FAT32 FSInfo sector.
//!
//! The FSInfo sector caches free-space hints. It is advisory: a volume whose FSInfo is
//! missing or damaged can still be read.

use binread::{BinRead, BinReaderExt};
use getset::Getters;
use std::fmt;
use std::io;

use super::bpb::Bpb;
use super::fat_error::FATError;
use crate::SECTOR_SIZE;
use crate::utils;

/// Value of `lead_sig`.
pub const LEAD_SIG: u32 = 0x41615252;
/// Value of `struc_sig`.
pub const STRUC_SIG: u32 = 0x61417272;
/// Value of `trail_sig`.
pub const TRAIL_SIG: u32 = 0xAA550000;

/// Value of a hint that the driver left unknown.
const UNKNOWN_HINT: u32 = 0xFFFFFFFF;

#[derive(BinRead, Debug, Getters)]
#[br(little)]
pub struct FsInfo {
    lead_sig: u32,
    #[br(count = 480)]
    _reserved_1: Vec<u8>,
    struc_sig: u32,
    /// Last known count of free clusters
    #[get = "pub"]
    free_count: u32,
    /// Hint for the first cluster to look at when allocating
    #[get = "pub"]
    nxt_free: u32,
    _reserved_2: [u8; 12],
    trail_sig: u32,
}

impl FsInfo {
    /// Reads the FSInfo sector designated by the Bpb and checks its three signatures.
    ///
    /// # Errors
    /// - `FATError::IOError` if the sector cannot be read
    /// - `FATError::InvalidFsInfoSignature` for the first signature that does not match;
    ///   the caller decides whether this is fatal
    pub fn from<T: io::Read + io::Seek>(reader: &mut T, bpb: &Bpb) -> Result<FsInfo, FATError> {
        let mut buf = vec![0; SECTOR_SIZE];
        utils::read_sector(reader, (*bpb.fs_info()).into(), SECTOR_SIZE, &mut buf)?;

        let fs_info: FsInfo = io::Cursor::new(buf).read_le()?;
        fs_info.validate()
    }

    fn validate(self) -> Result<Self, FATError> {
        let signatures = [
            ("lead signature", LEAD_SIG, self.lead_sig),
            ("structure signature", STRUC_SIG, self.struc_sig),
            ("trail signature", TRAIL_SIG, self.trail_sig),
        ];

        for (name, expected, actual) in signatures {
            if actual != expected {
                return Err(FATError::InvalidFsInfoSignature {
                    name,
                    expected,
                    actual,
                });
            }
        }

        Ok(self)
    }
}

fn hint(value: u32) -> String {
    match value {
        UNKNOWN_HINT => String::from("unknown"),
        v => v.to_string(),
    }
}

impl fmt::Display for FsInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FSInfo:")?;
        writeln!(f, "  {:<20} 0x{:08X}", "lead_sig", self.lead_sig)?;
        writeln!(f, "  {:<20} 0x{:08X}", "struc_sig", self.struc_sig)?;
        writeln!(f, "  {:<20} {}", "free_count", hint(self.free_count))?;
        writeln!(f, "  {:<20} {}", "nxt_free", hint(self.nxt_free))?;
        writeln!(f, "  {:<20} 0x{:08X}", "trail_sig", self.trail_sig)
    }
}
