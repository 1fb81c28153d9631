//! Export of reconstructed chains to files.
//!
//! Each chain is written to `data_NNNN.<ext>`, where the extension comes from a look at
//! the first bytes of the chain. AVI files carry their own length, which trims the slack
//! of their last cluster; other payloads keep the whole chain.

use getset::Getters;
use log::{info, warn};
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::filesystem::chain::FATChain;
use crate::filesystem::fat::FATVol;
use crate::filesystem::fat_error::FATError;
use crate::traits::BoundedRead;
use crate::utils;

/// Number of leading bytes needed to recognise a payload.
pub const SNIFF_LEN: usize = 12;

const RIFF_MAGIC: &[u8] = b"RIFF";
const AVI_MAGIC: &[u8] = b"AVI ";
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Recognised content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Avi,
    Jpeg,
    Binary,
}

impl PayloadKind {
    /// File extension used for exported chains.
    pub fn extension(&self) -> &'static str {
        match self {
            PayloadKind::Avi => "avi",
            PayloadKind::Jpeg => "jpg",
            PayloadKind::Binary => "bin",
        }
    }
}

/// What a chain holds and how many of its bytes belong to the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload {
    pub kind: PayloadKind,
    pub len: u64,
}

/// Classifies a chain from its first bytes.
///
/// # Parameters
/// - `header`: The first bytes of the chain, [`SNIFF_LEN`] of them when available
/// - `chain_len`: The size of the chain in bytes
pub fn sniff(header: &[u8], chain_len: u64) -> Payload {
    if header.len() >= SNIFF_LEN && header.starts_with(RIFF_MAGIC) && &header[8..12] == AVI_MAGIC
    {
        // The RIFF size field excludes the 8-byte RIFF header.
        let riff_len = utils::u32_at(header, 4) as u64 + 8;
        return Payload {
            kind: PayloadKind::Avi,
            len: riff_len.min(chain_len),
        };
    }

    let kind = if header.starts_with(JPEG_MAGIC) {
        PayloadKind::Jpeg
    } else {
        PayloadKind::Binary
    };

    Payload {
        kind,
        len: chain_len,
    }
}

/// Outcome of a batch export.
#[derive(Debug, Default, Getters)]
pub struct ExportReport {
    /// Files written, in chain order.
    #[get = "pub"]
    written: Vec<PathBuf>,
    /// Number of chains that could not be exported.
    #[get = "pub"]
    failed: usize,
}

/// Writes the content of every chain into `dir`.
///
/// A chain that cannot be read or written is logged and counted; the batch goes on.
///
/// # Errors
/// - `io::Error` if the output directory cannot be created
pub fn export_chains<S: Read + Seek>(
    vol: &FATVol<S>,
    chains: &[FATChain],
    dir: &Path,
) -> io::Result<ExportReport> {
    fs::create_dir_all(dir)?;
    let mut report = ExportReport::default();

    for (i, chain) in chains.iter().enumerate() {
        match export_chain(vol, i, chain, dir) {
            Ok((path, payload)) => {
                info!(
                    "Saved chain {}/{} as {} ({} bytes)",
                    i + 1,
                    chains.len(),
                    path.display(),
                    payload.len
                );
                report.written.push(path);
            }
            Err(err) => {
                warn!("Failed to export chain {} ({chain}): {err}", i + 1);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

fn export_chain<S: Read + Seek>(
    vol: &FATVol<S>,
    index: usize,
    chain: &FATChain,
    dir: &Path,
) -> Result<(PathBuf, Payload), FATError> {
    let mut reader = vol.open_chain_reader(chain)?;

    let mut header = [0u8; SNIFF_LEN];
    let transfer = reader.read_bounded(&mut header)?;
    let payload = sniff(&header[..transfer.count], reader.size());

    let path = dir.join(format!("data_{index:04}.{}", payload.kind.extension()));
    let mut file = File::create(&path)?;

    reader.seek(SeekFrom::Start(0))?;
    let copied = io::copy(&mut reader.take(payload.len), &mut file)?;
    if copied < payload.len {
        warn!(
            "Chain {} ended after {copied} of {} bytes",
            index + 1,
            payload.len
        );
    }

    Ok((path, payload))
}
