//! Byte streams over reconstructed chains.
//!
//! Contiguous chains are read through a single window over the volume. Fragmented chains
//! are read cluster by cluster, following the allocation table.

use std::io::{self, Read, Seek, SeekFrom};

use super::allocation_table::Link;
use super::chain::FATChain;
use super::fat::FATVol;
use super::fat_error::InternalError;
use crate::traits::{BoundedRead, Transfer};
use crate::window::WindowedReader;

/// Reader over the content of one chain.
pub enum ChainReader<'a, S> {
    /// Bounded linear read over adjacent clusters.
    Contiguous(WindowedReader<S>),
    /// Cluster-by-cluster read following the table.
    Fragmented(ClusterWalker<'a, S>),
}

impl<S: Read + Seek> ChainReader<'_, S> {
    /// Whether this reader uses the single-window path.
    pub fn is_contiguous(&self) -> bool {
        matches!(self, ChainReader::Contiguous(_))
    }

    /// Whether the cursor sits at the end of the chain, for instance after a seek past it.
    pub fn is_exhausted(&self) -> bool {
        match self {
            ChainReader::Contiguous(window) => window.is_exhausted(),
            ChainReader::Fragmented(walker) => walker.is_exhausted(),
        }
    }
}

impl<S: Read + Seek> BoundedRead for ChainReader<'_, S> {
    fn size(&self) -> u64 {
        match self {
            ChainReader::Contiguous(window) => window.size(),
            ChainReader::Fragmented(walker) => walker.size(),
        }
    }

    fn read_bounded(&mut self, buf: &mut [u8]) -> io::Result<Transfer> {
        match self {
            ChainReader::Contiguous(window) => window.read_bounded(buf),
            ChainReader::Fragmented(walker) => walker.read_bounded(buf),
        }
    }
}

impl<S: Read + Seek> Read for ChainReader<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_bounded(buf).map(|transfer| transfer.count)
    }
}

impl<S: Read + Seek> Seek for ChainReader<'_, S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            ChainReader::Contiguous(window) => window.seek(pos),
            ChainReader::Fragmented(walker) => walker.seek(pos),
        }
    }
}

/// Reads a chain by following its links in the allocation table.
///
/// The walker moves to the next cluster lazily, when a read needs bytes from it.
pub struct ClusterWalker<'a, S> {
    volume: &'a FATVol<S>,
    view: WindowedReader<S>,
    start_cluster: u32,
    /// Cluster holding the byte at `position`, once `cluster_index` has caught up.
    cluster: u32,
    /// Index of `cluster` within the chain.
    cluster_index: u64,
    position: u64,
    size: u64,
}

impl<'a, S: Read + Seek> ClusterWalker<'a, S> {
    /// Creates a walker positioned at the first byte of the chain.
    ///
    /// The start cluster must already have been validated by the volume.
    pub(super) fn new(volume: &'a FATVol<S>, view: WindowedReader<S>, chain: &FATChain) -> Self {
        Self {
            volume,
            view,
            start_cluster: *chain.start_cluster(),
            cluster: *chain.start_cluster(),
            cluster_index: 0,
            position: 0,
            size: *chain.size_bytes(),
        }
    }

    /// Whether every byte of the chain has been read or skipped.
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.size
    }

    /// Follows the link of the current cluster.
    fn advance(&mut self) -> Result<(), InternalError> {
        match self.volume.allocation_table().link(self.cluster) {
            Some(Link::Next(next)) => {
                self.cluster = next;
                self.cluster_index += 1;
                Ok(())
            }
            _ => Err(InternalError::ChainExhausted {
                cluster: self.cluster,
                link: self
                    .volume
                    .allocation_table()
                    .entry(self.cluster)
                    .unwrap_or(0),
                remaining: self.size - self.position,
            }),
        }
    }
}

impl<S: Read + Seek> BoundedRead for ClusterWalker<'_, S> {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_bounded(&mut self, buf: &mut [u8]) -> io::Result<Transfer> {
        let cluster_size = self.volume.cluster_size() as u64;
        let remaining = self.size - self.position;
        let crosses_end = buf.len() as u64 > remaining;
        let wanted = if crosses_end {
            remaining as usize
        } else {
            buf.len()
        };

        let mut count = 0;
        while count < wanted {
            let target_index = self.position / cluster_size;
            while self.cluster_index < target_index {
                if let Err(err) = self.advance() {
                    // Hand over what was read; the next call reports the break.
                    if count > 0 {
                        return Ok(Transfer {
                            count,
                            end_of_stream: false,
                        });
                    }
                    return Err(err.into());
                }
            }

            let in_cluster = self.position % cluster_size;
            let chunk = (cluster_size - in_cluster).min((wanted - count) as u64) as usize;

            self.view.seek(SeekFrom::Start(
                self.volume.data_offset(self.cluster, in_cluster),
            ))?;
            let transfer = self.view.read_bounded(&mut buf[count..count + chunk])?;
            count += transfer.count;
            self.position += transfer.count as u64;

            // The volume ends before the chain does.
            if transfer.count < chunk {
                return Ok(Transfer {
                    count,
                    end_of_stream: true,
                });
            }
        }

        Ok(Transfer {
            count,
            end_of_stream: crosses_end,
        })
    }
}

impl<S: Read + Seek> Read for ClusterWalker<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_bounded(buf).map(|transfer| transfer.count)
    }
}

impl<S: Read + Seek> Seek for ClusterWalker<'_, S> {
    /// Moves within the chain, clamping at its end like a window does.
    ///
    /// Seeking backwards restarts the walk from the first cluster.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::Current(delta) => i128::from(self.position) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(self.size) + i128::from(delta),
        };

        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid seek to a negative position ({target})"),
            ));
        }

        self.position = if target >= i128::from(self.size) {
            self.size
        } else {
            target as u64
        };

        if self.position / (self.volume.cluster_size() as u64) < self.cluster_index {
            self.cluster = self.start_cluster;
            self.cluster_index = 0;
        }

        Ok(self.position)
    }
}
