//! Cluster chain reconstruction from the allocation table alone.
//!
//! Every entry that ends a chain seeds one chain. The chain is traced back through a
//! reversed copy of the table until a cluster without predecessor is found, then walked
//! forward once more to measure it and decide whether its clusters are adjacent.
//!
//! A link that was zeroed (or holds the invalid value 1) breaks a chain in two. The
//! cluster it belongs to still closes the segment leading to it, so both halves are
//! reported.

use getset::Getters;
use log::{debug, warn};
use std::fmt;

use super::allocation_table::{AllocationTable, Link};
use super::fat_error::InternalError;
use crate::utils;

/// Slot value of the reversed table for clusters nothing links to.
///
/// Cluster 0 is reserved, so it is never recorded as a predecessor.
const NO_PREDECESSOR: u32 = 0;

/// A maximal sequence of linked clusters, believed to hold one file.
///
/// The size is a whole number of clusters. A chain is only meaningful against the table
/// it was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters)]
pub struct FATChain {
    /// First cluster of the chain.
    #[get = "pub"]
    start_cluster: u32,
    /// Whether every link goes to the next adjacent cluster.
    #[get = "pub"]
    contiguous: bool,
    /// Length of the chain in bytes.
    #[get = "pub"]
    size_bytes: u64,
}

impl FATChain {
    pub(crate) fn new(start_cluster: u32, contiguous: bool, size_bytes: u64) -> Self {
        Self {
            start_cluster,
            contiguous,
            size_bytes,
        }
    }
}

impl fmt::Display for FATChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cluster {:>10} {:>12} {}",
            self.start_cluster,
            utils::human_size(self.size_bytes),
            if self.contiguous {
                "contiguous"
            } else {
                "fragmented"
            }
        )
    }
}

/// Builds the reversed table: `reverse[j] == i` whenever cluster `i` links to cluster `j`.
///
/// Free entries add no edge. If several clusters claim the same successor, the highest one
/// is kept.
fn reverse_table(table: &AllocationTable) -> Vec<u32> {
    let mut reverse = vec![NO_PREDECESSOR; table.entries().len()];

    for (cluster, link) in table.links() {
        if let Link::Next(next) = link {
            reverse[next as usize] = cluster;
        }
    }

    reverse
}

/// Follows predecessors from `tail` to the first cluster of its chain.
///
/// Returns the first cluster and the chain length in clusters.
fn trace_back(reverse: &[u32], tail: u32) -> Result<(u32, u64), InternalError> {
    let mut start = tail;
    let mut length = 1u64;

    while reverse[start as usize] != NO_PREDECESSOR {
        start = reverse[start as usize];
        length += 1;

        if length > reverse.len() as u64 {
            return Err(InternalError::ChainCycle { cluster: tail });
        }
    }

    Ok((start, length))
}

/// Walks from `start` to the end of its chain, or to the first cluster whose link is lost.
///
/// Returns the last cluster, the length in clusters, and whether every link goes to the
/// adjacent cluster.
fn walk_forward(table: &AllocationTable, start: u32) -> Result<(u32, u64, bool), InternalError> {
    let mut cluster = start;
    let mut length = 1u64;
    let mut contiguous = true;

    loop {
        match table.link(cluster) {
            Some(Link::End | Link::Free | Link::Invalid) => {
                return Ok((cluster, length, contiguous));
            }
            Some(Link::Next(next)) => {
                contiguous &= next == cluster + 1;
                cluster = next;
                length += 1;

                if length > table.entries().len() as u64 {
                    return Err(InternalError::ChainCycle { cluster: start });
                }
            }
            None => {
                return Err(InternalError::ChainExhausted {
                    cluster,
                    link: 0,
                    remaining: 0,
                });
            }
        }
    }
}

/// Discovers every chain of the table.
///
/// Chains are returned in ascending order of their last cluster, which makes the result
/// reproducible for a given table. A free or invalid entry closes a chain when another
/// cluster links to it.
///
/// # Errors
/// Only logic defects are reported, as `InternalError`: a damaged table yields more or
/// shorter chains, never an error.
pub fn reconstruct(
    table: &AllocationTable,
    cluster_size: u32,
) -> Result<Vec<FATChain>, InternalError> {
    let reverse = reverse_table(table);
    let mut chains = vec![];
    let mut broken = 0usize;

    for (tail, link) in table.links() {
        let entry = table.entry(tail).unwrap_or(0);
        match link {
            Link::End if entry < table.cluster_count() => {
                return Err(InternalError::TailIsMidChain {
                    cluster: tail,
                    entry,
                });
            }
            Link::End => {}
            Link::Free | Link::Invalid if reverse[tail as usize] != NO_PREDECESSOR => {
                broken += 1;
            }
            _ => continue,
        }

        let (start, length) = trace_back(&reverse, tail)?;
        let (last, walked, contiguous) = walk_forward(table, start)?;
        if last != tail || walked != length {
            return Err(InternalError::TailIsMidChain {
                cluster: tail,
                entry,
            });
        }

        chains.push(FATChain::new(
            start,
            contiguous,
            length * cluster_size as u64,
        ));
    }

    if broken > 0 {
        warn!("{broken} chains end on a lost link");
    }
    debug!(
        "Reconstructed {} chains from {} FAT entries",
        chains.len(),
        table.cluster_count()
    );

    Ok(chains)
}

/// Aggregated figures over a set of chains.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChainSummary {
    pub chains: usize,
    pub contiguous: usize,
    pub total_bytes: u64,
}

impl From<&[FATChain]> for ChainSummary {
    fn from(chains: &[FATChain]) -> Self {
        chains.iter().fold(Self::default(), |mut summary, chain| {
            summary.chains += 1;
            summary.contiguous += usize::from(chain.contiguous);
            summary.total_bytes += chain.size_bytes;
            summary
        })
    }
}

impl fmt::Display for ChainSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Found {} chains in the FAT, {} were on contiguous clusters ({} in total).",
            self.chains,
            self.contiguous,
            utils::human_size(self.total_bytes)
        )
    }
}
