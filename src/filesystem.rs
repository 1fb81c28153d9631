//! FAT32 volume reading and cluster chain reconstruction.

pub mod allocation_table;
pub mod bpb;
pub mod chain;
pub mod chain_reader;
pub mod fat;
pub mod fat_error;
pub mod fs_info;

#[cfg(test)]
mod testing;
