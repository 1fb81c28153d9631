//! Partition tables and disk images.
//!
//! A disk image is opened once and shared; each partition is exposed as a window over it,
//! onto which a FAT32 volume can be mounted.

pub mod disk;
pub mod disk_error;
pub mod mbr;
