//! Declaration of traits reused across the code.

use std::fmt;
use std::io::{Read, Result, Seek};

/// Implementation of the LayoutDisplay trait.
/// It is used to display the layout of a given structure such as a disk or partition.
pub trait LayoutDisplay {
    fn display_layout(&self, indent: u8) -> std::result::Result<String, fmt::Error>;
}

/// Outcome of a bounded read.
///
/// `end_of_stream` is set on the same call that transfers the last bytes of the
/// stream, or when nothing is left to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    /// Number of bytes written into the destination buffer.
    pub count: usize,
    /// Whether the end of the stream was reached or exceeded by the request.
    pub end_of_stream: bool,
}

/// A seekable byte stream of known length that reports end-of-stream together with the
/// last bytes it transfers.
///
/// Implementors are peers ([`crate::WindowedReader`], [`crate::filesystem::chain_reader::ChainReader`]),
/// not layers of each other.
pub trait BoundedRead: Read + Seek {
    /// Total length of the stream in bytes.
    fn size(&self) -> u64;

    /// Reads up to `buf.len()` bytes and reports whether the end of the stream was reached.
    fn read_bounded(&mut self, buf: &mut [u8]) -> Result<Transfer>;
}
