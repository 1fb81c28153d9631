//! Bounded, offset-remapping views over a shared seekable source.
//!
//! A [`WindowedReader`] maps the byte range `[base, limit)` of an underlying source onto
//! `[0, limit - base)`. Windows are used to look at a partition inside a disk image and
//! at a contiguous cluster chain inside a partition.
//!
//! Nesting never stacks readers: [`WindowedReader::sub_window`] folds the parent's base
//! offset into the new window and checks the parent's bound, so every window holds the
//! ultimate source directly.
//!
//! # Concurrency
//! All windows opened over one source share a single physical cursor. Every read
//! reseeks before transferring bytes, which keeps interleaved use of several windows
//! correct on one thread. The source is held in an `Rc<RefCell<_>>`, so windows cannot
//! be sent to other threads.

mod window_error;

use getset::Getters;
use std::cell::RefCell;
use std::io::{self, Read, Seek, SeekFrom};
use std::rc::Rc;

pub use window_error::WindowError;

use crate::traits::{BoundedRead, Transfer};

/// A seekable source shared between windows.
pub type SharedSource<S> = Rc<RefCell<S>>;

/// Wraps a seekable source so windows can share it.
pub fn share<S: Read + Seek>(source: S) -> SharedSource<S> {
    Rc::new(RefCell::new(source))
}

/// A seekable byte-range view over a shared source.
///
/// Invariant: `0 <= current_offset <= size`, and no read ever touches bytes outside
/// `[base_offset, base_offset + size)` of the source.
#[derive(Getters)]
pub struct WindowedReader<S> {
    source: SharedSource<S>,
    /// Offset of the window's first byte in the underlying source.
    #[get = "pub"]
    base_offset: u64,
    size: u64,
    /// Logical cursor, relative to the window.
    #[get = "pub"]
    current_offset: u64,
}

impl<S> Clone for WindowedReader<S> {
    fn clone(&self) -> Self {
        Self {
            source: Rc::clone(&self.source),
            base_offset: self.base_offset,
            size: self.size,
            current_offset: self.current_offset,
        }
    }
}

impl<S: Read + Seek> WindowedReader<S> {
    /// Opens a window over `[base_offset, limit)` of a raw source.
    ///
    /// # Errors
    /// - `WindowError::InvertedRange` if `limit <= base_offset`
    pub fn open(
        source: SharedSource<S>,
        base_offset: u64,
        limit: u64,
    ) -> Result<Self, WindowError> {
        if limit <= base_offset {
            return Err(WindowError::InvertedRange {
                base: base_offset,
                limit,
            });
        }

        Ok(Self {
            source,
            base_offset,
            size: limit - base_offset,
            current_offset: 0,
        })
    }

    /// Opens a window covering the whole source, from byte 0 to its current end.
    ///
    /// # Errors
    /// - `WindowError::Io` if the length of the source cannot be determined
    /// - `WindowError::InvertedRange` if the source is empty
    pub fn whole(source: SharedSource<S>) -> Result<Self, WindowError> {
        let len = source.borrow_mut().seek(SeekFrom::End(0))?;
        Self::open(source, 0, len)
    }

    /// Opens a window over `[base_offset, limit)` of this window.
    ///
    /// The result refers to the same underlying source as `self`, with the base offsets
    /// added up, so nesting depth never adds indirection.
    ///
    /// # Errors
    /// - `WindowError::InvertedRange` if `limit <= base_offset`
    /// - `WindowError::ExceedsParent` if `limit` lies beyond the end of this window
    pub fn sub_window(&self, base_offset: u64, limit: u64) -> Result<Self, WindowError> {
        if limit <= base_offset {
            return Err(WindowError::InvertedRange {
                base: base_offset,
                limit,
            });
        }
        if limit > self.size {
            return Err(WindowError::ExceedsParent {
                limit,
                parent_size: self.size,
            });
        }

        Ok(Self {
            source: Rc::clone(&self.source),
            base_offset: self.base_offset + base_offset,
            size: limit - base_offset,
            current_offset: 0,
        })
    }

    /// Whether the logical cursor sits at the end of the window.
    ///
    /// This is the end-of-stream signal of a seek at or past the end, which is clamped
    /// to `size` instead of failing.
    pub fn is_exhausted(&self) -> bool {
        self.current_offset >= self.size
    }

    /// Whether two windows read from the same underlying source.
    pub fn shares_source_with(&self, other: &WindowedReader<S>) -> bool {
        Rc::ptr_eq(&self.source, &other.source)
    }
}

impl<S: Read + Seek> BoundedRead for WindowedReader<S> {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_bounded(&mut self, buf: &mut [u8]) -> io::Result<Transfer> {
        let remaining = self.size - self.current_offset;
        let crosses_end = buf.len() as u64 > remaining;
        let wanted = if crosses_end {
            remaining as usize
        } else {
            buf.len()
        };

        let mut source = self
            .source
            .try_borrow_mut()
            .map_err(|_| io::Error::other("underlying source is already in use"))?;

        // The physical cursor may have been moved by another window.
        source.seek(SeekFrom::Start(self.base_offset + self.current_offset))?;

        let mut count = 0;
        let mut source_exhausted = false;
        while count < wanted {
            match source.read(&mut buf[count..wanted]) {
                Ok(0) => {
                    source_exhausted = true;
                    break;
                }
                Ok(n) => count += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        self.current_offset += count as u64;

        Ok(Transfer {
            count,
            end_of_stream: crosses_end || source_exhausted,
        })
    }
}

impl<S: Read + Seek> Read for WindowedReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_bounded(buf).map(|transfer| transfer.count)
    }
}

impl<S: Read + Seek> Seek for WindowedReader<S> {
    /// Moves the logical cursor. The physical seek is deferred to the next read.
    ///
    /// Targets at or past the end are clamped to the window size.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::Current(delta) => i128::from(self.current_offset) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(self.size) + i128::from(delta),
        };

        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid seek to a negative position ({target})"),
            ));
        }

        self.current_offset = if target >= i128::from(self.size) {
            self.size
        } else {
            target as u64
        };

        Ok(self.current_offset)
    }
}
