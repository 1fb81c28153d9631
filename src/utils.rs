use std::io::{self, Read, Seek, SeekFrom};

/// Reads a specific sector from a reader into a buffer.
///
/// # Arguments
///
/// - `reader`: A mutable reference to the source to read from.
/// - `sector`: The sector number to read.
/// - `sector_size`: The size in bytes of a sector.
/// - `buffer`: A mutable reference to a vector where the sector data will be stored.
///
/// The buffer will be resized to match the sector size. The source is always reseeked
/// before reading, since other readers may share its cursor.
///
/// # Errors
///
/// Returns an `io::Error` if the sector cannot be read.
pub fn read_sector<T: Read + Seek>(
    reader: &mut T,
    sector: u64,
    sector_size: usize,
    buffer: &mut Vec<u8>,
) -> io::Result<()> {
    buffer.resize(sector_size, 0);

    reader.seek(SeekFrom::Start(sector_size as u64 * sector))?;

    reader.read_exact(buffer).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("Failed to read sector {}: {}", sector, err),
        )
    })?;

    Ok(())
}

/// Reads up to `len` bytes starting at `offset`.
///
/// The buffer only grows with the bytes the source actually holds, so a huge `len`
/// taken from a damaged header cannot exhaust memory. A result shorter than `len` means
/// the source ended first.
///
/// # Errors
///
/// Returns an `io::Error` carrying the offset if the source cannot be read.
pub fn read_at<T: Read + Seek>(reader: &mut T, offset: u64, len: u64) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();

    reader.seek(SeekFrom::Start(offset))?;
    reader
        .by_ref()
        .take(len)
        .read_to_end(&mut buffer)
        .map_err(|err| {
            io::Error::new(
                err.kind(),
                format!("Failed to read {len} bytes at offset {offset}: {err}"),
            )
        })?;

    Ok(buffer)
}

/// Extracts a 32-bit unsigned integer from a buffer at a given offset.
///
/// # Arguments
///
/// - `buffer`: A slice of bytes from which the value will be extracted.
/// - `offset`: The offset within the buffer where the 32-bit value starts.
///
/// # Panics
///
/// Panics if the slice does not contain enough bytes starting from the offset.
pub fn u32_at(buffer: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(
        buffer[offset..offset + 4]
            .try_into()
            .expect("invalid slice"),
    )
}

/// Extracts a 16-bit unsigned integer from a buffer at a given offset.
///
/// # Panics
///
/// Panics if the slice does not contain enough bytes starting from the offset.
pub fn u16_at(buffer: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buffer[offset], buffer[offset + 1]])
}

/// Decodes a buffer as a sequence of little-endian 32-bit values.
///
/// Trailing bytes that do not fill a whole value are ignored.
pub fn le_u32_values(buffer: &[u8]) -> Vec<u32> {
    buffer
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Formats a byte count with a binary unit suffix.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} {}", UNITS[0])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}
