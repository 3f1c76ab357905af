//! Big-endian codec primitives shared by the DOL and GCM parsers.
//!
//! Every multi-byte field in a DOL or GCM image is big-endian, regardless
//! of the endianness of the host doing the patching. Rather than hand-roll
//! shift/mask pairs (easy to get backwards on a little-endian host), this
//! goes through `scroll`'s `Pread`/`Pwrite` with an explicit `scroll::BE`
//! context, the same way the teacher reads every ELF/PE field.

use crate::error::Result;
use scroll::{Pread, Pwrite, BE};

/// Read a big-endian `u16` at `offset`.
#[inline]
pub fn read_u16(buf: &[u8], offset: usize) -> Result<u16> {
    Ok(buf.pread_with::<u16>(offset, BE)?)
}

/// Read a big-endian `u32` at `offset`.
#[inline]
pub fn read_u32(buf: &[u8], offset: usize) -> Result<u32> {
    Ok(buf.pread_with::<u32>(offset, BE)?)
}

/// Write a big-endian `u16` at `offset`.
#[inline]
pub fn write_u16(buf: &mut [u8], offset: usize, value: u16) -> Result<()> {
    buf.pwrite_with::<u16>(value, offset, BE)?;
    Ok(())
}

/// Write a big-endian `u32` at `offset`.
#[inline]
pub fn write_u32(buf: &mut [u8], offset: usize, value: u32) -> Result<()> {
    buf.pwrite_with::<u32>(value, offset, BE)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_u32() {
        let mut buf = [0u8; 8];
        write_u32(&mut buf, 2, 0x8000_3100).unwrap();
        assert_eq!(buf[2..6], [0x80, 0x00, 0x31, 0x00]);
        assert_eq!(read_u32(&buf, 2).unwrap(), 0x8000_3100);
    }

    #[test]
    fn round_trips_u16() {
        let mut buf = [0u8; 4];
        write_u16(&mut buf, 0, 0xBEEF).unwrap();
        assert_eq!(buf[0..2], [0xBE, 0xEF]);
        assert_eq!(read_u16(&buf, 0).unwrap(), 0xBEEF);
    }
}
