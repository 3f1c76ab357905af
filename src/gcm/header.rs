//! The 0x2440-byte GCM disc-image header prefix.

extern crate alloc;

use alloc::string::String;

use crate::be;
use crate::error::{Error, Result};

/// Size in bytes of the GCM header prefix.
pub const HEADER_SIZE: usize = 0x2440;

const GAME_CODE: usize = 0x00;
const MAKER_CODE: usize = 0x06;
const DISC_ID: usize = 0x08;
const VERSION: usize = 0x09;
const AUDIO_STREAMING: usize = 0x0A;
const GAME_NAME: usize = 0x20;
const GAME_NAME_LEN: usize = 0x3E0;
const DOL_OFFSET: usize = 0x420;
const FST_OFFSET: usize = 0x424;
const FST_SIZE: usize = 0x428;
const FST_MAX_SIZE: usize = 0x42C;

const MAX_DISC_OFFSET: u32 = 0x1000_0000;

/// Parsed fields from a GCM disc-image header.
#[derive(Debug, Clone, Copy)]
pub struct GcmHeader {
    pub game_code: [u8; 6],
    pub maker_code: [u8; 2],
    pub disc_id: u8,
    pub version: u8,
    pub audio_streaming: u8,
    game_name: [u8; GAME_NAME_LEN],
    pub dol_offset: u32,
    pub fst_offset: u32,
    pub fst_size: u32,
    pub fst_max_size: u32,
}

impl GcmHeader {
    /// Parse the fixed-offset fields out of a `0x2440`-byte (or longer)
    /// buffer, validating the result.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::Malformed("GCM header shorter than 0x2440 bytes"));
        }

        let mut game_code = [0u8; 6];
        game_code.copy_from_slice(&data[GAME_CODE..GAME_CODE + 6]);
        let mut maker_code = [0u8; 2];
        maker_code.copy_from_slice(&data[MAKER_CODE..MAKER_CODE + 2]);
        let mut game_name = [0u8; GAME_NAME_LEN];
        game_name.copy_from_slice(&data[GAME_NAME..GAME_NAME + GAME_NAME_LEN]);

        let header = GcmHeader {
            game_code,
            maker_code,
            disc_id: data[DISC_ID],
            version: data[VERSION],
            audio_streaming: data[AUDIO_STREAMING],
            game_name,
            dol_offset: be::read_u32(data, DOL_OFFSET)?,
            fst_offset: be::read_u32(data, FST_OFFSET)?,
            fst_size: be::read_u32(data, FST_SIZE)?,
            fst_max_size: be::read_u32(data, FST_MAX_SIZE)?,
        };
        header.validate()?;
        Ok(header)
    }

    /// Write the modeled fields into the first [`HEADER_SIZE`] bytes of
    /// `data`, in place. `data` must already hold the disc image's real
    /// header bytes (from [`parse`](Self::parse) or a freshly loaded
    /// image): this only overwrites the byte ranges above, leaving
    /// `stream_buf_size`, the reserved `unused` block, and every other
    /// byte this type doesn't model untouched, the same way the original
    /// writer never zeroed or rebuilt the buffer it was handed.
    pub fn write_into(&self, data: &mut [u8]) {
        data[GAME_CODE..GAME_CODE + 6].copy_from_slice(&self.game_code);
        data[MAKER_CODE..MAKER_CODE + 2].copy_from_slice(&self.maker_code);
        data[DISC_ID] = self.disc_id;
        data[VERSION] = self.version;
        data[AUDIO_STREAMING] = self.audio_streaming;
        data[GAME_NAME..GAME_NAME + GAME_NAME_LEN].copy_from_slice(&self.game_name);
        be::write_u32(data, DOL_OFFSET, self.dol_offset).unwrap();
        be::write_u32(data, FST_OFFSET, self.fst_offset).unwrap();
        be::write_u32(data, FST_SIZE, self.fst_size).unwrap();
        be::write_u32(data, FST_MAX_SIZE, self.fst_max_size).unwrap();
    }

    /// Validate: non-zero game code, `dol_offset` in
    /// `[0x2440, 0x10000000)`, `fst_offset` in `[dol_offset, 0x10000000)`.
    pub fn validate(&self) -> Result<()> {
        if self.game_code[0] == 0 {
            return Err(Error::Malformed("empty game code"));
        }
        if self.dol_offset < HEADER_SIZE as u32 || self.dol_offset >= MAX_DISC_OFFSET {
            return Err(Error::Malformed("DOL offset out of range"));
        }
        if self.fst_offset < self.dol_offset || self.fst_offset >= MAX_DISC_OFFSET {
            return Err(Error::Malformed("FST offset out of range"));
        }
        Ok(())
    }

    /// Override the 6-byte game code, e.g. from `--id`.
    pub fn set_game_code(&mut self, code: &str) {
        let bytes = code.as_bytes();
        let n = bytes.len().min(self.game_code.len());
        self.game_code[..n].copy_from_slice(&bytes[..n]);
        for slot in self.game_code[n..].iter_mut() {
            *slot = 0;
        }
    }

    /// The NUL-padded 0x3E0-byte game name, trimmed at the first NUL and
    /// decoded lossily (region names are not guaranteed to be ASCII).
    pub fn game_name(&self) -> alloc::borrow::Cow<'_, str> {
        let end = self.game_name.iter().position(|&b| b == 0).unwrap_or(self.game_name.len());
        alloc::string::String::from_utf8_lossy(&self.game_name[..end])
    }
}

impl core::fmt::Display for GcmHeader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "GCM Header:")?;
        writeln!(f, "  Game: {}", self.game_name())?;
        writeln!(f, "  Code: {}", String::from_utf8_lossy(&self.game_code))?;
        writeln!(f, "  Maker: {}", String::from_utf8_lossy(&self.maker_code))?;
        writeln!(f, "  DOL Offset: {:#010x}", self.dol_offset)?;
        writeln!(f, "  FST Offset: {:#010x}", self.fst_offset)?;
        writeln!(f, "  FST Size: {:#010x}", self.fst_size)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bytes() -> alloc::vec::Vec<u8> {
        let mut buf = alloc::vec![0u8; HEADER_SIZE];
        buf[0..6].copy_from_slice(b"GDHE01");
        buf[GAME_NAME..GAME_NAME + 11].copy_from_slice(b"Hello Game\0");
        be::write_u32(&mut buf, DOL_OFFSET, 0x2440).unwrap();
        be::write_u32(&mut buf, FST_OFFSET, 0x10_0000).unwrap();
        buf
    }

    #[test]
    fn parses_valid_header() {
        let buf = sample_bytes();
        let header = GcmHeader::parse(&buf).unwrap();
        assert_eq!(&header.game_code, b"GDHE01");
        assert_eq!(header.dol_offset, 0x2440);
        assert_eq!(header.fst_offset, 0x10_0000);
        assert_eq!(header.game_name(), "Hello Game");
    }

    #[test]
    fn round_trips() {
        let buf = sample_bytes();
        let header = GcmHeader::parse(&buf).unwrap();
        let mut reserialized = buf.clone();
        header.write_into(&mut reserialized);
        let reparsed = GcmHeader::parse(&reserialized).unwrap();
        assert_eq!(reparsed.dol_offset, header.dol_offset);
        assert_eq!(reparsed.game_code, header.game_code);
    }

    #[test]
    fn write_into_preserves_unmodeled_bytes() {
        let mut buf = sample_bytes();
        // stream_buf_size (0x0B) and the unused block (0x0C..0x1E) carry
        // real boot-configuration bytes this type never models.
        buf[0x0B] = 0xAB;
        for b in buf[0x0C..0x1E].iter_mut() {
            *b = 0xCD;
        }
        // Past fst_max_size (0x430..), the rest of the header prefix.
        for b in buf[0x430..0x440].iter_mut() {
            *b = 0xEF;
        }
        let before = buf.clone();

        let header = GcmHeader::parse(&buf).unwrap();
        header.write_into(&mut buf);

        assert_eq!(buf[0x0B], before[0x0B]);
        assert_eq!(buf[0x0C..0x1E], before[0x0C..0x1E]);
        assert_eq!(buf[0x430..0x440], before[0x430..0x440]);
    }

    #[test]
    fn rejects_fst_before_dol() {
        let mut buf = sample_bytes();
        be::write_u32(&mut buf, FST_OFFSET, 0x100).unwrap();
        assert!(GcmHeader::parse(&buf).is_err());
    }

    #[test]
    fn set_game_code_overrides_and_pads() {
        let buf = sample_bytes();
        let mut header = GcmHeader::parse(&buf).unwrap();
        header.set_game_code("GAB");
        assert_eq!(&header.game_code, b"GAB\0\0\0");
    }
}
