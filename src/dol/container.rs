//! Owns a DOL header plus its backing byte image.

extern crate alloc;

use alloc::vec::Vec;

use super::header::{DolHeader, DolSection, SectionKind, HEADER_SIZE};
use crate::error::{Error, Result};

/// Alignment DOL sections are appended on, per convention.
const SECTION_ALIGN: usize = 32;

/// A DOL header plus the full byte image it was parsed from (or will be
/// serialized into).
#[derive(Debug, Clone)]
pub struct DolContainer {
    header: DolHeader,
    data: Vec<u8>,
}

impl DolContainer {
    /// Parse a DOL header from the first [`HEADER_SIZE`] bytes of `data`
    /// and keep the rest as the backing image.
    pub fn load(data: Vec<u8>) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::Malformed("DOL image shorter than header"));
        }
        let header = DolHeader::parse(&data)?;
        Ok(DolContainer { header, data })
    }

    pub fn header(&self) -> &DolHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut DolHeader {
        &mut self.header
    }

    /// Serialize the current header into the first [`HEADER_SIZE`] bytes
    /// of the image and return the full byte buffer.
    pub fn save(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if out.len() < HEADER_SIZE {
            out.resize(HEADER_SIZE, 0);
        }
        out[..HEADER_SIZE].copy_from_slice(&self.header.serialize());
        out
    }

    /// Extract the raw bytes of a previously-enumerated section.
    pub fn section_data(&self, sec: &DolSection) -> Result<&[u8]> {
        let start = sec.file_offset as usize;
        let end = start
            .checked_add(sec.size as usize)
            .ok_or(Error::Malformed("section size overflows file offset"))?;
        self.data
            .get(start..end)
            .ok_or(Error::Malformed("section extends past end of DOL image"))
    }

    /// Align the image length up to 32 bytes, append `payload`, and
    /// register the resulting range as a new section of `kind` at
    /// `load_addr`. Leaves the container unchanged if no slot of that
    /// kind is free.
    pub fn inject_payload(&mut self, payload: &[u8], load_addr: u32, kind: SectionKind) -> Result<()> {
        let file_offset = align_up(self.data.len(), SECTION_ALIGN);
        let sec = DolSection {
            file_offset: file_offset as u32,
            load_addr,
            size: payload.len() as u32,
            kind,
        };
        // Validate slot availability before mutating the image, so a
        // capacity failure leaves the container untouched.
        let mut probe = self.header;
        probe.add_section(sec)?;

        self.data.resize(file_offset, 0);
        self.data.extend_from_slice(payload);
        self.header = probe;
        Ok(())
    }
}

fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}
