//! GCM disc-image bytes plus header: load/save, DOL extraction, and the
//! in-place vs. relocate write strategies.

extern crate alloc;

use alloc::vec::Vec;

use super::header::{GcmHeader, HEADER_SIZE};
use crate::dol::{DolContainer, DolHeader};
use crate::error::{Error, Result};

/// Alignment a relocated DOL is placed on at the end of the image.
const RELOCATE_ALIGN: usize = 0x8000;

/// Whether [`GcmContainer::create_backup`] actually copied the file or
/// found an existing sidecar and left it alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupOutcome {
    Created,
    AlreadyExisted,
}

/// Disc-image bytes plus the parsed header at offset 0.
#[derive(Debug, Clone)]
pub struct GcmContainer {
    header: GcmHeader,
    data: Vec<u8>,
}

impl GcmContainer {
    /// Parse the header out of a full disc image already read into
    /// memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::Malformed("GCM image shorter than header"));
        }
        let header = GcmHeader::parse(&data)?;
        Ok(GcmContainer { header, data })
    }

    pub fn header(&self) -> &GcmHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut GcmHeader {
        &mut self.header
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write the header fields back into a clone of the image and
    /// return the full byte buffer. Only the header's modeled byte
    /// ranges are overwritten; everything else, including the fields
    /// this type doesn't model, passes through unchanged.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        self.header.write_into(&mut out[..HEADER_SIZE]);
        out
    }

    /// Read the embedded DOL: parse its header at `dol_offset`, compute
    /// its true byte span (`0x100` plus the highest in-use
    /// `file_offset + size`), and hand that slice to the DOL container
    /// loader.
    pub fn read_dol(&self) -> Result<DolContainer> {
        let start = self.header.dol_offset as usize;
        if start + crate::dol::HEADER_SIZE > self.data.len() {
            return Err(Error::Malformed("DOL offset runs past end of image"));
        }
        let temp_header = DolHeader::parse(&self.data[start..])?;

        let mut end = crate::dol::HEADER_SIZE;
        for sec in temp_header.sections() {
            let sec_end = sec.file_offset as usize + sec.size as usize;
            if sec_end > end {
                end = sec_end;
            }
        }

        let span = self
            .data
            .get(start..start + end)
            .ok_or(Error::Malformed("DOL section extends past end of image"))?;
        DolContainer::load(span.to_vec())
    }

    /// Write a patched DOL in place, iff it fits in the gap between
    /// `dol_offset` and `fst_offset`. Does not touch any header field.
    pub fn write_dol_in_place(&mut self, dol: &DolContainer) -> Result<()> {
        let bytes = dol.save();
        let start = self.header.dol_offset as usize;
        let available = self.header.fst_offset as usize - start;
        if bytes.len() > available {
            return Err(Error::Capacity("patched DOL does not fit before FST"));
        }
        self.data[start..start + bytes.len()].copy_from_slice(&bytes);
        Ok(())
    }

    /// Append the patched DOL at the next `0x8000`-aligned offset past
    /// the end of the image and repoint `dol_offset` at it. The FST
    /// fields, and the original DOL bytes, are left untouched.
    pub fn relocate_dol(&mut self, dol: &DolContainer) {
        let bytes = dol.save();
        let new_offset = align_up(self.data.len(), RELOCATE_ALIGN);
        self.data.resize(new_offset, 0);
        self.data.extend_from_slice(&bytes);
        self.header.dol_offset = new_offset as u32;
    }

    /// Write the patched DOL, trying in-place first and falling back to
    /// relocation on a capacity failure.
    pub fn write_dol(&mut self, dol: &DolContainer) -> Result<()> {
        match self.write_dol_in_place(dol) {
            Ok(()) => Ok(()),
            Err(Error::Capacity(_)) => {
                self.relocate_dol(dol);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Bounded read of arbitrary image bytes.
    pub fn read(&self, offset: u32, size: u32) -> Result<&[u8]> {
        let start = offset as usize;
        let end = start
            .checked_add(size as usize)
            .ok_or(Error::Malformed("read range overflows"))?;
        self.data.get(start..end).ok_or(Error::Malformed("read past end of image"))
    }

    /// Bounded write of arbitrary image bytes, growing the image if
    /// necessary.
    pub fn write(&mut self, offset: u32, bytes: &[u8]) {
        let start = offset as usize;
        let end = start + bytes.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(bytes);
    }
}

fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

#[cfg(feature = "std")]
pub mod io {
    //! Host filesystem load/save/backup, kept separate from the
    //! in-memory container so the container itself stays usable under
    //! `no_std` + `alloc`.

    use super::{BackupOutcome, GcmContainer};
    use crate::error::Result;
    use std::path::Path;

    impl GcmContainer {
        /// Read an entire disc image into memory and parse its header.
        /// Streaming is not supported: disc images are small enough
        /// (typically <=1.4 GiB) and this tool runs offline.
        pub fn load(path: impl AsRef<Path>) -> Result<Self> {
            let data = std::fs::read(path)?;
            Self::from_bytes(data)
        }

        /// Serialize the header and write the full image to `path`.
        pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
            std::fs::write(path, self.to_bytes())?;
            Ok(())
        }

        /// Create a `<original>.bak` sidecar copy, unless one already
        /// exists.
        pub fn create_backup(original_path: impl AsRef<Path>) -> Result<BackupOutcome> {
            let original_path = original_path.as_ref();
            let mut backup_path = original_path.as_os_str().to_owned();
            backup_path.push(".bak");
            let backup_path = std::path::PathBuf::from(backup_path);
            if backup_path.exists() {
                return Ok(BackupOutcome::AlreadyExisted);
            }
            std::fs::copy(original_path, &backup_path)?;
            Ok(BackupOutcome::Created)
        }
    }
}
