//! The fixed-layout DOL header: positional text/data section slots,
//! BSS, and the entry point.

use crate::be;
use crate::error::{Error, Result};

/// Number of text-section slots in a DOL header.
pub const MAX_TEXT_SECTIONS: usize = 18;
/// Number of data-section slots in a DOL header.
pub const MAX_DATA_SECTIONS: usize = 11;
/// Size in bytes of the fixed DOL header: the true footprint of every
/// positional slot (18 text + 11 data offsets/addrs/sizes, BSS, entry
/// point), through the last byte `serialize`/`parse` touch. This is
/// *not* the same quantity as [`MIN_SECTION_FILE_OFFSET`]: that's the
/// spec's literal "no section may start before 0x100" floor, which
/// predates (and is smaller than) this header's full slot layout.
pub const HEADER_SIZE: usize = 0x168;

/// Minimum `file_offset` any in-use section may have, per the
/// positional-header invariant (spec.md §3/§4.2). Deliberately distinct
/// from [`HEADER_SIZE`]: the invariant is a fixed `0x100` floor, not the
/// header's actual (larger) byte footprint.
const MIN_SECTION_FILE_OFFSET: u32 = 0x100;

const TEXT_OFFSETS: usize = 0x00;
const DATA_OFFSETS: usize = 0x48;
const TEXT_ADDRS: usize = 0x74;
const DATA_ADDRS: usize = 0xBC;
const TEXT_SIZES: usize = 0xE8;
const DATA_SIZES: usize = 0x130;
const BSS_ADDR: usize = 0x15C;
const BSS_SIZE: usize = 0x160;
const ENTRY_POINT: usize = 0x164;

const MIN_LOAD_ADDR: u32 = 0x8000_0000;
const MIN_ENTRY: u32 = 0x8000_0000;
const MAX_ENTRY: u32 = 0x8180_0000;

/// Whether a [`DolSection`] came from a text or a data slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Text,
    Data,
}

/// A single in-use DOL section, as returned by [`DolHeader::sections`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DolSection {
    pub file_offset: u32,
    pub load_addr: u32,
    pub size: u32,
    pub kind: SectionKind,
}

/// The fixed-layout, positionally-encoded DOL header.
///
/// Slots are fixed-size arrays, not growable containers: the on-disk
/// contract depends on each slot staying at the same position, and a
/// zero size is what marks a slot free.
#[derive(Debug, Clone, Copy)]
pub struct DolHeader {
    text_offsets: [u32; MAX_TEXT_SECTIONS],
    data_offsets: [u32; MAX_DATA_SECTIONS],
    text_addrs: [u32; MAX_TEXT_SECTIONS],
    data_addrs: [u32; MAX_DATA_SECTIONS],
    text_sizes: [u32; MAX_TEXT_SECTIONS],
    data_sizes: [u32; MAX_DATA_SECTIONS],
    bss_addr: u32,
    bss_size: u32,
    pub entry_point: u32,
}

impl DolHeader {
    /// Parse a big-endian DOL header, validating it per the positional
    /// invariants before returning it.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::Malformed("DOL header shorter than its fixed footprint"));
        }

        let mut text_offsets = [0u32; MAX_TEXT_SECTIONS];
        let mut text_addrs = [0u32; MAX_TEXT_SECTIONS];
        let mut text_sizes = [0u32; MAX_TEXT_SECTIONS];
        for i in 0..MAX_TEXT_SECTIONS {
            text_offsets[i] = be::read_u32(data, TEXT_OFFSETS + i * 4)?;
            text_addrs[i] = be::read_u32(data, TEXT_ADDRS + i * 4)?;
            text_sizes[i] = be::read_u32(data, TEXT_SIZES + i * 4)?;
        }

        let mut data_offsets = [0u32; MAX_DATA_SECTIONS];
        let mut data_addrs = [0u32; MAX_DATA_SECTIONS];
        let mut data_sizes = [0u32; MAX_DATA_SECTIONS];
        for i in 0..MAX_DATA_SECTIONS {
            data_offsets[i] = be::read_u32(data, DATA_OFFSETS + i * 4)?;
            data_addrs[i] = be::read_u32(data, DATA_ADDRS + i * 4)?;
            data_sizes[i] = be::read_u32(data, DATA_SIZES + i * 4)?;
        }

        let bss_addr = be::read_u32(data, BSS_ADDR)?;
        let bss_size = be::read_u32(data, BSS_SIZE)?;
        let entry_point = be::read_u32(data, ENTRY_POINT)?;

        let header = DolHeader {
            text_offsets,
            data_offsets,
            text_addrs,
            data_addrs,
            text_sizes,
            data_sizes,
            bss_addr,
            bss_size,
            entry_point,
        };
        header.validate()?;
        Ok(header)
    }

    /// Serialize back to a big-endian buffer of [`HEADER_SIZE`] bytes. Round-trips with
    /// [`DolHeader::parse`] for any header that was itself parsed or
    /// built through [`DolHeader::add_section`].
    pub fn serialize(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        for i in 0..MAX_TEXT_SECTIONS {
            be::write_u32(&mut buf, TEXT_OFFSETS + i * 4, self.text_offsets[i]).unwrap();
            be::write_u32(&mut buf, TEXT_ADDRS + i * 4, self.text_addrs[i]).unwrap();
            be::write_u32(&mut buf, TEXT_SIZES + i * 4, self.text_sizes[i]).unwrap();
        }
        for i in 0..MAX_DATA_SECTIONS {
            be::write_u32(&mut buf, DATA_OFFSETS + i * 4, self.data_offsets[i]).unwrap();
            be::write_u32(&mut buf, DATA_ADDRS + i * 4, self.data_addrs[i]).unwrap();
            be::write_u32(&mut buf, DATA_SIZES + i * 4, self.data_sizes[i]).unwrap();
        }
        be::write_u32(&mut buf, BSS_ADDR, self.bss_addr).unwrap();
        be::write_u32(&mut buf, BSS_SIZE, self.bss_size).unwrap();
        be::write_u32(&mut buf, ENTRY_POINT, self.entry_point).unwrap();
        buf
    }

    /// Validate the positional invariants: entry point range, and for
    /// every in-use section, `file_offset >= 0x100` and `load_addr >=
    /// 0x80000000`. The `0x100` floor is [`MIN_SECTION_FILE_OFFSET`],
    /// not [`HEADER_SIZE`] — the two are different quantities.
    pub fn validate(&self) -> Result<()> {
        if self.entry_point < MIN_ENTRY || self.entry_point > MAX_ENTRY {
            return Err(Error::Malformed("entry point out of valid range"));
        }
        for i in 0..MAX_TEXT_SECTIONS {
            if self.text_sizes[i] > 0 {
                if self.text_offsets[i] < MIN_SECTION_FILE_OFFSET {
                    return Err(Error::Malformed("text section overlaps header"));
                }
                if self.text_addrs[i] < MIN_LOAD_ADDR {
                    return Err(Error::Malformed("text section load address too low"));
                }
            }
        }
        for i in 0..MAX_DATA_SECTIONS {
            if self.data_sizes[i] > 0 {
                if self.data_offsets[i] < MIN_SECTION_FILE_OFFSET {
                    return Err(Error::Malformed("data section overlaps header"));
                }
                if self.data_addrs[i] < MIN_LOAD_ADDR {
                    return Err(Error::Malformed("data section load address too low"));
                }
            }
        }
        Ok(())
    }

    /// Yield every in-use section, text slots before data slots, in
    /// slot order.
    pub fn sections(&self) -> impl Iterator<Item = DolSection> + '_ {
        (0..MAX_TEXT_SECTIONS)
            .filter(|&i| self.text_sizes[i] > 0)
            .map(|i| DolSection {
                file_offset: self.text_offsets[i],
                load_addr: self.text_addrs[i],
                size: self.text_sizes[i],
                kind: SectionKind::Text,
            })
            .chain((0..MAX_DATA_SECTIONS).filter(|&i| self.data_sizes[i] > 0).map(|i| {
                DolSection {
                    file_offset: self.data_offsets[i],
                    load_addr: self.data_addrs[i],
                    size: self.data_sizes[i],
                    kind: SectionKind::Data,
                }
            }))
    }

    /// Highest `load_addr + size` over every in-use section and the BSS
    /// region, used to pick the payload's load address.
    pub fn highest_addr(&self) -> u32 {
        let mut highest = 0u32;
        for sec in self.sections() {
            let end = sec.load_addr + sec.size;
            if end > highest {
                highest = end;
            }
        }
        if self.bss_size > 0 {
            let end = self.bss_addr + self.bss_size;
            if end > highest {
                highest = end;
            }
        }
        highest
    }

    /// Insert into the first free slot of the requested kind. Fails
    /// without mutating the header when all slots of that kind are
    /// occupied.
    pub fn add_section(&mut self, sec: DolSection) -> Result<()> {
        match sec.kind {
            SectionKind::Text => {
                for i in 0..MAX_TEXT_SECTIONS {
                    if self.text_sizes[i] == 0 {
                        self.text_offsets[i] = sec.file_offset;
                        self.text_addrs[i] = sec.load_addr;
                        self.text_sizes[i] = sec.size;
                        return Ok(());
                    }
                }
                Err(Error::Capacity("no free text section slot"))
            }
            SectionKind::Data => {
                for i in 0..MAX_DATA_SECTIONS {
                    if self.data_sizes[i] == 0 {
                        self.data_offsets[i] = sec.file_offset;
                        self.data_addrs[i] = sec.load_addr;
                        self.data_sizes[i] = sec.size;
                        return Ok(());
                    }
                }
                Err(Error::Capacity("no free data section slot"))
            }
        }
    }

    pub fn bss_addr(&self) -> u32 {
        self.bss_addr
    }

    pub fn bss_size(&self) -> u32 {
        self.bss_size
    }
}

/// `Display` wrapper that renders a DOL header the way `--print-dol`
/// does: entry point, BSS range, then every text and data section.
pub struct DolTable<'a>(pub &'a DolHeader);

impl core::fmt::Display for DolTable<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let h = self.0;
        writeln!(f, "DOL Header:")?;
        writeln!(f, "  Entry Point: {:#010x}", h.entry_point)?;
        writeln!(
            f,
            "  BSS: {:#010x} - {:#010x} (size: {:#010x})",
            h.bss_addr,
            h.bss_addr.wrapping_add(h.bss_size),
            h.bss_size
        )?;
        writeln!(f, "\nText Sections:")?;
        for (i, sec) in h.sections().filter(|s| s.kind == SectionKind::Text).enumerate() {
            writeln!(
                f,
                "  [{i}] File:{:#010x} -> Addr:{:#010x} Size:{:#010x}",
                sec.file_offset, sec.load_addr, sec.size
            )?;
        }
        writeln!(f, "\nData Sections:")?;
        for (i, sec) in h.sections().filter(|s| s.kind == SectionKind::Data).enumerate() {
            writeln!(
                f,
                "  [{i}] File:{:#010x} -> Addr:{:#010x} Size:{:#010x}",
                sec.file_offset, sec.load_addr, sec.size
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bytes() -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        be::write_u32(&mut buf, TEXT_OFFSETS, 0x100).unwrap();
        be::write_u32(&mut buf, TEXT_ADDRS, 0x8000_3100).unwrap();
        be::write_u32(&mut buf, TEXT_SIZES, 0x1000).unwrap();
        be::write_u32(&mut buf, ENTRY_POINT, 0x8000_3100).unwrap();
        buf
    }

    #[test]
    fn s1_dol_parse() {
        let buf = sample_bytes();
        let header = DolHeader::parse(&buf).unwrap();
        let sections: Vec<_> = header.sections().collect();
        assert_eq!(sections.len(), 1);
        assert_eq!(
            sections[0],
            DolSection {
                file_offset: 0x100,
                load_addr: 0x8000_3100,
                size: 0x1000,
                kind: SectionKind::Text,
            }
        );
        assert_eq!(header.highest_addr(), 0x8000_4100);
    }

    #[test]
    fn round_trip() {
        let buf = sample_bytes();
        let header = DolHeader::parse(&buf).unwrap();
        let reserialized = header.serialize();
        let reparsed = DolHeader::parse(&reserialized).unwrap();
        assert_eq!(reparsed.entry_point, header.entry_point);
        assert_eq!(reparsed.sections().collect::<Vec<_>>(), header.sections().collect::<Vec<_>>());
    }

    #[test]
    fn add_section_monotonic() {
        let buf = sample_bytes();
        let mut header = DolHeader::parse(&buf).unwrap();
        let before: Vec<_> = header.sections().collect();
        let new_sec = DolSection {
            file_offset: 0x2000,
            load_addr: 0x8000_5000,
            size: 0x200,
            kind: SectionKind::Data,
        };
        header.add_section(new_sec).unwrap();
        let after: Vec<_> = header.sections().collect();
        assert_eq!(after.len(), before.len() + 1);
        assert!(after.contains(&new_sec));
    }

    #[test]
    fn add_section_exhaustion_leaves_header_unchanged() {
        let buf = sample_bytes();
        let mut header = DolHeader::parse(&buf).unwrap();
        for i in 0..MAX_DATA_SECTIONS {
            header
                .add_section(DolSection {
                    file_offset: 0x100 + (i as u32 + 1) * 0x20,
                    load_addr: 0x8000_6000 + i as u32 * 0x20,
                    size: 0x10,
                    kind: SectionKind::Data,
                })
                .unwrap();
        }
        let before: Vec<_> = header.sections().collect();
        let result = header.add_section(DolSection {
            file_offset: 0x9000,
            load_addr: 0x8000_9000,
            size: 0x10,
            kind: SectionKind::Data,
        });
        assert!(result.is_err());
        assert_eq!(header.sections().collect::<Vec<_>>(), before);
    }

    #[test]
    fn rejects_bad_entry_point() {
        let mut buf = sample_bytes();
        be::write_u32(&mut buf, ENTRY_POINT, 0x6000_0000).unwrap();
        assert!(DolHeader::parse(&buf).is_err());
    }
}
