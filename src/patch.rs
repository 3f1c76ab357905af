//! Patch driver: orchestrates loading the image, stamping the original
//! entry point into the payload, injecting the payload as a new DOL
//! text section, and writing the patched image back out.
//!
//! Mirrors `main()` in the original C `patchiso` tool step for step
//! (spec.md §4.4).

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::dol::{DolContainer, SectionKind};
use crate::error::{Error, Result};
use crate::gcm::GcmContainer;
use crate::symbols::{SymbolMap, DEFAULT_ORIGINAL_ENTRY, ENTRY_SYMBOL, ORIGINAL_ENTRY_SYMBOL};

/// The sentinel value `__dolhook_original_entry` is initialized to
/// inside the payload, scanned for at patch time.
const ORIGINAL_ENTRY_PLACEHOLDER: u32 = 0x8000_3100;

/// Minimum load address a payload is placed at, even if the DOL's
/// existing highest address is lower.
const MIN_PAYLOAD_LOAD_ADDR: u32 = 0x8040_0000;

/// Options controlling a patch run, independent of the CLI surface
/// that produces them.
#[derive(Debug, Clone, Default)]
pub struct PatchOptions {
    pub game_id: Option<String>,
    pub dry_run: bool,
}

/// Summary of a completed (or dry-run) patch, for the CLI to report.
#[derive(Debug, Clone)]
pub struct PatchReport {
    pub original_entry: u32,
    pub new_entry: u32,
    pub payload_size: usize,
    pub load_addr: u32,
    pub relocated: bool,
    pub used_default_symbols: bool,
    pub stamped_by_append: bool,
}

/// Locate the 4-byte big-endian sentinel slot in `payload` and
/// overwrite it with `original_entry`. If no sentinel is found, append
/// a 4-byte slot instead. Returns whether the fallback (append) path
/// was taken, so the caller can warn exactly once.
pub fn stamp_original_entry(payload: &mut Vec<u8>, original_entry: u32) -> bool {
    let mut offset = None;
    let mut i = 0usize;
    while i + 4 <= payload.len() {
        if crate::be::read_u32(payload, i).unwrap() == ORIGINAL_ENTRY_PLACEHOLDER {
            offset = Some(i);
            break;
        }
        i += 4;
    }
    let (slot, appended) = match offset {
        Some(o) => (o, false),
        None => {
            let o = payload.len();
            payload.resize(o + 4, 0);
            (o, true)
        }
    };
    crate::be::write_u32(payload, slot, original_entry).unwrap();
    appended
}

/// Run the full patch algorithm against an already-loaded image and
/// payload. Returns before section injection (step 7 onward) when
/// `options.dry_run` is set.
pub fn patch(
    gcm: &mut GcmContainer,
    mut payload: Vec<u8>,
    symbols: Option<SymbolMap>,
    options: &PatchOptions,
) -> Result<(PatchReport, Option<DolContainer>)> {
    let used_default_symbols = symbols.is_none();
    let symbols = symbols.unwrap_or_else(SymbolMap::defaults);

    let hook_entry = symbols
        .get(ENTRY_SYMBOL)
        .ok_or_else(|| Error::MissingInput(ENTRY_SYMBOL.to_string()))?;
    let _original_entry_slot = symbols.get(ORIGINAL_ENTRY_SYMBOL).unwrap_or(DEFAULT_ORIGINAL_ENTRY);

    if let Some(id) = &options.game_id {
        gcm.header_mut().set_game_code(id);
    }

    let mut dol = gcm.read_dol()?;
    let original_entry = dol.header().entry_point;

    let stamped_by_append = stamp_original_entry(&mut payload, original_entry);

    let report = PatchReport {
        original_entry,
        new_entry: hook_entry,
        payload_size: payload.len(),
        load_addr: 0,
        relocated: false,
        used_default_symbols,
        stamped_by_append,
    };

    if options.dry_run {
        return Ok((report, None));
    }

    let mut load_addr = (dol.header().highest_addr() + 0xFF) & !0xFF;
    if load_addr < MIN_PAYLOAD_LOAD_ADDR {
        load_addr = MIN_PAYLOAD_LOAD_ADDR;
    }

    dol.inject_payload(&payload, load_addr, SectionKind::Text)?;
    dol.header_mut().entry_point = hook_entry;

    let report = PatchReport { load_addr, ..report };

    Ok((report, Some(dol)))
}

#[cfg(feature = "std")]
pub mod driver {
    //! Host-side glue: fixed payload paths, backup creation, and the
    //! in-place-then-relocate write (spec.md §6).

    use super::*;
    use std::path::{Path, PathBuf};

    /// Fixed location of the raw payload bytes, relative to the
    /// working directory, matching the original tool.
    pub const PAYLOAD_PATH: &str = "payload/payload.bin";
    /// Fixed location of the payload's symbol map.
    pub const PAYLOAD_SYMBOLS_PATH: &str = "payload/payload.sym";

    /// Run the whole CLI-facing algorithm: load, read payload +
    /// symbols, patch, back up (if writing over the input), and save.
    pub fn run(
        input: &Path,
        output: Option<&Path>,
        options: &PatchOptions,
    ) -> Result<PatchReport> {
        let mut gcm = GcmContainer::load(input)?;

        let payload = std::fs::read(PAYLOAD_PATH)
            .map_err(|_| Error::MissingInput(PAYLOAD_PATH.to_string()))?;
        let symbols = SymbolMap::load(PAYLOAD_SYMBOLS_PATH);

        let (mut report, dol) = super::patch(&mut gcm, payload, symbols, options)?;

        let Some(dol) = dol else {
            return Ok(report);
        };

        let output_path: PathBuf = match output {
            Some(p) => p.to_path_buf(),
            None => {
                GcmContainer::create_backup(input)?;
                input.to_path_buf()
            }
        };

        report.relocated = matches!(
            gcm.write_dol_in_place(&dol),
            Err(Error::Capacity(_))
        );
        if report.relocated {
            gcm.relocate_dol(&dol);
        }

        gcm.save(&output_path)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::be;

    fn sample_gcm_with_entry(entry: u32) -> GcmContainer {
        let mut gcm_bytes = alloc::vec![0u8; crate::gcm::HEADER_SIZE + 0x2000];
        gcm_bytes[0..6].copy_from_slice(b"GDHE01");
        be::write_u32(&mut gcm_bytes, 0x420, crate::gcm::HEADER_SIZE as u32).unwrap();
        be::write_u32(&mut gcm_bytes, 0x424, (crate::gcm::HEADER_SIZE + 0x1800) as u32).unwrap();

        let mut dol_bytes = alloc::vec![0u8; crate::dol::HEADER_SIZE];
        be::write_u32(&mut dol_bytes, 0x164, entry).unwrap();
        gcm_bytes[crate::gcm::HEADER_SIZE..crate::gcm::HEADER_SIZE + dol_bytes.len()]
            .copy_from_slice(&dol_bytes);

        GcmContainer::from_bytes(gcm_bytes).unwrap()
    }

    #[test]
    fn stamp_finds_sentinel() {
        let mut payload = alloc::vec![0u8; 0x20];
        be::write_u32(&mut payload, 0x10, ORIGINAL_ENTRY_PLACEHOLDER).unwrap();
        let appended = stamp_original_entry(&mut payload, 0x8000_3100);
        assert!(!appended);
        assert_eq!(be::read_u32(&payload, 0x10).unwrap(), 0x8000_3100);
    }

    #[test]
    fn stamp_appends_when_sentinel_missing() {
        let mut payload = alloc::vec![0u8; 0x20];
        let appended = stamp_original_entry(&mut payload, 0x8000_3100);
        assert!(appended);
        assert_eq!(payload.len(), 0x24);
        assert_eq!(be::read_u32(&payload, 0x20).unwrap(), 0x8000_3100);
    }

    #[test]
    fn s6_patch_driver_end_to_end() {
        let mut gcm = sample_gcm_with_entry(0x8000_3100);
        let mut payload = alloc::vec![0u8; 0x800];
        be::write_u32(&mut payload, 0x10, ORIGINAL_ENTRY_PLACEHOLDER).unwrap();

        let mut symbols = crate::symbols::SymbolMap::parse("__dolhook_entry 80400000\n");
        let options = PatchOptions::default();

        let (report, dol) = patch(&mut gcm, payload, Some(core::mem::take(&mut symbols)), &options).unwrap();
        let dol = dol.expect("non-dry-run produces a patched DOL");

        assert_eq!(report.new_entry, 0x8040_0000);
        assert_eq!(dol.header().entry_point, 0x8040_0000);

        let sections: Vec<_> = dol.header().sections().collect();
        let injected = sections.last().unwrap();
        assert!(injected.file_offset >= crate::dol::HEADER_SIZE as u32);
        assert_eq!(injected.file_offset % 32, 0);

        let bytes = dol.section_data(injected).unwrap();
        assert_eq!(be::read_u32(bytes, 0x10).unwrap(), 0x8000_3100);
    }

    #[test]
    fn dry_run_stops_before_injection() {
        let mut gcm = sample_gcm_with_entry(0x8000_3100);
        let payload = alloc::vec![0u8; 0x40];
        let options = PatchOptions { dry_run: true, ..Default::default() };
        let (_, dol) = patch(&mut gcm, payload, None, &options).unwrap();
        assert!(dol.is_none());
    }

    #[test]
    fn missing_entry_symbol_is_fatal() {
        let mut gcm = sample_gcm_with_entry(0x8000_3100);
        let payload = alloc::vec![0u8; 0x40];
        let empty_map = crate::symbols::SymbolMap::parse("");
        let options = PatchOptions::default();
        let result = patch(&mut gcm, payload, Some(empty_map), &options);
        assert!(result.is_err());
    }
}
