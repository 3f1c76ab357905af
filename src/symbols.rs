//! Line-oriented `NAME HEXADDR` symbol map, used to locate the payload's
//! entry point and original-entry placeholder slot.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::String;

/// Payload entry symbol: required. Patching is fatal without it.
pub const ENTRY_SYMBOL: &str = "__dolhook_entry";
/// Original-entry placeholder slot symbol: advisory only.
pub const ORIGINAL_ENTRY_SYMBOL: &str = "__dolhook_original_entry";

/// Default entry address used when the symbol map is absent.
pub const DEFAULT_ENTRY: u32 = 0x8040_0000;
/// Default original-entry slot address used when the symbol map is
/// absent.
pub const DEFAULT_ORIGINAL_ENTRY: u32 = 0x8040_0100;

/// An insertion-insensitive `name -> address` map parsed from a
/// `payload.sym`-style file.
#[derive(Debug, Clone, Default)]
pub struct SymbolMap {
    symbols: BTreeMap<String, u32>,
}

impl SymbolMap {
    /// Parse `NAME HEXADDR` lines, skipping blank lines and lines
    /// starting with `#`.
    pub fn parse(text: &str) -> Self {
        let mut symbols = BTreeMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(name), Some(addr_str)) = (parts.next(), parts.next()) else {
                continue;
            };
            let addr_str = addr_str.trim_start_matches("0x").trim_start_matches("0X");
            if let Ok(addr) = u32::from_str_radix(addr_str, 16) {
                symbols.insert(String::from(name), addr);
            }
        }
        SymbolMap { symbols }
    }

    /// The symbol map with the defaults from spec.md §3, used when the
    /// map file is absent.
    pub fn defaults() -> Self {
        let mut symbols = BTreeMap::new();
        symbols.insert(String::from(ENTRY_SYMBOL), DEFAULT_ENTRY);
        symbols.insert(String::from(ORIGINAL_ENTRY_SYMBOL), DEFAULT_ORIGINAL_ENTRY);
        SymbolMap { symbols }
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.symbols.get(name).copied()
    }

    pub fn has(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(feature = "std")]
pub mod io {
    use super::SymbolMap;
    use std::path::Path;

    impl SymbolMap {
        /// Load and parse a symbol map file. Returns `None` (rather than
        /// an error) when the file is absent, matching the patcher's
        /// warn-and-default behavior.
        pub fn load(path: impl AsRef<Path>) -> Option<Self> {
            let text = std::fs::read_to_string(path).ok()?;
            let map = SymbolMap::parse(&text);
            if map.is_empty() {
                None
            } else {
                Some(map)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comments_and_blank_lines() {
        let text = "# comment\n\n__dolhook_entry 80400000\n__dolhook_original_entry 0x80400100\n";
        let map = SymbolMap::parse(text);
        assert_eq!(map.get(ENTRY_SYMBOL), Some(0x8040_0000));
        assert_eq!(map.get(ORIGINAL_ENTRY_SYMBOL), Some(0x8040_0100));
    }

    #[test]
    fn ignores_malformed_lines() {
        let text = "not_hex zzzz\nvalid 1000\n";
        let map = SymbolMap::parse(text);
        assert!(!map.has("not_hex"));
        assert_eq!(map.get("valid"), Some(0x1000));
    }

    #[test]
    fn defaults_match_spec() {
        let map = SymbolMap::defaults();
        assert_eq!(map.get(ENTRY_SYMBOL), Some(DEFAULT_ENTRY));
        assert_eq!(map.get(ORIGINAL_ENTRY_SYMBOL), Some(DEFAULT_ORIGINAL_ENTRY));
    }
}
