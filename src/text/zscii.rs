//! ZSCII ↔ Unicode/ASCII translation (§4.2).

use log::warn;

use crate::memory::Memory;

/// Default ZSCII 155-251 → Unicode mapping (Z-Machine standard's "extra
/// characters" table), used when the story does not supply a custom Unicode
/// table.
const DEFAULT_UNICODE_TABLE: &[char] = &[
    'ä', 'ö', 'ü', 'Ä', 'Ö', 'Ü', 'ß', '»', '«', 'ë', 'ï', 'ÿ', 'Ë', 'Ï', 'á', 'é', 'í', 'ó', 'ú',
    'ý', 'Á', 'É', 'Í', 'Ó', 'Ú', 'Ý', 'à', 'è', 'ì', 'ò', 'ù', 'À', 'È', 'Ì', 'Ò', 'Ù', 'â', 'ê',
    'î', 'ô', 'û', 'Â', 'Ê', 'Î', 'Ô', 'Û', 'å', 'Å', 'ø', 'Ø', 'ã', 'ñ', 'õ', 'Ã', 'Ñ', 'Õ', 'æ',
    'Æ', 'ç', 'Ç', 'þ', 'ð', 'Þ', 'Ð', '£', 'œ', 'Œ', '¡', '¿',
];

/// Translate one ZSCII code point to a Rust `char`, or `None` if it is
/// silent/out of range. `unicode_table_addr` is the story's custom table
/// (0 = use the default).
pub fn zscii_to_char(memory: &Memory, unicode_table_addr: u16, code: u16) -> Option<char> {
    match code {
        0 => None,
        13 => Some('\n'),
        32..=126 => Some(code as u8 as char),
        155..=251 => {
            if unicode_table_addr != 0 {
                let n_entries = memory.read_u8(unicode_table_addr as usize) as u16;
                let idx = code - 155;
                if idx < n_entries {
                    let addr = unicode_table_addr as usize + 1 + 2 * idx as usize;
                    char::from_u32(memory.read_u16(addr) as u32)
                } else {
                    warn!("ZSCII code {code} outside custom unicode table range");
                    None
                }
            } else {
                let idx = (code - 155) as usize;
                DEFAULT_UNICODE_TABLE.get(idx).copied()
            }
        }
        other => {
            warn!("unsupported ZSCII code {other}");
            None
        }
    }
}

/// Decode a full ZSCII byte string (as produced by §4.4's parser/dictionary
/// machinery) into a display string.
pub fn zscii_to_string(memory: &Memory, unicode_table_addr: u16, codes: &[u16]) -> String {
    codes
        .iter()
        .filter_map(|&c| zscii_to_char(memory, unicode_table_addr, c))
        .collect()
}

/// Translate one input byte to ZSCII: newline → 13, tab → space, printable
/// ASCII passes through, everything else becomes `?` (§4.2).
pub fn ascii_to_zscii(byte: u8) -> u8 {
    match byte {
        b'\n' => 13,
        b'\t' => b' ',
        0x20..=0x7E => byte,
        _ => b'?',
    }
}

/// Translate a ZSCII byte (no Unicode table lookups — used for re-encoding
/// typed input for dictionary matching, §4.4) back to a display byte.
pub fn zscii_to_ascii(code: u8) -> u8 {
    match code {
        13 => b'\n',
        0x20..=0x7E => code,
        _ => b'?',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passthrough_round_trips() {
        for byte in 0x20u8..=0x7E {
            assert_eq!(zscii_to_ascii(ascii_to_zscii(byte)), byte);
        }
    }

    #[test]
    fn newline_and_tab_normalize() {
        assert_eq!(ascii_to_zscii(b'\n'), 13);
        assert_eq!(ascii_to_zscii(b'\t'), b' ');
        assert_eq!(zscii_to_ascii(13), b'\n');
    }

    #[test]
    fn default_unicode_table_resolves_accents() {
        let mem = Memory::new(vec![0u8; 16], 0);
        assert_eq!(zscii_to_char(&mem, 0, 155), Some('ä'));
    }

    #[test]
    fn zero_is_silent_and_control_codes_suppressed() {
        let mem = Memory::new(vec![0u8; 16], 0);
        assert_eq!(zscii_to_char(&mem, 0, 0), None);
        assert_eq!(zscii_to_char(&mem, 0, 1), None);
    }
}
