//! Packed z-char string decoding/encoding (§4.2): three z-chars per 16-bit
//! word, alphabet shifts, abbreviation expansion and 10-bit ZSCII escapes.

pub mod alphabet;
pub mod zscii;

pub use alphabet::AlphabetTable;

use scroll::{Pread, BE};

use crate::error::{Error, Result};
use crate::memory::Memory;

/// Abbreviations may not reference other abbreviations; this bounds the
/// recursion in case a malformed story violates that anyway.
const MAX_ABBREV_DEPTH: usize = 1;

/// Split one 16-bit word into its three 5-bit z-chars plus the "last word"
/// terminator bit (bit 15).
fn unpack_zchars(word: u16) -> ([u8; 3], bool) {
    let terminal = word & 0x8000 != 0;
    let z0 = ((word >> 10) & 0x1F) as u8;
    let z1 = ((word >> 5) & 0x1F) as u8;
    let z2 = (word & 0x1F) as u8;
    ([z0, z1, z2], terminal)
}

/// Decodes packed strings against a fixed alphabet table, abbreviation table
/// and Unicode translation table — the three pieces of state §4.2 says a
/// decode needs, bundled so callers (`print`, `print_paddr`, object short
/// names, the dictionary) don't each have to thread them through by hand.
pub struct TextDecoder<'a> {
    memory: &'a Memory,
    alphabets: AlphabetTable,
    abbrev_base: usize,
    unicode_table_addr: u16,
}

impl<'a> TextDecoder<'a> {
    pub fn new(
        memory: &'a Memory,
        alphabets: AlphabetTable,
        abbrev_base: usize,
        unicode_table_addr: u16,
    ) -> TextDecoder<'a> {
        TextDecoder {
            memory,
            alphabets,
            abbrev_base,
            unicode_table_addr,
        }
    }

    /// Decode the packed string at `addr`, returning the text and the byte
    /// address immediately after its terminating word.
    pub fn decode_string(&self, addr: usize) -> Result<(String, usize)> {
        let mut codes = Vec::new();
        let end = self.collect_zscii(addr, &mut codes, 0)?;
        Ok((zscii::zscii_to_string(self.memory, self.unicode_table_addr, &codes), end))
    }

    /// Walk the z-char stream starting at `addr`, appending decoded ZSCII
    /// codes to `out`, and returning the address past the terminating word.
    fn collect_zscii(&self, addr: usize, out: &mut Vec<u16>, depth: usize) -> Result<usize> {
        let mut cursor = addr;
        let mut alphabet = 0usize;
        let mut pending_abbrev: Option<u8> = None;
        // 10-bit ZSCII escape (A2 zchar 6) needs its two following zchars;
        // `None` = not in an escape, `Some(None)` = escape started, awaiting
        // the high 5 bits, `Some(Some(high))` = awaiting the low 5 bits.
        let mut pending_escape: Option<Option<u8>> = None;

        loop {
            let word: u16 = self
                .memory
                .slice(cursor, 2)
                .pread_with(0, BE)
                .map_err(Error::Decode)?;
            cursor += 2;
            let (zchars, terminal) = unpack_zchars(word);

            for z in zchars {
                if let Some(state) = pending_escape {
                    match state {
                        None => pending_escape = Some(Some(z)),
                        Some(high) => {
                            let code = ((high as u16) << 5) | z as u16;
                            out.push(code);
                            pending_escape = None;
                        }
                    }
                    continue;
                }
                if let Some(which) = pending_abbrev.take() {
                    if depth >= MAX_ABBREV_DEPTH {
                        return Err(Error::Malformed("abbreviation nested too deeply".into()));
                    }
                    let abbrev_index = 32 * (which as usize - 1) + z as usize;
                    let entry_addr = self.abbrev_base + 2 * abbrev_index;
                    let target = self.memory.read_u16(entry_addr) as usize * 2;
                    self.collect_zscii(target, out, depth + 1)?;
                    alphabet = 0;
                    continue;
                }

                match z {
                    0 => {
                        out.push(32);
                        alphabet = 0;
                    }
                    1..=3 => {
                        pending_abbrev = Some(z);
                    }
                    4 => alphabet = 1,
                    5 => alphabet = 2,
                    6 if alphabet == 2 => {
                        pending_escape = Some(None);
                    }
                    7 if alphabet == 2 => {
                        out.push(13);
                        alphabet = 0;
                    }
                    _ => {
                        let ch = self.alphabets.char_for(alphabet, z);
                        out.push(ch as u16);
                        alphabet = 0;
                    }
                }
            }

            if terminal {
                break;
            }
        }
        Ok(cursor)
    }

    /// Encode `text` into exactly `num_zchars` z-chars (padded with 5,
    /// truncated if too long), used for dictionary-word lookup (§4.4). A free
    /// function rather than a `&self` method: it only needs the alphabet
    /// table, so callers that already hold a mutable `Memory` borrow (the
    /// tokenizer) don't have to fight a `TextDecoder`'s `&Memory` for it.
    pub fn encode_word(alphabets: &AlphabetTable, text: &str, num_zchars: usize) -> Vec<u8> {
        let mut zchars = Vec::with_capacity(num_zchars);
        for byte in text.bytes() {
            if zchars.len() >= num_zchars {
                break;
            }
            let zscii = zscii::ascii_to_zscii(byte);
            match alphabets.encode(zscii) {
                Some((0, z)) => zchars.push(z),
                Some((a, z)) => {
                    zchars.push(if a == 1 { 4 } else { 5 });
                    if zchars.len() < num_zchars {
                        zchars.push(z);
                    }
                }
                None => {
                    zchars.push(5);
                    zchars.push(6);
                    zchars.push((zscii >> 5) & 0x1F);
                    zchars.push(zscii & 0x1F);
                }
            }
        }
        zchars.resize(num_zchars, 5);
        zchars.truncate(num_zchars);
        zchars
    }

    /// Pack encoded z-chars (from [`TextDecoder::encode_word`]) into 16-bit
    /// words, three per word, the last word's top bit set.
    pub fn pack_zchars(zchars: &[u8]) -> Vec<u16> {
        let mut words = Vec::new();
        for chunk in zchars.chunks(3) {
            let mut padded = [5u8; 3];
            padded[..chunk.len()].copy_from_slice(chunk);
            let word = ((padded[0] as u16) << 10) | ((padded[1] as u16) << 5) | padded[2] as u16;
            words.push(word);
        }
        if let Some(last) = words.last_mut() {
            *last |= 0x8000;
        }
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story_with_words(words: &[u16]) -> Memory {
        let mut bytes = vec![0u8; 0x40 + words.len() * 2];
        for (i, w) in words.iter().enumerate() {
            bytes[0x40 + i * 2] = (w >> 8) as u8;
            bytes[0x40 + i * 2 + 1] = (w & 0xFF) as u8;
        }
        Memory::new(bytes, 0x40)
    }

    #[test]
    fn decodes_hello() {
        // "hello" = h(13) e(10) l(17) l(17) o(20) in A0, padded with a final 5.
        let zchars = [13u8, 10, 17, 17, 20, 5];
        let words = TextDecoder::pack_zchars(&zchars);
        let mem = story_with_words(&words);
        let decoder = TextDecoder::new(&mem, AlphabetTable::default_table(), 0, 0);
        let (text, end) = decoder.decode_string(0x40).unwrap();
        assert_eq!(text, "hello");
        assert_eq!(end, 0x40 + words.len() * 2);
    }

    #[test]
    fn shift_to_a1_is_single_character() {
        // shift(4), 'H' in A1 at index 13 (zchar 19), then back to A0 'i' (zchar 14).
        let zchars = [4u8, 19, 14, 5, 5, 5];
        let words = TextDecoder::pack_zchars(&zchars);
        let mem = story_with_words(&words);
        let decoder = TextDecoder::new(&mem, AlphabetTable::default_table(), 0, 0);
        let (text, _) = decoder.decode_string(0x40).unwrap();
        assert_eq!(text, "Hi");
    }

    #[test]
    fn expands_abbreviation() {
        let abbrev_base = 0x40;
        let abbrev_table_words = 2; // room for abbrev index 0
        let target_addr = abbrev_base + abbrev_table_words * 2;
        let mut bytes = vec![0u8; target_addr + 4];
        bytes[abbrev_base] = 0;
        bytes[abbrev_base + 1] = (target_addr / 2) as u8;
        let zchars_target = [13u8, 10, 5, 5, 5, 5]; // "he" (only reading 2 chars matters)
        let words = TextDecoder::pack_zchars(&zchars_target);
        bytes[target_addr] = (words[0] >> 8) as u8;
        bytes[target_addr + 1] = (words[0] & 0xFF) as u8;
        let main_zchars = [1u8, 0, 5]; // abbreviation 1, index 0
        let main_words = TextDecoder::pack_zchars(&main_zchars);
        let main_addr = target_addr + 2;
        bytes.resize(main_addr + main_words.len() * 2, 0);
        for (i, w) in main_words.iter().enumerate() {
            bytes[main_addr + i * 2] = (w >> 8) as u8;
            bytes[main_addr + i * 2 + 1] = (w & 0xFF) as u8;
        }
        let mem = Memory::new(bytes, 0x40);
        let decoder = TextDecoder::new(&mem, AlphabetTable::default_table(), abbrev_base, 0);
        let (text, _) = decoder.decode_string(main_addr).unwrap();
        assert_eq!(text, "he");
    }

    #[test]
    fn pack_zchars_sets_terminal_bit() {
        let words = TextDecoder::pack_zchars(&[6, 6, 6]);
        assert_eq!(words.len(), 1);
        assert_ne!(words[0] & 0x8000, 0);
    }
}
