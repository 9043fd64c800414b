//! Dictionary header parsing and the input tokenizer (§4.4).

use std::cmp::Ordering;

use crate::memory::Memory;
use crate::text::alphabet::AlphabetTable;
use crate::text::TextDecoder;
use crate::version::Version;

/// A parsed dictionary header plus its entry table geometry.
#[derive(Debug, Clone)]
pub struct Dictionary {
    version: Version,
    separators: Vec<u8>,
    entry_length: usize,
    entry_count: i16,
    entries_base: usize,
}

impl Dictionary {
    pub fn parse(memory: &Memory, version: Version, base: usize) -> Dictionary {
        let sep_count = memory.read_u8(base) as usize;
        let separators = (0..sep_count).map(|i| memory.read_u8(base + 1 + i)).collect();
        let entry_length = memory.read_u8(base + 1 + sep_count) as usize;
        let entry_count = memory.read_i16(base + 2 + sep_count);
        let entries_base = base + 4 + sep_count;
        Dictionary {
            version,
            separators,
            entry_length,
            entry_count,
            entries_base,
        }
    }

    fn is_sorted(&self) -> bool {
        self.entry_count >= 0
    }

    fn count(&self) -> usize {
        self.entry_count.unsigned_abs() as usize
    }

    fn entry_addr(&self, index: usize) -> usize {
        self.entries_base + index * self.entry_length
    }

    fn zchar_width(&self) -> usize {
        self.version.dict_zchar_width()
    }

    /// Encode `word` the way a resident entry's leading z-chars are encoded,
    /// so the two are bit-for-bit comparable (§4.2 "Encoding for dictionary
    /// lookups").
    fn encode_key(&self, alphabets: &AlphabetTable, word: &[u8]) -> Vec<u8> {
        let text: String = word.iter().map(|&b| b as char).collect();
        let zchars = TextDecoder::encode_word(alphabets, &text, self.zchar_width());
        TextDecoder::pack_zchars(&zchars)
            .into_iter()
            .flat_map(u16::to_be_bytes)
            .collect()
    }

    /// Look up `word`'s dictionary address, or 0 if absent. Binary-searches a
    /// sorted table on the raw packed bytes (already in the game's sort
    /// order); falls back to a linear scan for an unsorted one.
    pub fn lookup(&self, memory: &Memory, alphabets: &AlphabetTable, word: &[u8]) -> u16 {
        let key = self.encode_key(alphabets, word);
        if self.is_sorted() {
            let mut lo = 0usize;
            let mut hi = self.count();
            while lo < hi {
                let mid = lo + (hi - lo) / 2;
                let addr = self.entry_addr(mid);
                match memory.slice(addr, key.len()).cmp(key.as_slice()) {
                    Ordering::Less => lo = mid + 1,
                    Ordering::Greater => hi = mid,
                    Ordering::Equal => return addr as u16,
                }
            }
            0
        } else {
            (0..self.count())
                .map(|i| self.entry_addr(i))
                .find(|&addr| memory.slice(addr, key.len()) == key.as_slice())
                .map(|addr| addr as u16)
                .unwrap_or(0)
        }
    }
}

/// One token produced by splitting a text buffer: its raw bytes and the byte
/// offset of its first character, counted from the start of the text buffer.
struct Token {
    bytes: Vec<u8>,
    offset: usize,
}

fn read_input_text(memory: &Memory, version: Version, text_buf: usize) -> Vec<u8> {
    if version.legacy_text_buffer() {
        let limit = memory.read_u8(text_buf) as usize;
        let start = text_buf + 1;
        (0..limit)
            .map(|i| memory.read_u8(start + i))
            .take_while(|&b| b != 0)
            .collect()
    } else {
        let used = memory.read_u8(text_buf + 1) as usize;
        let start = text_buf + 2;
        (0..used).map(|i| memory.read_u8(start + i)).collect()
    }
}

fn split_tokens(text: &[u8], separators: &[u8], text_start_offset: usize) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < text.len() {
        let b = text[i];
        if b == b' ' {
            i += 1;
            continue;
        }
        if separators.contains(&b) {
            tokens.push(Token {
                bytes: vec![b],
                offset: text_start_offset + i,
            });
            i += 1;
            continue;
        }
        let word_start = i;
        while i < text.len() && text[i] != b' ' && !separators.contains(&text[i]) {
            i += 1;
        }
        tokens.push(Token {
            bytes: text[word_start..i].to_ascii_lowercase(),
            offset: text_start_offset + word_start,
        });
    }
    tokens
}

/// Tokenize the text buffer at `text_buf` and write matched-word entries into
/// the parse buffer at `parse_buf` (§4.4). `dict` is the dictionary to match
/// against (the caller resolves a nonzero dictionary operand to an alternate
/// table before calling this). When `skip_unknown` is set, unmatched tokens
/// are not written at all rather than written with dictionary address 0.
pub fn tokenize(
    memory: &mut Memory,
    version: Version,
    alphabets: &AlphabetTable,
    dict: &Dictionary,
    text_buf: usize,
    parse_buf: usize,
    skip_unknown: bool,
) {
    let text_start = if version.legacy_text_buffer() { 1 } else { 2 };
    let text = read_input_text(memory, version, text_buf);
    let tokens = split_tokens(&text, &dict.separators, text_start);

    let max_entries = memory.read_u8(parse_buf) as usize;
    let mut written = 0usize;
    for token in tokens.iter() {
        if written >= max_entries {
            break;
        }
        let addr = dict.lookup(memory, alphabets, &token.bytes);
        if addr == 0 && skip_unknown {
            continue;
        }
        let entry = parse_buf + 2 + written * 4;
        memory.write_u16(entry, addr);
        memory.write_u8(entry + 2, token.bytes.len() as u8);
        memory.write_u8(entry + 3, token.offset as u8);
        written += 1;
    }
    memory.write_u8(parse_buf + 1, written as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_dict_with_words(words: &[&str]) -> (Memory, Dictionary) {
        let base = 0x40usize;
        let mut bytes = vec![0u8; base + 4];
        bytes[base] = 0; // no separators
        bytes[base + 1] = 6; // entry length (4 zchar bytes + 2 data bytes)
        let alphabets = AlphabetTable::default_table();
        let entries_base = base + 4;
        let mut entries: Vec<(Vec<u8>, &str)> = words
            .iter()
            .map(|w| {
                let zchars = TextDecoder::encode_word(&alphabets, w, 4);
                let key: Vec<u8> = TextDecoder::pack_zchars(&zchars)
                    .into_iter()
                    .flat_map(u16::to_be_bytes)
                    .collect();
                (key, *w)
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        bytes[base + 2] = 0;
        bytes[base + 3] = entries.len() as u8;
        for (key, _) in &entries {
            bytes.extend_from_slice(key);
            bytes.push(0);
            bytes.push(0);
        }
        let mem = Memory::new(bytes, base);
        let dict = Dictionary::parse(&mem, Version::V3, base);
        let _ = entries_base;
        (mem, dict)
    }

    #[test]
    fn parses_header_geometry() {
        let (_, dict) = minimal_dict_with_words(&["north", "south"]);
        assert_eq!(dict.count(), 2);
        assert!(dict.is_sorted());
    }

    #[test]
    fn lookup_finds_known_word() {
        let (mem, dict) = minimal_dict_with_words(&["north", "south", "west"]);
        let alphabets = AlphabetTable::default_table();
        let addr = dict.lookup(&mem, &alphabets, b"north");
        assert_ne!(addr, 0);
        let missing = dict.lookup(&mem, &alphabets, b"zzzzzz");
        assert_eq!(missing, 0);
    }

    #[test]
    fn tokenize_splits_on_separators_and_spaces() {
        let (mut mem, dict) = minimal_dict_with_words(&["go", "north"]);
        let alphabets = AlphabetTable::default_table();

        let text_buf = 0x200usize;
        let parse_buf = 0x300usize;
        mem_ensure_len(&mut mem, parse_buf + 2 + 8 * 4);
        mem.write_u8(text_buf, 20); // limit
        for (i, b) in b"go north".iter().enumerate() {
            mem.write_u8(text_buf + 1 + i, *b);
        }
        mem.write_u8(parse_buf, 8); // max entries

        tokenize(&mut mem, Version::V3, &alphabets, &dict, text_buf, parse_buf, false);

        assert_eq!(mem.read_u8(parse_buf + 1), 2);
        let first_addr = mem.read_u16(parse_buf + 2);
        assert_ne!(first_addr, 0);
        assert_eq!(mem.read_u8(parse_buf + 2 + 2), 2); // "go" length
        assert_eq!(mem.read_u8(parse_buf + 2 + 3), 1); // offset after length byte
    }

    fn mem_ensure_len(mem: &mut Memory, len: usize) {
        if mem.len() < len {
            let mut bytes = mem.as_bytes().to_vec();
            bytes.resize(len, 0);
            *mem = Memory::new(bytes, mem.static_base());
        }
    }
}
