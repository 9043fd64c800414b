//! Quetzal save-file format (§4.9): an IFF FORM "IFZS" containing an `IFhd`
//! identification chunk, a `CMem`/`UMem` memory chunk, and a `Stks` call-stack
//! chunk. Grounded on the teacher's IFF-flavored chunk readers (`mach/fat.rs`'s
//! magic-plus-count header followed by sequential sub-records, and
//! `archive.rs`'s size-prefixed, even-padded member records — IFF chunks pad
//! to even length the same way Unix archive members do).

use std::fs;
use std::io::Write;

use scroll::{Pread, BE};

use crate::error::{Error, Result};
use crate::frame::{CallStack, Frame};
use crate::header::Header;
use crate::memory::Memory;

const FORM_ID: &[u8; 4] = b"FORM";
const IFZS_ID: &[u8; 4] = b"IFZS";
const IFHD_ID: &[u8; 4] = b"IFhd";
const CMEM_ID: &[u8; 4] = b"CMem";
const UMEM_ID: &[u8; 4] = b"UMem";
const STKS_ID: &[u8; 4] = b"Stks";

struct Chunk {
    id: [u8; 4],
    data: Vec<u8>,
}

fn write_chunk(out: &mut Vec<u8>, id: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(id);
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
    if data.len() % 2 == 1 {
        out.push(0);
    }
}

fn chunk_id_at(bytes: &[u8], offset: usize) -> Result<[u8; 4]> {
    bytes
        .get(offset..offset + 4)
        .map(|s| [s[0], s[1], s[2], s[3]])
        .ok_or_else(|| Error::Malformed("quetzal file truncated".into()))
}

fn read_chunks(bytes: &[u8]) -> Result<Vec<Chunk>> {
    if bytes.len() < 12 {
        return Err(Error::Malformed("quetzal file too short".into()));
    }
    let form = chunk_id_at(bytes, 0)?;
    if &form != FORM_ID {
        return Err(Error::Malformed("quetzal file missing FORM header".into()));
    }
    let total_len: u32 = bytes.pread_with(4, BE).map_err(Error::Decode)?;
    let sub_id = chunk_id_at(bytes, 8)?;
    if &sub_id != IFZS_ID {
        return Err(Error::Malformed("quetzal file is not an IFZS form".into()));
    }

    let mut chunks = Vec::new();
    let mut cursor = 12usize;
    let end = (8 + total_len as usize).min(bytes.len());
    while cursor + 8 <= end {
        let id = chunk_id_at(bytes, cursor)?;
        let len: u32 = bytes.pread_with(cursor + 4, BE).map_err(Error::Decode)?;
        let data_start = cursor + 8;
        let data_end = data_start + len as usize;
        if data_end > bytes.len() {
            return Err(Error::Malformed("quetzal chunk runs past end of file".into()));
        }
        chunks.push(Chunk {
            id,
            data: bytes[data_start..data_end].to_vec(),
        });
        cursor = data_end + (len as usize % 2);
    }
    Ok(chunks)
}

/// RLE-encode `current` against `original` per Quetzal's `CMem` rule: equal
/// bytes collapse into a run length (stored as `0x00`, run_length - 1); any
/// other byte is the XOR of the two images, stored literally.
fn encode_cmem(original: &[u8], current: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut zero_run = 0usize;
    let len = original.len().max(current.len());
    for i in 0..len {
        let o = original.get(i).copied().unwrap_or(0);
        let c = current.get(i).copied().unwrap_or(0);
        let diff = o ^ c;
        if diff == 0 {
            zero_run += 1;
            if zero_run == 256 {
                out.push(0);
                out.push(255);
                zero_run = 0;
            }
        } else {
            if zero_run > 0 {
                out.push(0);
                out.push((zero_run - 1) as u8);
                zero_run = 0;
            }
            out.push(diff);
        }
    }
    if zero_run > 0 {
        out.push(0);
        out.push((zero_run - 1) as u8);
    }
    out
}

fn decode_cmem(original: &[u8], encoded: &[u8]) -> Vec<u8> {
    let mut result = original.to_vec();
    let mut pos = 0usize;
    let mut i = 0usize;
    while i < encoded.len() {
        let b = encoded[i];
        if b == 0 {
            let run = encoded.get(i + 1).copied().unwrap_or(0) as usize + 1;
            pos += run;
            i += 2;
        } else {
            if pos < result.len() {
                result[pos] ^= b;
            }
            pos += 1;
            i += 1;
        }
    }
    result
}

/// One call frame as it appears in a `Stks` chunk (§4.9): 3-byte big-endian
/// return PC, a flags byte (bit 4 set when the result is discarded, low
/// nibble the local count), the result variable, an arguments-supplied
/// bitmask, the eval-stack word count, then locals and eval-stack words.
fn write_stack_frame(out: &mut Vec<u8>, frame: &Frame) {
    out.push((frame.return_pc >> 16) as u8);
    out.push((frame.return_pc >> 8) as u8);
    out.push(frame.return_pc as u8);

    let discards_result = frame.return_slot.is_none();
    let flags = (frame.locals.len() as u8 & 0x0F) | if discards_result { 0x10 } else { 0 };
    out.push(flags);
    out.push(frame.return_slot.unwrap_or(0));

    let arg_mask = if frame.num_args_supplied == 0 {
        0
    } else {
        (1u16 << frame.num_args_supplied) - 1
    };
    out.push(arg_mask as u8);

    out.extend_from_slice(&(frame.eval_stack.len() as u16).to_be_bytes());
    for local in &frame.locals {
        out.extend_from_slice(&local.to_be_bytes());
    }
    for value in &frame.eval_stack {
        out.extend_from_slice(&value.to_be_bytes());
    }
}

fn read_stack_frame(data: &[u8], cursor: &mut usize) -> Result<Frame> {
    if *cursor + 8 > data.len() {
        return Err(Error::Malformed("quetzal Stks chunk truncated".into()));
    }
    let return_pc = ((data[*cursor] as usize) << 16) | ((data[*cursor + 1] as usize) << 8) | data[*cursor + 2] as usize;
    let flags = data[*cursor + 3];
    let result_var = data[*cursor + 4];
    let _arg_mask = data[*cursor + 5];
    let eval_len = u16::from_be_bytes([data[*cursor + 6], data[*cursor + 7]]) as usize;
    *cursor += 8;

    let num_locals = (flags & 0x0F) as usize;
    if *cursor + 2 * (num_locals + eval_len) > data.len() {
        return Err(Error::Malformed("quetzal Stks chunk truncated".into()));
    }
    let mut locals = Vec::with_capacity(num_locals);
    for _ in 0..num_locals {
        locals.push(u16::from_be_bytes([data[*cursor], data[*cursor + 1]]));
        *cursor += 2;
    }
    let mut eval_stack = Vec::with_capacity(eval_len);
    for _ in 0..eval_len {
        eval_stack.push(u16::from_be_bytes([data[*cursor], data[*cursor + 1]]));
        *cursor += 2;
    }

    let discards_result = flags & 0x10 != 0;
    Ok(Frame {
        return_pc,
        num_args_supplied: bits_set(_arg_mask),
        locals,
        eval_stack,
        return_slot: if discards_result { None } else { Some(result_var) },
    })
}

fn bits_set(mask: u8) -> usize {
    (0..8).filter(|b| mask & (1 << b) != 0).count()
}

/// Serialize the full interpreter state — memory diff, call stack, and the PC
/// of the `save` instruction itself — to `path` in Quetzal format.
pub fn save(path: &str, memory: &Memory, header: &Header, call_stack: &CallStack, pc: usize) -> Result<()> {
    let mut ifhd = Vec::new();
    ifhd.extend_from_slice(&header.raw.release_number.to_be_bytes());
    ifhd.extend_from_slice(&header.raw.serial);
    ifhd.extend_from_slice(&header.raw.checksum.to_be_bytes());
    ifhd.push((pc >> 16) as u8);
    ifhd.push((pc >> 8) as u8);
    ifhd.push(pc as u8);

    let cmem = encode_cmem(memory.original_bytes(), memory.as_bytes());

    let mut stks = Vec::new();
    for frame in call_stack.frames_oldest_first() {
        write_stack_frame(&mut stks, frame);
    }

    let mut body = Vec::new();
    body.extend_from_slice(IFZS_ID);
    write_chunk(&mut body, IFHD_ID, &ifhd);
    write_chunk(&mut body, CMEM_ID, &cmem);
    write_chunk(&mut body, STKS_ID, &stks);

    let mut file_bytes = Vec::new();
    file_bytes.extend_from_slice(FORM_ID);
    file_bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
    file_bytes.extend_from_slice(&body);

    let mut file = fs::File::create(path)?;
    file.write_all(&file_bytes)?;
    Ok(())
}

/// The restored PC (positioned at the `save` instruction's store/branch byte,
/// per §4.9) and call stack.
pub struct RestoredState {
    pub pc: usize,
    pub call_stack: CallStack,
}

/// Read `path`, apply its memory chunk over `memory`'s pristine copy, and
/// return the saved PC and call stack. The caller is responsible for
/// validating the restored release/serial/checksum against the running story
/// if it cares to reject a save from a different game.
pub fn restore(path: &str, memory: &mut Memory) -> Result<RestoredState> {
    let bytes = fs::read(path)?;
    let chunks = read_chunks(&bytes)?;

    let mut pc = 0usize;
    let mut call_stack = CallStack::new();
    let mut applied_memory = false;

    for chunk in &chunks {
        match &chunk.id {
            id if id == IFHD_ID => {
                if chunk.data.len() >= 13 {
                    pc = ((chunk.data[10] as usize) << 16)
                        | ((chunk.data[11] as usize) << 8)
                        | chunk.data[12] as usize;
                }
            }
            id if id == CMEM_ID => {
                let restored = decode_cmem(memory.original_bytes(), &chunk.data);
                let len = restored.len().min(memory.len());
                memory.as_bytes_mut()[..len].copy_from_slice(&restored[..len]);
                applied_memory = true;
            }
            id if id == UMEM_ID => {
                let len = chunk.data.len().min(memory.len());
                memory.as_bytes_mut()[..len].copy_from_slice(&chunk.data[..len]);
                applied_memory = true;
            }
            id if id == STKS_ID => {
                let mut cursor = 0usize;
                let mut frames = Vec::new();
                while cursor < chunk.data.len() {
                    frames.push(read_stack_frame(&chunk.data, &mut cursor)?);
                }
                for frame in frames {
                    call_stack.push_frame(frame);
                }
            }
            _ => {}
        }
    }

    if !applied_memory {
        return Err(Error::Malformed("quetzal file has no memory chunk".into()));
    }

    Ok(RestoredState { pc, call_stack })
}
