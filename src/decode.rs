//! The instruction decoder (§4.6): an iterator-style cursor over the memory
//! buffer, the same "advance an offset, yield a structured record" shape as
//! a packed-string or Quetzal chunk reader, specialized to one instruction.

use crate::error::{Error, Result};
use crate::memory::Memory;
use crate::text::TextDecoder;
use crate::version::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    Long,
    Short,
    Variable,
    Extended,
}

/// Which opcode table an instruction's number indexes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Op0,
    Op1,
    Op2,
    Var,
    Ext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Constant(u16),
    Variable(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Branch {
    pub on_true: bool,
    pub offset: i16,
}

#[derive(Debug, Clone)]
pub struct Instruction {
    pub addr: usize,
    pub len: usize,
    pub name: &'static str,
    pub form: Form,
    pub category: Category,
    pub opcode_number: u8,
    pub operands: Vec<Operand>,
    pub store: Option<u8>,
    pub branch: Option<Branch>,
    /// Inline packed string for `print`/`print_ret`.
    pub text: Option<String>,
}

impl Instruction {
    /// The address of the next instruction, absent any branch/call/return
    /// override.
    pub fn next_addr(&self) -> usize {
        self.addr + self.len
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperandType {
    LargeConstant,
    SmallConstant,
    Variable,
    Omitted,
}

impl OperandType {
    fn from_bits(bits: u8) -> OperandType {
        match bits & 0x3 {
            0 => OperandType::LargeConstant,
            1 => OperandType::SmallConstant,
            2 => OperandType::Variable,
            _ => OperandType::Omitted,
        }
    }
}

/// Opcode metadata this crate needs to finish parsing an instruction: its
/// name (for tracing and dispatch) and whether a store byte / branch bytes
/// follow the operands.
struct Meta {
    name: &'static str,
    has_store: bool,
    has_branch: bool,
    has_text: bool,
}

fn meta(name: &'static str, has_store: bool, has_branch: bool) -> Meta {
    Meta {
        name,
        has_store,
        has_branch,
        has_text: false,
    }
}

fn op2_meta(num: u8) -> Meta {
    match num {
        1 => meta("je", false, true),
        2 => meta("jl", false, true),
        3 => meta("jg", false, true),
        4 => meta("dec_chk", false, true),
        5 => meta("inc_chk", false, true),
        6 => meta("jin", false, true),
        7 => meta("test", false, true),
        8 => meta("or", true, false),
        9 => meta("and", true, false),
        10 => meta("test_attr", false, true),
        11 => meta("set_attr", false, false),
        12 => meta("clear_attr", false, false),
        13 => meta("store", false, false),
        14 => meta("insert_obj", false, false),
        15 => meta("loadw", true, false),
        16 => meta("loadb", true, false),
        17 => meta("get_prop", true, false),
        18 => meta("get_prop_addr", true, false),
        19 => meta("get_next_prop", true, false),
        20 => meta("add", true, false),
        21 => meta("sub", true, false),
        22 => meta("mul", true, false),
        23 => meta("div", true, false),
        24 => meta("mod", true, false),
        25 => meta("call_2s", true, false),
        26 => meta("call_2n", false, false),
        27 => meta("set_colour", false, false),
        28 => meta("throw", false, false),
        _ => meta("unknown_2op", false, false),
    }
}

fn op1_meta(num: u8, version: Version) -> Meta {
    match num {
        0 => meta("jz", false, true),
        1 => meta("get_sibling", true, true),
        2 => meta("get_child", true, true),
        3 => meta("get_parent", true, false),
        4 => meta("get_prop_len", true, false),
        5 => meta("inc", false, false),
        6 => meta("dec", false, false),
        7 => meta("print_addr", false, false),
        8 => meta("call_1s", true, false),
        9 => meta("remove_obj", false, false),
        10 => meta("print_obj", false, false),
        11 => meta("ret", false, false),
        12 => meta("jump", false, false),
        13 => meta("print_paddr", false, false),
        14 => meta("load", true, false),
        15 => {
            if matches!(version, Version::V5 | Version::V7 | Version::V8) {
                meta("call_1n", false, false)
            } else {
                meta("not", true, false)
            }
        }
        _ => meta("unknown_1op", false, false),
    }
}

fn op0_meta(num: u8, version: Version) -> Meta {
    match num {
        0 => meta("rtrue", false, false),
        1 => meta("rfalse", false, false),
        2 => {
            let mut m = meta("print", false, false);
            m.has_text = true;
            m
        }
        3 => {
            let mut m = meta("print_ret", false, false);
            m.has_text = true;
            m
        }
        4 => meta("nop", false, false),
        5 => {
            if version == Version::V3 {
                meta("save", false, true)
            } else {
                meta("save", true, false)
            }
        }
        6 => {
            if version == Version::V3 {
                meta("restore", false, true)
            } else {
                meta("restore", true, false)
            }
        }
        7 => meta("restart", false, false),
        8 => meta("ret_popped", false, false),
        9 => {
            if matches!(version, Version::V5 | Version::V7 | Version::V8) {
                meta("catch", true, false)
            } else {
                meta("pop", false, false)
            }
        }
        10 => meta("quit", false, false),
        11 => meta("new_line", false, false),
        12 => meta("show_status", false, false),
        13 => meta("verify", false, true),
        15 => meta("piracy", false, true),
        _ => meta("unknown_0op", false, false),
    }
}

fn var_meta(num: u8, version: Version) -> Meta {
    match num {
        0 => meta("call_vs", true, false),
        1 => meta("storew", false, false),
        2 => meta("storeb", false, false),
        3 => meta("put_prop", false, false),
        4 => {
            if version.is_v4_plus() {
                meta("aread", true, false)
            } else {
                meta("sread", false, false)
            }
        }
        5 => meta("print_char", false, false),
        6 => meta("print_num", false, false),
        7 => meta("random", true, false),
        8 => meta("push", false, false),
        9 => meta("pull", false, false),
        10 => meta("split_window", false, false),
        11 => meta("set_window", false, false),
        12 => meta("call_vs2", true, false),
        13 => meta("erase_window", false, false),
        14 => meta("erase_line", false, false),
        15 => meta("set_cursor", false, false),
        16 => meta("get_cursor", false, false),
        17 => meta("set_text_style", false, false),
        18 => meta("buffer_mode", false, false),
        19 => meta("output_stream", false, false),
        20 => meta("input_stream", false, false),
        21 => meta("sound_effect", false, false),
        22 => meta("read_char", true, false),
        23 => meta("scan_table", true, true),
        24 => meta("not", true, false),
        25 => meta("call_vn", false, false),
        26 => meta("call_vn2", false, false),
        27 => meta("tokenise", false, false),
        28 => meta("encode_text", false, false),
        29 => meta("copy_table", false, false),
        30 => meta("print_table", false, false),
        31 => meta("check_arg_count", false, true),
        _ => meta("unknown_var", false, false),
    }
}

fn ext_meta(num: u8) -> Meta {
    match num {
        0 => meta("save", true, false),
        1 => meta("restore", true, false),
        2 => meta("log_shift", true, false),
        3 => meta("art_shift", true, false),
        4 => meta("set_font", true, false),
        9 => meta("save_undo", true, false),
        10 => meta("restore_undo", true, false),
        11 => meta("print_unicode", false, false),
        12 => meta("check_unicode", true, false),
        _ => meta("unknown_ext", false, false),
    }
}

/// Opcodes that read a second type byte for up to 8 operands instead of 4.
fn takes_double_operand_types(category: Category, num: u8) -> bool {
    category == Category::Var && (num == 12 || num == 26)
}

pub struct Decoder<'a> {
    memory: &'a Memory,
    version: Version,
}

impl<'a> Decoder<'a> {
    pub fn new(memory: &'a Memory, version: Version) -> Decoder<'a> {
        Decoder { memory, version }
    }

    /// Decode the instruction at `addr`. `text_decoder` is used only for
    /// `print`/`print_ret`'s inline string.
    pub fn decode_at(&self, addr: usize, text_decoder: &TextDecoder) -> Result<Instruction> {
        let mut cursor = addr;
        let opcode_byte = self.memory.read_u8(cursor);
        cursor += 1;

        let (form, category, opcode_number, operand_types) = if opcode_byte == 0xBE {
            if !self.version.has_extended_form() {
                return Err(Error::Malformed(format!(
                    "extended opcode form at {addr:#06x} unsupported in this version"
                )));
            }
            let num = self.memory.read_u8(cursor);
            cursor += 1;
            let types_byte = self.memory.read_u8(cursor);
            cursor += 1;
            let mut types = Self::unpack_types(types_byte);
            if takes_double_operand_types(Category::Ext, num) {
                let second = self.memory.read_u8(cursor);
                cursor += 1;
                types.extend(Self::unpack_types(second));
            }
            (Form::Extended, Category::Ext, num, types)
        } else if opcode_byte & 0xC0 == 0xC0 {
            let is_2op = opcode_byte & 0x20 == 0;
            let num = opcode_byte & 0x1F;
            let category = if is_2op { Category::Op2 } else { Category::Var };
            let types_byte = self.memory.read_u8(cursor);
            cursor += 1;
            let mut types = Self::unpack_types(types_byte);
            if takes_double_operand_types(category, num) {
                let second = self.memory.read_u8(cursor);
                cursor += 1;
                types.extend(Self::unpack_types(second));
            }
            (Form::Variable, category, num, types)
        } else if opcode_byte & 0x80 == 0 {
            let num = opcode_byte & 0x1F;
            let op1_type = if opcode_byte & 0x40 != 0 {
                OperandType::Variable
            } else {
                OperandType::SmallConstant
            };
            let op2_type = if opcode_byte & 0x20 != 0 {
                OperandType::Variable
            } else {
                OperandType::SmallConstant
            };
            (Form::Long, Category::Op2, num, vec![op1_type, op2_type])
        } else {
            let type_bits = (opcode_byte >> 4) & 0x3;
            let num = opcode_byte & 0x0F;
            let operand_type = OperandType::from_bits(type_bits);
            if operand_type == OperandType::Omitted {
                (Form::Short, Category::Op0, num, vec![])
            } else {
                (Form::Short, Category::Op1, num, vec![operand_type])
            }
        };

        let mut operands = Vec::with_capacity(operand_types.len());
        for ty in &operand_types {
            match ty {
                OperandType::LargeConstant => {
                    let value = self.memory.read_u16(cursor);
                    cursor += 2;
                    operands.push(Operand::Constant(value));
                }
                OperandType::SmallConstant => {
                    let value = self.memory.read_u8(cursor) as u16;
                    cursor += 1;
                    operands.push(Operand::Constant(value));
                }
                OperandType::Variable => {
                    let value = self.memory.read_u8(cursor);
                    cursor += 1;
                    operands.push(Operand::Variable(value));
                }
                OperandType::Omitted => break,
            }
        }

        let info = match category {
            Category::Op0 => op0_meta(opcode_number, self.version),
            Category::Op1 => op1_meta(opcode_number, self.version),
            Category::Op2 => op2_meta(opcode_number),
            Category::Var => var_meta(opcode_number, self.version),
            Category::Ext => ext_meta(opcode_number),
        };

        let store = if info.has_store {
            let s = self.memory.read_u8(cursor);
            cursor += 1;
            Some(s)
        } else {
            None
        };

        let branch = if info.has_branch {
            let b0 = self.memory.read_u8(cursor);
            cursor += 1;
            let on_true = b0 & 0x80 != 0;
            let offset = if b0 & 0x40 != 0 {
                (b0 & 0x3F) as i16
            } else {
                let b1 = self.memory.read_u8(cursor);
                cursor += 1;
                let raw = (((b0 & 0x3F) as u16) << 8) | b1 as u16;
                if raw & 0x2000 != 0 {
                    raw as i16 - 0x4000
                } else {
                    raw as i16
                }
            };
            Some(Branch { on_true, offset })
        } else {
            None
        };

        let text = if info.has_text {
            let (decoded, end) = text_decoder.decode_string(cursor)?;
            cursor = end;
            Some(decoded)
        } else {
            None
        };

        Ok(Instruction {
            addr,
            len: cursor - addr,
            name: info.name,
            form,
            category,
            opcode_number,
            operands,
            store,
            branch,
            text,
        })
    }

    fn unpack_types(byte: u8) -> Vec<OperandType> {
        let mut types = Vec::with_capacity(4);
        for shift in [6, 4, 2, 0] {
            let ty = OperandType::from_bits(byte >> shift);
            if ty == OperandType::Omitted {
                break;
            }
            types.push(ty);
        }
        types
    }
}

/// Resolve a `Branch` descriptor against the current `addr`-relative PC
/// (already advanced past the instruction) into the next PC, or a return
/// value if the branch is a `rtrue`/`rfalse` shorthand (offset 0 or 1).
pub enum BranchOutcome {
    Jump(usize),
    ReturnFalse,
    ReturnTrue,
}

pub fn resolve_branch(branch: Branch, taken: bool, pc_after_instruction: usize) -> Option<BranchOutcome> {
    if taken != branch.on_true {
        return None;
    }
    Some(match branch.offset {
        0 => BranchOutcome::ReturnFalse,
        1 => BranchOutcome::ReturnTrue,
        offset => BranchOutcome::Jump((pc_after_instruction as isize + offset as isize - 2) as usize),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::alphabet::AlphabetTable;

    fn decoder_for(bytes: Vec<u8>) -> (Memory, Version) {
        (Memory::new(bytes, 0x40), Version::V3)
    }

    #[test]
    fn decodes_long_form_add() {
        // add (opcode 20): long form, both small constants: 0x14 = 0b00010100
        let bytes = vec![0x14, 5, 7, 0x00 /* store var 0 */];
        let (mem, version) = decoder_for(bytes);
        let decoder = Decoder::new(&mem, version);
        let text_decoder = TextDecoder::new(&mem, AlphabetTable::default_table(), 0, 0);
        let instr = decoder.decode_at(0, &text_decoder).unwrap();
        assert_eq!(instr.name, "add");
        assert_eq!(instr.operands, vec![Operand::Constant(5), Operand::Constant(7)]);
        assert_eq!(instr.store, Some(0));
        assert_eq!(instr.len, 4);
    }

    #[test]
    fn decodes_short_form_jz_with_branch() {
        // jz (1OP opcode 0): short form, small-constant operand: 0x90
        // branch byte: on_true=1, 6-bit offset=5 -> 0b11000101 = 0xC5
        let bytes = vec![0x90, 3, 0xC5];
        let (mem, version) = decoder_for(bytes);
        let decoder = Decoder::new(&mem, version);
        let text_decoder = TextDecoder::new(&mem, AlphabetTable::default_table(), 0, 0);
        let instr = decoder.decode_at(0, &text_decoder).unwrap();
        assert_eq!(instr.name, "jz");
        assert_eq!(instr.operands, vec![Operand::Constant(3)]);
        let branch = instr.branch.unwrap();
        assert!(branch.on_true);
        assert_eq!(branch.offset, 5);
    }

    #[test]
    fn decodes_variable_form_call_vs() {
        // call_vs = VAR opcode 0 -> byte 0xE0; type byte: large const, small const, omitted, omitted = 0b00_01_11_11 = 0x1F
        let bytes = vec![0xE0, 0x1F, 0x10, 0x00, 2, 0xAB];
        let (mem, version) = decoder_for(bytes);
        let decoder = Decoder::new(&mem, version);
        let text_decoder = TextDecoder::new(&mem, AlphabetTable::default_table(), 0, 0);
        let instr = decoder.decode_at(0, &text_decoder).unwrap();
        assert_eq!(instr.name, "call_vs");
        assert_eq!(
            instr.operands,
            vec![Operand::Constant(0x1000), Operand::Constant(2)]
        );
        assert_eq!(instr.store, Some(0xAB));
    }

    #[test]
    fn fourteen_bit_branch_offset_sign_extends() {
        // jz, operand small const 0, branch: on_true=0, long form, offset -10 (14-bit signed)
        let raw: i16 = -10;
        let unsigned = (raw + 0x4000) as u16 & 0x3FFF;
        let b0 = ((unsigned >> 8) as u8) & 0x3F; // bit7=0 (on_true=false), bit6=0 (long branch)
        let b1 = (unsigned & 0xFF) as u8;
        let bytes = vec![0x90, 0, b0, b1];
        let (mem, version) = decoder_for(bytes);
        let decoder = Decoder::new(&mem, version);
        let text_decoder = TextDecoder::new(&mem, AlphabetTable::default_table(), 0, 0);
        let instr = decoder.decode_at(0, &text_decoder).unwrap();
        let branch = instr.branch.unwrap();
        assert!(!branch.on_true);
        assert_eq!(branch.offset, -10);
    }

    #[test]
    fn resolve_branch_offset_zero_returns_false() {
        let branch = Branch { on_true: true, offset: 0 };
        match resolve_branch(branch, true, 100) {
            Some(BranchOutcome::ReturnFalse) => {}
            other => panic!("expected ReturnFalse, got {other:?}"),
        }
    }

    impl std::fmt::Debug for BranchOutcome {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                BranchOutcome::Jump(a) => write!(f, "Jump({a})"),
                BranchOutcome::ReturnFalse => write!(f, "ReturnFalse"),
                BranchOutcome::ReturnTrue => write!(f, "ReturnTrue"),
            }
        }
    }
}
