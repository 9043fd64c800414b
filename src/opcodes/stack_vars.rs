//! Variable, evaluation-stack, and raw-memory opcodes (§3, §4.1, §4.5).

use crate::decode::{Instruction, Operand};
use crate::error::Result;
use crate::interpreter::Interpreter;

fn var_number(op: Operand) -> Result<u8> {
    match op {
        Operand::Constant(c) => Ok(c as u8),
        Operand::Variable(v) => Ok(v),
    }
}

pub fn op_store(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let var = var_number(instr.operands[0])?;
    let value = interp.resolve_operand(instr.operands[1])?;
    interp.poke_variable(var, value)?;
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_load(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let var = var_number(instr.operands[0])?;
    let value = interp.peek_variable(var)?;
    interp.store_result(instr, value)
}

pub fn op_push(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let value = interp.resolve_operand(instr.operands[0])?;
    interp.write_variable(0, value)?;
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_pull(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let var = var_number(instr.operands[0])?;
    let value = interp.read_variable(0)?;
    interp.poke_variable(var, value)?;
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_pop(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    interp.read_variable(0)?;
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_inc(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let var = var_number(instr.operands[0])?;
    let value = (interp.peek_variable(var)? as i16).wrapping_add(1) as u16;
    interp.poke_variable(var, value)?;
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_dec(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let var = var_number(instr.operands[0])?;
    let value = (interp.peek_variable(var)? as i16).wrapping_sub(1) as u16;
    interp.poke_variable(var, value)?;
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_inc_chk(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let var = var_number(instr.operands[0])?;
    let threshold = interp.resolve_operand(instr.operands[1])? as i16;
    let value = (interp.peek_variable(var)? as i16).wrapping_add(1);
    interp.poke_variable(var, value as u16)?;
    interp.take_branch(instr, value > threshold)
}

pub fn op_dec_chk(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let var = var_number(instr.operands[0])?;
    let threshold = interp.resolve_operand(instr.operands[1])? as i16;
    let value = (interp.peek_variable(var)? as i16).wrapping_sub(1);
    interp.poke_variable(var, value as u16)?;
    interp.take_branch(instr, value < threshold)
}

pub fn op_loadw(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let addr = interp.wrapped_word_addr(vals[0], vals[1] as i16);
    let value = interp.memory().read_u16(addr);
    interp.store_result(instr, value)
}

pub fn op_loadb(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let addr = interp.wrapped_byte_addr(vals[0], vals[1] as i16);
    let value = interp.memory().read_u8(addr) as u16;
    interp.store_result(instr, value)
}

pub fn op_storew(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let addr = interp.wrapped_word_addr(vals[0], vals[1] as i16);
    interp.memory_mut().write_u16(addr, vals[2]);
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_storeb(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let addr = interp.wrapped_byte_addr(vals[0], vals[1] as i16);
    interp.memory_mut().write_u8(addr, vals[2] as u8);
    interp.fallthrough(instr);
    Ok(())
}

/// `copy_table(src, dst, size)`: `dst == 0` zero-fills `src`; `size < 0`
/// deliberately reads `src` live byte by byte, so an overlapping region
/// smears already-written bytes forward; `size > 0` snapshots `src` first
/// and copies overlap-safely (§4.1).
pub fn op_copy_table(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let src = vals[0] as usize;
    let dst = vals[1] as usize;
    let size = vals[2] as i16;
    let len = size.unsigned_abs() as usize;

    if dst == 0 {
        for i in 0..len {
            interp.memory_mut().write_u8(src + i, 0);
        }
        interp.fallthrough(instr);
        return Ok(());
    }

    if size < 0 {
        for i in 0..len {
            let b = interp.memory().read_u8(src + i);
            interp.memory_mut().write_u8(dst + i, b);
        }
    } else {
        let bytes: Vec<u8> = (0..len).map(|i| interp.memory().read_u8(src + i)).collect();
        if dst <= src {
            for (i, b) in bytes.iter().enumerate() {
                interp.memory_mut().write_u8(dst + i, *b);
            }
        } else {
            for (i, b) in bytes.iter().enumerate().rev() {
                interp.memory_mut().write_u8(dst + i, *b);
            }
        }
    }
    interp.fallthrough(instr);
    Ok(())
}

/// `scan_table(value, table, len, form?)`: linear search for `value`, either
/// as words (default) or bytes (`form` bit 7 clear and bit-width 1). Stores
/// the matching address and branches if found.
pub fn op_scan_table(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let value = vals[0];
    let table = vals[1] as usize;
    let len = vals[2] as usize;
    let form = vals.get(3).copied().unwrap_or(0x82);
    let as_words = form & 0x80 != 0;
    let entry_size = (form & 0x7F).max(1) as usize;

    let mut found = 0u16;
    for i in 0..len {
        let addr = table + i * entry_size;
        let candidate = if as_words {
            interp.memory().read_u16(addr)
        } else {
            interp.memory().read_u8(addr) as u16
        };
        if candidate == value {
            found = addr as u16;
            break;
        }
    }
    interp.store_result(instr, found)?;
    interp.take_branch(instr, found != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{Branch, Category, Form};
    use crate::interpreter::tests_support::minimal_interpreter;

    fn instr(
        name: &'static str,
        operands: Vec<Operand>,
        store: Option<u8>,
        branch: Option<Branch>,
    ) -> Instruction {
        Instruction {
            addr: 0,
            len: 1,
            name,
            form: Form::Variable,
            category: Category::Var,
            opcode_number: 0,
            operands,
            store,
            branch,
            text: None,
        }
    }

    #[test]
    fn storew_loadw_round_trip() {
        let mut interp = minimal_interpreter();
        let store = instr(
            "storew",
            vec![Operand::Constant(0x300), Operand::Constant(2), Operand::Constant(0xBEEF)],
            None,
            None,
        );
        op_storew(&mut interp, &store).unwrap();
        let load = instr(
            "loadw",
            vec![Operand::Constant(0x300), Operand::Constant(2)],
            Some(16),
            None,
        );
        op_loadw(&mut interp, &load).unwrap();
        assert_eq!(interp.read_variable(16).unwrap(), 0xBEEF);
    }

    #[test]
    fn inc_chk_branches_when_over_threshold() {
        let mut interp = minimal_interpreter();
        interp.write_variable(16, 4).unwrap();
        let i = instr(
            "inc_chk",
            vec![Operand::Constant(16), Operand::Constant(4)],
            None,
            Some(Branch { on_true: true, offset: 10 }),
        );
        let pc_before = interp.pc();
        op_inc_chk(&mut interp, &i).unwrap();
        assert_eq!(interp.read_variable(16).unwrap(), 5);
        assert_ne!(interp.pc(), pc_before);
    }

    #[test]
    fn copy_table_zero_fills_when_dst_is_zero() {
        let mut interp = minimal_interpreter();
        interp.memory_mut().write_u8(0x300, 0xFF);
        interp.memory_mut().write_u8(0x301, 0xFF);
        let i = instr(
            "copy_table",
            vec![Operand::Constant(0x300), Operand::Constant(0), Operand::Constant(2)],
            None,
            None,
        );
        op_copy_table(&mut interp, &i).unwrap();
        assert_eq!(interp.memory().read_u8(0x300), 0);
        assert_eq!(interp.memory().read_u8(0x301), 0);
    }

    #[test]
    fn copy_table_negative_size_smears_overlapping_forward_copy() {
        let mut interp = minimal_interpreter();
        interp.memory_mut().write_u8(0x300, b'a');
        interp.memory_mut().write_u8(0x301, b'b');
        interp.memory_mut().write_u8(0x302, b'c');
        interp.memory_mut().write_u8(0x303, b'd');
        let i = instr(
            "copy_table",
            vec![
                Operand::Constant(0x300),
                Operand::Constant(0x302),
                Operand::Constant(-4i16 as u16),
            ],
            None,
            None,
        );
        op_copy_table(&mut interp, &i).unwrap();
        assert_eq!(interp.memory().read_u8(0x302), b'a');
        assert_eq!(interp.memory().read_u8(0x303), b'b');
        assert_eq!(interp.memory().read_u8(0x304), b'a');
        assert_eq!(interp.memory().read_u8(0x305), b'b');
    }

    #[test]
    fn scan_table_finds_matching_word() {
        let mut interp = minimal_interpreter();
        interp.memory_mut().write_u16(0x300, 11);
        interp.memory_mut().write_u16(0x302, 22);
        let i = instr(
            "scan_table",
            vec![Operand::Constant(22), Operand::Constant(0x300), Operand::Constant(2)],
            Some(16),
            Some(Branch { on_true: true, offset: 1 }),
        );
        op_scan_table(&mut interp, &i).unwrap();
        assert_eq!(interp.read_variable(16).unwrap(), 0x302);
    }
}
