//! Signed/unsigned arithmetic and bitwise opcodes (§4.7).

use crate::decode::Instruction;
use crate::error::{Error, Result};
use crate::interpreter::Interpreter;

pub fn op_je(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let cond = vals.len() >= 2 && vals[1..].iter().any(|&v| v == vals[0]);
    interp.take_branch(instr, cond)
}

pub fn op_jz(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    interp.take_branch(instr, vals[0] == 0)
}

pub fn op_jl(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    interp.take_branch(instr, (vals[0] as i16) < (vals[1] as i16))
}

pub fn op_jg(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    interp.take_branch(instr, (vals[0] as i16) > (vals[1] as i16))
}

pub fn op_test(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    interp.take_branch(instr, vals[0] & vals[1] == vals[1])
}

pub fn op_add(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let result = (vals[0] as i16).wrapping_add(vals[1] as i16) as u16;
    interp.store_result(instr, result)
}

pub fn op_sub(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let result = (vals[0] as i16).wrapping_sub(vals[1] as i16) as u16;
    interp.store_result(instr, result)
}

pub fn op_mul(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let result = (vals[0] as i16).wrapping_mul(vals[1] as i16) as u16;
    interp.store_result(instr, result)
}

pub fn op_div(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let divisor = vals[1] as i16;
    if divisor == 0 {
        return Err(Error::IllegalOperand("division by zero".into()));
    }
    let result = ((vals[0] as i16).wrapping_div(divisor)) as u16;
    interp.store_result(instr, result)
}

pub fn op_mod(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let divisor = vals[1] as i16;
    if divisor == 0 {
        return Err(Error::IllegalOperand("modulo by zero".into()));
    }
    let result = ((vals[0] as i16).wrapping_rem(divisor)) as u16;
    interp.store_result(instr, result)
}

pub fn op_and(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    interp.store_result(instr, vals[0] & vals[1])
}

pub fn op_or(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    interp.store_result(instr, vals[0] | vals[1])
}

pub fn op_not(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    interp.store_result(instr, !vals[0])
}

pub fn op_log_shift(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let places = vals[1] as i16;
    let result = if places >= 0 {
        vals[0].wrapping_shl(places as u32)
    } else {
        vals[0].wrapping_shr((-places) as u32)
    };
    interp.store_result(instr, result)
}

pub fn op_art_shift(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let value = vals[0] as i16;
    let places = vals[1] as i16;
    let result = if places >= 0 {
        value.wrapping_shl(places as u32)
    } else {
        value.wrapping_shr((-places) as u32)
    } as u16;
    interp.store_result(instr, result)
}
