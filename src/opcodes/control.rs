//! Routine calls, returns, and unconditional control flow (§4.5, §4.6).

use crate::decode::{Instruction, Operand};
use crate::error::{Error, Result};
use crate::interpreter::Interpreter;

fn call(interp: &mut Interpreter, instr: &Instruction, keep_result: bool) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let args = &vals[1..];
    let return_slot = if keep_result { instr.store } else { None };
    interp.do_call(vals[0], args, instr.next_addr(), return_slot)
}

pub fn op_call_1s(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    call(interp, instr, true)
}

pub fn op_call_2s(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    call(interp, instr, true)
}

pub fn op_call_vs(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    call(interp, instr, true)
}

pub fn op_call_vs2(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    call(interp, instr, true)
}

pub fn op_call_1n(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    call(interp, instr, false)
}

pub fn op_call_2n(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    call(interp, instr, false)
}

pub fn op_call_vn(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    call(interp, instr, false)
}

pub fn op_call_vn2(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    call(interp, instr, false)
}

pub fn op_rtrue(interp: &mut Interpreter, _instr: &Instruction) -> Result<()> {
    interp.do_return(1)
}

pub fn op_rfalse(interp: &mut Interpreter, _instr: &Instruction) -> Result<()> {
    interp.do_return(0)
}

pub fn op_ret(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let value = interp.resolve_operand(instr.operands[0])?;
    interp.do_return(value)
}

pub fn op_ret_popped(interp: &mut Interpreter, _instr: &Instruction) -> Result<()> {
    let value = interp.read_variable(0)?;
    interp.do_return(value)
}

pub fn op_jump(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let offset = interp.resolve_operand(instr.operands[0])? as i16;
    let target = instr.next_addr() as isize + offset as isize - 2;
    interp.set_pc(target as usize);
    Ok(())
}

pub fn op_nop(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    interp.fallthrough(instr);
    Ok(())
}

/// `check_arg_count`: branch if at least `n` arguments were supplied to the
/// current routine (§4.5, §14.2.3 of the dialect this tolerates `call`
/// variance with).
pub fn op_check_arg_count(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let n = interp.resolve_operand(instr.operands[0])?;
    let supplied = interp.call_stack().current()?.num_args_supplied as u16;
    interp.take_branch(instr, supplied >= n)
}

/// `catch`: store the current call-stack depth so a matching `throw` can
/// unwind back to it.
pub fn op_catch(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let depth = interp.call_stack().depth() as u16;
    interp.store_result(instr, depth)
}

/// `throw(value, stack_frame)`: unwind to the saved depth and return `value`
/// from the routine that called `catch`.
pub fn op_throw(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let value = vals[0];
    let depth = vals[1] as usize;
    if depth == 0 || depth > interp.call_stack().depth() {
        return Err(Error::IllegalOperand(format!(
            "throw to depth {depth}: no such call frame"
        )));
    }
    interp.call_stack_mut().unwind_to(depth)?;
    interp.do_return(value)
}
