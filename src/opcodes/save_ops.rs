//! Save/restore, restart, verify, and meta opcodes (§4.1, §4.9, §4.10).

use log::warn;

use crate::decode::{Decoder, Instruction};
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::quetzal;

/// Every save goes to one well-known path; this core has no host dialog for
/// choosing a filename (§6 leaves file selection out of scope).
const SAVE_PATH: &str = "zmachine.qzl";

fn complete_save_restore(interp: &mut Interpreter, instr: &Instruction, success: bool) -> Result<()> {
    match instr.branch {
        Some(_) => interp.take_branch(instr, success),
        None => {
            let result = if success { 2 } else { 0 };
            interp.store_result(instr, result)?;
            interp.fallthrough(instr);
            Ok(())
        }
    }
}

pub fn op_save(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let pc = instr.addr;
    let result = quetzal::save(SAVE_PATH, interp.memory(), interp.header(), interp.call_stack(), pc);
    let success = match result {
        Ok(()) => true,
        Err(e) => {
            warn!("save to {SAVE_PATH} failed: {e}");
            false
        }
    };
    complete_save_restore(interp, instr, success)
}

pub fn op_restore(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    match quetzal::restore(SAVE_PATH, interp.memory_mut()) {
        Ok(state) => {
            *interp.call_stack_mut() = state.call_stack;
            // The restored PC lands on the original save instruction's own
            // address (§4.9). Re-decode it there rather than reusing this
            // restore instruction's own store/branch/length, since the two
            // opcodes need not be encoded identically.
            let version = interp.version();
            let text_decoder = interp.text_decoder();
            let decoder = Decoder::new(interp.memory(), version);
            let save_instr = decoder.decode_at(state.pc, &text_decoder)?;
            complete_save_restore(interp, &save_instr, true)
        }
        Err(e) => {
            warn!("restore from {SAVE_PATH} failed: {e}");
            complete_save_restore(interp, instr, false)
        }
    }
}

/// `save_undo`/`restore_undo`: this core keeps no in-memory undo history, so
/// both report "not available" (§7 unimplemented-feature handling).
pub fn op_save_undo(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    warn!("save_undo requested but no undo history is kept");
    interp.store_result(instr, (-1i16) as u16)
}

pub fn op_restore_undo(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    warn!("restore_undo requested but no undo history is kept");
    interp.store_result(instr, 0)
}

pub fn op_restart(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    interp.memory_mut().restart()?;
    interp.set_pc(interp.header().initial_pc());
    let depth = interp.call_stack().depth();
    if depth > 1 {
        interp.call_stack_mut().unwind_to(1)?;
    }
    let _ = instr;
    Ok(())
}

pub fn op_verify(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let expected = interp.header().raw.checksum;
    let file_end = interp.header().file_length_bytes();
    let actual = if file_end == 0 { expected } else { interp.memory().checksum(file_end) };
    interp.take_branch(instr, actual == expected)
}

/// `piracy`: branch on "genuine" — this core never claims to be pirated.
pub fn op_piracy(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    interp.take_branch(instr, true)
}

pub fn op_quit(interp: &mut Interpreter, _instr: &Instruction) -> Result<()> {
    interp.request_quit();
    Ok(())
}

pub fn op_random(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let n = interp.resolve_operand(instr.operands[0])? as i16;
    let result = interp.random(n);
    interp.store_result(instr, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{Category, Form, Operand};
    use crate::interpreter::tests_support::minimal_interpreter;

    fn instr(name: &'static str, operands: Vec<Operand>, store: Option<u8>) -> Instruction {
        Instruction {
            addr: 0x200,
            len: 1,
            name,
            form: Form::Short,
            category: Category::Op0,
            opcode_number: 0,
            operands,
            store,
            branch: None,
            text: None,
        }
    }

    #[test]
    fn save_undo_reports_unavailable() {
        let mut interp = minimal_interpreter();
        let i = instr("save_undo", vec![], Some(16));
        op_save_undo(&mut interp, &i).unwrap();
        assert_eq!(interp.read_variable(16).unwrap() as i16, -1);
    }

    #[test]
    fn verify_matches_freshly_loaded_checksum() {
        let mut interp = minimal_interpreter();
        let i = instr("verify", vec![], None);
        let with_branch = Instruction {
            branch: Some(crate::decode::Branch { on_true: true, offset: 1 }),
            ..i
        };
        let depth_before = interp.call_stack().depth();
        op_verify(&mut interp, &with_branch).unwrap();
        // file_length is 0 in the synthetic story, so verify trivially matches
        // and takes the "return true" shorthand branch.
        assert_eq!(interp.call_stack().depth(), depth_before - 1);
    }

    #[test]
    fn random_delegates_to_interpreter_rng() {
        let mut interp = minimal_interpreter();
        let i = instr("random", vec![Operand::Constant(10)], Some(16));
        op_random(&mut interp, &i).unwrap();
        assert!((1..=10).contains(&interp.read_variable(16).unwrap()));
    }
}
