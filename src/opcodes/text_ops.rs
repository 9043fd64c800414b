//! Text output opcodes (§4.2, §4.7): printing decoded strings, numbers and
//! table contents to the active output streams.

use crate::decode::Instruction;
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::text::zscii;

pub fn op_print(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    if let Some(text) = &instr.text {
        interp.emit(text);
    }
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_print_ret(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    if let Some(text) = &instr.text {
        interp.emit(text);
    }
    interp.emit("\n");
    interp.do_return(1)
}

pub fn op_new_line(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    interp.emit("\n");
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_print_addr(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let addr = interp.resolve_operand(instr.operands[0])? as usize;
    let (text, _) = interp.text_decoder().decode_string(addr)?;
    interp.emit(&text);
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_print_paddr(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let packed = interp.resolve_operand(instr.operands[0])?;
    let addr = interp
        .version()
        .unpack_string(packed, interp.header().raw.string_offset);
    let (text, _) = interp.text_decoder().decode_string(addr)?;
    interp.emit(&text);
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_print_num(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let value = interp.resolve_operand(instr.operands[0])? as i16;
    interp.emit(&value.to_string());
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_print_char(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let code = interp.resolve_operand(instr.operands[0])?;
    if let Some(ch) = zscii::zscii_to_char(interp.memory(), interp.header().unicode_table_addr, code) {
        interp.emit_char(ch);
    }
    interp.fallthrough(instr);
    Ok(())
}

/// `print_table(table, width, height?, skip?)`: print `height` rows of
/// `width` ZSCII bytes each, advancing `skip` bytes between rows (default 0
/// rows beyond one, per §4.7).
pub fn op_print_table(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let table = vals[0] as usize;
    let width = vals[1] as usize;
    let height = vals.get(2).copied().unwrap_or(1) as usize;
    let skip = vals.get(3).copied().unwrap_or(0) as usize;

    for row in 0..height {
        if row > 0 {
            interp.emit("\n");
        }
        let row_addr = table + row * (width + skip);
        for col in 0..width {
            let byte = interp.memory().read_u8(row_addr + col);
            interp.emit_char(zscii::zscii_to_ascii(byte) as char);
        }
    }
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_check_unicode(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let code = interp.resolve_operand(instr.operands[0])?;
    let printable = code < 128;
    // bit 0: can be printed; bit 1: can be received as input (assumed symmetric here).
    let result = if printable { 0x3 } else { 0x0 };
    interp.store_result(instr, result)
}

pub fn op_print_unicode(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let code = interp.resolve_operand(instr.operands[0])?;
    if let Some(ch) = char::from_u32(code as u32) {
        interp.emit_char(ch);
    }
    interp.fallthrough(instr);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{Category, Form, Operand};
    use crate::interpreter::tests_support::minimal_interpreter;

    fn instr(name: &'static str, operands: Vec<Operand>, text: Option<String>) -> Instruction {
        Instruction {
            addr: 0,
            len: 1,
            name,
            form: Form::Short,
            category: Category::Op0,
            opcode_number: 0,
            operands,
            store: None,
            branch: None,
            text,
        }
    }

    #[test]
    fn print_num_emits_signed_decimal() {
        let mut interp = minimal_interpreter();
        let i = instr("print_num", vec![Operand::Constant((-5i16) as u16)], None);
        op_print_num(&mut interp, &i).unwrap();
    }

    #[test]
    fn print_ret_returns_true_after_printing() {
        let mut interp = minimal_interpreter();
        let i = instr("print_ret", vec![], Some("hi".into()));
        let depth_before = interp.call_stack().depth();
        op_print_ret(&mut interp, &i).unwrap();
        assert_eq!(interp.call_stack().depth(), depth_before - 1);
    }

    #[test]
    fn check_unicode_flags_printable_ascii() {
        let mut interp = minimal_interpreter();
        let i = Instruction {
            store: Some(16),
            ..instr("check_unicode", vec![Operand::Constant('A' as u16)], None)
        };
        op_check_unicode(&mut interp, &i).unwrap();
        assert_eq!(interp.read_variable(16).unwrap(), 0x3);
    }
}
