//! Input and screen/window opcodes (§4.4 input, §4.7 screen model).

use crate::decode::Instruction;
use crate::dict;
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::text::zscii;

/// Write `line` (already-lowercased ASCII) into the text buffer at
/// `text_buf` per `version`'s convention, truncating to the buffer's stated
/// capacity (§4.4).
fn write_text_buffer(interp: &mut Interpreter, text_buf: usize, line: &str) {
    let legacy = interp.version().legacy_text_buffer();
    let capacity = interp.memory().read_u8(text_buf) as usize;
    let bytes: Vec<u8> = line.bytes().map(zscii::ascii_to_zscii).collect();
    let start = if legacy { text_buf + 1 } else { text_buf + 2 };
    let max = if legacy { capacity.saturating_sub(1) } else { capacity };
    let len = bytes.len().min(max);
    for (i, b) in bytes.iter().take(len).enumerate() {
        interp.memory_mut().write_u8(start + i, *b);
    }
    if legacy {
        interp.memory_mut().write_u8(start + len, 0);
    } else {
        interp.memory_mut().write_u8(text_buf + 1, len as u8);
    }
}

/// `sread`/`aread(text_buf, parse_buf, time?, routine?)`: read a line, store
/// it, and tokenize against the main dictionary unless `parse_buf` is 0
/// (§4.4). Timed-interrupt operands are accepted and ignored per
/// `InterpreterConfig::skip_unimplemented_interrupts`.
pub fn op_sread(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let text_buf = vals[0] as usize;
    let parse_buf = vals.get(1).copied().unwrap_or(0) as usize;

    let capacity = interp.memory().read_u8(text_buf) as usize;
    let line = interp.keyboard_mut().read_line(capacity).to_ascii_lowercase();
    write_text_buffer(interp, text_buf, &line);

    if parse_buf != 0 {
        let version = interp.version();
        let alphabets = *interp.alphabets();
        let dictionary = interp.dictionary().clone();
        dict::tokenize(interp.memory_mut(), version, &alphabets, &dictionary, text_buf, parse_buf, false);
    }

    if instr.store.is_some() {
        // v5+ `aread` stores the terminating character; a plain newline
        // covers every story that doesn't register its own terminators.
        // store_result also advances PC past the instruction.
        interp.store_result(instr, 13)?;
    } else {
        interp.fallthrough(instr);
    }
    Ok(())
}

pub fn op_read_char(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let code = interp.keyboard_mut().read_char();
    interp.store_result(instr, code as u16)
}

/// `tokenise(text_buf, parse_buf, dict?, skip_unknown?)`: tokenizes against
/// the supplied dictionary's table when the `dict` operand is nonzero,
/// otherwise against the story's main dictionary (§4.4).
pub fn op_tokenise(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let text_buf = vals[0] as usize;
    let parse_buf = vals[1] as usize;
    let dict_base = vals.get(2).copied().unwrap_or(0) as usize;
    let skip_unknown = vals.get(3).map(|&v| v != 0).unwrap_or(false);

    let version = interp.version();
    let alphabets = *interp.alphabets();
    let dictionary = if dict_base != 0 {
        crate::dict::Dictionary::parse(interp.memory(), version, dict_base)
    } else {
        interp.dictionary().clone()
    };
    dict::tokenize(
        interp.memory_mut(),
        version,
        &alphabets,
        &dictionary,
        text_buf,
        parse_buf,
        skip_unknown,
    );
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_buffer_mode(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let enabled = interp.resolve_operand(instr.operands[0])? != 0;
    interp.screen_mut().buffer_mode(enabled);
    interp.fallthrough(instr);
    Ok(())
}

/// `output_stream(number, table?)`: positive selects, negative deselects;
/// stream 3 carries a table address operand (§4.7).
pub fn op_output_stream(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let stream = vals[0] as i16;
    let table = vals.get(1).map(|&a| a as usize);
    interp.set_stream_enabled(stream, table)?;
    interp.fallthrough(instr);
    Ok(())
}

/// `input_stream`: selecting stream 1 (keyboard) is the only form this core
/// supports; scripted-input playback (stream 0) is a host concern.
pub fn op_input_stream(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_split_window(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let lines = interp.resolve_operand(instr.operands[0])?;
    interp.screen_mut().split_window(lines);
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_set_window(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let window = interp.resolve_operand(instr.operands[0])?;
    interp.screen_mut().set_window(window);
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_erase_window(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let window = interp.resolve_operand(instr.operands[0])? as i16;
    interp.screen_mut().erase_window(window);
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_erase_line(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let value = interp.resolve_operand(instr.operands[0])?;
    interp.screen_mut().erase_line(value);
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_set_cursor(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    interp.screen_mut().set_cursor(vals[0], vals[1]);
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_get_cursor(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let array = vals[0] as usize;
    let (line, column) = interp.screen_mut().get_cursor();
    interp.memory_mut().write_u16(array, line);
    interp.memory_mut().write_u16(array + 2, column);
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_set_text_style(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let style = interp.resolve_operand(instr.operands[0])?;
    interp.screen_mut().set_text_style(style);
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_set_colour(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    interp.screen_mut().set_colour(vals[0], vals[1]);
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_set_font(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let font = interp.resolve_operand(instr.operands[0])?;
    let previous = interp.screen_mut().set_font(font);
    interp.store_result(instr, previous)
}

pub fn op_show_status(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let global_base = interp.header().global_var_base();
    let location_obj = interp.memory().read_u16(global_base);
    let addr = interp.objects().short_name_addr(interp.memory(), location_obj);
    let (location, _) = interp.text_decoder().decode_string(addr)?;
    let a = interp.memory().read_u16(global_base + 2) as i16;
    let b = interp.memory().read_u16(global_base + 4);
    interp.screen_mut().show_status(&location, a, b);
    interp.fallthrough(instr);
    Ok(())
}

/// `sound_effect`: no audio device behind this core; accepted and ignored.
pub fn op_sound_effect(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    interp.fallthrough(instr);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{Category, Form, Operand};
    use crate::interpreter::tests_support::minimal_interpreter;

    fn instr(name: &'static str, operands: Vec<Operand>, store: Option<u8>) -> Instruction {
        Instruction {
            addr: 0,
            len: 1,
            name,
            form: Form::Variable,
            category: Category::Var,
            opcode_number: 0,
            operands,
            store,
            branch: None,
            text: None,
        }
    }

    #[test]
    fn sread_writes_legacy_text_buffer_and_terminator() {
        let mut interp = minimal_interpreter();
        let text_buf = 0x200usize;
        interp.memory_mut().write_u8(text_buf, 10);

        let i = instr("sread", vec![Operand::Constant(text_buf as u16)], None);
        op_sread(&mut interp, &i).unwrap();
        // With an empty keyboard, read_line returns "", so the buffer should
        // just be zero-terminated at offset 0.
        assert_eq!(interp.memory().read_u8(text_buf + 1), 0);
    }

    #[test]
    fn set_font_reports_previous_font_from_screen() {
        let mut interp = minimal_interpreter();
        let i = instr("set_font", vec![Operand::Constant(3)], Some(16));
        op_set_font(&mut interp, &i).unwrap();
        assert_eq!(interp.read_variable(16).unwrap(), 0);
    }
}
