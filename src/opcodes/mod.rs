//! Opcode dispatch (§4, §9): one free function per opcode, grouped into
//! category modules, looked up here by decoded instruction name. A table
//! indexed by (form, opcode_number) would also work, but a name match keeps
//! the dispatch point readable against the Z-Machine Standard's own naming.

pub mod arithmetic;
pub mod control;
pub mod io_ops;
pub mod objects_ops;
pub mod save_ops;
pub mod stack_vars;
pub mod text_ops;

use log::warn;

use crate::decode::Instruction;
use crate::error::Result;
use crate::interpreter::Interpreter;

pub fn dispatch(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    use arithmetic::*;
    use control::*;
    use io_ops::*;
    use objects_ops::*;
    use save_ops::*;
    use stack_vars::*;
    use text_ops::*;

    match instr.name {
        "je" => op_je(interp, instr),
        "jz" => op_jz(interp, instr),
        "jl" => op_jl(interp, instr),
        "jg" => op_jg(interp, instr),
        "test" => op_test(interp, instr),
        "add" => op_add(interp, instr),
        "sub" => op_sub(interp, instr),
        "mul" => op_mul(interp, instr),
        "div" => op_div(interp, instr),
        "mod" => op_mod(interp, instr),
        "and" => op_and(interp, instr),
        "or" => op_or(interp, instr),
        "not" => op_not(interp, instr),
        "log_shift" => op_log_shift(interp, instr),
        "art_shift" => op_art_shift(interp, instr),

        "jin" => op_jin(interp, instr),
        "get_parent" => op_get_parent(interp, instr),
        "get_sibling" => op_get_sibling(interp, instr),
        "get_child" => op_get_child(interp, instr),
        "insert_obj" => op_insert_obj(interp, instr),
        "remove_obj" => op_remove_obj(interp, instr),
        "test_attr" => op_test_attr(interp, instr),
        "set_attr" => op_set_attr(interp, instr),
        "clear_attr" => op_clear_attr(interp, instr),
        "get_prop_addr" => op_get_prop_addr(interp, instr),
        "get_prop_len" => op_get_prop_len(interp, instr),
        "get_prop" => op_get_prop(interp, instr),
        "put_prop" => op_put_prop(interp, instr),
        "get_next_prop" => op_get_next_prop(interp, instr),
        "print_obj" => op_print_obj(interp, instr),

        "store" => op_store(interp, instr),
        "load" => op_load(interp, instr),
        "push" => op_push(interp, instr),
        "pull" => op_pull(interp, instr),
        "pop" => op_pop(interp, instr),
        "inc" => op_inc(interp, instr),
        "dec" => op_dec(interp, instr),
        "inc_chk" => op_inc_chk(interp, instr),
        "dec_chk" => op_dec_chk(interp, instr),
        "loadw" => op_loadw(interp, instr),
        "loadb" => op_loadb(interp, instr),
        "storew" => op_storew(interp, instr),
        "storeb" => op_storeb(interp, instr),
        "copy_table" => op_copy_table(interp, instr),
        "scan_table" => op_scan_table(interp, instr),

        "call_1s" => op_call_1s(interp, instr),
        "call_2s" => op_call_2s(interp, instr),
        "call_vs" => op_call_vs(interp, instr),
        "call_vs2" => op_call_vs2(interp, instr),
        "call_1n" => op_call_1n(interp, instr),
        "call_2n" => op_call_2n(interp, instr),
        "call_vn" => op_call_vn(interp, instr),
        "call_vn2" => op_call_vn2(interp, instr),
        "rtrue" => op_rtrue(interp, instr),
        "rfalse" => op_rfalse(interp, instr),
        "ret" => op_ret(interp, instr),
        "ret_popped" => op_ret_popped(interp, instr),
        "jump" => op_jump(interp, instr),
        "nop" => op_nop(interp, instr),
        "check_arg_count" => op_check_arg_count(interp, instr),
        "catch" => op_catch(interp, instr),
        "throw" => op_throw(interp, instr),

        "print" => op_print(interp, instr),
        "print_ret" => op_print_ret(interp, instr),
        "new_line" => op_new_line(interp, instr),
        "print_addr" => op_print_addr(interp, instr),
        "print_paddr" => op_print_paddr(interp, instr),
        "print_num" => op_print_num(interp, instr),
        "print_char" => op_print_char(interp, instr),
        "print_table" => op_print_table(interp, instr),
        "check_unicode" => op_check_unicode(interp, instr),
        "print_unicode" => op_print_unicode(interp, instr),

        "sread" | "aread" => op_sread(interp, instr),
        "read_char" => op_read_char(interp, instr),
        "tokenise" => op_tokenise(interp, instr),
        "buffer_mode" => op_buffer_mode(interp, instr),
        "output_stream" => op_output_stream(interp, instr),
        "input_stream" => op_input_stream(interp, instr),
        "split_window" => op_split_window(interp, instr),
        "set_window" => op_set_window(interp, instr),
        "erase_window" => op_erase_window(interp, instr),
        "erase_line" => op_erase_line(interp, instr),
        "set_cursor" => op_set_cursor(interp, instr),
        "get_cursor" => op_get_cursor(interp, instr),
        "set_text_style" => op_set_text_style(interp, instr),
        "set_colour" => op_set_colour(interp, instr),
        "set_font" => op_set_font(interp, instr),
        "show_status" => op_show_status(interp, instr),
        "sound_effect" => op_sound_effect(interp, instr),

        "save" => op_save(interp, instr),
        "restore" => op_restore(interp, instr),
        "save_undo" => op_save_undo(interp, instr),
        "restore_undo" => op_restore_undo(interp, instr),
        "restart" => op_restart(interp, instr),
        "verify" => op_verify(interp, instr),
        "piracy" => op_piracy(interp, instr),
        "quit" => op_quit(interp, instr),
        "random" => op_random(interp, instr),

        other => unimplemented(interp, instr, other),
    }
}

/// An opcode this core decodes but has no behavior for (V6 window-graphics
/// opcodes, `encode_text`, unrecognized extended forms): log it, satisfy a
/// pending store with 0, and fall through rather than aborting the program.
fn unimplemented(interp: &mut Interpreter, instr: &Instruction, name: &str) -> Result<()> {
    warn!("unimplemented opcode {name:?} at {:#06x}, treated as nop", instr.addr);
    if let Some(var) = instr.store {
        interp.write_variable(var, 0)?;
    }
    interp.fallthrough(instr);
    Ok(())
}
