//! Object tree, attribute, and property opcodes (§4.3).

use crate::decode::Instruction;
use crate::interpreter::Interpreter;
use crate::error::Result;

pub fn op_jin(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let parent = interp.objects().parent(interp.memory(), vals[0]);
    interp.take_branch(instr, parent == vals[1])
}

pub fn op_get_parent(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let parent = interp.objects().parent(interp.memory(), vals[0]);
    interp.store_result(instr, parent)
}

pub fn op_get_sibling(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let sibling = interp.objects().sibling(interp.memory(), vals[0]);
    interp.store_result(instr, sibling)?;
    interp.take_branch(instr, sibling != 0)
}

pub fn op_get_child(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let child = interp.objects().child(interp.memory(), vals[0]);
    interp.store_result(instr, child)?;
    interp.take_branch(instr, child != 0)
}

pub fn op_insert_obj(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let objects = *interp.objects();
    objects.insert_obj(interp.memory_mut(), vals[0], vals[1]);
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_remove_obj(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let objects = *interp.objects();
    objects.remove_obj(interp.memory_mut(), vals[0]);
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_test_attr(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let set = interp.objects().test_attr(interp.memory(), vals[0], vals[1]);
    interp.take_branch(instr, set)
}

pub fn op_set_attr(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let objects = *interp.objects();
    objects.set_attr(interp.memory_mut(), vals[0], vals[1]);
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_clear_attr(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let objects = *interp.objects();
    objects.clear_attr(interp.memory_mut(), vals[0], vals[1]);
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_get_prop_addr(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let addr = interp.objects().get_prop_addr(interp.memory(), vals[0], vals[1]) as u16;
    interp.store_result(instr, addr)
}

pub fn op_get_prop_len(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let len = interp.objects().get_prop_len(interp.memory(), vals[0] as usize) as u16;
    interp.store_result(instr, len)
}

pub fn op_get_prop(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let value = interp
        .objects()
        .get_prop(interp.memory(), vals[0], vals[1], interp.config())?;
    interp.store_result(instr, value)
}

pub fn op_put_prop(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let objects = *interp.objects();
    objects.put_prop(interp.memory_mut(), vals[0], vals[1], vals[2])?;
    interp.fallthrough(instr);
    Ok(())
}

pub fn op_get_next_prop(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let next = interp.objects().get_next_prop(interp.memory(), vals[0], vals[1]);
    interp.store_result(instr, next)
}

pub fn op_print_obj(interp: &mut Interpreter, instr: &Instruction) -> Result<()> {
    let vals = interp.resolve_operands(instr)?;
    let addr = interp.objects().short_name_addr(interp.memory(), vals[0]);
    let (text, _) = interp.text_decoder().decode_string(addr)?;
    interp.emit(&text);
    interp.fallthrough(instr);
    Ok(())
}
