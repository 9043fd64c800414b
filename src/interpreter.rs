//! The single owning interpreter context (§9): no hidden global state, one
//! value holds memory, header, call stack, object/dictionary views, output
//! routing, RNG and the host collaborators, and runs the fetch-decode-
//! dispatch loop.

use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::InterpreterConfig;
use crate::decode::{resolve_branch, BranchOutcome, Decoder, Instruction, Operand};
use crate::dict::Dictionary;
use crate::error::{Error, Result};
use crate::frame::{CallStack, Frame};
use crate::header::Header;
use crate::io::{Keyboard, Screen};
use crate::memory::{wrap_addr, Memory};
use crate::objects::ObjectTable;
use crate::opcodes;
use crate::text::alphabet::AlphabetTable;
use crate::text::TextDecoder;
use crate::version::Version;

/// Stream 3's in-memory redirect target: ZSCII bytes accumulate here until
/// the stream is deselected, then `u16 length` + bytes are written to
/// `table_addr` (§4.7 `output_stream`).
struct Stream3Buf {
    table_addr: usize,
    bytes: Vec<u8>,
}

struct OutputStreams {
    screen_enabled: bool,
    transcript_enabled: bool,
    stream3_stack: Vec<Stream3Buf>,
}

impl OutputStreams {
    fn new() -> OutputStreams {
        OutputStreams {
            screen_enabled: true,
            transcript_enabled: false,
            stream3_stack: Vec::new(),
        }
    }

    fn active_stream3(&self) -> bool {
        !self.stream3_stack.is_empty()
    }
}

pub struct Interpreter {
    memory: Memory,
    header: Header,
    version: Version,
    alphabets: AlphabetTable,
    objects: ObjectTable,
    dictionary: Dictionary,
    call_stack: CallStack,
    pc: usize,
    config: InterpreterConfig,
    rng: StdRng,
    streams: OutputStreams,
    screen: Box<dyn Screen>,
    keyboard: Box<dyn Keyboard>,
    finished: bool,
}

impl Interpreter {
    pub fn new(
        story: Vec<u8>,
        config: InterpreterConfig,
        screen: Box<dyn Screen>,
        keyboard: Box<dyn Keyboard>,
    ) -> Result<Interpreter> {
        let probe = Memory::new(story.clone(), 0);
        let header = Header::parse(&probe)?;
        let memory = Memory::new(story, header.static_mem_base());
        let alphabets = AlphabetTable::resolve(&memory, header.alphabet_table_base());
        let objects = ObjectTable::new(header.version, header.obj_table_base());
        let dictionary = Dictionary::parse(&memory, header.version, header.dict_base());
        let version = header.version;
        let pc = header.initial_pc();

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut interp = Interpreter {
            memory,
            header,
            version,
            alphabets,
            objects,
            dictionary,
            call_stack: CallStack::new(),
            pc,
            config,
            rng,
            streams: OutputStreams::new(),
            screen,
            keyboard,
            finished: false,
        };
        interp.call_stack.push_frame(Frame::new(0, 0, Vec::new(), None));
        Ok(interp)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn alphabets(&self) -> &AlphabetTable {
        &self.alphabets
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn set_pc(&mut self, pc: usize) {
        self.pc = pc;
    }

    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    pub fn call_stack_mut(&mut self) -> &mut CallStack {
        &mut self.call_stack
    }

    pub fn screen_mut(&mut self) -> &mut dyn Screen {
        &mut *self.screen
    }

    pub fn keyboard_mut(&mut self) -> &mut dyn Keyboard {
        &mut *self.keyboard
    }

    pub fn text_decoder(&self) -> TextDecoder<'_> {
        TextDecoder::new(
            &self.memory,
            self.alphabets,
            self.header.abbrev_base(),
            self.header.unicode_table_addr,
        )
    }

    /// One fetch-decode-dispatch step. Returns `Ok(false)` once `quit` has
    /// run.
    pub fn step(&mut self) -> Result<bool> {
        if self.finished {
            return Ok(false);
        }
        let text_decoder = self.text_decoder();
        let decoder = Decoder::new(&self.memory, self.version);
        let instr = decoder.decode_at(self.pc, &text_decoder)?;
        trace!(
            "{:#06x}: {} operands={:?} store={:?} branch={:?}",
            instr.addr, instr.name, instr.operands, instr.store, instr.branch
        );
        opcodes::dispatch(self, &instr)?;
        Ok(!self.finished)
    }

    pub fn run(&mut self) -> Result<()> {
        while self.step()? {}
        Ok(())
    }

    pub fn request_quit(&mut self) {
        self.finished = true;
    }

    // -- Variable namespace (§3) --------------------------------------

    pub fn read_variable(&mut self, var: u8) -> Result<u16> {
        match var {
            0 => self.call_stack.current_mut()?.pop(),
            1..=15 => self.call_stack.current()?.read_local(var),
            _ => Ok(self
                .memory
                .read_u16(self.header.global_var_base() + 2 * (var as usize - 16))),
        }
    }

    pub fn write_variable(&mut self, var: u8, value: u16) -> Result<()> {
        match var {
            0 => {
                self.call_stack.current_mut()?.push(value);
                Ok(())
            }
            1..=15 => self.call_stack.current_mut()?.write_local(var, value),
            _ => {
                self.memory
                    .write_u16(self.header.global_var_base() + 2 * (var as usize - 16), value);
                Ok(())
            }
        }
    }

    /// `load`: peek variable 0 instead of popping it.
    pub fn peek_variable(&mut self, var: u8) -> Result<u16> {
        if var == 0 {
            self.call_stack.current()?.peek()
        } else {
            self.read_variable(var)
        }
    }

    /// `store`: poke variable 0 in place instead of pushing.
    pub fn poke_variable(&mut self, var: u8, value: u16) -> Result<()> {
        if var == 0 {
            self.call_stack.current_mut()?.poke(value)
        } else {
            self.write_variable(var, value)
        }
    }

    pub fn resolve_operand(&mut self, operand: Operand) -> Result<u16> {
        match operand {
            Operand::Constant(c) => Ok(c),
            Operand::Variable(v) => self.read_variable(v),
        }
    }

    pub fn resolve_operands(&mut self, instr: &Instruction) -> Result<Vec<u16>> {
        instr
            .operands
            .iter()
            .map(|&op| self.resolve_operand(op))
            .collect()
    }

    /// Store `value` in `instr`'s result variable (if any) and advance PC
    /// past the instruction. Callers that also branch or return call
    /// `take_branch`/`do_return` afterward, which simply overrides this PC.
    pub fn store_result(&mut self, instr: &Instruction, value: u16) -> Result<()> {
        if let Some(var) = instr.store {
            self.write_variable(var, value)?;
        }
        self.fallthrough(instr);
        Ok(())
    }

    // -- Control flow ---------------------------------------------------

    /// Advance PC past `instr` with no branch/call override.
    pub fn fallthrough(&mut self, instr: &Instruction) {
        self.pc = instr.next_addr();
    }

    /// Evaluate a branch descriptor against `condition`, updating PC or
    /// returning from the current routine as the descriptor directs.
    pub fn take_branch(&mut self, instr: &Instruction, condition: bool) -> Result<()> {
        match instr.branch {
            None => {
                self.fallthrough(instr);
                Ok(())
            }
            Some(branch) => match resolve_branch(branch, condition, instr.next_addr()) {
                None => {
                    self.fallthrough(instr);
                    Ok(())
                }
                Some(BranchOutcome::Jump(addr)) => {
                    self.pc = addr;
                    Ok(())
                }
                Some(BranchOutcome::ReturnFalse) => self.do_return(0),
                Some(BranchOutcome::ReturnTrue) => self.do_return(1),
            },
        }
    }

    pub fn do_return(&mut self, value: u16) -> Result<()> {
        let frame = self.call_stack.pop_frame()?;
        self.pc = frame.return_pc;
        if let Some(slot) = frame.return_slot {
            self.write_variable(slot, value)?;
        }
        Ok(())
    }

    /// `call`: expand the packed routine address, build a frame from the
    /// routine header and supplied arguments, and jump into it (§4.5). A
    /// call to address 0 stores 0 (if a result slot was requested) and falls
    /// through without pushing a frame.
    pub fn do_call(&mut self, packed_addr: u16, args: &[u16], return_pc: usize, return_slot: Option<u8>) -> Result<()> {
        if packed_addr == 0 {
            if let Some(slot) = return_slot {
                self.write_variable(slot, 0)?;
            }
            self.pc = return_pc;
            return Ok(());
        }
        let routine_addr = self
            .version
            .unpack_routine(packed_addr, self.header.raw.routine_offset);
        let local_count = self.memory.read_u8(routine_addr) as usize;
        if local_count > 15 {
            return Err(Error::IllegalOperand(format!(
                "routine at {routine_addr:#06x} declares {local_count} locals (max 15)"
            )));
        }
        let mut locals = vec![0u16; local_count];
        let mut code_addr = routine_addr + 1;
        if self.version.locals_from_header() {
            for local in locals.iter_mut() {
                *local = self.memory.read_u16(code_addr);
                code_addr += 2;
            }
        }
        for (i, &arg) in args.iter().enumerate().take(local_count) {
            locals[i] = arg;
        }

        self.call_stack
            .push_frame(Frame::new(return_pc, args.len(), locals, return_slot));
        self.pc = code_addr;
        Ok(())
    }

    // -- Output routing (§4.7 `output_stream`) ---------------------------

    pub fn set_stream_enabled(&mut self, stream: i16, table_addr: Option<usize>) -> Result<()> {
        match stream {
            1 => self.streams.screen_enabled = true,
            -1 => self.streams.screen_enabled = false,
            2 => self.streams.transcript_enabled = true,
            -2 => self.streams.transcript_enabled = false,
            3 => {
                let addr = table_addr.ok_or_else(|| {
                    Error::IllegalOperand("output_stream 3 requires a table address".into())
                })?;
                if self.streams.stream3_stack.len() >= 16 {
                    return Err(Error::IllegalOperand("output_stream 3 nested too deeply".into()));
                }
                self.streams.stream3_stack.push(Stream3Buf {
                    table_addr: addr,
                    bytes: Vec::new(),
                });
            }
            -3 => {
                if let Some(buf) = self.streams.stream3_stack.pop() {
                    self.memory.write_u16(buf.table_addr, buf.bytes.len() as u16);
                    for (i, b) in buf.bytes.iter().enumerate() {
                        self.memory.write_u8(buf.table_addr + 2 + i, *b);
                    }
                }
            }
            4 | -4 => {}
            other => {
                return Err(Error::IllegalOperand(format!("unknown output stream {other}")));
            }
        }
        Ok(())
    }

    /// Route decoded text to whichever stream is active, honoring stream 3's
    /// exclusive redirect (§4.7).
    pub fn emit(&mut self, text: &str) {
        if self.streams.active_stream3() {
            if let Some(buf) = self.streams.stream3_stack.last_mut() {
                for ch in text.chars() {
                    buf.bytes.push(crate::text::zscii::ascii_to_zscii(ch as u8));
                }
            }
            return;
        }
        if self.streams.screen_enabled {
            self.screen.print(text);
        }
        let _ = self.streams.transcript_enabled;
    }

    pub fn emit_char(&mut self, ch: char) {
        self.emit(&ch.to_string());
    }

    // -- Memory helpers used by several opcode categories ----------------

    pub fn wrapped_word_addr(&self, base: u16, index: i16) -> usize {
        wrap_addr((base as i32 + 2 * index as i32) as usize)
    }

    pub fn wrapped_byte_addr(&self, base: u16, index: i16) -> usize {
        wrap_addr((base as i32 + index as i32) as usize)
    }

    pub fn random(&mut self, n: i16) -> u16 {
        match n.cmp(&0) {
            std::cmp::Ordering::Greater => self.rng.gen_range(1..=n as u16),
            std::cmp::Ordering::Equal => {
                self.rng = StdRng::from_entropy();
                0
            }
            std::cmp::Ordering::Less => {
                self.rng = StdRng::seed_from_u64(n.unsigned_abs() as u64);
                0
            }
        }
    }
}
