//! Shared story construction and host stand-ins for the integration tests.

use std::cell::RefCell;
use std::rc::Rc;

use zengine::config::InterpreterConfig;
use zengine::io::{Keyboard, Screen};
use zengine::Interpreter;

/// A `Screen` that appends every printed character to a shared buffer the
/// test can read back once execution stops.
pub struct RecordingScreen {
    output: Rc<RefCell<String>>,
}

impl RecordingScreen {
    pub fn new(output: Rc<RefCell<String>>) -> RecordingScreen {
        RecordingScreen { output }
    }
}

impl Screen for RecordingScreen {
    fn print(&mut self, text: &str) {
        self.output.borrow_mut().push_str(text);
    }
    fn print_char(&mut self, ch: char) {
        self.output.borrow_mut().push(ch);
    }
    fn new_line(&mut self) {
        self.output.borrow_mut().push('\n');
    }
    fn split_window(&mut self, _lines: u16) {}
    fn set_window(&mut self, _window: u16) {}
    fn erase_window(&mut self, _window: i16) {}
    fn erase_line(&mut self, _value: u16) {}
    fn set_cursor(&mut self, _line: u16, _column: u16) {}
    fn get_cursor(&mut self) -> (u16, u16) {
        (1, 1)
    }
    fn set_text_style(&mut self, _style: u16) {}
    fn set_colour(&mut self, _foreground: u16, _background: u16) {}
    fn set_font(&mut self, _font: u16) -> u16 {
        0
    }
    fn buffer_mode(&mut self, _enabled: bool) {}
    fn show_status(&mut self, _location: &str, _score_or_hours: i16, _turns_or_minutes: u16) {}
}

pub struct ScriptedKeyboard {
    pub lines: Vec<String>,
}

impl Keyboard for ScriptedKeyboard {
    fn read_line(&mut self, _max_len: usize) -> String {
        if self.lines.is_empty() {
            String::new()
        } else {
            self.lines.remove(0)
        }
    }
    fn read_char(&mut self) -> u8 {
        13
    }
}

fn write_u16(bytes: &mut [u8], addr: usize, value: u16) {
    bytes[addr] = (value >> 8) as u8;
    bytes[addr + 1] = value as u8;
}

/// A two-object v3 story whose single routine runs:
/// `insert_obj 1 2`, `get_parent 1 -> G00`, `add 2 3 -> G01`, `print "hi"`,
/// `new_line`, `quit`.
pub fn two_object_story() -> Vec<u8> {
    let obj_table = 0x40usize;
    let default_props = 31 * 2;
    let entry_size = 9;
    let obj1 = obj_table + default_props;
    let obj2 = obj1 + entry_size;
    let entries_end = obj2 + entry_size;
    let prop1 = entries_end;
    let prop2 = prop1 + 2;
    let dict_base = prop2 + 2;
    let entries_base = dict_base + 4;
    let global_base = entries_base;
    let routine = global_base + 240 * 2;
    let program_start = routine + 5;

    let program: [u8; 15] = [
        0x0E, 0x01, 0x02, // insert_obj 1 2
        0x93, 0x01, 0x10, // get_parent 1 -> G00 (variable 16)
        0x14, 0x02, 0x03, 0x11, // add 2 3 -> G01 (variable 17)
        0xB2, 0xB5, 0xC5, // print "hi"
        0xBB, // new_line
        0xBA, // quit
    ];
    let static_base = program_start + program.len() + 4;
    let total_len = static_base + 16;

    let mut bytes = vec![0u8; total_len];
    bytes[0x00] = 3; // version
    write_u16(&mut bytes, 0x04, routine as u16); // high_mem_base
    write_u16(&mut bytes, 0x06, program_start as u16); // initial_pc
    write_u16(&mut bytes, 0x08, dict_base as u16);
    write_u16(&mut bytes, 0x0A, obj_table as u16);
    write_u16(&mut bytes, 0x0C, global_base as u16);
    write_u16(&mut bytes, 0x0E, static_base as u16);
    bytes[0x12..0x18].copy_from_slice(b"000000");

    write_u16(&mut bytes, obj1 + 7, prop1 as u16);
    write_u16(&mut bytes, obj2 + 7, prop2 as u16);
    bytes[prop1] = 0;
    bytes[prop1 + 1] = 0;
    bytes[prop2] = 0;
    bytes[prop2 + 1] = 0;
    bytes[dict_base + 1] = 6; // entry length; 0 separators and 0 entries already zeroed

    bytes[routine] = 2; // 2 locals, both defaulting to 0
    bytes[program_start..program_start + program.len()].copy_from_slice(&program);

    bytes
}

/// Build an interpreter over `story`, returning it alongside the buffer its
/// screen appends printed text to.
pub fn interpreter_with_story(story: Vec<u8>) -> (Interpreter, Rc<RefCell<String>>) {
    let output = Rc::new(RefCell::new(String::new()));
    let screen = RecordingScreen::new(output.clone());
    let keyboard = ScriptedKeyboard { lines: Vec::new() };
    let interp = Interpreter::new(story, InterpreterConfig::default(), Box::new(screen), Box::new(keyboard))
        .expect("story builds a valid interpreter");
    (interp, output)
}
