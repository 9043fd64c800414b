//! Host collaborator interfaces (§6): the screen and keyboard are reached
//! through narrow traits supplied by the host, never owned by this crate.

/// The window/cursor/style surface `set_window`, `split_window`,
/// `set_cursor`, `set_text_style`, `set_colour`, `set_font` and friends sit
/// on top of. A host implements this over its terminal or GUI; this crate
/// only calls it.
pub trait Screen {
    fn print(&mut self, text: &str);
    fn print_char(&mut self, ch: char);
    fn new_line(&mut self);
    fn split_window(&mut self, lines: u16);
    fn set_window(&mut self, window: u16);
    fn erase_window(&mut self, window: i16);
    fn erase_line(&mut self, value: u16);
    fn set_cursor(&mut self, line: u16, column: u16);
    fn get_cursor(&mut self) -> (u16, u16);
    fn set_text_style(&mut self, style: u16);
    fn set_colour(&mut self, foreground: u16, background: u16);
    /// Returns the font actually in effect (0 if the requested font is
    /// unavailable), per `set_font`'s semantics (§9 Open Questions).
    fn set_font(&mut self, font: u16) -> u16;
    fn buffer_mode(&mut self, enabled: bool);
    fn show_status(&mut self, location: &str, score_or_hours: i16, turns_or_minutes: u16);
}

/// Line and single-character input. A host backs this with raw-mode TTY
/// reads, a GUI text box, or a scripted transcript for testing.
pub trait Keyboard {
    /// Read up to `max_len` ZSCII bytes of input, already lowercased. Real
    /// terminal echo is the host's responsibility.
    fn read_line(&mut self, max_len: usize) -> String;
    fn read_char(&mut self) -> u8;
}
