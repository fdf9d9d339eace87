//! CSI-sequence state, dispatch, and mode handling.

use crate::emulator::{Flow, TerminalEmulator};
use crate::layer::{CursorVisibility, Layer};
use crate::parser::{Intermediate, State};
use crate::report;

/// DECCOLM column widths.
const WIDE_COLS: usize = 132;
const NARROW_COLS: usize = 80;

/// DEC private modes the emulator recognizes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    num_enum::TryFromPrimitive,
    num_enum::IntoPrimitive,
)]
#[repr(u32)]
enum PrivateMode {
    /// DECCKM: application cursor keys.
    CursorKeys = 1,
    /// DECANM: ANSI/VT52.
    Ansi = 2,
    /// DECCOLM: 132/80 columns.
    Columns = 3,
    /// DECSCNM: reverse video.
    ReverseVideo = 5,
    /// DECOM: origin mode.
    Origin = 6,
    /// DECAWM: autowrap.
    AutoWrap = 7,
    MouseX10 = 9,
    /// DECTCEM: cursor visibility.
    CursorVisible = 25,
    AltScreen = 47,
    MouseVt200 = 1000,
    MouseHighlight = 1001,
    MouseButtonEvent = 1002,
    MouseAnyEvent = 1003,
    AltScreenClear = 1047,
    SaveCursor = 1048,
    AltScreenSaveCursor = 1049,
    BracketedPaste = 2004,
}

impl<L: Layer> TerminalEmulator<L> {
    pub(crate) fn csi_state(&mut self, c: u32) -> Flow {
        match c {
            0x30..=0x39 => self.parser.push_digit(c - 0x30),
            0x3a | 0x3b => self.parser.next_arg(), // ':' ';'
            _ => {
                if self.special(c) {
                    return Flow::Next;
                }
                if (0x40..=0x7e).contains(&c) {
                    let im = self.parser.intermediate;
                    self.do_csi(c as u8, im);
                    if self.parser.state != State::Print {
                        self.parser.state = State::Literal;
                    }
                } else if (0x20..=0x2f).contains(&c) || (0x3c..=0x3f).contains(&c) {
                    // A second intermediate poisons the sequence.
                    self.parser.intermediate = match self.parser.intermediate {
                        Intermediate::None => Intermediate::Byte(c as u8),
                        _ => Intermediate::Poisoned,
                    };
                } else {
                    self.parser.state = State::Literal;
                    return Flow::Again(c);
                }
            }
        }
        Flow::Next
    }

    #[allow(clippy::too_many_lines)]
    pub(crate) fn do_csi(&mut self, c: u8, intermediate: Intermediate) {
        let cols = self.grid.width();
        let rows = self.grid.height();
        let a1 = self.parser.arg(0) as usize;
        let a2 = self.parser.arg(1) as usize;
        match intermediate {
            Intermediate::None => match c {
                b'H' | b'f' => {
                    // Under origin mode rows are relative to the region
                    // top and clamped inside it.
                    let row = if self.modes.origin {
                        (a1.max(1) + self.top).min(self.bot + 1)
                    } else {
                        a1.max(1).min(rows)
                    };
                    let col = a2.max(1).min(cols);
                    self.goto_pos(col - 1, row - 1);
                    if self.title.auto_line != 0 {
                        self.title.auto_line = i32::try_from(row).unwrap_or(0);
                    }
                }
                b'J' => match a1 {
                    1 => self.clear_from_bos(),
                    2 => {
                        self.clear_screen();
                        self.layer.goto_pos(self.x, self.y);
                    }
                    _ => self.clear_to_eos(),
                },
                b'K' => match a1 % 3 {
                    0 => self.clear_line_region(self.x, cols - 1),
                    1 => self.clear_line_region(0, self.x),
                    _ => self.clear_line_region(0, cols - 1),
                },
                b'X' => {
                    let end = self.x + a1.saturating_sub(1);
                    self.clear_line_region(self.x, end.min(cols - 1));
                }
                b'A' => self.cursor_up(a1.max(1)),
                b'B' => self.cursor_down(a1.max(1)),
                b'C' => self.cursor_right(a1.max(1)),
                b'D' => self.cursor_left(a1.max(1)),
                b'E' => {
                    self.x = 0;
                    self.cursor_down(a1.max(1));
                }
                b'F' => {
                    self.x = 0;
                    self.cursor_up(a1.max(1));
                }
                b'G' | b'`' => {
                    // HPA
                    self.x = a1.saturating_sub(1).min(cols - 1);
                    self.layer.goto_pos(self.x, self.y);
                }
                b'd' => {
                    // VPA, origin-relative like H/f.
                    let row = if self.modes.origin {
                        (a1.max(1) + self.top).min(self.bot + 1)
                    } else {
                        a1.max(1).min(rows)
                    };
                    self.y = row - 1;
                    self.layer.goto_pos(self.x, self.y);
                }
                b'm' => self.select_rendition(),
                b'g' => {
                    if a1 == 0 {
                        if let Some(stop) = self.tabs.get_mut(self.x) {
                            *stop = false;
                        }
                    } else if a1 == 3 {
                        self.tabs.fill(false);
                    }
                }
                b'r' => {
                    let t = a1.max(1);
                    let b = if a2 == 0 { rows } else { a2 };
                    if b > rows || t >= b {
                        return;
                    }
                    self.top = t - 1;
                    self.bot = b - 1;
                    if self.modes.origin {
                        self.goto_pos(0, self.top);
                    } else {
                        self.goto_pos(0, 0);
                    }
                }
                b's' => self.saved = Some(self.save_cursor()),
                b'u' => {
                    if let Some(saved) = self.saved {
                        self.restore_cursor(saved);
                    }
                }
                b't' => self.do_window_op(a1, a2),
                b'I' => {
                    for _ in 0..a1.max(1) {
                        self.forward_tab();
                    }
                }
                b'Z' => {
                    for _ in 0..a1.max(1) {
                        self.backward_tab();
                    }
                }
                b'L' => self.insert_line(a1.max(1)),
                b'M' => self.delete_line(a1.max(1)),
                b'P' => self.delete_char(a1.max(1)),
                b'@' => self.insert_char(a1.max(1)),
                b'h' => self.ansi_set_mode(true),
                b'l' => self.ansi_set_mode(false),
                b'i' => {
                    // Media copy; only "print screen on" is honored.
                    if a1 == 5 {
                        self.print_start();
                    }
                }
                b'n' => {
                    if a1 == 5 {
                        self.report(&report::status_ok());
                    } else if a1 == 6 {
                        let (x, y) = (self.x, self.y);
                        self.report(&report::cursor_position(y as u32 + 1, x as u32 + 1));
                    }
                }
                b'c' => {
                    if a1 == 0 {
                        self.report(&report::device_attributes());
                    }
                }
                b'x' => {
                    if a1 <= 1 {
                        self.report(&report::terminal_parameters(a1 as u32));
                    }
                }
                b'p' => {
                    // 97801-style cursor invisibility.
                    if a1 == 6 || a1 == 7 {
                        self.modes.curinv = a1 == 6;
                        let vis = self.cursor_visibility_value();
                        self.layer.cursor_visibility(vis);
                    }
                }
                b'S' => self.scroll_region_by(isize::try_from(a1.max(1)).unwrap_or(1)),
                b'T' | b'^' => {
                    self.scroll_region_by(-isize::try_from(a1.max(1)).unwrap_or(1));
                }
                _ => {}
            },
            Intermediate::Byte(b' ') => {
                if c == b'q' {
                    self.modes.cursor_style = self.parser.arg(0);
                    self.layer.cursor_style(self.modes.cursor_style);
                }
            }
            Intermediate::Byte(b'?') => {
                if c == b'h' || c == b'l' {
                    let on = c == b'h';
                    for i in 0..self.parser.args.len() {
                        let mode = self.parser.arg(i);
                        self.private_mode(mode, on);
                    }
                }
            }
            Intermediate::Byte(b'>') => {
                if c == b'c' && a1 == 0 {
                    let version = self.config.nversion;
                    self.report(&report::secondary_device_attributes(version));
                }
            }
            _ => {}
        }
    }

    fn do_window_op(&mut self, a1: usize, a2: usize) {
        match a1 {
            11 => {
                let iconified = !self.layer.displayed();
                self.report(&report::window_state(iconified));
            }
            7 => self.layer.refresh_all(false),
            21 => {
                let title = self.title.current.clone();
                self.report(&report::title_report(&title));
            }
            8 => {
                let mut w = self.parser.arg(2) as usize;
                let mut h = a2;
                if w < 1 {
                    w = self.grid.width();
                }
                if h < 1 {
                    h = self.grid.height();
                }
                if w > 10_000 || h > 10_000 {
                    return;
                }
                self.resize(w, h);
            }
            _ => {}
        }
    }

    fn ansi_set_mode(&mut self, on: bool) {
        for i in 0..self.parser.args.len() {
            match self.parser.arg(i) {
                4 => {
                    // IRM
                    self.modes.insert = on;
                    self.layer.insert_mode(on);
                }
                20 => self.modes.autolf = on, // LNM
                34 => {
                    self.modes.curvvis = !on;
                    let vis = self.cursor_visibility_value();
                    self.layer.cursor_visibility(vis);
                }
                _ => {}
            }
        }
    }

    pub(crate) fn cursor_visibility_value(&self) -> CursorVisibility {
        if self.modes.curinv {
            CursorVisibility::Invisible
        } else if self.modes.curvvis {
            CursorVisibility::VeryVisible
        } else {
            CursorVisibility::Normal
        }
    }

    #[allow(clippy::too_many_lines)]
    fn private_mode(&mut self, mode: u32, on: bool) {
        let Ok(mode) = PrivateMode::try_from(mode) else {
            return;
        };
        match mode {
            PrivateMode::CursorKeys => {
                self.modes.cursorkeys = on;
                self.layer.cursorkeys_mode(on);
                self.layer.set_flow(!on);
            }
            PrivateMode::Ansi => {
                // Back to ANSI resets all designations.
                if on && self.encoding == crate::decode::Encoding::Ascii {
                    let cs = &mut self.charsets;
                    cs.slots = [0; 4];
                    cs.gl = 0;
                    cs.gr_sel = 2;
                    cs.ss = 0;
                    cs.font_l = 0;
                    cs.font_r = 0;
                }
            }
            PrivateMode::Columns => {
                let w = if on { WIDE_COLS } else { NARROW_COLS };
                self.clear_screen();
                self.x = 0;
                self.y = 0;
                self.resize(w, self.grid.height());
            }
            PrivateMode::ReverseVideo => {
                if on != self.modes.revvid {
                    self.layer.reverse_video(on);
                }
                self.modes.revvid = on;
            }
            PrivateMode::Origin => {
                self.modes.origin = on;
                if on {
                    self.goto_pos(0, self.top);
                } else {
                    self.goto_pos(0, 0);
                }
            }
            PrivateMode::AutoWrap => self.modes.wrap = on,
            PrivateMode::MouseX10
            | PrivateMode::MouseVt200
            | PrivateMode::MouseHighlight
            | PrivateMode::MouseButtonEvent
            | PrivateMode::MouseAnyEvent => {
                self.modes.mouse = if on { u32::from(mode) as u16 } else { 0 };
                self.layer.mouse_mode(self.modes.mouse);
            }
            PrivateMode::CursorVisible => {
                self.modes.curinv = !on;
                let vis = self.cursor_visibility_value();
                self.layer.cursor_visibility(vis);
            }
            PrivateMode::AltScreen
            | PrivateMode::AltScreenClear
            | PrivateMode::AltScreenSaveCursor => {
                if !self.config.use_altscreen {
                    return;
                }
                if on {
                    if !self.alt.on {
                        if mode == PrivateMode::AltScreenSaveCursor {
                            self.alt.cursor = Some(self.save_cursor());
                        }
                        self.enter_alt_screen();
                    }
                } else if self.alt.on {
                    self.leave_alt_screen();
                    if mode == PrivateMode::AltScreenSaveCursor
                        && let Some(saved) = self.alt.cursor.take()
                    {
                        self.restore_cursor(saved);
                    }
                }
                if mode == PrivateMode::AltScreen && !on {
                    self.saved = None;
                }
                self.layer.refresh_all(false);
                self.layer.goto_pos(self.x, self.y);
            }
            PrivateMode::SaveCursor => {
                if on {
                    self.saved = Some(self.save_cursor());
                } else if let Some(saved) = self.saved {
                    self.restore_cursor(saved);
                }
            }
            PrivateMode::BracketedPaste => {
                self.modes.bracketed = on;
                self.layer.bracketed_paste_mode(on);
            }
        }
    }
}
