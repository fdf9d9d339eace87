//! ESC-sequence state and dispatch.

use crate::emulator::{Flow, TerminalEmulator};
use crate::layer::Layer;
use crate::parser::{Intermediate, State, StringKind};
use crate::report;

impl<L: Layer> TerminalEmulator<L> {
    pub(crate) fn esc_state(&mut self, c: u32) -> Flow {
        match c {
            0x5b => self.parser.enter_csi(), // '['
            0x5d => self.string_start(StringKind::Osc), // ']'
            0x5f => self.string_start(StringKind::Apc), // '_'
            0x50 => self.string_start(StringKind::Dcs), // 'P'
            0x5e => self.string_start(StringKind::Pm), // '^'
            0x21 => self.string_start(StringKind::Gm), // '!'
            0x22 | 0x6b => self.string_start(StringKind::Aka), // '"' 'k'
            _ => {
                if self.special(c) {
                    self.parser.state = State::Literal;
                } else if (0x20..=0x2f).contains(&c) {
                    self.parser.intermediate = self.parser.intermediate.push(c as u8);
                } else if (0x30..=0x7e).contains(&c) {
                    let im = self.parser.intermediate;
                    self.parser.state = State::Literal;
                    self.do_esc(c as u8, im);
                } else {
                    // Out-of-class byte: back to ground, retry it.
                    self.parser.state = State::Literal;
                    return Flow::Again(c);
                }
            }
        }
        Flow::Next
    }

    pub(crate) fn do_esc(&mut self, c: u8, intermediate: Intermediate) {
        match intermediate {
            Intermediate::None => match c {
                b'E' => self.line_feed(true),
                b'D' => self.line_feed(false),
                b'M' => self.reverse_line_feed(),
                b'H' => {
                    if let Some(stop) = self.tabs.get_mut(self.x) {
                        *stop = true;
                    }
                }
                b'Z' => self.report(&report::device_attributes()),
                b'7' => self.saved = Some(self.save_cursor()),
                b'8' => {
                    if let Some(saved) = self.saved {
                        self.restore_cursor(saved);
                    }
                }
                b'c' => {
                    self.clear_screen();
                    self.full_reset();
                    self.layer.keypad_mode(false);
                    self.layer.cursorkeys_mode(false);
                    self.layer.set_flow(true);
                    self.layer.goto_pos(self.x, self.y);
                }
                b'=' => {
                    self.modes.keypad = true;
                    self.layer.keypad_mode(true);
                    self.layer.set_flow(false);
                }
                b'>' => {
                    self.modes.keypad = false;
                    self.layer.keypad_mode(false);
                    self.layer.set_flow(true);
                }
                b'n' => self.map_charset(2), // LS2
                b'o' => self.map_charset(3), // LS3
                b'~' => self.map_charset_r(1), // LS1R
                b'}' => self.map_charset_r(2), // LS2R
                b'|' => self.map_charset_r(3), // LS3R
                b'N' => self.single_shift(2),
                b'O' => self.single_shift(3),
                // Private visual-bell sequence.
                b'g' => self.layer.bell(true),
                _ => {}
            },
            Intermediate::Byte(b'#') => {
                if c == b'8' {
                    self.fill_with_es();
                }
            }
            Intermediate::Byte(b'(') => self.designate_charset(c, 0),
            Intermediate::Byte(b')') => self.designate_charset(c, 1),
            Intermediate::Byte(b'*') => self.designate_charset(c, 2),
            Intermediate::Byte(b'+') => self.designate_charset(c, 3),
            // ESC $ Fn and ESC $ ( Fn designate a multi-byte set; the
            // final byte folds into the 0x01..0x1f range.
            Intermediate::Byte(b'$') | Intermediate::Dollar(b'(') => {
                self.designate_charset(c & 0x1f, 0);
            }
            Intermediate::Dollar(b')') => self.designate_charset(c & 0x1f, 1),
            Intermediate::Dollar(b'*') => self.designate_charset(c & 0x1f, 2),
            Intermediate::Dollar(b'+') => self.designate_charset(c & 0x1f, 3),
            _ => {}
        }
    }
}
