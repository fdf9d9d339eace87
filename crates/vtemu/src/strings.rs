//! Control-string accumulation and dispatch (OSC/DCS/APC/PM/GM/AKA).

use crate::emulator::{Flow, TerminalEmulator};
use crate::layer::Layer;
use crate::parser::{MAXSTR, State, StringKind};

/// `atoi`-style leading-digits parse; no digits yield zero.
fn leading_int(s: &str) -> u32 {
    s.bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0u32, |acc, b| {
            acc.saturating_mul(10).saturating_add(u32::from(b - b'0'))
        })
}

impl<L: Layer> TerminalEmulator<L> {
    pub(crate) fn string_start(&mut self, kind: StringKind) {
        self.parser.string_kind = kind;
        self.parser.string.clear();
        self.parser.state = State::Str;
    }

    pub(crate) fn string_char(&mut self, c: u32) {
        // An overlong string aborts back to ground; the tail prints as
        // literal text.
        if self.parser.string.len() >= MAXSTR - 1 {
            self.parser.state = State::Literal;
        } else {
            self.parser.string.push(c as u8);
        }
    }

    pub(crate) fn str_state(&mut self, c: u32) -> Flow {
        if c == 0 {
            // Null bytes are dropped.
            return Flow::Next;
        }
        if c == 0x1b {
            self.parser.state = State::StrEsc;
            return Flow::Next;
        }
        // Control bytes (except ^E, kept for title escapes) terminate
        // an OSC, which makes BEL work as xterm's OSC terminator. The
        // 8-bit ST terminates any string when C1 is on.
        let osc_control =
            self.parser.string_kind == StringKind::Osc && c < 0x20 && c != 0x05;
        if !osc_control && !(self.charsets.c1 && c == 0x9c) {
            self.string_char(c);
            return Flow::Next;
        }
        self.parser.state = State::StrEsc;
        Flow::Again(u32::from(b'\\'))
    }

    pub(crate) fn str_esc_state(&mut self, c: u32) -> Flow {
        match c {
            0x5c => {
                // ST
                if self.string_end() {
                    return Flow::Suspend;
                }
                Flow::Next
            }
            0x1b => {
                self.string_char(0x1b);
                Flow::Next
            }
            _ => {
                self.parser.state = State::Str;
                self.string_char(0x1b);
                self.string_char(c);
                Flow::Next
            }
        }
    }

    /// Dispatch a terminated control string. Returns `true` when the
    /// parse must suspend until a status message clears.
    pub(crate) fn string_end(&mut self) -> bool {
        self.parser.state = State::Literal;
        let raw = std::mem::take(&mut self.parser.string);
        match self.parser.string_kind {
            StringKind::Osc => self.osc_end(&raw),
            StringKind::Apc => {
                self.set_hardstatus(&raw);
                false
            }
            StringKind::Pm | StringKind::Gm => {
                let msg = String::from_utf8_lossy(&raw).into_owned();
                self.layer.status_message(&msg)
            }
            StringKind::Dcs => {
                self.layer.dcs_passthrough(&raw);
                false
            }
            StringKind::Aka => {
                let s = String::from_utf8_lossy(&raw).into_owned();
                if s.is_empty() && self.title.current.is_empty() {
                    return false;
                }
                self.change_title(&s);
                if s.is_empty() {
                    // An empty title re-arms auto-title inference on
                    // the current line.
                    self.title.auto_line = i32::try_from(self.y).unwrap_or(0) + 1;
                }
                false
            }
            StringKind::None => false,
        }
    }

    fn osc_end(&mut self, raw: &[u8]) -> bool {
        let s = String::from_utf8_lossy(raw).into_owned();
        let Some((num, payload)) = s.split_once(';') else {
            return false;
        };
        if num.is_empty() {
            return false;
        }
        let typ = leading_int(num);
        if typ == 83 {
            // OSC 83 executes multiplexer commands in the original;
            // command dispatch belongs to the command parser, not the
            // emulator.
            return false;
        }
        if matches!(typ, 0 | 1 | 2 | 20 | 39 | 49) {
            let slot = (typ / 10).saturating_sub(1) as usize;
            if self.osc_strings[slot] != payload {
                self.osc_strings[slot] = payload.to_string();
                self.layer.xterm_osc(slot, payload);
            }
        }
        if typ == 0 || typ == 2 {
            self.set_hardstatus(payload.as_bytes());
        }
        false
    }

    fn set_hardstatus(&mut self, raw: &[u8]) {
        if !self.config.use_hardstatus {
            return;
        }
        let s = String::from_utf8_lossy(raw);
        let new = if s.is_empty() {
            None
        } else {
            Some(s.into_owned())
        };
        if new != self.hardstatus {
            self.hardstatus = new;
            self.layer.hardstatus_changed(self.hardstatus.as_deref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::leading_int;

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int("42"), 42);
        assert_eq!(leading_int("2x"), 2);
        assert_eq!(leading_int("x2"), 0);
        assert_eq!(leading_int(""), 0);
    }
}
