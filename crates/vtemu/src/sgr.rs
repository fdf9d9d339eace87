//! Select Graphic Rendition.

use vtgrid::{Attr, Color};

use crate::emulator::TerminalEmulator;
use crate::layer::Layer;

/// What a classic SGR argument does to the attribute set.
#[derive(Debug, Clone, Copy)]
enum AttrOp {
    Nop,
    Set(Attr),
    Clear(Attr),
    ClearAll,
}

/// Attribute effects of SGR arguments 0..=27.
const RENDLIST: [AttrOp; 28] = [
    AttrOp::ClearAll,                                                       // 0
    AttrOp::Set(Attr::BOLD),                                                // 1
    AttrOp::Set(Attr::DIM),                                                 // 2
    AttrOp::Set(Attr::STANDOUT),                                            // 3
    AttrOp::Set(Attr::UNDERLINE),                                           // 4
    AttrOp::Set(Attr::BLINK),                                               // 5
    AttrOp::Nop,                                                            // 6
    AttrOp::Set(Attr::REVERSE),                                             // 7
    AttrOp::Nop,                                                            // 8
    AttrOp::Nop,                                                            // 9
    AttrOp::Nop,                                                            // 10
    AttrOp::Nop,                                                            // 11
    AttrOp::Nop,                                                            // 12
    AttrOp::Nop,                                                            // 13
    AttrOp::Nop,                                                            // 14
    AttrOp::Nop,                                                            // 15
    AttrOp::Nop,                                                            // 16
    AttrOp::Nop,                                                            // 17
    AttrOp::Nop,                                                            // 18
    AttrOp::Nop,                                                            // 19
    AttrOp::Nop,                                                            // 20
    AttrOp::Nop,                                                            // 21
    AttrOp::Clear(Attr::BOLD.union(Attr::STANDOUT).union(Attr::DIM)),       // 22
    AttrOp::Clear(Attr::STANDOUT),                                          // 23
    AttrOp::Clear(Attr::UNDERLINE),                                         // 24
    AttrOp::Clear(Attr::BLINK),                                             // 25
    AttrOp::Nop,                                                            // 26
    AttrOp::Clear(Attr::REVERSE),                                           // 27
];

impl<L: Layer> TerminalEmulator<L> {
    pub(crate) fn select_rendition(&mut self) {
        let nargs = self.parser.args.len();
        let mut attr = self.rend.attr;
        let mut fg = self.rend.fg;
        let mut bg = self.rend.bg;

        let mut i = 0;
        while i < nargs {
            let j = self.parser.arg(i);

            // 256-color space: `38;5;n` / `48;5;n`.
            if (j == 38 || j == 48) && i + 2 < nargs && self.parser.arg(i + 1) == 5 {
                i += 2;
                let idx = self.parser.arg(i);
                if idx <= 255 {
                    let color = Color::indexed(idx as u8);
                    if j == 38 {
                        fg = color;
                    } else {
                        bg = color;
                    }
                }
                i += 1;
                continue;
            }
            // Direct color: `38;2;r;g;b` / `48;2;r;g;b`.
            if (j == 38 || j == 48) && i + 4 < nargs && self.parser.arg(i + 1) == 2 {
                let r = self.parser.arg(i + 2) as u8;
                let g = self.parser.arg(i + 3) as u8;
                let b = self.parser.arg(i + 4) as u8;
                let color = Color::rgb(r, g, b);
                if j == 38 {
                    fg = color;
                } else {
                    bg = color;
                }
                i += 5;
                continue;
            }

            match j {
                90..=97 => fg = Color::indexed((j - 90 + 8) as u8),
                100..=107 => bg = Color::indexed((j - 100 + 8) as u8),
                30..=37 => fg = Color::indexed((j - 30) as u8),
                40..=47 => bg = Color::indexed((j - 40) as u8),
                39 => fg = Color::DEFAULT,
                49 => bg = Color::DEFAULT,
                0 => {
                    attr = Attr::empty();
                    fg = Color::DEFAULT;
                    bg = Color::DEFAULT;
                }
                _ => {}
            }
            if let Some(op) = RENDLIST.get(j as usize) {
                match op {
                    AttrOp::Nop => {}
                    AttrOp::Set(a) => attr |= *a,
                    AttrOp::Clear(a) => attr &= !*a,
                    AttrOp::ClearAll => attr = Attr::empty(),
                }
            }
            i += 1;
        }

        self.rend.attr = attr;
        self.rend.fg = fg;
        self.rend.bg = bg;
        self.layer.set_rendition(&self.rend);
    }
}
