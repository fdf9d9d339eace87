//! Incremental byte-to-codepoint decoding.
//!
//! UTF-8 decodes through a resumable DFA that survives arbitrary buffer
//! splits; the CJK encodings buffer a lead byte and combine on the
//! trailing byte. Invalid continuation bytes emit U+FFFD and hand the
//! offending byte back to the caller for a fresh decode.

use unicode_width::UnicodeWidthChar;

/// The replacement character emitted for undecodable input.
pub const UCS_REPL: u32 = 0xfffd;

/// Stream encoding of a window.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Hash,
    strum::Display,
    strum::EnumString,
)]
pub enum Encoding {
    #[strum(serialize = "ASCII")]
    Ascii,
    #[default]
    #[strum(serialize = "UTF-8")]
    Utf8,
    #[strum(serialize = "SJIS")]
    Sjis,
    #[strum(serialize = "EUC-JP")]
    EucJp,
    #[strum(serialize = "GBK")]
    Gbk,
}

impl Encoding {
    /// Whether this encoding forms double-byte characters outside of
    /// UTF-8.
    #[inline]
    #[must_use]
    pub const fn is_cjk(self) -> bool {
        matches!(self, Encoding::Sjis | Encoding::EucJp | Encoding::Gbk)
    }
}

/// One step of the incremental UTF-8 decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf8Step {
    /// A complete codepoint.
    Char(u32),
    /// Mid-sequence; feed the next byte.
    NeedMore,
    /// Broken continuation: the caller emits U+FFFD and feeds the same
    /// byte again against a fresh decoder state.
    Restart,
}

/// Resumable UTF-8 decoder state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Decoder {
    cp: u32,
    need: u8,
    len: u8,
}

impl Utf8Decoder {
    #[must_use]
    pub const fn new() -> Self {
        Utf8Decoder { cp: 0, need: 0, len: 0 }
    }

    pub fn reset(&mut self) {
        self.need = 0;
    }

    /// Whether a sequence is in flight.
    #[inline]
    #[must_use]
    pub const fn is_mid_sequence(&self) -> bool {
        self.need != 0
    }

    pub fn push(&mut self, b: u8) -> Utf8Step {
        if self.need == 0 {
            match b {
                0x00..=0x7f => Utf8Step::Char(u32::from(b)),
                0xc2..=0xdf => {
                    self.cp = u32::from(b & 0x1f);
                    self.need = 1;
                    self.len = 2;
                    Utf8Step::NeedMore
                }
                0xe0..=0xef => {
                    self.cp = u32::from(b & 0x0f);
                    self.need = 2;
                    self.len = 3;
                    Utf8Step::NeedMore
                }
                0xf0..=0xf4 => {
                    self.cp = u32::from(b & 0x07);
                    self.need = 3;
                    self.len = 4;
                    Utf8Step::NeedMore
                }
                // Stray continuation or invalid lead: consumed as-is.
                _ => Utf8Step::Char(UCS_REPL),
            }
        } else if (0x80..=0xbf).contains(&b) {
            self.cp = (self.cp << 6) | u32::from(b & 0x3f);
            self.need -= 1;
            if self.need == 0 {
                Utf8Step::Char(self.validate())
            } else {
                Utf8Step::NeedMore
            }
        } else {
            self.need = 0;
            Utf8Step::Restart
        }
    }

    fn validate(&self) -> u32 {
        let min = match self.len {
            2 => 0x80,
            3 => 0x800,
            _ => 0x10000,
        };
        if self.cp < min || self.cp > 0x0010_ffff || (0xd800..=0xdfff).contains(&self.cp) {
            UCS_REPL
        } else {
            self.cp
        }
    }
}

/// Whether `cp` occupies two columns.
#[inline]
#[must_use]
pub fn is_double_width(cp: u32) -> bool {
    char::from_u32(cp).is_some_and(|c| c.width() == Some(2))
}

/// Whether `cp` is a combining mark that folds into the preceding cell.
#[inline]
#[must_use]
pub fn is_combining(cp: u32) -> bool {
    cp >= 0x0300 && char::from_u32(cp).is_some_and(|c| c.width() == Some(0))
}

/// Whether `b` opens a Shift-JIS double-byte character.
#[inline]
#[must_use]
pub const fn is_sjis_lead(b: u8) -> bool {
    matches!(b, 0x81..=0x9f | 0xe0..=0xef)
}

/// Whether `b` is a valid Shift-JIS trailing byte.
#[inline]
#[must_use]
pub const fn is_sjis_trail(b: u8) -> bool {
    0x40 <= b && b <= 0xfc && b != 0x7f
}

/// Map a Shift-JIS lead/trail pair to its EUC (JIS X 0208) bytes.
///
/// Lead bytes `0x81..=0x9f` map to `0x21, 0x23, ...`; `0xe0..=0xef` to
/// `0x5f, 0x61, ...`. Trailing bytes above `0x9e` bump the lead to the
/// odd row.
#[must_use]
pub const fn sjis_to_euc(lead: u8, trail: u8) -> (u8, u8) {
    let mut c = if lead <= 0x9f {
        (lead - 0x81) * 2 + 0x21
    } else {
        (lead - 0xc1) * 2 + 0x21
    };
    let t = if trail <= 0x7e {
        trail - 0x1f
    } else if trail <= 0x9e {
        trail - 0x20
    } else {
        c += 1;
        trail - 0x7e
    };
    (c, t)
}
