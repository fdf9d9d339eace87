//! Character cells and their renditions.
//!
//! A [`Cell`] is the unit of the display matrix: a codepoint (or the lead
//! byte of a double-byte CJK pair), a display attribute set, a foreground
//! and background [`Color`], and the charset bookkeeping needed to map the
//! codepoint back to a glyph.

use bitflags::bitflags;

bitflags! {
    /// Display attributes of a cell.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u8 {
        const BOLD = 0x01;
        const DIM = 0x02;
        const STANDOUT = 0x04;
        const UNDERLINE = 0x08;
        const BLINK = 0x10;
        const REVERSE = 0x20;
    }
}

/// A terminal color.
///
/// The value is a tagged 32-bit word: the high byte distinguishes the
/// default color (`0x00`), an indexed palette color (`0x01`, index in the
/// low byte) and a direct RGB color (`0x02`, payload in the low 24 bits).
/// The default color is all-zero, so zero-filled storage reads back as
/// "no color set".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(transparent)]
pub struct Color(u32);

impl Color {
    pub const DEFAULT: Color = Color(0);

    const TAG_MASK: u32 = 0xff00_0000;
    const TAG_INDEXED: u32 = 0x0100_0000;
    const TAG_RGB: u32 = 0x0200_0000;

    /// A color from the 256-entry palette.
    #[must_use]
    pub const fn indexed(index: u8) -> Self {
        Color(Self::TAG_INDEXED | index as u32)
    }

    /// A direct 24-bit color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color(Self::TAG_RGB | ((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    #[inline]
    #[must_use]
    pub const fn is_default(self) -> bool {
        self.0 == 0
    }

    /// The palette index, if this is an indexed color.
    #[must_use]
    pub const fn as_indexed(self) -> Option<u8> {
        if self.0 & Self::TAG_MASK == Self::TAG_INDEXED {
            Some((self.0 & 0xff) as u8)
        } else {
            None
        }
    }

    /// The RGB triple, if this is a direct color.
    #[must_use]
    pub const fn as_rgb(self) -> Option<(u8, u8, u8)> {
        if self.0 & Self::TAG_MASK == Self::TAG_RGB {
            Some((
                ((self.0 >> 16) & 0xff) as u8,
                ((self.0 >> 8) & 0xff) as u8,
                (self.0 & 0xff) as u8,
            ))
        } else {
            None
        }
    }

    /// The raw tagged word, as stored in line color channels.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Color(raw)
    }
}

/// Trail marker used for wide characters decoded from UTF-8, where the
/// pair has no real second byte.
pub const WIDE_TRAIL_UTF8: u8 = 0xff;

/// A single character cell.
///
/// `image` holds the decoded codepoint in UTF-8 mode, or the (EUC-mapped)
/// lead byte of a double-byte pair in the CJK encodings. `trail` is zero
/// for single-width cells; for double-width cells it carries the trailing
/// byte of the pair ([`WIDE_TRAIL_UTF8`] when there is none). `font` is
/// the designated character set of the glyph and `fontx` its extension
/// byte for multi-byte sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    pub image: u32,
    pub trail: u8,
    pub font: u8,
    pub fontx: u8,
    pub attr: Attr,
    pub fg: Color,
    pub bg: Color,
}

impl Cell {
    /// The all-zero cell, used to terminate a line at the deferred-wrap
    /// column.
    pub const NULL: Cell = Cell {
        image: 0,
        trail: 0,
        font: 0,
        fontx: 0,
        attr: Attr::empty(),
        fg: Color::DEFAULT,
        bg: Color::DEFAULT,
    };

    /// A plain space with default rendition.
    pub const BLANK: Cell = Cell {
        image: ' ' as u32,
        trail: 0,
        font: 0,
        fontx: 0,
        attr: Attr::empty(),
        fg: Color::DEFAULT,
        bg: Color::DEFAULT,
    };

    /// Whether this cell occupies two columns.
    #[inline]
    #[must_use]
    pub const fn is_wide(&self) -> bool {
        self.trail != 0
    }

    /// A blank carrying only a background color, used for
    /// back-color-erase fills.
    #[must_use]
    pub const fn bce(bg: Color) -> Self {
        Cell {
            image: ' ' as u32,
            trail: 0,
            font: 0,
            fontx: 0,
            attr: Attr::empty(),
            fg: Color::DEFAULT,
            bg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_tags() {
        assert!(Color::DEFAULT.is_default());
        assert_eq!(Color::indexed(7).as_indexed(), Some(7));
        assert_eq!(Color::indexed(7).as_rgb(), None);
        assert_eq!(Color::rgb(0x12, 0x34, 0x56).as_rgb(), Some((0x12, 0x34, 0x56)));
        assert_eq!(Color::rgb(0x12, 0x34, 0x56).raw(), 0x0212_3456);
    }

    #[test]
    fn test_default_color_is_zero() {
        assert_eq!(Color::default().raw(), 0);
        assert_eq!(Color::from_raw(0), Color::DEFAULT);
    }

    #[test]
    fn test_blank_cell() {
        assert_eq!(Cell::BLANK.image, u32::from(b' '));
        assert!(!Cell::BLANK.is_wide());
        assert_eq!(Cell::BLANK.attr, Attr::empty());
    }
}
