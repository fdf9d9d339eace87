//! Outbound hooks toward the presentation layer.
//!
//! The emulator narrates every display mutation through a [`Layer`], the
//! seam between grid state and whatever renders it (a canvas, a
//! recording, a test probe). All hooks default to no-ops so a layer only
//! implements what it cares about.

use std::io;

use vtgrid::{Cell, Color, Line};

/// Cursor visibility as negotiated by the host program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorVisibility {
    Invisible,
    #[default]
    Normal,
    VeryVisible,
}

/// Presentation-layer hooks.
///
/// Hooks fire in the order the corresponding cells are emitted; a layer
/// observing `put_char` calls sees renditions in stream order.
#[allow(unused_variables)]
pub trait Layer {
    fn goto_pos(&mut self, x: usize, y: usize) {}

    fn set_rendition(&mut self, c: &Cell) {}

    fn put_char(&mut self, c: &Cell, x: usize, y: usize) {}

    /// A character was inserted at `(x, y)`; `prev` is the row as it
    /// was before the shift.
    fn ins_char(&mut self, c: &Cell, x: usize, y: usize, prev: &Line) {}

    fn wrap_char(&mut self, c: &Cell, y: usize, top: usize, bot: usize, ins: bool) {}

    fn scroll_h(
        &mut self,
        n: isize,
        y: usize,
        xs: usize,
        xe: usize,
        bce: Color,
        prev: &Line,
    ) {
    }

    fn scroll_v(&mut self, n: isize, ys: usize, ye: usize, bce: Color) {}

    fn clear_area(
        &mut self,
        xs: usize,
        ys: usize,
        xe: usize,
        ye: usize,
        bce: Color,
        uniform: bool,
    ) {
    }

    fn clear_all(&mut self, uniform: bool) {}

    fn refresh_all(&mut self, blank: bool) {}

    fn keypad_mode(&mut self, on: bool) {}

    fn cursorkeys_mode(&mut self, on: bool) {}

    fn cursor_style(&mut self, style: u32) {}

    fn cursor_visibility(&mut self, vis: CursorVisibility) {}

    fn mouse_mode(&mut self, mode: u16) {}

    fn bracketed_paste_mode(&mut self, on: bool) {}

    fn insert_mode(&mut self, on: bool) {}

    fn reverse_video(&mut self, on: bool) {}

    /// Flow-control hint derived from keypad/cursor-key transitions.
    fn set_flow(&mut self, on: bool) {}

    fn bell(&mut self, visual: bool) {}

    /// A one-line warning surfaced to the user (degraded channels,
    /// failed sinks).
    fn message(&mut self, msg: &str) {}

    /// A PM/GM string to show as a status message. Return `true` if the
    /// message is displayed over this window, in which case parsing
    /// suspends until the caller resumes it.
    fn status_message(&mut self, msg: &str) -> bool {
        false
    }

    fn title_changed(&mut self, title: &str) {}

    fn hardstatus_changed(&mut self, status: Option<&str>) {}

    /// An xterm OSC string slot changed (0 = title/icon, 1 = 20,
    /// 2 = 39, 3 = 49).
    fn xterm_osc(&mut self, slot: usize, value: &str) {}

    /// DCS payload passed through to the display verbatim.
    fn dcs_passthrough(&mut self, data: &[u8]) {}

    /// Media-copy output routed to the display's printer port.
    ///
    /// # Errors
    ///
    /// Return an error to disable print-through for the window.
    fn print_through(&mut self, data: &[u8]) -> io::Result<()> {
        Ok(())
    }

    fn resized(&mut self, width: usize, height: usize) {}

    /// Whether the window is currently visible on a display; drives the
    /// `CSI 11 t` iconified report.
    fn displayed(&self) -> bool {
        true
    }
}

/// A layer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLayer;

impl Layer for NullLayer {}
