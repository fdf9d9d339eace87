//! The terminal emulator proper.
//!
//! [`TerminalEmulator`] consumes the byte stream of a program attached
//! to a pty and maintains the logical display state: grid, cursor,
//! rendition, charsets, modes, scroll region, scrollback and the
//! alternate screen. Display mutations are narrated through a
//! [`Layer`]; responses to the program queue in a [`ReportBuffer`].

use vtgrid::{Attr, Cell, ChannelSet, Color, Grid, Line, WIDE_TRAIL_UTF8};

use crate::charset::{self, CharsetState, KANA, KANJI};
use crate::config::EmulatorConfig;
use crate::decode::{self, Encoding, UCS_REPL, Utf8Decoder, Utf8Step};
use crate::layer::{CursorVisibility, Layer, NullLayer};
use crate::logsink::LogSink;
use crate::parser::{Intermediate, Parser, State, StringKind};
use crate::print::{FlushDisposition, PrintTarget, Printer};
use crate::report::{INPUT_BUFFER_SIZE, ReportBuffer};
use crate::title::TitleState;

/// Result of feeding bytes to the emulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The whole buffer was consumed.
    Complete,
    /// A status string is being displayed; the unconsumed tail was
    /// saved and [`TerminalEmulator::resume_pending`] continues it.
    Suspended,
}

/// Per-byte control flow of the parser.
pub(crate) enum Flow {
    /// Byte consumed.
    Next,
    /// Re-dispatch the (possibly rewritten) character in the new state.
    Again(u32),
    /// Stop parsing and save the remaining input.
    Suspend,
}

/// Terminal modes of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modes {
    pub insert: bool,
    pub wrap: bool,
    pub origin: bool,
    pub autolf: bool,
    pub keypad: bool,
    pub cursorkeys: bool,
    pub revvid: bool,
    pub curinv: bool,
    pub curvvis: bool,
    pub bracketed: bool,
    /// Mouse reporting level (0, 9, 1000..=1003).
    pub mouse: u16,
    pub cursor_style: u32,
}

impl Default for Modes {
    fn default() -> Self {
        Modes {
            insert: false,
            wrap: true,
            origin: false,
            autolf: false,
            keypad: false,
            cursorkeys: false,
            revvid: false,
            curinv: false,
            curvvis: false,
            bracketed: false,
            mouse: 0,
            cursor_style: 0,
        }
    }
}

/// Snapshot taken by DECSC and the alternate-screen switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedCursor {
    pub x: usize,
    pub y: usize,
    pub rend: Cell,
    pub slots: [u8; 4],
    pub gl: usize,
    pub gr_sel: usize,
}

/// The hidden half of the alternate-screen pair.
#[derive(Debug, Default)]
pub(crate) struct AltScreen {
    pub on: bool,
    pub lines: Vec<Line>,
    pub hist: Vec<Line>,
    pub hist_idx: usize,
    pub cursor: Option<SavedCursor>,
}

/// A VT100/ANSI terminal emulator engine.
pub struct TerminalEmulator<L: Layer = NullLayer> {
    pub(crate) config: EmulatorConfig,
    pub(crate) layer: L,
    pub(crate) grid: Grid,
    pub(crate) x: usize,
    pub(crate) y: usize,
    pub(crate) top: usize,
    pub(crate) bot: usize,
    pub(crate) rend: Cell,
    pub(crate) charsets: CharsetState,
    pub(crate) modes: Modes,
    pub(crate) tabs: Vec<bool>,
    pub(crate) saved: Option<SavedCursor>,
    pub(crate) alt: AltScreen,
    pub(crate) parser: Parser,
    pub(crate) utf8: Utf8Decoder,
    pub(crate) mbcs: u8,
    pub(crate) encoding: Encoding,
    pub(crate) reports: ReportBuffer,
    pub(crate) pending: Vec<u8>,
    pub(crate) printer: Printer,
    pub(crate) log: Option<LogSink>,
    pub(crate) title: TitleState,
    pub(crate) osc_strings: [String; 4],
    pub(crate) hardstatus: Option<String>,
    pub(crate) degraded: ChannelSet,
}

fn default_tabs(cols: usize, interval: usize) -> Vec<bool> {
    (0..=cols)
        .map(|x| interval != 0 && x != 0 && x % interval == 0)
        .collect()
}

impl TerminalEmulator<NullLayer> {
    /// A new emulator without a presentation layer.
    #[must_use]
    pub fn new(cols: usize, rows: usize, histlen: usize, config: EmulatorConfig) -> Self {
        Self::with_layer(cols, rows, histlen, config, NullLayer)
    }
}

impl<L: Layer> TerminalEmulator<L> {
    /// A new emulator narrating display mutations to `layer`.
    pub fn with_layer(
        cols: usize,
        rows: usize,
        histlen: usize,
        config: EmulatorConfig,
        layer: L,
    ) -> Self {
        let mut emu = TerminalEmulator {
            layer,
            grid: Grid::new(cols, rows, histlen),
            x: 0,
            y: 0,
            top: 0,
            bot: rows.saturating_sub(1),
            rend: Cell::NULL,
            charsets: CharsetState::default(),
            modes: Modes::default(),
            tabs: default_tabs(cols, config.tab_interval),
            saved: None,
            alt: AltScreen::default(),
            parser: Parser::default(),
            utf8: Utf8Decoder::new(),
            mbcs: 0,
            encoding: config.encoding,
            reports: ReportBuffer::new(),
            pending: Vec::new(),
            printer: Printer::default(),
            log: None,
            title: TitleState::default(),
            osc_strings: Default::default(),
            hardstatus: None,
            degraded: ChannelSet::empty(),
            config,
        };
        emu.reset_charsets();
        emu
    }

    // ---- inspection ----

    #[inline]
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Cursor position; `x == width` is the deferred-wrap column.
    #[inline]
    #[must_use]
    pub fn cursor(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    #[inline]
    #[must_use]
    pub fn scroll_region(&self) -> (usize, usize) {
        (self.top, self.bot)
    }

    #[inline]
    #[must_use]
    pub fn modes(&self) -> &Modes {
        &self.modes
    }

    /// The current rendition applied to printed characters.
    #[inline]
    #[must_use]
    pub fn rendition(&self) -> &Cell {
        &self.rend
    }

    #[inline]
    #[must_use]
    pub fn charsets(&self) -> &CharsetState {
        &self.charsets
    }

    #[inline]
    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    #[inline]
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title.current
    }

    #[inline]
    #[must_use]
    pub fn hardstatus(&self) -> Option<&str> {
        self.hardstatus.as_deref()
    }

    /// Stored xterm OSC string (0 = title/icon, 1..3 = slots 20/39/49).
    #[must_use]
    pub fn osc_string(&self, slot: usize) -> &str {
        self.osc_strings.get(slot).map_or("", String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn alt_screen_active(&self) -> bool {
        self.alt.on
    }

    /// Human-readable parser state for status lines; `None` in ground
    /// state.
    #[must_use]
    pub fn parser_status(&self) -> Option<String> {
        self.parser.status()
    }

    /// Drain the responses queued for the attached program.
    pub fn take_reports(&mut self) -> Vec<u8> {
        self.reports.take()
    }

    #[must_use]
    pub fn pending_reports(&self) -> &[u8] {
        self.reports.as_bytes()
    }

    pub fn layer_mut(&mut self) -> &mut L {
        &mut self.layer
    }

    // ---- wiring ----

    /// Attach or detach the raw-output log tee.
    pub fn set_log_sink(&mut self, sink: Option<Box<dyn std::io::Write + Send>>) {
        self.log = sink.map(LogSink::new);
    }

    /// Route print-through output to `sink` instead of the display.
    pub fn set_print_sink(&mut self, sink: Option<Box<dyn std::io::Write + Send>>) {
        self.printer.target = match sink {
            Some(s) => PrintTarget::Sink(s),
            None => PrintTarget::Display,
        };
    }

    /// Set the window title, as the `title` command would.
    pub fn change_title(&mut self, raw: &str) {
        let t = crate::title::sanitize_title(raw, self.charsets.c1);
        if t != self.title.current {
            self.title.current = t;
            self.layer.title_changed(&self.title.current);
        }
    }

    /// Arm auto-title inference with the prompt prefix to scan past.
    pub fn set_title_prefix(&mut self, prefix: &str) {
        self.title.auto_prefix = prefix.to_string();
        self.title.auto_line = i32::try_from(self.y).unwrap_or(0) + 1;
    }

    // ---- resets ----

    /// Abort any half-parsed sequence, returning the parser to ground.
    pub fn reset_ansi_state(&mut self) {
        self.parser.state = State::Literal;
        self.parser.string_kind = StringKind::None;
    }

    /// Reset designations, shifts and the encoding-specific GR setup.
    pub fn reset_charsets(&mut self) {
        self.charsets.gr = self.config.gr;
        self.charsets.c1 = self.config.c1;
        self.charsets.set_from_str("BBBB02");
        if let Some(spec) = self.config.charset.clone() {
            self.charsets.set_from_str(&spec);
        }
        self.reset_encoding();
    }

    /// Apply a designation string (see [`CharsetState::set_from_str`]).
    pub fn set_charsets(&mut self, s: &str) {
        self.charsets.set_from_str(s);
    }

    /// Switch the stream encoding and designate its default GR sets.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.encoding = encoding;
        self.mbcs = 0;
        self.utf8.reset();
        self.reset_encoding();
    }

    fn reset_encoding(&mut self) {
        let cs = &mut self.charsets;
        match self.encoding {
            Encoding::Ascii | Encoding::Utf8 => {}
            Encoding::Sjis => {
                cs.slots[1] = KANA;
                cs.gr_sel = 1;
                cs.gr = 1;
            }
            Encoding::EucJp => {
                cs.slots[1] = KANJI;
                cs.gr_sel = 1;
                cs.gr = 1;
            }
            Encoding::Gbk => {
                cs.slots[1] = charset::GBK_FONT;
                cs.gr_sel = 1;
                cs.gr = 2;
                cs.font_e = charset::GBK_FONT;
            }
        }
        cs.ss = 0;
        cs.font_l = cs.slots[cs.gl];
        cs.font_r = cs.slots[cs.gr_sel];
    }

    /// Full reset, as done by `ESC c`.
    pub(crate) fn full_reset(&mut self) {
        self.modes = Modes::default();
        self.rend = Cell::NULL;
        self.top = 0;
        self.bot = self.grid.height().saturating_sub(1);
        self.saved = None;
        self.tabs = default_tabs(self.grid.width(), self.config.tab_interval);
        self.reset_charsets();
        self.layer.insert_mode(false);
        self.layer.cursor_visibility(CursorVisibility::Normal);
    }

    /// Change the window size. Only legal between `write_bytes` calls.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        if cols == 0 || rows == 0 || cols > 10_000 || rows > 10_000 {
            return;
        }
        self.grid.resize(cols, rows);
        for ml in &mut self.alt.lines {
            ml.resize(cols);
        }
        if self.alt.lines.len() > rows {
            self.alt.lines.truncate(rows);
        } else {
            let missing = rows - self.alt.lines.len();
            self.alt
                .lines
                .extend((0..missing).map(|_| Line::blank(cols)));
        }
        for ml in &mut self.alt.hist {
            ml.resize(cols);
        }
        self.x = self.x.min(cols);
        self.y = self.y.min(rows - 1);
        self.top = 0;
        self.bot = rows - 1;
        self.tabs = default_tabs(cols, self.config.tab_interval);
        self.layer.resized(cols, rows);
    }

    // ---- the write path ----

    /// Feed program output. This is the sole mutator; it runs to
    /// completion unless a status string suspends it.
    pub fn write_bytes(&mut self, buf: &[u8]) -> WriteOutcome {
        if buf.is_empty() {
            return WriteOutcome::Complete;
        }
        if self.log.is_some() {
            self.log_write(buf);
        }
        self.feed(buf)
    }

    /// Continue parsing input saved when a status suspended
    /// [`TerminalEmulator::write_bytes`].
    pub fn resume_pending(&mut self) -> WriteOutcome {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            WriteOutcome::Complete
        } else {
            self.feed(&pending)
        }
    }

    fn log_write(&mut self, buf: &[u8]) {
        if let Some(log) = &mut self.log
            && let Err(e) = log.write(buf, self.config.log_timestamps.as_ref(), self.config.log_flush)
        {
            tracing::warn!(error = %e, "error writing logfile, logging disabled");
            self.log = None;
            self.layer.message("Error writing logfile");
        }
    }

    fn feed(&mut self, buf: &[u8]) -> WriteOutcome {
        if self.grid.width() == 0 || self.grid.height() == 0 {
            return WriteOutcome::Complete;
        }
        let mut i = 0;
        while i < buf.len() {
            let byte = buf[i];
            i += 1;
            if self.mbcs == 0 {
                self.rend.font = self.charsets.font_l;
            }
            let mut c = u32::from(byte);
            if self.encoding == Encoding::Utf8 && !self.parser.state.takes_raw_bytes() {
                match self.utf8.push(byte) {
                    Utf8Step::NeedMore => continue,
                    Utf8Step::Char(u) => c = u,
                    Utf8Step::Restart => {
                        c = UCS_REPL;
                        i -= 1;
                    }
                }
            }
            loop {
                match self.process(c) {
                    Flow::Next => break,
                    Flow::Again(nc) => c = nc,
                    Flow::Suspend => {
                        if i >= buf.len() {
                            break;
                        }
                        let take = (buf.len() - i).min(INPUT_BUFFER_SIZE);
                        self.pending.clear();
                        self.pending.extend_from_slice(&buf[i..i + take]);
                        return WriteOutcome::Suspended;
                    }
                }
            }
        }
        if self.printer.uses_display()
            && matches!(
                self.parser.state,
                State::Print | State::PrintEsc | State::PrintCsi | State::PrintCsiFour
            )
        {
            self.flush_print();
        }
        WriteOutcome::Complete
    }

    fn process(&mut self, c: u32) -> Flow {
        match self.parser.state {
            State::Literal => self.literal(c),
            State::Esc => self.esc_state(c),
            State::Csi => self.csi_state(c),
            State::Str => self.str_state(c),
            State::StrEsc => self.str_esc_state(c),
            State::Print => {
                if c == 0x1b {
                    self.parser.state = State::PrintEsc;
                } else {
                    self.print_char(c as u8);
                }
                Flow::Next
            }
            State::PrintEsc => {
                if c == u32::from(b'[') {
                    self.parser.state = State::PrintCsi;
                } else {
                    self.print_char(0x1b);
                    self.print_char(c as u8);
                    self.parser.state = State::Print;
                }
                Flow::Next
            }
            State::PrintCsi => {
                if c == u32::from(b'4') {
                    self.parser.state = State::PrintCsiFour;
                } else {
                    self.print_char(0x1b);
                    self.print_char(b'[');
                    self.print_char(c as u8);
                    self.parser.state = State::Print;
                }
                Flow::Next
            }
            State::PrintCsiFour => {
                if c == u32::from(b'i') {
                    self.parser.state = State::Literal;
                    self.flush_print();
                } else {
                    self.print_char(0x1b);
                    self.print_char(b'[');
                    self.print_char(b'4');
                    self.print_char(c as u8);
                    self.parser.state = State::Print;
                }
                Flow::Next
            }
        }
    }

    // ---- ground state ----

    #[allow(clippy::too_many_lines)]
    fn literal(&mut self, c: u32) -> Flow {
        let mut c = c;
        let cols = self.grid.width();

        // A control byte abandons a pending CJK lead.
        if self.mbcs != 0
            && (c <= 0x20
                || c == 0x7f
                || ((0x80..0xa0).contains(&c) && self.charsets.c1))
        {
            self.mbcs = 0;
        }

        if c < 0x20 {
            if c == 0x1b {
                self.parser.intermediate = Intermediate::None;
                self.parser.state = State::Esc;
                if self.title.auto_line < 0 {
                    self.title.auto_line = 0;
                }
            } else {
                self.special(c);
            }
            return Flow::Next;
        }

        // 8-bit C1 controls, unless GR maps printable glyphs there.
        if (0x80..0xa0).contains(&c)
            && self.charsets.c1
            && (self.charsets.font_r & 0xf0 != 0x20 || self.encoding == Encoding::Utf8)
        {
            match c {
                0x84 | 0x85 | 0x88 | 0x8d | 0x8e | 0x8f => {
                    // IND NEL HTS RI SS2 SS3
                    self.do_esc((c ^ 0xc0) as u8, Intermediate::None);
                }
                0x9b => {
                    if self.title.auto_line < 0 {
                        self.title.auto_line = 0;
                    }
                    self.parser.enter_csi();
                }
                0x90 => self.string_start(StringKind::Dcs),
                _ => {}
            }
            return Flow::Next;
        }

        if self.mbcs == 0 {
            self.rend.font = if c < 0x80 || self.charsets.gr == 0 {
                self.charsets.font_l
            } else if self.charsets.gr == 2 && self.charsets.ss == 0 {
                self.charsets.font_e
            } else {
                self.charsets.font_r
            };
        }

        if self.encoding == Encoding::Utf8 {
            if self.rend.font == charset::LINE_DRAWING {
                if let Ok(b) = u8::try_from(c)
                    && let Some(glyph) = charset::dec_graphics(b)
                {
                    c = glyph as u32;
                }
            }
            self.rend.font = 0;
            self.rend.fontx = 0;
            if decode::is_double_width(c) {
                self.mbcs = WIDE_TRAIL_UTF8;
            }
            if decode::is_combining(c) {
                self.combine_char(c);
                return Flow::Next;
            }
        }

        let mut font = self.rend.font;
        if font == KANA && self.encoding == Encoding::Sjis && self.mbcs == 0 {
            if decode::is_sjis_lead(c as u8) {
                self.mbcs = c as u8;
                return Flow::Next;
            }
        }
        if font == charset::GBK_FONT && c == 0x80 && self.mbcs == 0 {
            font = 0;
            self.rend.font = 0;
        }
        if charset::is_dw_font(font) && c == 0x20 {
            font = 0;
            self.rend.font = 0;
        }

        if charset::is_dw_font(font) || self.mbcs != 0 {
            let mut t = c;
            if self.mbcs == 0 {
                self.mbcs = c as u8;
                return Flow::Next;
            }
            if self.x == cols - 1 {
                self.x += usize::from(self.modes.wrap);
            }
            if self.encoding != Encoding::Utf8 {
                c = u32::from(self.mbcs);
                if font == KANA && self.encoding == Encoding::Sjis {
                    if decode::is_sjis_trail(t as u8) {
                        let (lead, trail) = decode::sjis_to_euc(c as u8, t as u8);
                        c = u32::from(lead);
                        t = u32::from(trail);
                        self.rend.font = KANJI;
                    } else {
                        // Incomplete Shift-JIS: drop the lead byte.
                        c = t;
                        t = 0;
                    }
                }
                if t != 0
                    && self.charsets.gr != 0
                    && font != 0x18
                    && font != charset::GBK_FONT
                {
                    t &= 0x7f;
                    if t < 0x20 {
                        // Control byte as trail: abandon the pair and
                        // execute it.
                        self.mbcs = 0;
                        self.parser.state = State::Literal;
                        return Flow::Again(t);
                    }
                }
                if t == 0x7f {
                    return Flow::Next;
                }
                self.mbcs = t as u8;
            }
        }

        if font == charset::CP437_HIGH && c >= 0x20 {
            self.rend.font = 0;
            c |= 0x80;
        } else if self.charsets.gr != 0 && self.encoding != Encoding::Utf8 {
            if c == 0x80 && font == 0 && self.encoding == Encoding::Gbk {
                c = 0xa4;
            } else {
                c &= 0x7f;
            }
            if c < 0x20 && font != charset::GBK_FONT {
                return Flow::Again(c);
            }
        }
        if c == 0x7f {
            return Flow::Next;
        }

        self.rend.image = c;
        self.rend.trail = self.mbcs;

        if self.x < cols - 1 {
            if self.modes.insert {
                let prev = self.grid.line(self.y).clone();
                let mut rend = self.rend;
                let failed = self.grid.ins_char(&mut rend, self.x, self.y);
                self.apply_degrade(failed);
                self.layer.ins_char(&rend, self.x, self.y, &prev);
            } else {
                let mut rend = self.rend;
                let failed = self.grid.put_char(&mut rend, self.x, self.y);
                self.apply_degrade(failed);
                self.layer.put_char(&rend, self.x, self.y);
            }
            self.x += 1;
        } else if self.x == cols - 1 {
            let mut rend = self.rend;
            let failed = self.grid.put_char(&mut rend, self.x, self.y);
            self.apply_degrade(failed);
            self.layer.put_char(&rend, self.x, self.y);
            if self.modes.wrap {
                self.x += 1;
            }
        } else {
            let mut rend = self.rend;
            let (_, failed) = self.grid.wrap_char(
                &mut rend,
                self.y,
                self.top,
                self.bot,
                self.modes.insert,
                true,
                self.config.compact_hist,
            );
            self.apply_degrade(failed);
            self.layer
                .wrap_char(&rend, self.y, self.top, self.bot, self.modes.insert);
            if self.y != self.bot && self.y != self.grid.height() - 1 {
                self.y += 1;
            }
            self.x = 1;
        }

        if self.mbcs != 0 {
            self.rend.trail = 0;
            self.mbcs = 0;
            self.x += 1;
        }

        if self.charsets.ss != 0 {
            self.charsets.font_l = self.charsets.slots[self.charsets.gl];
            self.charsets.font_r = self.charsets.slots[self.charsets.gr_sel];
            self.rend.font = self.charsets.font_l;
            self.layer.set_rendition(&self.rend);
            self.charsets.ss = 0;
        }
        Flow::Next
    }

    /// Handle a C0 control. Returns `false` for bytes with no meaning
    /// here.
    pub(crate) fn special(&mut self, c: u32) -> bool {
        match c {
            0x08 => self.backspace(),
            0x0d => self.carriage_return(),
            0x0a => {
                if self.title.auto_line != 0 {
                    self.find_aka();
                }
                self.line_feed(false);
            }
            0x0b => self.line_feed(false),
            0x07 => self.layer.bell(self.config.visual_bell),
            0x09 => self.forward_tab(),
            0x0f => self.map_charset(0),
            0x0e => self.map_charset(1),
            _ => return false,
        }
        true
    }

    fn combine_char(&mut self, c: u32) {
        let cols = self.grid.width();
        let (mut ox, oy) = if self.x == 0 {
            (cols - 1, self.y.saturating_sub(1))
        } else {
            (self.x - 1, self.y)
        };
        let mut omc = self.grid.cell_at(ox, oy);
        if self.grid.line(oy).is_wide_right(ox) {
            if ox == 0 {
                return;
            }
            ox -= 1;
            omc = self.grid.cell_at(ox, oy);
        }
        if let (Some(base), Some(comb)) = (char::from_u32(omc.image), char::from_u32(c))
            && let Some(composed) = unicode_normalization::char::compose(base, comb)
        {
            omc.image = composed as u32;
        }
        let failed = self.grid.fix_line(oy, &mut omc);
        self.apply_degrade(failed);
        self.grid.line_mut(oy).set_cell(ox, &omc);
        self.layer.put_char(&omc, ox, oy);
        self.layer.goto_pos(self.x, self.y);
    }

    // ---- cursor & motion ----

    pub(crate) fn goto_pos(&mut self, x: usize, y: usize) {
        self.x = x;
        self.y = y;
        self.layer.goto_pos(x, y);
    }

    pub(crate) fn restore_pos_rendition(&mut self) {
        self.layer.goto_pos(self.x, self.y);
        self.layer.set_rendition(&self.rend);
    }

    fn backspace(&mut self) {
        if self.x > 0 {
            self.x -= 1;
        } else if self.modes.wrap && self.y > 0 {
            self.x = self.grid.width() - 1;
            self.y -= 1;
        }
        self.layer.goto_pos(self.x, self.y);
    }

    fn carriage_return(&mut self) {
        if self.x == 0 {
            return;
        }
        self.x = 0;
        self.layer.goto_pos(self.x, self.y);
    }

    pub(crate) fn line_feed(&mut self, with_return: bool) {
        if with_return {
            self.x = 0;
        }
        if self.y != self.bot {
            if self.y < self.grid.height() - 1 {
                self.y += 1;
            }
            self.layer.goto_pos(self.x, self.y);
            return;
        }
        if self.title.auto_line > 1 {
            self.title.auto_line -= 1;
        }
        let bce = self.rend.bg;
        let failed =
            self.grid
                .scroll_v(1, self.top, self.bot, bce, true, self.config.compact_hist);
        self.apply_degrade(failed);
        self.layer.scroll_v(1, self.top, self.bot, bce);
        self.layer.goto_pos(self.x, self.y);
    }

    pub(crate) fn reverse_line_feed(&mut self) {
        if self.y == self.top {
            let bce = self.rend.bg;
            let failed = self.grid.scroll_v(-1, self.top, self.bot, bce, false, false);
            self.apply_degrade(failed);
            self.layer.scroll_v(-1, self.top, self.bot, bce);
            self.layer.goto_pos(self.x, self.y);
        } else if self.y > 0 {
            self.cursor_up(1);
        }
    }

    pub(crate) fn cursor_up(&mut self, n: usize) {
        if self.y < self.top {
            // Above the scroll region its bounds do not apply.
            self.y = self.y.saturating_sub(n);
        } else {
            self.y = self.y.saturating_sub(n).max(self.top);
        }
        self.layer.goto_pos(self.x, self.y);
    }

    pub(crate) fn cursor_down(&mut self, n: usize) {
        let rows = self.grid.height();
        if self.y > self.bot {
            self.y = (self.y + n).min(rows - 1);
        } else {
            self.y = (self.y + n).min(self.bot);
        }
        self.layer.goto_pos(self.x, self.y);
    }

    pub(crate) fn cursor_left(&mut self, n: usize) {
        self.x = self.x.saturating_sub(n);
        self.layer.goto_pos(self.x, self.y);
    }

    pub(crate) fn cursor_right(&mut self, n: usize) {
        if self.x == self.grid.width() {
            self.line_feed(true);
        }
        self.x = (self.x + n).min(self.grid.width() - 1);
        self.layer.goto_pos(self.x, self.y);
    }

    pub(crate) fn forward_tab(&mut self) {
        let cols = self.grid.width();
        let mut x = self.x;
        if x == cols {
            self.line_feed(true);
            x = 0;
        }
        if self.tabs.get(x).copied().unwrap_or(false) && x < cols - 1 {
            x += 1;
        }
        while x < cols - 1 && !self.tabs.get(x).copied().unwrap_or(false) {
            x += 1;
        }
        self.x = x;
        self.layer.goto_pos(self.x, self.y);
    }

    pub(crate) fn backward_tab(&mut self) {
        let mut x = self.x;
        if self.tabs.get(x).copied().unwrap_or(false) && x > 0 {
            x -= 1;
        }
        while x > 0 && !self.tabs.get(x).copied().unwrap_or(false) {
            x -= 1;
        }
        self.x = x;
        self.layer.goto_pos(self.x, self.y);
    }

    // ---- save / restore ----

    pub(crate) fn save_cursor(&self) -> SavedCursor {
        SavedCursor {
            x: self.x,
            y: self.y,
            rend: self.rend,
            slots: self.charsets.slots,
            gl: self.charsets.gl,
            gr_sel: self.charsets.gr_sel,
        }
    }

    pub(crate) fn restore_cursor(&mut self, saved: SavedCursor) {
        self.x = saved.x.min(self.grid.width());
        self.y = saved.y.min(self.grid.height() - 1);
        self.layer.goto_pos(self.x, self.y);
        self.rend = saved.rend;
        self.charsets.slots = saved.slots;
        self.charsets.gl = saved.gl;
        self.charsets.gr_sel = saved.gr_sel;
        self.charsets.ss = 0;
        self.charsets.font_l = self.charsets.slots[self.charsets.gl];
        self.charsets.font_r = self.charsets.slots[self.charsets.gr_sel];
        self.layer.set_rendition(&self.rend);
    }

    // ---- clearing ----

    pub(crate) fn clear_screen(&mut self) {
        let (cols, rows) = (self.grid.width(), self.grid.height());
        let bce = self.rend.bg;
        self.layer
            .clear_area(0, 0, cols - 1, rows - 1, bce, true);
        // The whole screen scrolls off so the content lands in the
        // scrollback.
        let failed = self.grid.scroll_v(
            rows as isize,
            0,
            rows - 1,
            bce,
            self.top == 0,
            self.config.compact_hist,
        );
        self.apply_degrade(failed);
    }

    pub(crate) fn clear_from_bos(&mut self) {
        let (x, y) = (self.x, self.y);
        let bce = self.rend.bg;
        self.layer.clear_area(0, 0, x, y, bce, true);
        let failed = self.grid.clear_area(0, 0, x, y, bce);
        self.apply_degrade(failed);
        self.restore_pos_rendition();
    }

    pub(crate) fn clear_to_eos(&mut self) {
        let (cols, rows) = (self.grid.width(), self.grid.height());
        let (x, y) = (self.x, self.y);
        if x == 0 && y == 0 {
            self.clear_screen();
            self.restore_pos_rendition();
            return;
        }
        let bce = self.rend.bg;
        self.layer.clear_area(x, y, cols - 1, rows - 1, bce, true);
        let failed = self.grid.clear_area(x, y, cols - 1, rows - 1, bce);
        self.apply_degrade(failed);
        self.restore_pos_rendition();
    }

    pub(crate) fn clear_line_region(&mut self, from: usize, to: usize) {
        let y = self.y;
        let bce = self.rend.bg;
        self.layer.clear_area(from, y, to, y, bce, true);
        let failed = self.grid.clear_area(from, y, to, y, bce);
        self.apply_degrade(failed);
        self.restore_pos_rendition();
    }

    // ---- insert / delete ----

    pub(crate) fn insert_char(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        let y = self.y;
        let x = self.x.min(self.grid.width() - 1);
        let bce = self.rend.bg;
        let prev = self.grid.line(y).clone();
        let n = isize::try_from(n).unwrap_or(isize::MAX);
        let failed = self.grid.scroll_h(-n, y, x, self.grid.width() - 1, bce);
        self.apply_degrade(failed);
        self.layer
            .scroll_h(-n, y, x, self.grid.width() - 1, bce, &prev);
        self.layer.goto_pos(x, y);
    }

    pub(crate) fn delete_char(&mut self, n: usize) {
        let y = self.y;
        let x = self.x.min(self.grid.width() - 1);
        let bce = self.rend.bg;
        let prev = self.grid.line(y).clone();
        let n = isize::try_from(n).unwrap_or(isize::MAX);
        let failed = self.grid.scroll_h(n, y, x, self.grid.width() - 1, bce);
        self.apply_degrade(failed);
        self.layer
            .scroll_h(n, y, x, self.grid.width() - 1, bce, &prev);
        self.layer.goto_pos(x, y);
    }

    pub(crate) fn insert_line(&mut self, n: usize) {
        if self.y < self.top || self.y > self.bot {
            return;
        }
        let n = n.min(self.bot - self.y + 1);
        let bce = self.rend.bg;
        let n = isize::try_from(n).unwrap_or(isize::MAX);
        let failed = self.grid.scroll_v(-n, self.y, self.bot, bce, false, false);
        self.apply_degrade(failed);
        self.layer.scroll_v(-n, self.y, self.bot, bce);
        self.layer.goto_pos(self.x, self.y);
    }

    pub(crate) fn delete_line(&mut self, n: usize) {
        if self.y < self.top || self.y > self.bot {
            return;
        }
        let n = n.min(self.bot - self.y + 1);
        let bce = self.rend.bg;
        let push_hist = self.y == self.top;
        let n = isize::try_from(n).unwrap_or(isize::MAX);
        let failed = self.grid.scroll_v(
            n,
            self.y,
            self.bot,
            bce,
            push_hist,
            self.config.compact_hist,
        );
        self.apply_degrade(failed);
        self.layer.scroll_v(n, self.y, self.bot, bce);
        self.layer.goto_pos(self.x, self.y);
    }

    /// SU/SD: shift the scroll region without moving the cursor.
    pub(crate) fn scroll_region_by(&mut self, n: isize) {
        let bce = self.rend.bg;
        let failed = self.grid.scroll_v(
            n,
            self.top,
            self.bot,
            bce,
            n > 0,
            self.config.compact_hist,
        );
        self.apply_degrade(failed);
        self.layer.scroll_v(n, self.top, self.bot, bce);
        self.layer.goto_pos(self.x, self.y);
    }

    /// DECALN: fill the screen with `E` in default rendition.
    pub(crate) fn fill_with_es(&mut self) {
        self.layer.clear_all(true);
        self.x = 0;
        self.y = 0;
        let cols = self.grid.width();
        for y in 0..self.grid.height() {
            let ml = self.grid.line_mut(y);
            ml.clear_all();
            for x in 0..cols {
                ml.set_cell(x, &Cell {
                    image: u32::from(b'E'),
                    ..Cell::BLANK
                });
            }
        }
        self.layer.refresh_all(true);
    }

    // ---- alternate screen ----

    pub(crate) fn enter_alt_screen(&mut self) {
        if self.alt.on {
            return;
        }
        let (cols, rows) = (self.grid.width(), self.grid.height());
        if self.alt.lines.len() != rows
            || self.alt.lines.first().is_some_and(|ml| ml.width() != cols)
        {
            self.alt.lines = self.grid.blank_screen();
            self.alt.hist = Vec::new();
            self.alt.hist_idx = 0;
        } else {
            for ml in &mut self.alt.lines {
                ml.clear_all();
            }
        }
        self.grid
            .swap_screen(&mut self.alt.lines, &mut self.alt.hist, &mut self.alt.hist_idx);
        self.alt.on = true;
    }

    pub(crate) fn leave_alt_screen(&mut self) {
        if !self.alt.on {
            return;
        }
        self.grid
            .swap_screen(&mut self.alt.lines, &mut self.alt.hist, &mut self.alt.hist_idx);
        self.alt.on = false;
    }

    // ---- degraded channels ----

    pub(crate) fn apply_degrade(&mut self, failed: ChannelSet) {
        if failed.is_empty() {
            return;
        }
        if failed.contains(ChannelSet::ATTR) {
            self.rend.attr = Attr::empty();
        }
        if failed.contains(ChannelSet::FONT) {
            let gl = self.charsets.effective_gl();
            self.charsets.slots[gl] = charset::ASCII;
            self.charsets.font_l = 0;
            let gr = if self.charsets.ss != 0 {
                self.charsets.ss
            } else {
                self.charsets.gr_sel
            };
            self.charsets.slots[gr] = charset::ASCII;
            self.charsets.font_r = 0;
            self.rend.font = 0;
            self.rend.fontx = 0;
        }
        if failed.contains(ChannelSet::FONTX) {
            self.rend.fontx = 0;
        }
        if failed.contains(ChannelSet::FG) {
            self.rend.fg = Color::DEFAULT;
        }
        if failed.contains(ChannelSet::BG) {
            self.rend.bg = Color::DEFAULT;
        }
        let new = failed - self.degraded;
        if new.is_empty() {
            return;
        }
        self.degraded |= new;
        for (flag, what) in [
            (ChannelSet::ATTR, "attr"),
            (ChannelSet::FONT, "font"),
            (ChannelSet::FG, "color foreground"),
            (ChannelSet::BG, "color background"),
        ] {
            if new.contains(flag) {
                tracing::warn!(channel = what, "no space for line channel, turned off");
                self.layer
                    .message(&format!("Warning: no space for {what} - turned off"));
            }
        }
    }

    // ---- charset plumbing ----

    pub(crate) fn designate_charset(&mut self, c: u8, slot: usize) {
        let mut c = c;
        self.charsets.ss = 0;
        if c == b'@' & 0x1f {
            // JIS 6226 maps to the 0208 set.
            c = KANJI;
        }
        if c == b'B' {
            c = charset::ASCII;
        }
        if self.charsets.slots[slot] != c {
            self.charsets.slots[slot] = c;
            if self.charsets.gl == slot {
                self.charsets.font_l = c;
                self.rend.font = c;
                self.layer.set_rendition(&self.rend);
            }
            if self.charsets.gr_sel == slot {
                self.charsets.font_r = c;
            }
        }
    }

    pub(crate) fn map_charset(&mut self, slot: usize) {
        self.charsets.ss = 0;
        if self.charsets.gl != slot {
            self.charsets.gl = slot;
            self.charsets.font_l = self.charsets.slots[slot];
            self.rend.font = self.charsets.font_l;
            self.layer.set_rendition(&self.rend);
        }
    }

    pub(crate) fn map_charset_r(&mut self, slot: usize) {
        self.charsets.ss = 0;
        if self.charsets.gr_sel != slot {
            self.charsets.gr_sel = slot;
            self.charsets.font_r = self.charsets.slots[slot];
        }
        self.charsets.gr = 1;
    }

    pub(crate) fn single_shift(&mut self, slot: usize) {
        let cs = &mut self.charsets;
        if cs.slots[cs.gl] != cs.slots[slot] || cs.slots[cs.gr_sel] != cs.slots[slot] {
            cs.ss = slot;
            cs.font_l = cs.slots[slot];
            cs.font_r = cs.slots[slot];
        } else {
            cs.ss = 0;
        }
    }

    // ---- reports ----

    pub(crate) fn report(&mut self, bytes: &[u8]) {
        self.reports.push(bytes);
    }

    // ---- printing ----

    pub(crate) fn print_start(&mut self) {
        self.parser.state = State::Print;
    }

    pub(crate) fn print_char(&mut self, b: u8) {
        if let Some(disposition) = self.printer.push(b) {
            self.handle_print_disposition(disposition);
        }
    }

    pub(crate) fn flush_print(&mut self) {
        let disposition = self.printer.flush();
        self.handle_print_disposition(disposition);
    }

    fn handle_print_disposition(&mut self, disposition: FlushDisposition) {
        match disposition {
            FlushDisposition::Done => {}
            FlushDisposition::SinkFailed(e) => {
                tracing::warn!(error = %e, "print sink failed, printing disabled");
                self.layer.message("printing aborted");
            }
            FlushDisposition::ToDisplay(data) => {
                if let Err(e) = self.layer.print_through(&data) {
                    tracing::warn!(error = %e, "print-through failed, printing disabled");
                    self.printer.target = PrintTarget::Disabled;
                    self.layer.message("printing aborted");
                }
            }
        }
    }

    // ---- auto title ----

    pub(crate) fn find_aka(&mut self) {
        let cols = self.grid.width();
        let rows = self.grid.height();
        let prefix: Vec<u32> = self.title.auto_prefix.bytes().map(u32::from).collect();
        let plen = prefix.len();
        let auto = self.title.auto_line;
        let mut y = if auto > 0 && (auto as usize) <= rows {
            auto as usize - 1
        } else {
            self.y
        };
        let mut cp = 0usize;
        if auto > 0 && plen > 0 {
            'try_line: loop {
                if cols < plen {
                    return;
                }
                cp = 0;
                loop {
                    if cp >= cols - plen {
                        y += 1;
                        if y == auto as usize && y < rows {
                            continue 'try_line;
                        }
                        return;
                    }
                    let line = self.grid.line(y);
                    if (0..plen).all(|k| line.cell_at(cp + k).image == prefix[k]) {
                        break 'try_line;
                    }
                    cp += 1;
                }
            }
            cp += plen;
        }

        let token = {
            let line = self.grid.line(y);
            let mut len = cols - cp;
            while len > 0 && line.cell_at(cp).image == u32::from(b' ') {
                cp += 1;
                len -= 1;
            }
            if len == 0 {
                self.title.auto_line = 0;
                return;
            }
            let first = line.cell_at(cp).image;
            if auto > 0 && matches!(first, 0x21 | 0x25 | 0x5e) {
                // A `!`, `%` or `^` prompt defers to the next line.
                self.title.auto_line = -1;
            } else {
                self.title.auto_line = 0;
            }
            let mut start = cp;
            while len > 0 && line.cell_at(cp).image != u32::from(b' ') {
                if line.cell_at(cp).image == u32::from(b'/') {
                    start = cp + 1;
                }
                cp += 1;
                len -= 1;
            }
            (start..cp)
                .map(|x| char::from_u32(line.cell_at(x).image).unwrap_or(' '))
                .collect::<String>()
        };
        self.change_title(&token);
    }
}
