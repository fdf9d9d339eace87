//! End-to-end emulator tests: byte streams in, grid state and reports
//! out.

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use vtemu::{EmulatorConfig, Encoding, Layer, TerminalEmulator, WriteOutcome};
use vtgrid::{Attr, Color};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn emu() -> TerminalEmulator {
    init_tracing();
    TerminalEmulator::new(80, 24, 100, EmulatorConfig::default())
}

fn emu_sized(cols: usize, rows: usize) -> TerminalEmulator {
    TerminalEmulator::new(cols, rows, 100, EmulatorConfig::default())
}

fn emu_ascii() -> TerminalEmulator {
    TerminalEmulator::new(
        80,
        24,
        100,
        EmulatorConfig {
            encoding: Encoding::Ascii,
            ..EmulatorConfig::default()
        },
    )
}

fn row_text<L: Layer>(emu: &TerminalEmulator<L>, y: usize) -> String {
    let grid = emu.grid();
    (0..grid.width())
        .map(|x| char::from_u32(grid.cell_at(x, y).image).unwrap_or('\u{fffd}'))
        .collect::<String>()
        .trim_end()
        .to_string()
}

fn screen_text<L: Layer>(emu: &TerminalEmulator<L>) -> Vec<String> {
    (0..emu.grid().height()).map(|y| row_text(emu, y)).collect()
}

/// Layer probe used by the suspension and print tests.
#[derive(Default)]
struct Probe {
    printed: Arc<Mutex<Vec<u8>>>,
    titles: Arc<Mutex<Vec<String>>>,
    statuses: Arc<Mutex<Vec<String>>>,
    suspend_on_status: bool,
}

impl Layer for Probe {
    fn status_message(&mut self, msg: &str) -> bool {
        self.statuses.lock().unwrap().push(msg.to_string());
        self.suspend_on_status
    }

    fn title_changed(&mut self, title: &str) {
        self.titles.lock().unwrap().push(title.to_string());
    }

    fn print_through(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.printed.lock().unwrap().extend_from_slice(data);
        Ok(())
    }
}

// ---- spec scenarios ----

#[test]
fn test_plain_text() {
    let mut t = emu();
    t.write_bytes(b"ABC");
    assert_eq!(row_text(&t, 0), "ABC");
    assert_eq!(t.cursor(), (3, 0));
}

#[test]
fn test_sgr_fg_and_reset() {
    let mut t = emu();
    t.write_bytes(b"\x1b[31mX\x1b[0mY");
    let x = t.grid().cell_at(0, 0);
    assert_eq!(x.image, u32::from(b'X'));
    assert_eq!(x.fg, Color::indexed(1));
    let y = t.grid().cell_at(1, 0);
    assert_eq!(y.image, u32::from(b'Y'));
    assert_eq!(y.fg, Color::DEFAULT);
    assert_eq!(t.cursor(), (2, 0));
}

#[test]
fn test_cursor_address_and_write() {
    let mut t = emu();
    t.write_bytes(b"\x1b[10;5H*");
    assert_eq!(t.grid().cell_at(4, 9).image, u32::from(b'*'));
    assert_eq!(t.cursor(), (5, 9));
}

#[test]
fn test_clear_display_keeps_cursor_and_rendition() {
    let mut t = emu();
    t.write_bytes(b"junk\x1b[5;5H\x1b[1;31m");
    t.write_bytes(b"\x1b[2J");
    for row in screen_text(&t) {
        assert_eq!(row, "");
    }
    assert_eq!(t.cursor(), (4, 4));
    assert_eq!(t.rendition().attr, Attr::BOLD);
    assert_eq!(t.rendition().fg, Color::indexed(1));
}

#[test]
fn test_alt_screen_preserves_primary() {
    let mut t = emu();
    t.write_bytes(b"pq");
    let before = screen_text(&t);
    t.write_bytes(b"\x1b[?1049h");
    assert!(t.alt_screen_active());
    t.write_bytes(b"hi");
    assert_eq!(t.grid().cell_at(2, 0).image, u32::from(b'h'));
    assert_eq!(t.grid().cell_at(3, 0).image, u32::from(b'i'));
    t.write_bytes(b"\x1b[?1049l");
    assert!(!t.alt_screen_active());
    assert_eq!(screen_text(&t), before);
    assert_eq!(t.cursor(), (2, 0));
}

#[test]
fn test_cursor_position_report() {
    let mut t = emu();
    t.write_bytes(b"\x1b[10;5H\x1b[6n");
    assert_eq!(t.take_reports(), b"\x1b[10;5R".to_vec());
}

#[test]
fn test_utf8_wide_char() {
    let mut t = emu();
    t.write_bytes("\u{4e16}".as_bytes());
    let left = t.grid().cell_at(0, 0);
    assert_eq!(left.image, 0x4e16);
    assert!(left.is_wide());
    assert!(t.grid().line(0).is_wide_right(1));
    assert_eq!(t.cursor(), (2, 0));
}

// ---- spec invariants ----

#[test]
fn test_cursor_bounds_under_hostile_input() {
    let mut t = emu();
    // Deterministic pseudo-random bytes, biased toward control bytes.
    let mut state = 0x2545_f491_4f6c_dd1du64;
    let mut next = move || {
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        (state >> 33) as u8
    };
    let mut buf = Vec::new();
    for _ in 0..20_000 {
        let b = next();
        buf.push(match b % 7 {
            0 => 0x1b,
            1 => b'[',
            2 => b % 0x20,
            _ => b,
        });
    }
    for chunk in buf.chunks(7) {
        t.write_bytes(chunk);
        let (w, h) = (t.grid().width(), t.grid().height());
        let (x, y) = t.cursor();
        let (top, bot) = t.scroll_region();
        assert!(x <= w);
        assert!(y < h);
        assert!(top <= bot && bot < h);
    }
}

#[test]
fn test_wide_pairs_never_split() {
    let mut t = emu_sized(10, 4);
    // Overlapping wide writes, wraps, inserts and clears.
    t.write_bytes("\u{4e16}\u{754c}a\u{4e16}".as_bytes());
    t.write_bytes(b"\x1b[1;2H*");
    t.write_bytes("\x1b[2;1H\u{4e16}\x1b[2;2H\u{754c}".as_bytes());
    t.write_bytes(b"\x1b[2;1H\x1b[2@");
    t.write_bytes(b"\x1b[K");
    let grid = t.grid();
    for y in 0..grid.height() {
        let line = grid.line(y);
        for x in 0..grid.width() {
            if line.is_wide_left(x) {
                assert!(line.is_wide_right(x + 1), "orphan left half at ({x},{y})");
            }
            if line.is_wide_right(x) {
                assert!(x > 0 && line.is_wide_left(x - 1), "orphan right half at ({x},{y})");
            }
        }
    }
}

#[test]
fn test_designated_charset_reaches_cells() {
    let mut t = emu_ascii();
    t.write_bytes(b"\x1b(0a");
    assert_eq!(t.grid().cell_at(0, 0).font, b'0');
    // Shift-in G1 line drawing via SO.
    let mut t = emu_ascii();
    t.write_bytes(b"\x1b)0\x0ea\x0fb");
    assert_eq!(t.grid().cell_at(0, 0).font, b'0');
    assert_eq!(t.grid().cell_at(1, 0).font, 0);
}

#[test]
fn test_save_restore_roundtrip() {
    let mut t = emu_ascii();
    t.write_bytes(b"\x1b[5;7H\x1b[1;33;44m\x1b)0\x0e");
    let x = t.cursor();
    let rend = *t.rendition();
    let cs = *t.charsets();
    t.write_bytes(b"\x1b7");
    t.write_bytes(b"\x1b[H\x1b[0m\x1b(B\x0fmore text\x1b[2J\x1b[33;20H");
    t.write_bytes(b"\x1b8");
    assert_eq!(t.cursor(), x);
    assert_eq!(*t.rendition(), rend);
    assert_eq!(t.charsets().slots, cs.slots);
    assert_eq!(t.charsets().gl, cs.gl);
    assert_eq!(t.charsets().gr_sel, cs.gr_sel);
}

#[test]
fn test_overlarge_scroll_equals_full_clear() {
    let mut t = emu_sized(10, 6);
    for i in 0..6 {
        t.write_bytes(format!("\x1b[{};1Hrow{i}", i + 1).as_bytes());
    }
    t.write_bytes(b"\x1b[2;5r\x1b[99S");
    assert_eq!(row_text(&t, 0), "row0");
    for y in 1..5 {
        assert_eq!(row_text(&t, y), "");
    }
    assert_eq!(row_text(&t, 5), "row5");
}

#[test]
fn test_alt_screen_toggle_is_involution() {
    let mut t = emu();
    t.write_bytes(b"\x1b[31mcolored\x1b[0m\r\nplain");
    let before = screen_text(&t);
    let cell_before = t.grid().cell_at(0, 0);
    for _ in 0..3 {
        t.write_bytes(b"\x1b[?47hgarbage on alt\x1b[?47l");
    }
    assert_eq!(screen_text(&t), before);
    assert_eq!(t.grid().cell_at(0, 0), cell_before);
}

#[test]
fn test_dec_alignment_fill() {
    let mut t = emu_sized(10, 4);
    t.write_bytes(b"\x1b[1;31mxyz");
    t.write_bytes(b"\x1b#8");
    let grid = t.grid();
    for y in 0..4 {
        for x in 0..10 {
            let c = grid.cell_at(x, y);
            assert_eq!(c.image, u32::from(b'E'));
            assert_eq!(c.attr, Attr::empty());
            assert_eq!(c.fg, Color::DEFAULT);
            assert_eq!(c.bg, Color::DEFAULT);
        }
    }
    assert_eq!(t.cursor(), (0, 0));
}

#[test]
fn test_utf8_split_delivery_matches_whole() {
    let text = "ab\u{4e16}\u{754c}c\u{e9}\u{1f600}d".as_bytes();
    let mut whole = emu();
    whole.write_bytes(text);
    let expect = screen_text(&whole);
    for split in 0..=text.len() {
        let mut t = emu();
        t.write_bytes(&text[..split]);
        t.write_bytes(&text[split..]);
        assert_eq!(screen_text(&t), expect, "split at {split}");
        assert_eq!(t.cursor(), whole.cursor(), "split at {split}");
    }
}

// ---- motion, wrap, scrolling ----

#[test]
fn test_deferred_wrap() {
    let mut t = emu();
    t.write_bytes(&[b'A'; 80]);
    // The 80th glyph fills the line but the wrap is deferred.
    assert_eq!(t.cursor(), (80, 0));
    t.write_bytes(b"B");
    assert_eq!(t.cursor(), (1, 1));
    assert_eq!(t.grid().cell_at(0, 1).image, u32::from(b'B'));
    assert_eq!(t.grid().cell_at(79, 0).image, u32::from(b'A'));
}

#[test]
fn test_wrap_disabled_overwrites_last_column() {
    let mut t = emu();
    t.write_bytes(b"\x1b[?7l");
    t.write_bytes(&[b'A'; 82]);
    assert_eq!(t.cursor(), (79, 0));
    assert_eq!(row_text(&t, 1), "");
}

#[test]
fn test_linefeed_at_bottom_scrolls_into_history() {
    let mut t = emu_sized(10, 3);
    t.write_bytes(b"one\r\ntwo\r\nthree\r\nfour");
    assert_eq!(row_text(&t, 0), "two");
    assert_eq!(row_text(&t, 2), "four");
    let hist = t.grid().hist_line(0);
    let first: String = (0..3)
        .map(|x| char::from_u32(hist.cell_at(x).image).unwrap())
        .collect();
    assert_eq!(first, "one");
}

#[test]
fn test_scroll_region_constrains_linefeed() {
    let mut t = emu_sized(10, 6);
    for i in 0..6 {
        t.write_bytes(format!("\x1b[{};1Hr{i}", i + 1).as_bytes());
    }
    // Region rows 2..4; cursor to its bottom, then LF.
    t.write_bytes(b"\x1b[2;4r\x1b[4;1H\n");
    assert_eq!(row_text(&t, 0), "r0");
    assert_eq!(row_text(&t, 1), "r2");
    assert_eq!(row_text(&t, 2), "r3");
    assert_eq!(row_text(&t, 3), "");
    assert_eq!(row_text(&t, 4), "r4");
    assert_eq!(row_text(&t, 5), "r5");
}

#[test]
fn test_reverse_linefeed_at_top_scrolls_down() {
    let mut t = emu_sized(10, 3);
    t.write_bytes(b"a\r\nb\r\nc\x1b[1;1H\x1bM");
    assert_eq!(row_text(&t, 0), "");
    assert_eq!(row_text(&t, 1), "a");
    assert_eq!(row_text(&t, 2), "b");
}

#[test]
fn test_origin_mode_addresses_relative_to_region() {
    let mut t = emu_sized(10, 10);
    t.write_bytes(b"\x1b[3;8r\x1b[?6h");
    // Home under origin mode is the region top.
    assert_eq!(t.cursor(), (0, 2));
    t.write_bytes(b"\x1b[2;1HX");
    assert_eq!(t.grid().cell_at(0, 3).image, u32::from(b'X'));
    // Addressing clamps to the region bottom.
    t.write_bytes(b"\x1b[99;1HY");
    assert_eq!(t.grid().cell_at(0, 7).image, u32::from(b'Y'));
    // VPA resolves relative to the region top and clamps to its
    // bottom, like H.
    t.write_bytes(b"\x1b[1d\x1b[1GV");
    assert_eq!(t.cursor(), (1, 2));
    assert_eq!(t.grid().cell_at(0, 2).image, u32::from(b'V'));
    t.write_bytes(b"\x1b[99d\x1b[1GW");
    assert_eq!(t.grid().cell_at(0, 7).image, u32::from(b'W'));
    // CNL stays pinned at the region bottom.
    t.write_bytes(b"\x1b[99E");
    assert_eq!(t.cursor(), (0, 7));
}

#[test]
fn test_cursor_motion_clamps() {
    let mut t = emu_sized(10, 5);
    t.write_bytes(b"\x1b[99A\x1b[99D");
    assert_eq!(t.cursor(), (0, 0));
    t.write_bytes(b"\x1b[99B\x1b[99C");
    assert_eq!(t.cursor(), (9, 4));
}

#[test]
fn test_tabs_and_tab_clear() {
    let mut t = emu();
    t.write_bytes(b"\tX");
    assert_eq!(t.grid().cell_at(8, 0).image, u32::from(b'X'));
    // CBT back to the stop, set a custom stop, clear all stops.
    t.write_bytes(b"\r\x1b[5G\x1bH\r\t");
    assert_eq!(t.cursor(), (4, 0));
    t.write_bytes(b"\x1b[3g\r\t");
    assert_eq!(t.cursor(), (79, 0));
}

#[test]
fn test_insert_and_delete() {
    let mut t = emu_sized(10, 3);
    t.write_bytes(b"abcdef\x1b[1;3H\x1b[2@");
    assert_eq!(row_text(&t, 0), "ab  cdef");
    t.write_bytes(b"\x1b[2P");
    assert_eq!(row_text(&t, 0), "abcdef");
    t.write_bytes(b"\x1b[4h\x1b[1;1HXY");
    assert_eq!(row_text(&t, 0), "XYabcdef");
    t.write_bytes(b"\x1b[4l");
    t.write_bytes(b"\x1b[2;1Hp\r\x1b[1Lq");
    assert_eq!(row_text(&t, 1), "q");
    assert_eq!(row_text(&t, 2), "p");
    t.write_bytes(b"\x1b[1M");
    assert_eq!(row_text(&t, 1), "p");
}

#[test]
fn test_erase_character() {
    let mut t = emu_sized(10, 2);
    t.write_bytes(b"abcdef\x1b[1;2H\x1b[3X");
    assert_eq!(row_text(&t, 0), "a   ef");
    assert_eq!(t.cursor(), (1, 0));
}

#[test]
fn test_bce_fills_background() {
    let mut t = emu_sized(10, 2);
    t.write_bytes(b"\x1b[44mabc\x1b[1;1H\x1b[K");
    for x in 0..10 {
        assert_eq!(t.grid().cell_at(x, 0).bg, Color::indexed(4), "col {x}");
        assert_eq!(t.grid().cell_at(x, 0).attr, Attr::empty());
    }
}

// ---- reports ----

#[test]
fn test_device_attributes() {
    let mut t = emu();
    t.write_bytes(b"\x1b[c");
    assert_eq!(t.take_reports(), b"\x1b[?1;2c".to_vec());
    t.write_bytes(b"\x1bZ");
    assert_eq!(t.take_reports(), b"\x1b[?1;2c".to_vec());
    t.write_bytes(b"\x1b[>c");
    assert_eq!(t.take_reports(), b"\x1b[>83;40900;0c".to_vec());
    t.write_bytes(b"\x1b[5n");
    assert_eq!(t.take_reports(), b"\x1b[0n".to_vec());
    t.write_bytes(b"\x1b[x");
    assert_eq!(t.take_reports(), b"\x1b[2;1;1;112;112;1;0x".to_vec());
}

#[test]
fn test_title_report() {
    let mut t = emu();
    t.write_bytes(b"\x1bkshell\x1b\\");
    assert_eq!(t.title(), "shell");
    t.write_bytes(b"\x1b[21t");
    assert_eq!(t.take_reports(), b"\x1b]lshell\x1b\\".to_vec());
}

// ---- modes ----

#[test]
fn test_mode_flags_track() {
    let mut t = emu();
    t.write_bytes(b"\x1b[?1h\x1b[?25l\x1b[?2004h\x1b[?1002h\x1b=");
    assert!(t.modes().cursorkeys);
    assert!(t.modes().curinv);
    assert!(t.modes().bracketed);
    assert!(t.modes().keypad);
    assert_eq!(t.modes().mouse, 1002);
    t.write_bytes(b"\x1b[?1002l\x1b[?2004l");
    assert_eq!(t.modes().mouse, 0);
    assert!(!t.modes().bracketed);
}

#[test]
fn test_deccolm_resizes_and_clears() {
    let mut t = emu();
    t.write_bytes(b"junk\x1b[?3h");
    assert_eq!(t.grid().width(), 132);
    assert_eq!(t.cursor(), (0, 0));
    assert_eq!(row_text(&t, 0), "");
    t.write_bytes(b"\x1b[?3l");
    assert_eq!(t.grid().width(), 80);
}

#[test]
fn test_full_reset() {
    let mut t = emu();
    t.write_bytes(b"\x1b[1;31m\x1b[5;20r\x1b[?6h\x1b[4h");
    t.write_bytes(b"\x1bc");
    assert_eq!(t.rendition().attr, Attr::empty());
    assert_eq!(t.scroll_region(), (0, 23));
    assert!(!t.modes().origin);
    assert!(!t.modes().insert);
}

// ---- control strings ----

#[test]
fn test_osc_title_with_st_and_bel() {
    let mut t = emu();
    t.write_bytes(b"\x1b]2;with st\x1b\\");
    assert_eq!(t.osc_string(0), "with st");
    assert_eq!(t.hardstatus(), Some("with st"));
    t.write_bytes(b"\x1b]2;with bel\x07");
    assert_eq!(t.osc_string(0), "with bel");
    assert_eq!(t.hardstatus(), Some("with bel"));
}

#[test]
fn test_osc_slots() {
    let mut t = emu();
    t.write_bytes(b"\x1b]39;color\x1b\\");
    assert_eq!(t.osc_string(2), "color");
    // Type 39 does not touch the hardstatus.
    assert_eq!(t.hardstatus(), None);
}

#[test]
fn test_apc_hardstatus() {
    let mut t = emu();
    t.write_bytes(b"\x1b_status line\x1b\\");
    assert_eq!(t.hardstatus(), Some("status line"));
    t.write_bytes(b"\x1b_\x1b\\");
    assert_eq!(t.hardstatus(), None);
}

#[test]
fn test_osc_ignored_without_semicolon() {
    let mut t = emu();
    t.write_bytes(b"\x1b]2junk\x1b\\x");
    assert_eq!(t.hardstatus(), None);
    assert_eq!(t.grid().cell_at(0, 0).image, u32::from(b'x'));
}

#[test]
fn test_esc_inside_string_kept() {
    let mut t = emu();
    t.write_bytes(b"\x1b_a\x1bzb\x1b\\");
    assert_eq!(t.hardstatus(), Some("a\x1bzb"));
}

#[test]
fn test_status_message_suspends_parse() {
    let probe = Probe {
        suspend_on_status: true,
        ..Probe::default()
    };
    let statuses = probe.statuses.clone();
    let mut t =
        TerminalEmulator::with_layer(80, 24, 0, EmulatorConfig::default(), probe);
    let outcome = t.write_bytes(b"\x1b^note\x1b\\tail");
    assert_eq!(outcome, WriteOutcome::Suspended);
    assert_eq!(statuses.lock().unwrap().as_slice(), ["note"]);
    // The tail was not parsed yet.
    assert_eq!(row_text(&t, 0), "");
    assert_eq!(t.resume_pending(), WriteOutcome::Complete);
    assert_eq!(row_text(&t, 0), "tail");
}

#[test]
fn test_overlong_string_aborts_to_literal() {
    let mut t = emu();
    let mut seq = b"\x1b]2;".to_vec();
    seq.extend_from_slice(&vec![b'a'; 400]);
    t.write_bytes(&seq);
    // The tail of the overlong string prints as literal text.
    assert!(row_text(&t, 0).starts_with('a'));
}

#[test]
fn test_parser_status_dump() {
    let mut t = emu();
    t.write_bytes(b"\x1b]2;ti");
    assert_eq!(t.parser_status().as_deref(), Some("ASTR-OSC"));
    t.write_bytes(b"tle\x1b\\");
    assert_eq!(t.parser_status(), None);
}

// ---- printer ----

#[test]
fn test_print_through_capture() {
    let probe = Probe::default();
    let printed = probe.printed.clone();
    let mut t =
        TerminalEmulator::with_layer(80, 24, 0, EmulatorConfig::default(), probe);
    t.write_bytes(b"before\x1b[5ipayload\x1b[4iafter");
    assert_eq!(printed.lock().unwrap().as_slice(), b"payload");
    assert_eq!(row_text(&t, 0), "beforeafter");
}

#[test]
fn test_print_sink_receives_output() {
    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);
    impl std::io::Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
    let sink = Shared::default();
    let out = sink.clone();
    let mut t = emu();
    t.set_print_sink(Some(Box::new(sink)));
    t.write_bytes(b"\x1b[5idata\x1b[4i");
    assert_eq!(out.0.lock().unwrap().as_slice(), b"data");
}

// ---- logging ----

#[test]
fn test_log_tee_sees_raw_bytes() {
    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);
    impl std::io::Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
    let sink = Shared::default();
    let out = sink.clone();
    let mut t = emu();
    t.set_log_sink(Some(Box::new(sink)));
    t.write_bytes(b"raw \x1b[31m bytes");
    assert_eq!(out.0.lock().unwrap().as_slice(), b"raw \x1b[31m bytes");
}

// ---- decoding ----

#[test]
fn test_invalid_utf8_yields_replacement_and_retries() {
    let mut t = emu();
    t.write_bytes(&[0xc3, b'A']);
    assert_eq!(t.grid().cell_at(0, 0).image, 0xfffd);
    assert_eq!(t.grid().cell_at(1, 0).image, u32::from(b'A'));
}

#[test]
fn test_combining_mark_folds_into_base() {
    let mut t = emu();
    t.write_bytes("a\u{0301}".as_bytes());
    assert_eq!(t.grid().cell_at(0, 0).image, u32::from('\u{e1}'));
    assert_eq!(t.cursor(), (1, 0));
}

#[test]
fn test_combining_mark_after_wide_char() {
    let mut t = emu();
    t.write_bytes("\u{304b}\u{3099}".as_bytes());
    // か + combining dakuten composes to が on the base cell.
    assert_eq!(t.grid().cell_at(0, 0).image, u32::from('\u{304c}'));
    assert!(t.grid().line(0).is_wide_right(1));
    assert_eq!(t.cursor(), (2, 0));
}

#[test]
fn test_wide_char_at_margin_wraps_whole() {
    let mut t = emu_sized(10, 3);
    t.write_bytes(b"123456789");
    t.write_bytes("\u{4e16}".as_bytes());
    // No room for both halves: the wide char wraps to the next row.
    assert_eq!(t.grid().cell_at(0, 1).image, 0x4e16);
    assert!(t.grid().line(1).is_wide_right(1));
}

#[test]
fn test_sjis_pair_maps_to_euc_cell() {
    let mut t = TerminalEmulator::new(
        80,
        24,
        0,
        EmulatorConfig {
            encoding: Encoding::Sjis,
            c1: false,
            ..EmulatorConfig::default()
        },
    );
    t.write_bytes(&[0x88, 0xa1]);
    let c = t.grid().cell_at(0, 0);
    assert_eq!(c.image, 0x30);
    assert_eq!(c.trail, 0x23);
    assert_eq!(c.font, vtemu::charset::KANJI);
    assert!(t.grid().line(0).is_wide_right(1));
    assert_eq!(t.cursor(), (2, 0));
}

#[test]
fn test_euc_pair() {
    let mut t = TerminalEmulator::new(
        80,
        24,
        0,
        EmulatorConfig {
            encoding: Encoding::EucJp,
            c1: false,
            ..EmulatorConfig::default()
        },
    );
    t.write_bytes(&[0xb0, 0xa1]);
    let c = t.grid().cell_at(0, 0);
    assert_eq!(c.image, 0x30);
    assert_eq!(c.trail, 0x21);
    assert_eq!(c.font, vtemu::charset::KANJI);
    assert_eq!(t.cursor(), (2, 0));
}

#[test]
fn test_c1_csi() {
    let mut t = emu();
    // In UTF-8 the 8-bit CSI arrives as the two-byte form of U+009B.
    t.write_bytes(b"\xc2\x9b31m");
    t.write_bytes(b"X");
    assert_eq!(t.grid().cell_at(0, 0).fg, Color::indexed(1));
}

// ---- parse recovery ----

#[test]
fn test_invalid_esc_retries_byte() {
    let mut t = emu();
    // 0x01 is out of class in ESC state; it must drop to ground and be
    // retried (here: ignored as a control), then text continues.
    t.write_bytes(b"\x1b\x01ok");
    assert_eq!(row_text(&t, 0), "ok");
}

#[test]
fn test_invalid_csi_retries_byte() {
    let mut t = emu();
    t.write_bytes(&[0x1b, b'[', b'1', 0x18, b'z']);
    // CAN drops the CSI and is retried as a (meaningless) control;
    // 'z' then prints as plain text.
    assert_eq!(row_text(&t, 0), "z");
}

#[test]
fn test_second_intermediate_poisons_csi() {
    let mut t = emu();
    t.write_bytes(b"\x1b[?$mX");
    // The poisoned sequence is ignored entirely.
    assert_eq!(t.rendition().fg, Color::DEFAULT);
    assert_eq!(row_text(&t, 0), "X");
}

// ---- auto title ----

#[test]
fn test_auto_title_from_prompt_line() {
    let probe = Probe::default();
    let titles = probe.titles.clone();
    let mut t =
        TerminalEmulator::with_layer(80, 24, 0, EmulatorConfig::default(), probe);
    t.write_bytes(b"$ ");
    t.set_title_prefix("$ ");
    t.write_bytes(b"\rrerun$ /usr/bin/vim notes.txt");
    t.write_bytes(b"\n");
    assert_eq!(t.title(), "vim");
    assert_eq!(titles.lock().unwrap().last().map(String::as_str), Some("vim"));
}

#[test]
fn test_empty_aka_rearms_auto_title() {
    let mut t = emu();
    t.write_bytes(b"\x1bkold\x1b\\");
    assert_eq!(t.title(), "old");
    t.write_bytes(b"\x1bk\x1b\\make target\n");
    assert_eq!(t.title(), "make");
}

// ---- resize ----

#[test]
fn test_resize_via_window_op() {
    let mut t = emu();
    t.write_bytes(b"keep\x1b[8;10;40t");
    assert_eq!(t.grid().width(), 40);
    assert_eq!(t.grid().height(), 10);
    assert_eq!(row_text(&t, 0), "keep");
    assert_eq!(t.scroll_region(), (0, 9));
}

#[test]
fn test_resize_rejects_absurd_sizes() {
    let mut t = emu();
    t.write_bytes(b"\x1b[8;99999;99999t");
    assert_eq!(t.grid().width(), 80);
    assert_eq!(t.grid().height(), 24);
}
