//! Emulator configuration.

use std::time::Duration;

use crate::decode::Encoding;

/// Timestamp stamping for the log tee.
///
/// After `after` of write silence the next log write is preceded by
/// `stamp`. Formatting of the stamp itself is the caller's business; it
/// is written verbatim.
#[derive(Debug, Clone)]
pub struct LogTimestamps {
    pub after: Duration,
    pub stamp: String,
}

/// Process-wide toggles, fixed before the first byte is parsed.
///
/// These correspond to the knobs a multiplexer configures once at
/// startup; the emulator never mutates them.
#[derive(Debug, Clone)]
pub struct EmulatorConfig {
    /// Honor the xterm alternate-screen modes (47/1047/1049).
    pub use_altscreen: bool,
    /// Store hardstatus strings received via APC (and title OSCs).
    pub use_hardstatus: bool,
    /// Deliver BEL as a visual bell instead of an audible one.
    pub visual_bell: bool,
    /// Trim trailing blank lines from scroll-off regions before they
    /// reach the scrollback ring.
    pub compact_hist: bool,
    /// Flush the log sink after every write.
    pub log_flush: bool,
    /// Optional timestamp stamping for the log sink.
    pub log_timestamps: Option<LogTimestamps>,
    /// Default tab stop interval.
    pub tab_interval: usize,
    /// Version number reported by secondary DA.
    pub nversion: u32,
    /// Initial encoding.
    pub encoding: Encoding,
    /// Accept 8-bit C1 controls.
    pub c1: bool,
    /// Initial GR mapping state.
    pub gr: u8,
    /// Initial charset designations, in `set_charsets` syntax, applied
    /// on top of the `"BBBB02"` baseline.
    pub charset: Option<String>,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        EmulatorConfig {
            use_altscreen: true,
            use_hardstatus: true,
            visual_bell: false,
            compact_hist: false,
            log_flush: true,
            log_timestamps: None,
            tab_interval: 8,
            nversion: 40_900,
            encoding: Encoding::Utf8,
            c1: true,
            gr: 0,
            charset: None,
        }
    }
}
