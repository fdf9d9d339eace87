//! Window title state, including the auto-inferred ("AKA") title.
//!
//! A title arrives explicitly (`ESC k ... ST`, OSC, or the public API)
//! or is inferred from screen content: after a prompt whose text is the
//! configured prefix, the first whitespace-delimited token on the line
//! becomes the title. The scan itself lives in the emulator, which owns
//! the grid.

/// Maximum stored title length, matching the fixed buffer of the
/// original terse titles.
const MAX_TITLE: usize = 256;

/// Title bookkeeping of one window.
#[derive(Debug, Clone, Default)]
pub struct TitleState {
    /// Current window title.
    pub current: String,
    /// Prompt prefix that arms the auto-title scan; empty disables the
    /// prefix match (the first token on the line wins).
    pub auto_prefix: String,
    /// Auto-title cursor: 0 = disarmed, `n > 0` = scan line `n - 1` on
    /// the next linefeed, -1 = deferred to the next line.
    pub auto_line: i32,
}

/// Filter a raw title: control bytes are dropped, C1 bytes too when
/// `c1` is active, and the result is length-bounded.
#[must_use]
pub fn sanitize_title(raw: &str, c1: bool) -> String {
    let mut out = String::new();
    for ch in raw.chars() {
        let cp = ch as u32;
        if cp < 32 || cp == 127 || (c1 && (128..160).contains(&cp)) {
            continue;
        }
        if out.len() + ch.len_utf8() > MAX_TITLE {
            break;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_controls() {
        assert_eq!(sanitize_title("a\x07b\x1bc", true), "abc");
        assert_eq!(sanitize_title("vi\u{9b}m", true), "vim");
        assert_eq!(sanitize_title("vi\u{9b}m", false), "vi\u{9b}m");
    }

    #[test]
    fn test_sanitize_bounds_length() {
        let long = "x".repeat(4 * MAX_TITLE);
        assert_eq!(sanitize_title(&long, true).len(), MAX_TITLE);
    }
}
