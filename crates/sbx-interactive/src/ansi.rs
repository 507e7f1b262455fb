//! Strips ANSI CSI escape sequences from a session's TTY output before it
//! is forwarded to the client (§4.4): "the container's TTY stream is
//! UTF-8; ANSI CSI sequences (`ESC [ ... letter`) are removed before
//! forwarding."

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CSI_RE: Regex = Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").expect("static CSI regex is valid");
}

/// Removes every `ESC [ ... letter` sequence from `text`, leaving the
/// remaining bytes untouched.
pub fn strip_csi(text: &str) -> String {
    CSI_RE.replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_color_codes() {
        assert_eq!(strip_csi("\x1b[31mred\x1b[0m"), "red");
    }

    #[test]
    fn leaves_plain_text_untouched() {
        assert_eq!(strip_csi("Hello, world!\n"), "Hello, world!\n");
    }

    #[test]
    fn strips_cursor_movement_sequences() {
        assert_eq!(strip_csi("a\x1b[2Kb\x1b[1;1Hc"), "abc");
    }
}
