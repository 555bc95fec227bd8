//! Terminal display width helpers.
//!
//! Panel lines carry ANSI color, so padding has to measure what the terminal
//! actually shows rather than the byte length.

/// Display width of a string after stripping ANSI escapes.
pub fn display_width(text: &str) -> usize {
    let clean = strip_ansi_escapes::strip(text);
    let clean_str = String::from_utf8_lossy(&clean);
    unicode_width::UnicodeWidthStr::width(&*clean_str)
}

/// Right-pad `text` with spaces up to `width` display columns.
pub fn pad_to(text: &str, width: usize) -> String {
    let shown = display_width(text);
    let mut padded = String::with_capacity(text.len() + width.saturating_sub(shown));
    padded.push_str(text);
    padded.extend(std::iter::repeat_n(' ', width.saturating_sub(shown)));
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_color_codes() {
        assert_eq!(display_width("\x1b[32mYES\x1b[0m"), 3);
        assert_eq!(display_width("←/→ move"), 8);
    }

    #[test]
    fn pads_by_visible_width() {
        let padded = pad_to("\x1b[1mab\x1b[0m", 5);
        assert_eq!(display_width(&padded), 5);
        assert!(padded.ends_with("   "));
        assert_eq!(pad_to("toolong", 3), "toolong");
    }
}
