//! Small text helpers: single-line escaping for log records and char-safe truncation
//! for channel payload limits.

use std::fmt::Write;

/// Longest preview written into a log line before an ellipsis is appended.
const MAX_LOG_PREVIEW: usize = 200;

/// Escape a captured string so it cannot break a log line.
///
/// Newlines, carriage returns, tabs and backslashes are escaped; other control
/// characters become `\xNN`. Output is capped at [`MAX_LOG_PREVIEW`] characters.
pub fn single_line(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_LOG_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_LOG_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Cut `s` to at most `max_chars` characters, never splitting a code point.
/// When truncation happens the last kept character is replaced with `…`.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some(_) => {
            let mut out: String = s.chars().take(max_chars - 1).collect();
            out.push('…');
            out
        }
    }
}

/// Cut `s` to at most `max_units` UTF-16 code units, ending with `…` when cut.
/// Astral characters such as most emoji count as two units.
pub fn truncate_utf16(s: &str, max_units: usize) -> String {
    if s.encode_utf16().count() <= max_units {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    // Reserve one unit for the ellipsis.
    for ch in s.chars() {
        let width = ch.len_utf16();
        if used + width + 1 > max_units {
            break;
        }
        out.push(ch);
        used += width;
    }
    if max_units > 0 {
        out.push('…');
    }
    out
}
