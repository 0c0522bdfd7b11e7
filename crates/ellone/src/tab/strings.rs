//! Escape sequences in string and character literals.

use crate::{
    charset::MAX_CHAR,
    diag::{DiagnosticKind, Diagnostics, Location},
};

/// Replace the escape sequences in `s` by the characters they denote.
///
/// Malformed sequences are reported and skipped.
pub fn unescape(s: &str, line: usize, diag: &mut Diagnostics) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut buf = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' {
            buf.push(chars[i]);
            i += 1;
            continue;
        }
        let escaped = match chars.get(i + 1) {
            Some('\\') => Some('\\'),
            Some('\'') => Some('\''),
            Some('"') => Some('"'),
            Some('r') => Some('\r'),
            Some('n') => Some('\n'),
            Some('t') => Some('\t'),
            Some('0') => Some('\0'),
            Some('a') => Some('\x07'),
            Some('b') => Some('\x08'),
            Some('f') => Some('\x0c'),
            Some('v') => Some('\x0b'),
            _ => None,
        };
        match (escaped, chars.get(i + 1)) {
            (Some(ch), _) => {
                buf.push(ch);
                i += 2;
            }
            (None, Some('u' | 'x')) => {
                if i + 6 <= chars.len() {
                    let digits: String = chars[i + 2..i + 6].iter().collect();
                    if let Some(ch) = hex_to_char(&digits, line, diag) {
                        buf.push(ch);
                    }
                    i += 6;
                } else {
                    bad_escape(line, diag);
                    i = chars.len();
                }
            }
            (None, _) => {
                bad_escape(line, diag);
                i += 2;
            }
        }
    }
    buf
}

/// Convert four hex digits to the character they encode.
pub(crate) fn hex_to_char(s: &str, line: usize, diag: &mut Diagnostics) -> Option<char> {
    let mut val: u32 = 0;
    for ch in s.chars() {
        match ch.to_digit(16) {
            Some(d) => val = 16 * val + d,
            None => {
                bad_escape(line, diag);
                return None;
            }
        }
    }
    if val >= MAX_CHAR {
        bad_escape(line, diag);
        return None;
    }
    char::from_u32(val).or_else(|| {
        bad_escape(line, diag);
        None
    })
}

fn bad_escape(line: usize, diag: &mut Diagnostics) {
    diag.error(DiagnosticKind::BadEscape, Some(Location::new(line, 0)));
}

/// The inverse of [`unescape`], used when a literal is written back into
/// generated source.
pub fn escape(s: &str) -> String {
    let mut buf = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => buf.push_str("\\\\"),
            '\'' => buf.push_str("\\'"),
            '"' => buf.push_str("\\\""),
            '\t' => buf.push_str("\\t"),
            '\r' => buf.push_str("\\r"),
            '\n' => buf.push_str("\\n"),
            ch if ch < ' ' || ch > '\x7f' => buf.push_str(&format!("\\0x{:04x}", ch as u32)),
            ch => buf.push(ch),
        }
    }
    buf
}
