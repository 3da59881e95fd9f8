//! Column-width and wire-encoding helpers
//!
//! Thermal printers lay text out in single-width columns: ASCII occupies one
//! column, CJK glyphs two. GBK encodes at exactly that ratio, so the GBK byte
//! length of a string equals its printed width. The same encoding is what the
//! firmware expects on the wire for non-ASCII text.

/// Printed width of a string in columns (ASCII = 1, CJK = 2).
pub fn column_width(s: &str) -> usize {
    let (encoded, _, _) = encoding_rs::GBK.encode(s);
    encoded.len()
}

/// Truncate a string so it occupies at most `max` columns.
///
/// Never splits a glyph: a double-width character that would straddle the
/// boundary is dropped entirely.
pub fn fit_width(s: &str, max: usize) -> String {
    let mut used = 0;
    let mut out = String::new();
    let mut buf = [0u8; 4];
    for ch in s.chars() {
        let w = column_width(ch.encode_utf8(&mut buf));
        if used + w > max {
            break;
        }
        out.push(ch);
        used += w;
    }
    out
}

/// Pad (or truncate) a string to exactly `width` columns.
pub fn pad_width(s: &str, width: usize, align_right: bool) -> String {
    let current = column_width(s);
    if current >= width {
        return fit_width(s, width);
    }
    let fill = " ".repeat(width - current);
    if align_right {
        format!("{}{}", fill, s)
    } else {
        format!("{}{}", s, fill)
    }
}

/// Wrap a string into lines of at most `max` columns, breaking on glyph
/// boundaries. Empty input yields a single empty line.
pub fn wrap_width(s: &str, max: usize) -> Vec<String> {
    if s.is_empty() || max == 0 {
        return vec![String::new()];
    }
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut used = 0;
    let mut buf = [0u8; 4];
    for ch in s.chars() {
        let w = column_width(ch.encode_utf8(&mut buf));
        if used + w > max {
            lines.push(std::mem::take(&mut line));
            used = 0;
        }
        line.push(ch);
        used += w;
    }
    lines.push(line);
    lines
}

/// Encode builder output for the wire.
///
/// Command bytes (< 0x80) pass through untouched so escape sequences survive;
/// multi-byte UTF-8 runs are re-encoded as GBK. CJK text mode (`FS &`,
/// `FS C 1`) is armed up front, re-armed after any embedded `ESC @` reset,
/// and released (`FS .`) at the end.
pub fn encode_wire(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() * 2);
    // FS & + FS C 1: enter CJK mode, select GBK code page
    out.extend_from_slice(&[0x1C, 0x26, 0x1C, 0x43, 0x01]);

    let mut run: Vec<u8> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];

        // ESC @ resets the printer and drops CJK mode; re-arm right after it.
        if b == 0x1B && bytes.get(i + 1) == Some(&0x40) {
            flush_run(&mut run, &mut out);
            out.extend_from_slice(&[0x1B, 0x40, 0x1C, 0x26]);
            i += 2;
            continue;
        }

        if b < 0x80 {
            flush_run(&mut run, &mut out);
            out.push(b);
        } else {
            run.push(b);
        }
        i += 1;
    }
    flush_run(&mut run, &mut out);

    // FS .: leave CJK mode
    out.extend_from_slice(&[0x1C, 0x2E]);
    out
}

/// Re-encode a pending UTF-8 run as GBK and append it.
fn flush_run(run: &mut Vec<u8>, out: &mut Vec<u8>) {
    if run.is_empty() {
        return;
    }
    let text = String::from_utf8_lossy(run);
    let (gbk, _, _) = encoding_rs::GBK.encode(&text);
    out.extend_from_slice(&gbk);
    run.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_width() {
        assert_eq!(column_width("order"), 5);
        assert_eq!(column_width("外卖"), 4);
        assert_eq!(column_width("No1外卖"), 7);
    }

    #[test]
    fn test_fit_width() {
        assert_eq!(fit_width("hello world", 5), "hello");
        assert_eq!(fit_width("外卖单", 4), "外卖");
        // Double-width glyph never straddles the boundary
        assert_eq!(fit_width("a外卖", 2), "a");
    }

    #[test]
    fn test_pad_width() {
        assert_eq!(pad_width("ab", 5, false), "ab   ");
        assert_eq!(pad_width("ab", 5, true), "   ab");
        assert_eq!(pad_width("abcdef", 4, false), "abcd");
    }

    #[test]
    fn test_wrap_width() {
        assert_eq!(wrap_width("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap_width("", 4), vec![""]);
        assert_eq!(wrap_width("ab", 4), vec!["ab"]);
    }

    #[test]
    fn test_encode_wire_preserves_commands() {
        let encoded = encode_wire(&[0x1B, 0x61, 0x01, b'h', b'i']);
        // Enters CJK mode, keeps the alignment escape verbatim, exits
        assert!(encoded.starts_with(&[0x1C, 0x26, 0x1C, 0x43, 0x01]));
        assert!(encoded.ends_with(&[0x1C, 0x2E]));
        let body = &encoded[5..encoded.len() - 2];
        assert_eq!(body, &[0x1B, 0x61, 0x01, b'h', b'i']);
    }

    #[test]
    fn test_encode_wire_rearms_after_reset() {
        let encoded = encode_wire(&[0x1B, 0x40, b'x']);
        let body = &encoded[5..encoded.len() - 2];
        assert_eq!(body, &[0x1B, 0x40, 0x1C, 0x26, b'x']);
    }

    #[test]
    fn test_encode_wire_gbk_text() {
        let encoded = encode_wire("外".as_bytes());
        let body = &encoded[5..encoded.len() - 2];
        let (expected, _, _) = encoding_rs::GBK.encode("外");
        assert_eq!(body, expected.as_ref());
    }
}
