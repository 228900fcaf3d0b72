//! Command serialization helpers.

/// Writes a quoted string, backslash-escaping `"` and `\`.
///
/// Every string argument the fetcher sends goes through here, so user names,
/// passwords and folder names with spaces or quotes stay a single token.
pub fn write_quoted(buf: &mut Vec<u8>, s: &str) {
    buf.push(b'"');
    for b in s.bytes() {
        if b == b'"' || b == b'\\' {
            buf.push(b'\\');
        }
        buf.push(b);
    }
    buf.push(b'"');
}
