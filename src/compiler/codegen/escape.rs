//! Escaping of raw bytes for LLVM `c"..."` string constants.

/// Escape a byte sequence for use inside an LLVM `c"..."` literal.
///
/// Printable ASCII passes through, the quote and backslash become hex
/// escapes, and every other byte is written as `\XX` (uppercase hex).
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\5C"),
            b'"' => out.push_str("\\22"),
            b'\n' => out.push_str("\\0A"),
            b'\r' => out.push_str("\\0D"),
            b'\t' => out.push_str("\\09"),
            32..=126 => out.push(b as char),
            _ => out.push_str(&format!("\\{:02X}", b)),
        }
    }
    out
}

/// Escape the UTF-8 encoding of `s`.
pub fn escape_str(s: &str) -> String {
    escape_bytes(s.as_bytes())
}

/// Size of the `[N x i8]` array holding `s`: encoded bytes plus the
/// trailing null.
pub fn array_len(s: &str) -> usize {
    s.len() + 1
}
