//! Hexadecimal conversions for identifiers.

use std::fmt::Write;

/// Encodes `s` as upper-case hexadecimal.
///
/// If `pretty` is set, a space is inserted after every four digits.
pub(crate) fn to_hex(s: &[u8], pretty: bool) -> String {
    let mut result = String::with_capacity(s.len() * 3);
    for (i, b) in s.iter().enumerate() {
        if pretty && i > 0 && i % 2 == 0 {
            result.push(' ');
        }
        // Writing to a String cannot fail.
        let _ = write!(&mut result, "{:02X}", b);
    }
    result
}

/// Decodes a hexadecimal string.
///
/// A leading `0x` is accepted.  If `pretty` is set, whitespace is
/// skipped.  Returns `None` on any other non-hex character or an odd
/// number of digits.
pub(crate) fn from_hex(hex: &str, pretty: bool) -> Option<Vec<u8>> {
    let hex = hex.strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);

    let mut nibbles = Vec::with_capacity(hex.len());
    for c in hex.chars() {
        if pretty && c.is_whitespace() {
            continue;
        }
        nibbles.push(c.to_digit(16)? as u8);
    }

    if nibbles.len() % 2 != 0 {
        return None;
    }

    Some(nibbles.chunks(2).map(|n| n[0] << 4 | n[1]).collect())
}
