//! Presentation-format label decoding.
//!
//! Instance names arrive in master-file presentation form: octets that are
//! not printable are written `\DDD` (three decimal digits) and special
//! characters are written `\c`. A single non-ASCII character usually spans
//! several consecutive `\DDD` escapes, so decoding accumulates raw bytes and
//! only then interprets them as UTF-8.

use tracing::debug;

use crate::error::LabelError;

/// Decode a presentation-format label (or relative name) into text.
///
/// ```
/// use dnssd_topology::label::decode;
///
/// assert_eq!(decode(r"My\032Printer").unwrap(), "My Printer");
/// assert_eq!(decode(r"\195\169").unwrap(), "é");
/// ```
pub fn decode(raw: &str) -> Result<String, LabelError> {
    let bytes = decode_bytes(raw)?;
    String::from_utf8(bytes).map_err(|e| LabelError::Malformed {
        label: raw.to_string(),
        position: e.utf8_error().valid_up_to(),
        reason: "invalid UTF-8",
    })
}

/// Decode a presentation-format label into its wire octets.
///
/// Same escape rules as [`decode`], without requiring the result to be
/// UTF-8.
pub fn decode_bytes(raw: &str) -> Result<Vec<u8>, LabelError> {
    let malformed = |position: usize, reason: &'static str| LabelError::Malformed {
        label: raw.to_string(),
        position,
        reason,
    };

    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let escape_at = i;
        let Some(&next) = bytes.get(i + 1) else {
            return Err(malformed(escape_at, "trailing backslash"));
        };

        if !next.is_ascii_digit() {
            // `\c`: the character itself, which may be multi-byte UTF-8.
            let ch_len = raw[i + 1..]
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(1);
            out.extend_from_slice(&bytes[i + 1..i + 1 + ch_len]);
            i += 1 + ch_len;
            continue;
        }

        let digits = match bytes.get(i + 1..i + 4) {
            Some(d) if d.iter().all(u8::is_ascii_digit) => d,
            _ => return Err(malformed(escape_at, "decimal escape needs three digits")),
        };
        let value = digits
            .iter()
            .fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0'));
        let octet = u8::try_from(value).map_err(|_| malformed(escape_at, "escape above 255"))?;
        out.push(octet);
        i += 4;
    }

    Ok(out)
}

/// Split a presentation-format name into its still-escaped labels.
///
/// Only unescaped dots separate labels; a trailing dot (the root) yields no
/// extra label, so `"."` splits into nothing. Returns `None` for an empty
/// label in the middle of the name (`"a..b"`).
pub fn split_labels(name: &str) -> Option<Vec<&str>> {
    if name == "." {
        return Some(Vec::new());
    }

    let bytes = name.as_bytes();
    let mut labels = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'.' => {
                if i == start {
                    return None;
                }
                labels.push(&name[start..i]);
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < bytes.len() {
        labels.push(&name[start..]);
    }
    Some(labels)
}

/// Decode `raw`, falling back to the raw text when it is malformed.
pub fn decode_or_raw(raw: &str) -> String {
    match decode(raw) {
        Ok(text) => text,
        Err(e) => {
            debug!(error = %e, "showing label undecoded");
            raw.to_string()
        }
    }
}

/// Encode text into presentation format. Inverse of [`decode`].
pub fn encode(text: &str) -> String {
    encode_bytes(text.as_bytes())
}

/// Encode one wire label's octets into presentation format.
pub fn encode_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'.' | b'\\' | b'"' | b'(' | b')' | b';' | b'@' | b'$' => {
                out.push('\\');
                out.push(char::from(b));
            }
            0x21..=0x7e => out.push(char::from(b)),
            _ => out.push_str(&format!("\\{:03}", b)),
        }
    }
    out
}
