use std::borrow::Cow;

use crate::error::{ArchiveError, Result};

/// Percent-decodes the path component of a `file:` URL.
///
/// Runs of consecutive escapes are collected into one byte buffer before being
/// turned back into text, so multi-byte UTF-8 sequences survive. Bytes that do
/// not form valid UTF-8 become U+FFFD.
pub fn decode(path: &str) -> Result<Cow<'_, str>> {
    if !path.contains('%') {
        return Ok(Cow::Borrowed(path));
    }

    let bytes = path.as_bytes();
    let mut result = String::with_capacity(path.len());
    let mut escaped = Vec::new();
    let mut literal_start = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] != b'%' {
            i += 1;
            continue;
        }

        result.push_str(&path[literal_start..i]);
        escaped.clear();
        loop {
            escaped.push(escape_at(path, i)?);
            i += 3;
            if i >= bytes.len() || bytes[i] != b'%' {
                break;
            }
        }
        result.push_str(&String::from_utf8_lossy(&escaped));
        literal_start = i;
    }

    result.push_str(&path[literal_start..]);
    Ok(Cow::Owned(result))
}

fn escape_at(path: &str, pos: usize) -> Result<u8> {
    let bytes = path.as_bytes();
    if pos + 2 >= bytes.len() {
        return Err(ArchiveError::InvalidEncoding {
            position: pos,
            sequence: String::from_utf8_lossy(&bytes[pos..]).into_owned(),
        });
    }

    let hi = hex_value(bytes[pos + 1]);
    let lo = hex_value(bytes[pos + 2]);
    match (hi, lo) {
        (Some(hi), Some(lo)) => Ok((hi << 4) | lo),
        _ => Err(ArchiveError::InvalidEncoding {
            position: pos,
            sequence: String::from_utf8_lossy(&bytes[pos..pos + 3]).into_owned(),
        }),
    }
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_passes_plain_text_through_borrowed() {
        let decoded = decode("plain").unwrap();
        assert!(matches!(decoded, Cow::Borrowed("plain")));
    }

    #[test]
    fn decode_replaces_single_escape() {
        assert_eq!(decode("a%20b").unwrap(), "a b");
        assert_eq!(decode("%2Ftmp%2f").unwrap(), "/tmp/");
    }

    #[test]
    fn decode_joins_consecutive_escapes_into_utf8() {
        assert_eq!(decode("/caf%C3%A9/classes").unwrap(), "/café/classes");
        assert_eq!(decode("%E6%97%A5%E6%9C%AC").unwrap(), "日本");
    }

    #[test]
    fn decode_keeps_non_ascii_literals() {
        assert_eq!(decode("/données/a%20b").unwrap(), "/données/a b");
    }

    #[test]
    fn decode_rejects_truncated_escape() {
        let err = decode("100%").unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidEncoding { position: 3, .. }));

        let err = decode("a%2").unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidEncoding { position: 1, .. }));
    }

    #[test]
    fn decode_rejects_non_hex_digits() {
        let err = decode("a%zzb").unwrap_err();
        match err {
            ArchiveError::InvalidEncoding { position, sequence } => {
                assert_eq!(position, 1);
                assert_eq!(sequence, "%zz");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn decode_rejects_bad_escape_inside_a_run() {
        assert!(decode("%41%4").is_err());
        assert!(decode("%41%g1").is_err());
    }
}
