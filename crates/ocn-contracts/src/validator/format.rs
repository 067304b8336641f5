//! String format checks for envelope attributes.

use chrono::DateTime;

pub fn is_rfc3339(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
}

/// URI reference (RFC 3986 section 4.1): absolute URI or relative reference.
pub fn is_uri_reference(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }

    // A colon before the first '/', '?' or '#' introduces a scheme.
    let head_end = value
        .find(|c: char| matches!(c, '/' | '?' | '#'))
        .unwrap_or(value.len());
    if let Some(colon) = value[..head_end].find(':') {
        if !is_scheme(&value[..colon]) {
            return false;
        }
    }

    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'%' {
            let escaped = bytes
                .get(i + 1..i + 3)
                .map(|hex| hex.iter().all(u8::is_ascii_hexdigit))
                .unwrap_or(false);
            if !escaped {
                return false;
            }
            i += 3;
            continue;
        }
        if !is_uri_char(b) {
            return false;
        }
        i += 1;
    }
    true
}

fn is_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

fn is_uri_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'.' | b'_' | b'~' // unreserved
                | b':' | b'/' | b'?' | b'#' | b'[' | b']' | b'@' // gen-delims
                | b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+' | b',' | b';' | b'=' // sub-delims
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc3339() {
        assert!(is_rfc3339("2024-01-21T12:00:00Z"));
        assert!(is_rfc3339("2024-01-21T12:00:00.123+02:00"));
        assert!(!is_rfc3339("bad-time"));
        assert!(!is_rfc3339("2024-01-21"));
    }

    #[test]
    fn test_uri_reference() {
        assert!(is_uri_reference("https://schemas.ocn.ai/events/v1/orca.decision.v1.schema.json"));
        assert!(is_uri_reference("urn:ocn:orca"));
        assert!(is_uri_reference("relative/path#frag"));
        assert!(is_uri_reference("/events/v1?x=%20"));
        assert!(!is_uri_reference(""));
        assert!(!is_uri_reference("has space"));
        assert!(!is_uri_reference("bad%zzescape"));
        assert!(!is_uri_reference("1http://x"));
    }
}
