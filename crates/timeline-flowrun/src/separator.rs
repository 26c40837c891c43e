//! Component escaping for row keys and column qualifiers
//!
//! Components are joined with `!`. Inside a component `%` and `!` are
//! percent-encoded, so an encoded component never contains the separator and
//! decoding is exact.

use bytes::{BufMut, BytesMut};

pub const SEPARATOR: u8 = b'!';

const ESCAPE: u8 = b'%';

pub fn encode(component: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(component.len());
    for &b in component.as_bytes() {
        match b {
            SEPARATOR | ESCAPE => {
                out.push(ESCAPE);
                out.extend_from_slice(format!("{:02X}", b).as_bytes());
            }
            _ => out.push(b),
        }
    }
    out
}

/// `None` on a dangling or unknown escape, or bytes that are not UTF-8.
pub fn decode(raw: &[u8]) -> Option<String> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == ESCAPE {
            let escaped = match raw.get(i + 1..i + 3)? {
                b"21" => SEPARATOR,
                b"25" => ESCAPE,
                _ => return None,
            };
            out.push(escaped);
            i += 3;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Encode each component followed by a separator.
pub fn join_terminated(buf: &mut BytesMut, components: &[&str]) {
    for component in components {
        buf.put_slice(&encode(component));
        buf.put_u8(SEPARATOR);
    }
}

/// Split off the first `n` separator-terminated components.
///
/// Returns the components found so far and the unconsumed tail; fewer than `n`
/// components means the input ran out of separators.
pub fn split_terminated(raw: &[u8], n: usize) -> (Vec<&[u8]>, &[u8]) {
    let mut components = Vec::with_capacity(n);
    let mut rest = raw;
    while components.len() < n {
        match rest.iter().position(|&b| b == SEPARATOR) {
            Some(pos) => {
                components.push(&rest[..pos]);
                rest = &rest[pos + 1..];
            }
            None => break,
        }
    }
    (components, rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_component_is_unchanged() {
        assert_eq!(encode("flow_1.daily"), b"flow_1.daily".to_vec());
    }

    #[test]
    fn test_separator_and_escape_are_encoded() {
        assert_eq!(encode("a!b%c"), b"a%21b%25c".to_vec());
        assert_eq!(decode(b"a%21b%25c").as_deref(), Some("a!b%c"));
        assert!(!encode("x!!y").contains(&SEPARATOR));
    }

    #[test]
    fn test_decode_rejects_bad_escapes() {
        assert_eq!(decode(b"abc%2"), None);
        assert_eq!(decode(b"abc%41"), None);
        assert_eq!(decode(&[0xff, 0xfe]), None);
    }

    #[test]
    fn test_split_terminated() {
        let (parts, rest) = split_terminated(b"a!b!c!tail", 3);
        assert_eq!(parts, vec![&b"a"[..], &b"b"[..], &b"c"[..]]);
        assert_eq!(rest, b"tail");

        let (parts, _) = split_terminated(b"a!b", 3);
        assert_eq!(parts.len(), 1);
    }
}
