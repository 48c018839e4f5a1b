//! Identifier shape validation.
//!
//! Content identifiers are issued as hyphenated UUIDs. Anything that decodes
//! from a token but does not have that exact shape is rejected before the
//! store is consulted.

use uuid::Uuid;

/// Length of the hyphenated text form
pub const IDENTIFIER_LEN: usize = 36;

/// Hex digit counts of each hyphen-separated group
const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

/// True when `id` is `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` (hex, any case)
pub fn is_well_formed(id: &str) -> bool {
    if id.len() != IDENTIFIER_LEN {
        return false;
    }

    let mut parts = id.split('-');
    for expected in GROUPS {
        match parts.next() {
            Some(part) if part.len() == expected && part.bytes().all(|b| b.is_ascii_hexdigit()) => {}
            _ => return false,
        }
    }
    parts.next().is_none()
}

/// Parse a well-formed identifier into a typed UUID.
///
/// Stricter than `Uuid::parse_str`, which also accepts the simple, braced and
/// URN forms.
pub fn parse(id: &str) -> Option<Uuid> {
    if !is_well_formed(id) {
        return None;
    }
    Uuid::parse_str(id).ok()
}

/// Issue a fresh identifier in canonical form
pub fn new_identifier() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_canonical() {
        assert!(is_well_formed("3f2504e0-4f89-11d3-9a0c-0305e82c3301"));
        assert!(is_well_formed("3F2504E0-4F89-11D3-9A0C-0305E82C3301"));
        assert!(is_well_formed(&new_identifier()));
    }

    #[test]
    fn test_rejects_other_shapes() {
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("abc-123"));
        assert!(!is_well_formed("3f2504e04f8911d39a0c0305e82c3301"));
        assert!(!is_well_formed("{3f2504e0-4f89-11d3-9a0c-0305e82c3301}"));
        assert!(!is_well_formed("3f2504e0-4f89-11d3-9a0c-0305e82c330g"));
        assert!(!is_well_formed("3f2504e0-4f8911d3-9a0c--0305e82c3301"));
        assert!(!is_well_formed("3f2504e0_4f89_11d3_9a0c_0305e82c3301"));
        // Right length, multibyte characters
        assert!(!is_well_formed("3f2504e0-4f89-11d3-9a0c-0305e82c33é"));
    }

    #[test]
    fn test_parse() {
        let id = "3f2504e0-4f89-11d3-9a0c-0305e82c3301";
        assert_eq!(parse(id).map(|u| u.to_string()), Some(id.to_string()));
        assert!(parse("urn:uuid:3f2504e0-4f89-11d3-9a0c-0305e82c3301").is_none());
    }
}
