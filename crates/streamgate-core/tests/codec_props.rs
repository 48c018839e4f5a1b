//! Property-based tests for the content token codec.

use proptest::prelude::*;

use streamgate_core::codec::{decode, encode};
use streamgate_core::identifier;
use streamgate_core::ContentResolver;

/// Canonical hyphenated identifiers, mixed case
fn arb_identifier() -> impl Strategy<Value = String> {
    "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}"
}

proptest! {
    #[test]
    fn round_trips_any_non_empty_identifier(id in ".{1,64}") {
        prop_assert_eq!(decode(&encode(&id)), Some(id));
    }

    #[test]
    fn tokens_are_path_safe(id in ".{1,64}") {
        let token = encode(&id);
        prop_assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn encoding_is_deterministic(id in ".{1,64}") {
        prop_assert_eq!(encode(&id), encode(&id));
    }

    #[test]
    fn decode_accepts_only_canonical_tokens(token in ".{0,80}") {
        // Never panics; anything accepted re-encodes to the same token
        if let Some(id) = decode(&token) {
            prop_assert!(!id.is_empty());
            prop_assert_eq!(encode(&id), token);
        }
    }

    #[test]
    fn decode_rejects_random_base64(token in "[A-Za-z0-9_-]{0,80}") {
        if let Some(id) = decode(&token) {
            prop_assert_eq!(encode(&id), token);
        }
    }

    #[test]
    fn resolver_accepts_well_formed_identifiers(id in arb_identifier()) {
        prop_assert_eq!(ContentResolver::identifier_for(&encode(&id)), Some(id));
    }

    #[test]
    fn resolver_rejects_wrong_shapes(id in ".{1,64}") {
        let accepted = ContentResolver::identifier_for(&encode(&id));
        prop_assert_eq!(accepted.is_some(), identifier::is_well_formed(&id));
    }
}
