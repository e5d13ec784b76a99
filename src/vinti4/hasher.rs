use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha512};

/// SHA-512 over the UTF-8 bytes of `input`, encoded as standard padded Base64.
///
/// This is the only digest the gateway understands; every fingerprint is built
/// from it, including the pre-hash of the shared POS secret.
pub fn digest_base64(input: &str) -> String {
    let digest = Sha512::digest(input.as_bytes());
    STANDARD.encode(digest)
}

/// Compares two fingerprints without short-circuiting on the first differing byte.
pub fn fingerprints_match(expected: &str, supplied: &str) -> bool {
    let expected = expected.as_bytes();
    let supplied = supplied.as_bytes();

    if expected.len() != supplied.len() {
        return false;
    }

    expected
        .iter()
        .zip(supplied)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_matches_known_vector() {
        // sha512("abc"), base64
        assert_eq!(
            digest_base64("abc"),
            "3a81oZNherrMQXNJriBBMRLm+k6JqX6iCp7u5ktV05ohkpkqJ0/BqDa6PCOj/uu9RU1EI2Q86A4qmslPpUyknw=="
        );
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(digest_base64("ticket-42"), digest_base64("ticket-42"));
        assert_ne!(digest_base64("ticket-42"), digest_base64("ticket-43"));
    }

    #[test]
    fn digest_has_no_line_breaks_and_fixed_length() {
        let long_input = "x".repeat(10_000);
        let digest = digest_base64(&long_input);
        assert!(!digest.contains('\n'));
        // 64 bytes -> 88 base64 chars with padding
        assert_eq!(digest.len(), 88);
    }

    #[test]
    fn empty_input_is_accepted() {
        assert_eq!(digest_base64("").len(), 88);
    }

    #[test]
    fn fingerprint_comparison() {
        assert!(fingerprints_match("abc=", "abc="));
        assert!(!fingerprints_match("abc=", "abd="));
        assert!(!fingerprints_match("abc=", "abc"));
        assert!(!fingerprints_match("", "a"));
    }
}
