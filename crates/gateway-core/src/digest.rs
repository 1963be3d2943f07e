//! Opaque cache-key digest over raw user IDs (spec.md §3).
//!
//! Used only to keep raw customer IDs out of the in-process profile cache;
//! it is not a security boundary.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sha2::{Digest, Sha256};

#[must_use]
pub fn digest(raw: &str) -> String {
    let hash = Sha256::digest(raw.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic_and_stable() {
        let a = digest("customer-123");
        let b = digest("customer-123");
        assert_eq!(a, b);
        assert_eq!(
            a, "ootdo3iwQ7DmK5JOGwVbuWraGAlD6Bz8mDjPmTOpHwM",
            "digest must remain stable across restarts"
        );
    }

    #[test]
    fn digest_differs_for_different_input() {
        assert_ne!(digest("customer-1"), digest("customer-2"));
    }

    #[test]
    fn digest_is_url_safe_and_unpadded() {
        let d = digest("anything-whatsoever-long-enough-to-pad");
        assert!(!d.contains('+'));
        assert!(!d.contains('/'));
        assert!(!d.contains('='));
    }
}
