//! Handshake token verification (C9).
//!
//! The core only *verifies* signed tokens (spec.md §1); issuance lives in an
//! external credential service. Shape carried over from
//! `services/server/src/auth.rs::validate_token`: a plain function returning
//! `Option<TokenClaims>`, plus a small bearer-extraction helper.

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
struct RawClaims {
    sub: String,
    #[allow(dead_code)]
    exp: u64,
}

/// Verifies an HS256-signed token and extracts the subject (user ID).
///
/// Returns `None` on any verification failure (bad signature, expired,
/// malformed) — callers close the handshake with `BAD_DATA` either way, per
/// spec.md §4.1, so the distinction isn't surfaced here.
#[must_use]
pub fn verify_token(secret: &str, raw_token: &str) -> Option<TokenClaims> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    let data = decode::<RawClaims>(raw_token, &key, &validation).ok()?;
    Some(TokenClaims {
        user_id: data.claims.sub,
    })
}

pub fn extract_bearer(authorization: &str) -> Option<&str> {
    authorization.strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct SignClaims {
        sub: String,
        exp: u64,
    }

    fn sign(secret: &str, user_id: &str, exp: u64) -> String {
        encode(
            &Header::new(jsonwebtoken::Algorithm::HS256),
            &SignClaims {
                sub: user_id.to_owned(),
                exp,
            },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("sign token")
    }

    #[test]
    fn verify_token_accepts_a_validly_signed_token() {
        let token = sign("secret", "user-1", 9_999_999_999);
        let claims = verify_token("secret", &token).expect("should verify");
        assert_eq!(claims.user_id, "user-1");
    }

    #[test]
    fn verify_token_rejects_wrong_secret() {
        let token = sign("secret", "user-1", 9_999_999_999);
        assert!(verify_token("wrong-secret", &token).is_none());
    }

    #[test]
    fn verify_token_rejects_expired_token() {
        let token = sign("secret", "user-1", 1);
        assert!(verify_token("secret", &token).is_none());
    }

    #[test]
    fn verify_token_rejects_garbage() {
        assert!(verify_token("secret", "not-a-jwt").is_none());
    }

    #[test]
    fn extract_bearer_strips_prefix() {
        assert_eq!(extract_bearer("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer("Basic abc123"), None);
    }
}
