// JWT session token issuance and verification

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::auth::error::AuthError;

/// Session lifetime: two hours from issuance
pub const SESSION_TTL_SECONDS: i64 = 2 * 60 * 60;

/// Layout version written into every token
pub const CLAIMS_VERSION: u16 = 1;

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Identity a token is minted for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub user_id: Uuid,
    pub email: String,
}

/// Claims carried in the token payload
///
/// `userId` is optional on decode: a token without a subject still verifies
/// here, and the authorization gate refuses to bind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
    pub ver: u16,
}

impl SessionClaims {
    pub fn identity(&self) -> Option<IdentityClaims> {
        self.user_id.map(|user_id| IdentityClaims {
            user_id,
            email: self.email.clone(),
        })
    }
}

/// Token service for HS256 session tokens
///
/// Holds the only copy of the signing key. Created once at startup.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        // Expiry is checked against an explicit clock in verify_at
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a session token valid for two hours from now
    pub fn issue(&self, identity: &IdentityClaims) -> Result<String, AuthError> {
        self.issue_at(identity, Utc::now().timestamp())
    }

    pub fn issue_at(&self, identity: &IdentityClaims, issued_at: i64) -> Result<String, AuthError> {
        let claims = SessionClaims {
            user_id: Some(identity.user_id),
            email: identity.email.clone(),
            iat: issued_at,
            exp: issued_at + SESSION_TTL_SECONDS,
            jti: Uuid::new_v4(),
            ver: CLAIMS_VERSION,
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        let token = encode(&Header::new(SIGNING_ALGORITHM), claims, &self.encoding)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))?;
        debug!(user_id = ?claims.user_id, "session token issued");
        Ok(token)
    }

    /// Verify a token against the current time
    ///
    /// Returns None for every rejection: malformed, tampered, foreign key,
    /// wrong algorithm, unknown claims version or expired.
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        self.verify_at(token, Utc::now().timestamp())
    }

    pub fn verify_at(&self, token: &str, now: i64) -> Option<SessionClaims> {
        let claims = match decode::<SessionClaims>(token, &self.decoding, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!(reason = ?e.kind(), "token rejected");
                return None;
            }
        };

        if claims.ver != CLAIMS_VERSION {
            debug!(ver = claims.ver, "token rejected: unknown claims version");
            return None;
        }

        // Strict: a token is dead at the second it expires
        if now >= claims.exp {
            debug!("token rejected: expired");
            return None;
        }

        Some(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TEST_SECRET: &[u8] = b"test_secret_key_for_testing_purposes";

    fn test_token_service() -> TokenService {
        TokenService::new(TEST_SECRET)
    }

    fn identity() -> IdentityClaims {
        IdentityClaims {
            user_id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
        }
    }

    fn flip_signature_byte(token: &str) -> String {
        let (head, signature) = token.rsplit_once('.').unwrap();
        let mut bytes = signature.as_bytes().to_vec();
        bytes[0] = if bytes[0] == b'A' { b'B' } else { b'A' };
        format!("{}.{}", head, String::from_utf8(bytes).unwrap())
    }

    #[test]
    fn test_roundtrip_returns_issued_identity() {
        let service = test_token_service();
        let identity = identity();

        let token = service.issue(&identity).unwrap();
        let claims = service.verify(&token).unwrap();

        assert_eq!(claims.identity(), Some(identity));
        assert_eq!(claims.ver, CLAIMS_VERSION);
    }

    #[test]
    fn test_token_is_three_base64url_segments() {
        let token = test_token_service().issue(&identity()).unwrap();
        let segments: Vec<&str> = token.split('.').collect();
        assert_eq!(segments.len(), 3);
        for segment in segments {
            assert!(segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }

    #[test]
    fn test_expiration_is_two_hours() {
        let service = test_token_service();
        let token = service.issue(&identity()).unwrap();
        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, SESSION_TTL_SECONDS);
        assert_eq!(SESSION_TTL_SECONDS, 7200);
    }

    #[test]
    fn test_two_tokens_for_same_identity_differ() {
        let service = test_token_service();
        let identity = identity();
        let now = Utc::now().timestamp();

        let first = service.issue_at(&identity, now).unwrap();
        let second = service.issue_at(&identity, now).unwrap();

        assert_ne!(first, second);
        assert!(service.verify(&first).is_some());
        assert!(service.verify(&second).is_some());
    }

    #[test]
    fn test_expired_token_rejected_despite_valid_signature() {
        let service = test_token_service();
        let issued_at = Utc::now().timestamp() - SESSION_TTL_SECONDS - 1;
        let token = service.issue_at(&identity(), issued_at).unwrap();

        assert!(service.verify(&token).is_none());
    }

    #[test]
    fn test_expiry_boundary_is_strict() {
        let service = test_token_service();
        let issued_at = 1_700_000_000;
        let token = service.issue_at(&identity(), issued_at).unwrap();
        let exp = issued_at + SESSION_TTL_SECONDS;

        assert!(service.verify_at(&token, exp - 1).is_some());
        assert!(service.verify_at(&token, exp).is_none());
        assert!(service.verify_at(&token, exp + 1).is_none());
    }

    #[test]
    fn test_flipped_signature_rejected() {
        let service = test_token_service();
        let token = service.issue(&identity()).unwrap();
        assert!(service.verify(&flip_signature_byte(&token)).is_none());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let service = test_token_service();
        let token = service.issue(&identity()).unwrap();
        let other = service.issue(&identity()).unwrap();

        // Header and signature from one token, payload from another
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert!(service.verify(&spliced).is_none());
    }

    #[test]
    fn test_token_signature_verification() {
        let service1 = TokenService::new(b"secret1");
        let service2 = TokenService::new(b"secret2");

        let token = service1.issue(&identity()).unwrap();

        assert!(service1.verify(&token).is_some());
        assert!(service2.verify(&token).is_none());
    }

    #[test]
    fn test_other_hmac_algorithm_with_same_key_rejected() {
        let service = test_token_service();
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            user_id: Some(Uuid::new_v4()),
            email: "a@x.com".to_string(),
            iat: now,
            exp: now + 600,
            jti: Uuid::new_v4(),
            ver: CLAIMS_VERSION,
        };

        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET),
        )
        .unwrap();

        assert!(service.verify(&token).is_none());
    }

    #[test]
    fn test_unsigned_token_rejected() {
        let service = test_token_service();
        let token = service.issue(&identity()).unwrap();
        let payload = token.split('.').nth(1).unwrap();

        // {"alg":"none","typ":"JWT"}
        let none_header = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";
        assert!(service.verify(&format!("{}.{}.", none_header, payload)).is_none());
    }

    #[test]
    fn test_unknown_claims_version_rejected() {
        let service = test_token_service();
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            user_id: Some(Uuid::new_v4()),
            email: "a@x.com".to_string(),
            iat: now,
            exp: now + 600,
            jti: Uuid::new_v4(),
            ver: CLAIMS_VERSION + 1,
        };
        let token = service.sign(&claims).unwrap();

        assert!(service.verify(&token).is_none());
    }

    #[test]
    fn test_token_without_subject_verifies_without_identity() {
        let service = test_token_service();
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            user_id: None,
            email: "a@x.com".to_string(),
            iat: now,
            exp: now + 600,
            jti: Uuid::new_v4(),
            ver: CLAIMS_VERSION,
        };
        let token = service.sign(&claims).unwrap();

        let verified = service.verify(&token).unwrap();
        assert_eq!(verified.user_id, None);
        assert_eq!(verified.identity(), None);
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        let service = test_token_service();

        assert!(service.verify("").is_none());
        assert!(service.verify("not.a.token").is_none());
        assert!(service.verify("invalid_token_format").is_none());
        assert!(service
            .verify("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.invalid.signature")
            .is_none());
    }

    proptest! {
        #[test]
        fn prop_roundtrip_preserves_identity(
            email in "[a-z]{3,10}@[a-z]{3,10}\\.(com|org|net)"
        ) {
            let service = test_token_service();
            let identity = IdentityClaims { user_id: Uuid::new_v4(), email };

            let token = service.issue(&identity)?;
            let claims = service.verify(&token);

            prop_assert!(claims.is_some());
            let claims = claims.unwrap();
            prop_assert_eq!(claims.identity(), Some(identity));
            prop_assert_eq!(claims.exp - claims.iat, SESSION_TTL_SECONDS);
        }

        #[test]
        fn prop_random_strings_rejected(malformed in "[a-zA-Z0-9._-]{0,80}") {
            let service = test_token_service();
            prop_assert!(service.verify(&malformed).is_none());
        }
    }
}
