//! Identity Token Verifier
//!
//! HS256 signed claims tokens carrying the caller's IIN and admin flag.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Identity;

/// Owner identifiers are stored in a 12 character column
pub const MAX_IIN_LEN: usize = 12;

/// Token verification failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token is expired")]
    TokenExpired,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// Claims embedded in an identity token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Owner identifier of the caller
    pub iin: String,
    pub admin: bool,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
}

impl Claims {
    /// Claims valid from `issued_at` for `ttl`
    pub fn new(
        iin: impl Into<String>,
        admin: bool,
        issued_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            iin: iin.into(),
            admin,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Verifies (and, for tooling, issues) tokens against the shared secret
#[derive(Clone)]
pub struct TokenVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is judged against the caller-supplied clock in `decode_claims`
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Check signature, required claims and expiry.
    pub fn decode_claims(&self, raw: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(raw, &self.decoding, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let claims = data.claims;

        if claims.iin.is_empty() {
            return Err(AuthError::InvalidToken("empty iin claim".to_string()));
        }
        if claims.iin.chars().count() > MAX_IIN_LEN {
            return Err(AuthError::InvalidToken(format!(
                "iin claim longer than {} characters",
                MAX_IIN_LEN
            )));
        }

        if claims.is_expired_at(now) {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }

    /// Verify a raw token and extract the caller identity
    pub fn verify(&self, raw: &str, now: DateTime<Utc>) -> Result<Identity, AuthError> {
        let claims = self.decode_claims(raw, now)?;
        Ok(Identity::new(claims.iin, claims.admin))
    }

    /// Sign claims with the shared secret
    pub fn issue(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SECRET: &[u8] = b"testingaccess";

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(SECRET)
    }

    #[test]
    fn test_verify_valid_token() {
        let now = Utc::now();
        let verifier = verifier();
        let token = verifier
            .issue(&Claims::new("910815450350", false, now, Duration::minutes(5)))
            .unwrap();

        let identity = verifier.verify(&token, now).unwrap();
        assert_eq!(identity, Identity::user("910815450350"));
    }

    #[test]
    fn test_admin_flag_extracted() {
        let now = Utc::now();
        let verifier = verifier();
        let token = verifier
            .issue(&Claims::new("000000000001", true, now, Duration::minutes(5)))
            .unwrap();

        assert!(verifier.verify(&token, now).unwrap().is_admin);
    }

    #[test]
    fn test_expired_token() {
        let issued = Utc::now() - Duration::hours(2);
        let verifier = verifier();
        let token = verifier
            .issue(&Claims::new("910815450350", false, issued, Duration::hours(1)))
            .unwrap();

        assert_eq!(
            verifier.verify(&token, Utc::now()),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn test_expiry_instant_is_already_expired() {
        let now = Utc::now();
        let verifier = verifier();
        let claims = Claims::new("910815450350", false, now, Duration::seconds(30));
        let token = verifier.issue(&claims).unwrap();

        let at_expiry = DateTime::from_timestamp(claims.exp, 0).unwrap();
        assert_eq!(verifier.verify(&token, at_expiry), Err(AuthError::TokenExpired));
        assert!(verifier
            .verify(&token, at_expiry - Duration::seconds(1))
            .is_ok());
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let now = Utc::now();
        let token = TokenVerifier::new(b"other-secret")
            .issue(&Claims::new("910815450350", false, now, Duration::minutes(5)))
            .unwrap();

        assert!(matches!(
            verifier().verify(&token, now),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_missing_admin_claim_is_invalid() {
        #[derive(Serialize)]
        struct Partial {
            iin: String,
            iat: i64,
            exp: i64,
        }

        let now = Utc::now();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Partial {
                iin: "910815450350".to_string(),
                iat: now.timestamp(),
                exp: (now + Duration::minutes(5)).timestamp(),
            },
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(matches!(
            verifier().verify(&token, now),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_overlong_iin_is_invalid() {
        let now = Utc::now();
        let verifier = verifier();
        let token = verifier
            .issue(&Claims::new("9108154503501", false, now, Duration::minutes(5)))
            .unwrap();

        assert!(matches!(
            verifier.verify(&token, now),
            Err(AuthError::InvalidToken(ref msg)) if msg.contains("iin")
        ));
    }

    #[test]
    fn test_garbage_is_invalid() {
        assert!(matches!(
            verifier().verify("not.a.token", Utc::now()),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_debug_hides_secret() {
        let rendered = format!("{:?}", verifier());
        assert!(!rendered.contains("testingaccess"));
    }
}
