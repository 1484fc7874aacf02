//! JWT-backed auth tokens scoped to `(agent_id, league_id, role)` (spec §4.2).
//!
//! Every registered referee and player receives a bearer token in its
//! registration response; every subsequent message it sends carries that
//! token in the envelope's `auth_token` field, and the receiving component
//! validates it before trusting the sender identity claimed in `sender`.

use std::fmt;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::envelope::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the agent id this token was issued to.
    pub sub: String,
    pub league_id: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique token id, so a revoked token can be named without revoking
    /// every token for its subject.
    pub jti: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    Missing,
    Invalid(String),
    Expired,
    RoleMismatch { expected: String, found: String },
    LeagueMismatch { expected: String, found: String },
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Missing => write!(f, "auth token missing"),
            AuthError::Invalid(reason) => write!(f, "auth token invalid: {reason}"),
            AuthError::Expired => write!(f, "auth token expired"),
            AuthError::RoleMismatch { expected, found } => {
                write!(f, "auth token role mismatch: expected {expected}, found {found}")
            }
            AuthError::LeagueMismatch { expected, found } => {
                write!(f, "auth token league mismatch: expected {expected}, found {found}")
            }
        }
    }
}

impl std::error::Error for AuthError {}

/// Issues and validates tokens for one league manager process.
///
/// Holds a single symmetric HMAC secret for the process lifetime, the same
/// "one long-lived secret, many short-lived tokens" shape the teacher uses
/// for its bearer-token `AuthConfig`, generalized here to JWT claims rather
/// than a single opaque string.
pub struct AuthTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
}

impl AuthTokenService {
    pub fn new(secret: &[u8], ttl_seconds: i64) -> Self {
        AuthTokenService {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::default(),
            ttl_seconds,
        }
    }

    pub fn issue(&self, agent_id: &str, league_id: &str, role: Role) -> Result<String, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: agent_id.to_string(),
            league_id: league_id.to_string(),
            role: role.as_str().to_string(),
            iat: now,
            exp: now + self.ttl_seconds,
            jti: uuid::Uuid::new_v4().to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Invalid(e.to_string()))
    }

    /// Validate a token, additionally checking it matches the expected
    /// league and role for the endpoint it arrived at.
    pub fn validate(
        &self,
        token: &str,
        expected_league_id: &str,
        expected_role: Role,
    ) -> Result<Claims, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Missing);
        }
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(e.to_string()),
            }
        })?;
        let claims = data.claims;
        if claims.league_id != expected_league_id {
            return Err(AuthError::LeagueMismatch {
                expected: expected_league_id.to_string(),
                found: claims.league_id,
            });
        }
        if claims.role != expected_role.as_str() {
            return Err(AuthError::RoleMismatch {
                expected: expected_role.as_str().to_string(),
                found: claims.role,
            });
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthTokenService {
        AuthTokenService::new(b"test-secret-at-least-this-long", 3600)
    }

    #[test]
    fn issue_then_validate_round_trips() {
        let svc = service();
        let token = svc.issue("p1", "league-1", Role::Player).unwrap();
        let claims = svc
            .validate(&token, "league-1", Role::Player)
            .expect("should validate");
        assert_eq!(claims.sub, "p1");
        assert_eq!(claims.league_id, "league-1");
    }

    #[test]
    fn empty_token_is_missing() {
        let svc = service();
        assert_eq!(svc.validate("", "league-1", Role::Player), Err(AuthError::Missing));
    }

    #[test]
    fn wrong_role_rejected() {
        let svc = service();
        let token = svc.issue("r1", "league-1", Role::Referee).unwrap();
        let result = svc.validate(&token, "league-1", Role::Player);
        assert!(matches!(result, Err(AuthError::RoleMismatch { .. })));
    }

    #[test]
    fn wrong_league_rejected() {
        let svc = service();
        let token = svc.issue("p1", "league-1", Role::Player).unwrap();
        let result = svc.validate(&token, "league-2", Role::Player);
        assert!(matches!(result, Err(AuthError::LeagueMismatch { .. })));
    }

    #[test]
    fn tampered_token_rejected() {
        let svc = service();
        let mut token = svc.issue("p1", "league-1", Role::Player).unwrap();
        token.push('x');
        assert!(matches!(
            svc.validate(&token, "league-1", Role::Player),
            Err(AuthError::Invalid(_))
        ));
    }
}
