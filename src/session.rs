// Vehicle Parts Tracker - Session Tokens
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Persisted form of the logged-in identity. Holds no password. Signed with
// SHA256 over the claims, the install secret and the user's stored password,
// and carries an expiry. A token is only honored after verify() against the
// current user record.

use crate::models::{Role, User};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionToken {
    pub user_id: String,
    pub username: String,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Hex SHA256, see sign()
    pub signature: String,
}

/// Why a persisted token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    Expired,
    UserMismatch,
    BadSignature,
}

impl SessionToken {
    /// Issue a token for `user`, valid for `ttl` from now
    pub fn issue(user: &User, secret: &str, ttl: Duration) -> Self {
        let issued_at = Utc::now();
        let mut token = Self {
            user_id: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
            issued_at,
            expires_at: issued_at + ttl,
            signature: String::new(),
        };
        token.signature = token.sign(secret, &user.password);
        token
    }

    fn sign(&self, secret: &str, password: &str) -> String {
        let issued_at = self.issued_at.to_rfc3339();
        let expires_at = self.expires_at.to_rfc3339();
        let mut hasher = Sha256::new();
        for field in [
            secret,
            self.user_id.as_str(),
            self.username.as_str(),
            self.role.as_str(),
            issued_at.as_str(),
            expires_at.as_str(),
            password,
        ] {
            hasher.update(field.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Check the token against the user record it names
    pub fn verify(&self, user: &User, secret: &str, now: DateTime<Utc>) -> Result<(), TokenRejection> {
        if self.is_expired(now) {
            return Err(TokenRejection::Expired);
        }
        if user.id != self.user_id || user.username != self.username || user.role != self.role {
            return Err(TokenRejection::UserMismatch);
        }
        if self.sign(secret, &user.password) != self.signature {
            return Err(TokenRejection::BadSignature);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new("u1", "zeynep", "hunter2", Role::User)
    }

    #[test]
    fn fresh_token_verifies() {
        let token = SessionToken::issue(&user(), "install-secret", Duration::hours(1));
        assert_eq!(token.signature.len(), 64);
        assert_eq!(token.verify(&user(), "install-secret", Utc::now()), Ok(()));
    }

    #[test]
    fn expired_token_rejected() {
        let token = SessionToken::issue(&user(), "s", Duration::hours(1));
        let later = Utc::now() + Duration::hours(2);
        assert_eq!(token.verify(&user(), "s", later), Err(TokenRejection::Expired));
    }

    #[test]
    fn password_change_invalidates() {
        let token = SessionToken::issue(&user(), "s", Duration::hours(1));
        let mut changed = user();
        changed.password = "new-pass".to_string();
        assert_eq!(token.verify(&changed, "s", Utc::now()), Err(TokenRejection::BadSignature));
    }

    #[test]
    fn role_change_or_tamper_rejected() {
        let token = SessionToken::issue(&user(), "s", Duration::hours(1));
        let mut promoted = user();
        promoted.role = Role::Admin;
        assert_eq!(token.verify(&promoted, "s", Utc::now()), Err(TokenRejection::UserMismatch));

        let mut forged = token.clone();
        forged.role = Role::Admin;
        assert_eq!(forged.verify(&promoted, "s", Utc::now()), Err(TokenRejection::BadSignature));

        assert_eq!(token.verify(&user(), "other-secret", Utc::now()), Err(TokenRejection::BadSignature));
    }

    #[test]
    fn token_json_has_no_password() {
        let token = SessionToken::issue(&user(), "s", Duration::hours(1));
        let json = serde_json::to_string(&token).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
