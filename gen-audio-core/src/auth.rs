//! Token issuance/verification and password handling (§3, §4.1). Ported
//! from `original_source/services/api/security.py`'s `PasswordValidator`
//! and `PasswordHasher` (bcrypt, cost 12) and `TokenGenerator`, expressed
//! with `jsonwebtoken` the way the teacher's own structs carry
//! `Default`/builder helpers rather than free functions.

use std::collections::HashSet;

use anyhow::{Context, Result, bail};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use once_cell::sync::Lazy;
use uuid::Uuid;

use crate::models::{TokenClaims, TokenType};

const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;

static COMMON_PASSWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "password", "123456", "123456789", "qwerty", "abc123", "password123", "admin",
        "letmein", "welcome", "monkey", "dragon", "login", "master", "hello", "freedom",
    ]
    .into_iter()
    .collect()
});

/// Mirrors `PasswordValidator.validate` from the original service: length
/// bounds, character-class coverage, a common-password denylist, and a
/// repeated-character check (`(.)\1{3,}`, i.e. more than 3 identical
/// characters in a row).
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!("password must be at least {MIN_PASSWORD_LEN} characters"));
    }
    if password.chars().count() > MAX_PASSWORD_LEN {
        return Err(format!("password must be at most {MAX_PASSWORD_LEN} characters"));
    }
    if COMMON_PASSWORDS.contains(password.to_lowercase().as_str()) {
        return Err("password is too common".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("password must contain an uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err("password must contain a lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("password must contain a digit".to_string());
    }
    const SPECIAL: &str = "!@#$%^&*(),.?\":{}|<>";
    if !password.chars().any(|c| SPECIAL.contains(c)) {
        return Err("password must contain a special character".to_string());
    }
    if has_excessive_repeats(password) {
        return Err("password contains too many repeated characters in a row".to_string());
    }
    Ok(())
}

fn has_excessive_repeats(password: &str) -> bool {
    let chars: Vec<char> = password.chars().collect();
    let mut run = 1;
    for i in 1..chars.len() {
        if chars[i] == chars[i - 1] {
            run += 1;
            if run > 3 {
                return true;
            }
        } else {
            run = 1;
        }
    }
    false
}

/// `sanitize_username` from the original service: lowercase-insensitive
/// storage isn't required, but the allowed charset and length are.
pub fn validate_username(username: &str) -> Result<(), String> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err("username must be 3-50 characters".to_string());
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err("username may only contain letters, digits, underscore, and hyphen".to_string());
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, 12).context("failed to hash password")
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

pub struct TokenIssuer {
    secret: String,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    pub fn issue(&self, user_id: Uuid, username: &str, token_type: TokenType, ttl: ChronoDuration) -> Result<String> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user_id,
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4(),
            token_type,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_bytes()))
            .context("failed to sign token")
    }

    pub fn verify(&self, token: &str, expected_type: TokenType) -> Result<TokenClaims> {
        let data = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .context("invalid or expired token")?;
        if data.claims.token_type != expected_type {
            bail!("token type mismatch");
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_common_password() {
        assert!(validate_password("Password1!").is_err() || validate_password("password").is_err());
        assert!(validate_password("password").is_err());
    }

    #[test]
    fn rejects_short_password() {
        assert!(validate_password("Ab1!").is_err());
    }

    #[test]
    fn rejects_missing_character_classes() {
        assert!(validate_password("alllowercase1!").is_err());
        assert!(validate_password("ALLUPPERCASE1!").is_err());
        assert!(validate_password("NoDigitsHere!").is_err());
        assert!(validate_password("NoSpecial123").is_err());
    }

    #[test]
    fn rejects_excessive_repeats() {
        assert!(validate_password("Aaaa1111!!!!").is_err());
    }

    #[test]
    fn accepts_strong_password() {
        assert!(validate_password("Tr0ub4dor&3zx").is_ok());
    }

    #[test]
    fn username_charset_is_enforced() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("valid_user-99").is_ok());
        assert!(validate_username("has a space").is_err());
    }

    #[test]
    fn password_hash_round_trips() {
        let hash = hash_password("Tr0ub4dor&3zx").unwrap();
        assert!(verify_password("Tr0ub4dor&3zx", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn token_round_trips_and_rejects_wrong_type() {
        let issuer = TokenIssuer::new("test-secret");
        let user_id = Uuid::new_v4();
        let token = issuer
            .issue(user_id, "alice", TokenType::Session, ChronoDuration::hours(1))
            .unwrap();
        let claims = issuer.verify(&token, TokenType::Session).unwrap();
        assert_eq!(claims.sub, user_id);
        assert!(issuer.verify(&token, TokenType::PasswordReset).is_err());
    }
}
