//! Authentication ports.

/// Claims carried by a session token.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    pub user_id: i32,
    pub username: String,
    pub exp: i64,
    /// Fingerprint of the password hash the session was issued under.
    pub password_fingerprint: String,
}

impl TokenClaims {
    /// A session stays valid only until the user's password changes.
    pub fn matches_password(&self, password_hash: &str) -> bool {
        self.password_fingerprint == password_fingerprint(password_hash)
    }
}

/// Characters of a password hash carried in tokens.
const FINGERPRINT_LEN: usize = 16;

/// The tail of a password hash, used to tie tokens to the current password.
pub fn password_fingerprint(password_hash: &str) -> String {
    let chars: Vec<char> = password_hash.chars().collect();
    let start = chars.len().saturating_sub(FINGERPRINT_LEN);
    chars[start..].iter().collect()
}

/// Token service trait for session and password-reset tokens.
pub trait TokenService: Send + Sync {
    /// Issue a session token for a logged-in user, bound to the current password hash.
    fn issue_session(
        &self,
        user_id: i32,
        username: &str,
        password_hash: &str,
    ) -> Result<String, AuthError>;

    /// Validate and decode a session token.
    fn validate_session(&self, token: &str) -> Result<TokenClaims, AuthError>;

    /// Issue a one-time password reset token bound to the current password hash.
    fn issue_password_reset(&self, user_id: i32, password_hash: &str)
    -> Result<String, AuthError>;

    /// Check a reset token against the user it was issued for.
    fn validate_password_reset(
        &self,
        token: &str,
        user_id: i32,
        password_hash: &str,
    ) -> Result<(), AuthError>;

    /// Session lifetime in seconds.
    fn session_seconds(&self) -> i64;
}

/// Password hashing service.
pub trait PasswordService: Send + Sync {
    /// Hash a plain text password.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Verify a password against a hash.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Hashing error: {0}")]
    HashingError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_hash_tail() {
        assert_eq!(password_fingerprint("!unusable"), "!unusable");
        assert_eq!(
            password_fingerprint("$argon2id$v=19$0123456789abcdefXYZ"),
            "3456789abcdefXYZ"
        );
    }
}
