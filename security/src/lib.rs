// security/src/lib.rs
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use async_trait::async_trait;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use models::medical::User;

pub mod gate;
pub mod middleware;
pub mod roles;

pub use gate::{
    authorize, require_admin, require_all_permissions, require_any_role, require_super_admin,
    Decision, GateError, Principal, Requirement,
};
pub use roles::{RoleSeed, RolesConfig, ADMIN_ROLE, SUPER_ADMIN_ROLE};

/// Claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (username)
    pub uid: Uuid,
    pub iat: u64, // Issued at
    pub exp: u64, // Expiration time
}

/// Custom authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Account is deactivated")]
    InactiveAccount,
    #[error("Password hashing error: {0}")]
    PasswordHashError(String),
    #[error("JWT error: {0}")]
    JwtError(String),
    #[error("Principal lookup failed: {0}")]
    Resolver(String),
}

/// Hashes a password using Argon2.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHashError(format!("Failed to hash password with Argon2: {}", e)))
}

/// Verifies a password against an Argon2 hash. A mismatch is `Ok(false)`;
/// a malformed hash is an error.
pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, AuthError> {
    let password_hash = PasswordHash::new(hashed_password)
        .map_err(|e| AuthError::PasswordHashError(format!("Failed to parse Argon2 password hash: {}", e)))?;
    match Argon2::default().verify_password(password.as_bytes(), &password_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::PasswordHashError(format!("Failed to verify Argon2 password: {}", e))),
    }
}

/// Checks a login attempt against a stored user.
pub fn check_credentials(user: &User, password: &str) -> Result<(), AuthError> {
    if !verify_password(password, &user.password_hash)? {
        return Err(AuthError::InvalidCredentials);
    }
    if !user.is_active {
        return Err(AuthError::InactiveAccount);
    }
    Ok(())
}

/// Issues and validates HS256 bearer tokens.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl_hours: u64) -> Self {
        TokenIssuer {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl_secs: ttl_hours.saturating_mul(60 * 60),
        }
    }

    /// Token lifetime in seconds.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// An issuer keyed with 32 random bytes. Tokens do not survive a restart.
    pub fn ephemeral(ttl_hours: u64) -> Self {
        let mut secret = [0u8; 32];
        rand_core::OsRng.fill_bytes(&mut secret);
        Self::new(&secret, ttl_hours)
    }

    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AuthError::JwtError(format!("System time error: {}", e)))?
            .as_secs();

        let claims = Claims {
            sub: user.username.clone(),
            uid: user.id,
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::JwtError(format!("Failed to encode JWT: {}", e)))
    }

    /// Decodes and validates a JWT token.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AuthError::JwtError(format!("Failed to decode or validate JWT: {}", e)))
    }
}

/// Turns validated token claims into a principal. `Ok(None)` means the
/// subject no longer exists or may not sign in.
#[async_trait]
pub trait PrincipalResolver: Send + Sync + 'static {
    async fn resolve(&self, claims: &Claims) -> Result<Option<Principal>, AuthError>;
}

#[async_trait]
impl<T: PrincipalResolver + ?Sized> PrincipalResolver for Arc<T> {
    async fn resolve(&self, claims: &Claims) -> Result<Option<Principal>, AuthError> {
        (**self).resolve(claims).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::medical::NewUser;

    fn user(password_hash: String) -> User {
        User::from_new_user(
            NewUser {
                username: "nurse1".into(),
                email: "nurse1@example.com".into(),
                password: String::new(),
                first_name: "Nora".into(),
                last_name: "Hale".into(),
                phone: None,
                roles: Vec::new(),
            },
            password_hash,
        )
    }

    #[test]
    fn should_verify_hashed_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }

    #[test]
    fn should_reject_malformed_hash() {
        assert!(matches!(
            verify_password("x", "not-a-hash"),
            Err(AuthError::PasswordHashError(_))
        ));
    }

    #[test]
    fn should_reject_inactive_account() {
        let mut u = user(hash_password("pw123456").unwrap());
        assert!(check_credentials(&u, "pw123456").is_ok());
        assert!(matches!(check_credentials(&u, "wrong"), Err(AuthError::InvalidCredentials)));
        u.is_active = false;
        assert!(matches!(check_credentials(&u, "pw123456"), Err(AuthError::InactiveAccount)));
    }

    #[test]
    fn should_round_trip_token_claims() {
        let issuer = TokenIssuer::new(b"test-secret-with-enough-length-000", 1);
        let u = user(String::new());
        let token = issuer.issue(&u).unwrap();
        let claims = issuer.validate(&token).unwrap();
        assert_eq!(claims.sub, "nurse1");
        assert_eq!(claims.uid, u.id);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn should_saturate_oversized_lifetime() {
        let issuer = TokenIssuer::new(b"test-secret-with-enough-length-000", u64::MAX);
        assert_eq!(issuer.ttl_secs(), u64::MAX);
        let token = issuer.issue(&user(String::new())).unwrap();
        assert_eq!(issuer.validate(&token).unwrap().exp, u64::MAX);
    }

    #[test]
    fn should_reject_token_from_other_key() {
        let token = TokenIssuer::ephemeral(1).issue(&user(String::new())).unwrap();
        assert!(TokenIssuer::ephemeral(1).validate(&token).is_err());
    }
}
