use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{NewUser, Role, User},
    stores::UserStore,
};

const MIN_PASSWORD_LEN: usize = 8;

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies credentials
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
    admin_username: Option<String>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("token_ttl", &self.token_ttl)
            .field("admin_username", &self.admin_username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl AuthService {
    pub fn new(secret: &str, token_ttl_secs: i64, admin_username: Option<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl: Duration::seconds(token_ttl_secs),
            admin_username,
        }
    }

    pub fn issue_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }

    /// Creates an account and returns it with a fresh token
    pub async fn register(
        &self,
        users: &dyn UserStore,
        request: RegisterRequest,
    ) -> AppResult<(User, String)> {
        let username = request.username.trim().to_string();
        if username.is_empty() {
            return Err(AppError::InvalidInput("Username cannot be empty".to_string()));
        }
        if !request.email.contains('@') {
            return Err(AppError::InvalidInput("Invalid email address".to_string()));
        }
        if request.password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::InvalidInput(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let role = match &self.admin_username {
            Some(admin) if admin.eq_ignore_ascii_case(&username) => Role::Admin,
            _ => Role::User,
        };

        let user = users
            .create(NewUser {
                username,
                email: request.email.trim().to_string(),
                password_hash: hash_password(&request.password)?,
                role,
            })
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");

        let token = self.issue_token(&user)?;
        Ok((user, token))
    }

    pub async fn login(
        &self,
        users: &dyn UserStore,
        request: LoginRequest,
    ) -> AppResult<(User, String)> {
        let invalid = || AppError::Unauthorized("Invalid username or password".to_string());

        let user = users
            .find_by_username(request.username.trim())
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&request.password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "Failed login attempt");
            return Err(invalid());
        }

        let token = self.issue_token(&user)?;
        Ok((user, token))
    }
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Stored password hash is invalid: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;

    fn service() -> AuthService {
        AuthService::new("test-secret", 3600, Some("admin".to_string()))
    }

    fn register_request(username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_token_carries_identity() {
        let store = MemoryStore::new();
        let auth = service();
        let (user, token) = auth
            .register(&store, register_request("deckard", "replicant1"))
            .await
            .unwrap();

        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::User);
    }

    #[test]
    fn test_token_signed_with_other_secret_rejected() {
        let user = NewUser {
            username: "roy".to_string(),
            email: "roy@example.com".to_string(),
            password_hash: String::new(),
            role: Role::User,
        }
        .into_user(Utc::now());
        let token = AuthService::new("other-secret", 3600, None)
            .issue_token(&user)
            .unwrap();

        let err = service().verify_token(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_configured_admin_gets_admin_role() {
        let store = MemoryStore::new();
        let (user, _) = service()
            .register(&store, register_request("Admin", "supersecret"))
            .await
            .unwrap();
        assert_eq!(user.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_register_rejects_short_password() {
        let store = MemoryStore::new();
        let err = service()
            .register(&store, register_request("gaff", "short"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let store = MemoryStore::new();
        let auth = service();
        auth.register(&store, register_request("rachael", "unicorn-dream"))
            .await
            .unwrap();

        let ok = auth
            .login(
                &store,
                LoginRequest {
                    username: "rachael".to_string(),
                    password: "unicorn-dream".to_string(),
                },
            )
            .await;
        assert!(ok.is_ok());

        let err = auth
            .login(
                &store,
                LoginRequest {
                    username: "rachael".to_string(),
                    password: "wrong-password".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
