use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};

use crate::{
    db::UserStore,
    error::{AppError, AppResult},
    models::{LoginRequest, NewUser, RegisterRequest, User},
};

/// Hashes a password with Argon2id and a random salt
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Checks a password against a stored PHC hash string
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash format: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Registration and login
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn register(&self, request: RegisterRequest) -> AppResult<User> {
        request.validate()?;

        // argon2 is CPU bound, keep it off the async workers
        let password = request.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))??;

        let user = self
            .users
            .create_user(NewUser {
                username: request.username.trim().to_string(),
                password_hash,
                name: request.name,
                email: request.email,
                age: request.age,
                country: request.country,
            })
            .await?;

        tracing::info!(uid = %user.uid, username = %user.username, "User registered");
        Ok(user)
    }

    /// Unknown usernames and wrong passwords fail the same way
    pub async fn login(&self, request: LoginRequest) -> AppResult<User> {
        let rejected = || AppError::Unauthorized("Invalid username or password".to_string());

        let credentials = self
            .users
            .user_by_username(request.username.trim())
            .await?
            .ok_or_else(rejected)?;

        let password = request.password;
        let stored = credentials.password_hash;
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))??;

        if !valid {
            tracing::warn!(username = %credentials.user.username, "Login rejected");
            return Err(rejected());
        }
        Ok(credentials.user)
    }
}
