/// Account creation, login and the viewer's own profile.
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use crate::db::{session_repo, unique_violation, user_repo};
use crate::error::{AppError, Result};
use crate::models::{User, UserId};
use crate::services::visibility::SocialGraph;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_USERNAME_LEN: usize = 64;

/// Hash a password with Argon2id and a random salt, PHC-encoded.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash format: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Internal(format!("Password verification failed: {}", e))),
    }
}

/// Opaque session token: 16 random bytes, hex encoded
pub fn generate_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<()> {
        let username = self.username.trim();
        if username.is_empty()
            || username.chars().count() > MAX_USERNAME_LEN
            || !username.chars().all(|c| c.is_alphanumeric() || c == '_')
        {
            return Err(AppError::InvalidInput("username".to_string()));
        }

        let email = self.email.trim();
        let well_formed = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !well_formed {
            return Err(AppError::InvalidInput("email".to_string()));
        }

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::InvalidInput("password".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Username or email
    #[serde(alias = "email")]
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: UserId,
    pub key: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub profile_background: Option<String>,
    pub verified: u8,
    pub explicit_content: u8,
    pub private: u8,
    pub follower_count: i64,
    pub following_count: i64,
    pub post_count: i64,
}

pub struct AccountService {
    pool: PgPool,
    graph: Arc<dyn SocialGraph>,
}

impl AccountService {
    pub fn new(pool: PgPool, graph: Arc<dyn SocialGraph>) -> Self {
        Self { pool, graph }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<User> {
        request.validate()?;
        let password_hash = hash_password(&request.password)?;

        let user = user_repo::create_user(
            &self.pool,
            request.username.trim(),
            request.email.trim(),
            &password_hash,
        )
        .await
        .map_err(|err| match unique_violation(&err) {
            Some(constraint) if constraint.contains("email") => {
                AppError::Conflict("That email address is already in use.".to_string())
            }
            Some(_) => AppError::Conflict("That username is already taken.".to_string()),
            None => AppError::from(err),
        })?;

        info!(user_id = user.id, "account created");
        Ok(user)
    }

    /// Verify credentials and issue a session bound to `client`.
    pub async fn login(&self, request: LoginRequest, client: &str) -> Result<LoginResponse> {
        let user = user_repo::find_user_by_login(&self.pool, request.username.trim())
            .await?
            .ok_or(AppError::Unauthenticated)?;

        if !verify_password(&request.password, &user.password_hash)? {
            return Err(AppError::Unauthenticated);
        }

        let session = session_repo::create_session(&self.pool, &generate_token(), user.id, client).await?;
        info!(user_id = user.id, client, "session issued");

        Ok(LoginResponse {
            user_id: user.id,
            key: session.token,
            username: user.username,
        })
    }

    pub async fn profile(&self, viewer: UserId) -> Result<ProfileResponse> {
        let user = user_repo::find_user_by_id(&self.pool, viewer)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", viewer)))?;

        let (follower_count, following_count, post_count) = futures::try_join!(
            self.graph.follower_count(viewer),
            self.graph.following_count(viewer),
            user_repo::count_posts_by_user(&self.pool, viewer),
        )?;

        Ok(ProfileResponse {
            user_id: user.id,
            username: user.username,
            email: user.email,
            avatar_url: user.avatar_url,
            description: user.bio,
            location: user.location,
            profile_background: user.profile_color,
            verified: u8::from(user.verified),
            explicit_content: u8::from(user.is_explicit),
            private: u8::from(user.is_private),
            follower_count,
            following_count,
            post_count,
        })
    }
}
