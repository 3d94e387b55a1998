use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::{Session, UserId};
use crate::services::session::SessionStore;

/// Store a new session token bound to `client` (empty binds to any client).
pub async fn create_session(
    pool: &PgPool,
    token: &str,
    user_id: UserId,
    client: &str,
) -> Result<Session, sqlx::Error> {
    sqlx::query_as::<_, Session>(
        r#"
        INSERT INTO tokens (token, user_id, vine_client)
        VALUES ($1, $2, $3)
        RETURNING token, user_id, vine_client, created_at
        "#,
    )
    .bind(token)
    .bind(user_id)
    .bind(client)
    .fetch_one(pool)
    .await
}

pub async fn find_session(pool: &PgPool, token: &str) -> Result<Option<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(
        "SELECT token, user_id, vine_client, created_at FROM tokens WHERE token = $1",
    )
    .bind(token)
    .fetch_optional(pool)
    .await
}

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn lookup(&self, token: &str) -> Result<Option<Session>, sqlx::Error> {
        find_session(&self.pool, token).await
    }
}
