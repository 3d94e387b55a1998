use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::UserId;
use crate::services::visibility::SocialGraph;

pub async fn is_following(pool: &PgPool, follower: UserId, followee: UserId) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM follows WHERE follow_from = $1 AND follow_to = $2)",
    )
    .bind(follower)
    .bind(followee)
    .fetch_one(pool)
    .await
}

pub async fn has_blocked(pool: &PgPool, source: UserId, target: UserId) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM blocks WHERE source_user = $1 AND target_user = $2)",
    )
    .bind(source)
    .bind(target)
    .fetch_one(pool)
    .await
}

pub async fn is_banned(pool: &PgPool, user: UserId) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM bans WHERE user_id = $1)")
        .bind(user)
        .fetch_one(pool)
        .await
}

pub async fn count_followers(pool: &PgPool, user: UserId) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE follow_to = $1")
        .bind(user)
        .fetch_one(pool)
        .await
}

pub async fn count_following(pool: &PgPool, user: UserId) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE follow_from = $1")
        .bind(user)
        .fetch_one(pool)
        .await
}

#[derive(Clone)]
pub struct PgSocialGraph {
    pool: PgPool,
}

impl PgSocialGraph {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SocialGraph for PgSocialGraph {
    async fn is_following(&self, follower: UserId, followee: UserId) -> Result<bool, sqlx::Error> {
        is_following(&self.pool, follower, followee).await
    }

    async fn has_blocked(&self, source: UserId, target: UserId) -> Result<bool, sqlx::Error> {
        has_blocked(&self.pool, source, target).await
    }

    async fn is_banned(&self, user: UserId) -> Result<bool, sqlx::Error> {
        is_banned(&self.pool, user).await
    }

    async fn follower_count(&self, user: UserId) -> Result<i64, sqlx::Error> {
        count_followers(&self.pool, user).await
    }

    async fn following_count(&self, user: UserId) -> Result<i64, sqlx::Error> {
        count_following(&self.pool, user).await
    }
}
