use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::escape_like;
use crate::error::AppError;
use crate::models::{TagRow, TagUsage, UserId};
use crate::services::entities::EntityDirectory;

/// Create the tag with one use, or count one more use, in a single statement.
///
/// The unique constraint on `tags.tag` makes concurrent first uses of the
/// same text converge on one row.
pub async fn record_tag_use(conn: &mut PgConnection, tag: &str) -> Result<TagUsage, sqlx::Error> {
    sqlx::query_as::<_, TagUsage>(
        r#"
        INSERT INTO tags (tag, post_count, last_used)
        VALUES ($1, 1, NOW())
        ON CONFLICT (tag) DO UPDATE
            SET post_count = tags.post_count + 1,
                last_used = NOW()
        RETURNING id, post_count
        "#,
    )
    .bind(tag)
    .fetch_one(conn)
    .await
}

/// Tags containing `needle` (case-sensitive), newest first
pub async fn search_tags(
    pool: &PgPool,
    needle: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<TagRow>, sqlx::Error> {
    sqlx::query_as::<_, TagRow>(
        r#"
        SELECT id, tag
        FROM tags
        WHERE tag LIKE '%' || $1 || '%' ESCAPE '\'
        ORDER BY id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(escape_like(needle))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Most used tags, ties broken by most recent use
pub async fn trending_tags(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<TagRow>, sqlx::Error> {
    sqlx::query_as::<_, TagRow>(
        r#"
        SELECT id, tag
        FROM tags
        ORDER BY post_count DESC, last_used DESC, id DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Entity lookups inside the publishing transaction.
pub struct PgEntityDirectory<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgEntityDirectory<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl EntityDirectory for PgEntityDirectory<'_> {
    async fn resolve_username(&mut self, username: &str) -> Result<Option<UserId>, AppError> {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(id)
    }

    async fn record_tag_use(&mut self, tag: &str) -> Result<TagUsage, AppError> {
        Ok(record_tag_use(&mut *self.conn, tag).await?)
    }
}
