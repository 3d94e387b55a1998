use sqlx::{PgConnection, PgPool};

use crate::models::{NewPost, PostId, UserId};

/// Author and moderation state of a post, used for single-post visibility checks
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct PostOwnership {
    pub user_id: UserId,
    pub is_rm: bool,
}

/// Insert a freshly published post.
pub async fn insert_post(conn: &mut PgConnection, post: &NewPost) -> Result<(), sqlx::Error> {
    let entities = sqlx::types::Json(&post.entities);
    sqlx::query(
        r#"
        INSERT INTO videos (
            id, share_id, user_id, video_url, thumbnail_url, description,
            entities, venue_id, venue_name, channel_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(post.id)
    .bind(&post.share_id)
    .bind(post.user_id)
    .bind(&post.video_url)
    .bind(&post.thumbnail_url)
    .bind(&post.description)
    .bind(entities)
    .bind(&post.venue_id)
    .bind(&post.venue_name)
    .bind(post.channel_id)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn find_post_ownership(pool: &PgPool, post_id: PostId) -> Result<Option<PostOwnership>, sqlx::Error> {
    sqlx::query_as::<_, PostOwnership>("SELECT user_id, is_rm FROM videos WHERE id = $1")
        .bind(post_id)
        .fetch_optional(pool)
        .await
}
