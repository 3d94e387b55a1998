use sqlx::PgPool;

use crate::models::{PostId, UserCardRow, UserId};

/// Record a like; liking twice is a no-op.
pub async fn create_like(pool: &PgPool, post_id: PostId, user_id: UserId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO likes (user_id, video_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, video_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(post_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Remove a like; unliking a post that was not liked is a no-op.
pub async fn delete_like(pool: &PgPool, post_id: PostId, user_id: UserId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND video_id = $2")
        .bind(user_id)
        .bind(post_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Users who liked a post, most recent like first, with the viewer's follow state.
pub async fn get_post_likers(
    pool: &PgPool,
    viewer: UserId,
    post_id: PostId,
    limit: i64,
    offset: i64,
) -> Result<Vec<UserCardRow>, sqlx::Error> {
    sqlx::query_as::<_, UserCardRow>(
        r#"
        SELECT u.id, u.username, u.avatar_url, u.verified, u.location, u.is_private,
               EXISTS (
                   SELECT 1 FROM follows f WHERE f.follow_from = $1 AND f.follow_to = u.id
               ) AS following
        FROM likes l
        JOIN users u ON u.id = l.user_id
        WHERE l.video_id = $2
        ORDER BY l.created_at DESC, l.id DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(viewer)
    .bind(post_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}
