use sqlx::PgPool;

use super::escape_like;
use crate::models::ChannelRow;

/// Channels whose name contains `needle`, newest first
pub async fn search_channels(pool: &PgPool, needle: &str, limit: i64) -> Result<Vec<ChannelRow>, sqlx::Error> {
    sqlx::query_as::<_, ChannelRow>(
        r#"
        SELECT id, name, icon, icon_retina, bgcolor
        FROM channels
        WHERE name ILIKE '%' || $1 || '%' ESCAPE '\'
        ORDER BY id DESC
        LIMIT $2
        "#,
    )
    .bind(escape_like(needle))
    .bind(limit)
    .fetch_all(pool)
    .await
}
