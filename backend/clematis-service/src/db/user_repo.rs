use sqlx::PgPool;

use super::escape_like;
use crate::models::{User, UserCardRow, UserId};

const USER_COLUMNS: &str = "id, username, email, password_hash, avatar_url, bio, location, \
                            profile_color, verified, is_explicit, is_private, created_at";

/// Insert a new account. Unique violations on username or email surface as
/// database errors for the caller to classify.
pub async fn create_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING {}",
        USER_COLUMNS
    ))
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await
}

pub async fn find_user_by_id(pool: &PgPool, user_id: UserId) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Look up an account by username or, failing that, by email (case-insensitive).
pub async fn find_user_by_login(pool: &PgPool, login: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE username = $1 OR LOWER(email) = LOWER($1) \
         ORDER BY (username = $1) DESC LIMIT 1",
        USER_COLUMNS
    ))
    .bind(login)
    .fetch_optional(pool)
    .await
}

pub async fn count_posts_by_user(pool: &PgPool, user_id: UserId) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM videos WHERE user_id = $1 AND is_rm = FALSE")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

/// Users whose username contains `needle`, newest accounts first, with the
/// viewer's follow state.
pub async fn search_user_cards(
    pool: &PgPool,
    viewer: UserId,
    needle: &str,
    limit: i64,
) -> Result<Vec<UserCardRow>, sqlx::Error> {
    sqlx::query_as::<_, UserCardRow>(
        r#"
        SELECT u.id, u.username, u.avatar_url, u.verified, u.location, u.is_private,
               EXISTS (
                   SELECT 1 FROM follows f WHERE f.follow_from = $1 AND f.follow_to = u.id
               ) AS following
        FROM users u
        WHERE u.username ILIKE '%' || $2 || '%' ESCAPE '\'
        ORDER BY u.id DESC
        LIMIT $3
        "#,
    )
    .bind(viewer)
    .bind(escape_like(needle))
    .bind(limit)
    .fetch_all(pool)
    .await
}
