use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::escape_like;
use crate::models::{AuthorRow, FeedRow, UserId};
use crate::services::feed::{CandidateQuery, FeedRepository, FeedScope};
use crate::services::visibility::push_exclusions;

/// Build the candidate query for one feed window.
///
/// Counters and the viewer's like/repost state are correlated subqueries so
/// the window is taken after filtering and ordering, never before.
pub fn build_candidate_query<'a>(query: &CandidateQuery<'_>) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT v.id, v.user_id, v.video_url, v.thumbnail_url, v.description, v.entities, \
         v.loops, v.created_at, v.promoted, v.venue_id, \
         EXISTS (SELECT 1 FROM likes l WHERE l.video_id = v.id AND l.user_id = ",
    );
    qb.push_bind(query.viewer);
    qb.push(
        ") AS liked, \
         (SELECT COUNT(*) FROM likes l WHERE l.video_id = v.id) AS like_count, \
         (SELECT COUNT(*) FROM comments c WHERE c.video_id = v.id) AS comment_count, \
         (SELECT COUNT(*) FROM reposts r WHERE r.video_id = v.id) AS repost_count, \
         (SELECT r.id FROM reposts r WHERE r.video_id = v.id AND r.user_id = ",
    );
    qb.push_bind(query.viewer);
    qb.push(" LIMIT 1) AS repost_id FROM videos v WHERE ");

    match query.scope {
        FeedScope::Home => {
            qb.push("v.user_id IN (SELECT f.follow_to FROM follows f WHERE f.follow_from = ")
                .push_bind(query.viewer)
                .push(")");
        }
        FeedScope::Popular => {
            qb.push("TRUE");
        }
        FeedScope::Promoted => {
            qb.push("v.promoted = TRUE");
        }
        FeedScope::Profile { target } => {
            qb.push("v.user_id = ").push_bind(*target);
        }
        FeedScope::Search { query: needle } => {
            qb.push("v.description ILIKE '%' || ")
                .push_bind(escape_like(needle))
                .push(r" || '%' ESCAPE '\'");
        }
    }

    push_exclusions(&mut qb, query.viewer);

    if query.scope.orders_by_likes() {
        qb.push(" ORDER BY like_count DESC, v.id DESC");
    } else {
        qb.push(" ORDER BY v.created_at DESC, v.id DESC");
    }

    qb.push(" LIMIT ").push_bind(query.limit);
    qb.push(" OFFSET ").push_bind(query.offset);
    qb
}

/// Profile fragments for `authors` as seen by `viewer`.
pub async fn find_author_profiles(
    pool: &PgPool,
    viewer: UserId,
    authors: &[UserId],
) -> Result<Vec<AuthorRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AuthorRow>(
        r#"
        SELECT u.id, u.username, u.avatar_url, u.verified, u.bio, u.is_explicit,
               u.location, u.profile_color,
               EXISTS (
                   SELECT 1 FROM follows f WHERE f.follow_from = $1 AND f.follow_to = u.id
               ) AS following
        FROM users u
        WHERE u.id = ANY($2)
        "#,
    )
    .bind(viewer)
    .bind(authors)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[derive(Clone)]
pub struct PgFeedRepository {
    pool: PgPool,
}

impl PgFeedRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedRepository for PgFeedRepository {
    async fn candidate_rows(&self, query: &CandidateQuery<'_>) -> Result<Vec<FeedRow>, sqlx::Error> {
        let mut qb = build_candidate_query(query);
        qb.build_query_as::<FeedRow>().fetch_all(&self.pool).await
    }

    async fn author_profiles(
        &self,
        viewer: UserId,
        authors: &[UserId],
    ) -> Result<Vec<AuthorRow>, sqlx::Error> {
        find_author_profiles(&self.pool, viewer, authors).await
    }
}
