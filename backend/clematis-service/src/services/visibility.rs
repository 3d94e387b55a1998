//! Moderation and block filtering for feed candidates.
//!
//! A post is visible to a viewer unless there is evidence against it: the
//! post is removed, a block edge exists in either direction between viewer
//! and author, or the author has a ban record. Missing rows never exclude.

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use crate::models::UserId;

/// Follow, block and ban membership plus follow counts.
#[async_trait]
pub trait SocialGraph: Send + Sync {
    async fn is_following(&self, follower: UserId, followee: UserId) -> Result<bool, sqlx::Error>;

    /// Whether `source` has blocked `target` (one direction only)
    async fn has_blocked(&self, source: UserId, target: UserId) -> Result<bool, sqlx::Error>;

    async fn is_banned(&self, user: UserId) -> Result<bool, sqlx::Error>;

    async fn follower_count(&self, user: UserId) -> Result<i64, sqlx::Error>;

    async fn following_count(&self, user: UserId) -> Result<i64, sqlx::Error>;
}

/// Evidence gathered for one (viewer, post) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityFacts {
    pub removed: bool,
    pub viewer_blocked_author: bool,
    pub author_blocked_viewer: bool,
    pub author_banned: bool,
}

impl VisibilityFacts {
    /// All three exclusion rules must pass.
    pub fn admits(&self) -> bool {
        !self.removed
            && !self.viewer_blocked_author
            && !self.author_blocked_viewer
            && !self.author_banned
    }
}

/// Decide visibility of one post by asking the graph directly.
///
/// Used where a single post is addressed (likes); feeds push the same rules
/// into their queries through [`push_exclusions`].
pub async fn is_visible(
    graph: &dyn SocialGraph,
    viewer: UserId,
    author: UserId,
    removed: bool,
) -> Result<bool, sqlx::Error> {
    if removed {
        return Ok(false);
    }

    let facts = VisibilityFacts {
        removed,
        viewer_blocked_author: graph.has_blocked(viewer, author).await?,
        author_blocked_viewer: graph.has_blocked(author, viewer).await?,
        author_banned: graph.is_banned(author).await?,
    };
    Ok(facts.admits())
}

/// Append the exclusion predicates for posts aliased `v` to a query that
/// already has a `WHERE` clause.
pub fn push_exclusions(qb: &mut QueryBuilder<'_, Postgres>, viewer: UserId) {
    qb.push(" AND v.is_rm = FALSE");
    qb.push(" AND NOT EXISTS (SELECT 1 FROM blocks b WHERE b.source_user = ")
        .push_bind(viewer)
        .push(" AND b.target_user = v.user_id)");
    qb.push(" AND NOT EXISTS (SELECT 1 FROM blocks b WHERE b.source_user = v.user_id AND b.target_user = ")
        .push_bind(viewer)
        .push(")");
    qb.push(" AND NOT EXISTS (SELECT 1 FROM bans x WHERE x.user_id = v.user_id)");
}
