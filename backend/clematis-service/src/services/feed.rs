//! Feed assembly.
//!
//! Every feed kind follows the same pipeline: select candidates by the kind's
//! base predicate, drop what the visibility rules exclude, order, take one
//! page window, then join author profiles and render [`PostRecord`]s. The
//! first three steps run inside storage; the assembler owns the rest.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::metrics::feed::{FEED_PAGE_SIZE, FEED_REQUEST_DURATION_SECONDS, FEED_REQUEST_TOTAL};
use crate::models::{
    AuthorProjection, AuthorRow, FeedRow, ListResponse, PostRecord, UserId,
};
use crate::services::pagination::PageCursor;

/// Which posts a feed draws from and how they are ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedScope {
    /// Posts by authors the viewer follows, newest first
    Home,
    /// All eligible posts, most liked first
    Popular,
    /// Promoted posts, newest first
    Promoted,
    /// Posts by one author, newest first
    Profile { target: UserId },
    /// Posts whose description contains `query` (case-insensitive), newest first
    Search { query: String },
}

impl FeedScope {
    pub fn kind(&self) -> &'static str {
        match self {
            FeedScope::Home => "home",
            FeedScope::Popular => "popular",
            FeedScope::Promoted => "promoted",
            FeedScope::Profile { .. } => "profile",
            FeedScope::Search { .. } => "search",
        }
    }

    /// Popular is the only kind not ordered by recency.
    pub fn orders_by_likes(&self) -> bool {
        matches!(self, FeedScope::Popular)
    }
}

/// One window over a scope's ordered, filtered candidates.
#[derive(Debug, Clone)]
pub struct CandidateQuery<'a> {
    pub scope: &'a FeedScope,
    pub viewer: UserId,
    pub limit: i64,
    pub offset: i64,
}

/// Storage behind feed assembly.
#[async_trait]
pub trait FeedRepository: Send + Sync {
    /// Candidate rows for the window, already filtered by visibility and
    /// ordered by the scope's ordering, with the viewer's like/repost state.
    async fn candidate_rows(&self, query: &CandidateQuery<'_>) -> Result<Vec<FeedRow>, sqlx::Error>;

    /// Profile fragments for the given authors, with the viewer's follow state.
    async fn author_profiles(
        &self,
        viewer: UserId,
        authors: &[UserId],
    ) -> Result<Vec<AuthorRow>, sqlx::Error>;
}

/// A fully assembled page. Never cached; rebuilt per request.
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub records: Vec<PostRecord>,
    pub cursor: PageCursor,
}

impl FeedPage {
    pub fn into_response(self) -> ListResponse<PostRecord> {
        ListResponse::page(self.records, self.cursor)
    }
}

pub struct FeedAssembler {
    repo: Arc<dyn FeedRepository>,
    share_url_prefix: String,
    deadline: Duration,
}

impl FeedAssembler {
    /// `deadline` bounds each storage call; exceeding it fails the request as transient.
    pub fn new(repo: Arc<dyn FeedRepository>, share_url_prefix: impl Into<String>, deadline: Duration) -> Self {
        Self {
            repo,
            share_url_prefix: share_url_prefix.into(),
            deadline,
        }
    }

    /// Assemble one page of `scope` for `viewer`.
    ///
    /// Any storage failure aborts the whole page.
    pub async fn assemble(&self, viewer: UserId, scope: &FeedScope, cursor: PageCursor) -> Result<FeedPage, AppError> {
        let kind = scope.kind();
        let start = Instant::now();

        let result = self
            .collect(viewer, scope, cursor.limit(), cursor.offset())
            .await;

        FEED_REQUEST_DURATION_SECONDS
            .with_label_values(&[kind])
            .observe(start.elapsed().as_secs_f64());

        match result {
            Ok(records) => {
                FEED_REQUEST_TOTAL.with_label_values(&[kind, "ok"]).inc();
                FEED_PAGE_SIZE
                    .with_label_values(&[kind])
                    .observe(records.len() as f64);
                debug!(
                    kind,
                    viewer,
                    page = cursor.page(),
                    records = records.len(),
                    "assembled feed page"
                );
                Ok(FeedPage { records, cursor })
            }
            Err(err) => {
                let outcome = if err.is_retryable() { "transient" } else { "error" };
                FEED_REQUEST_TOTAL.with_label_values(&[kind, outcome]).inc();
                Err(err)
            }
        }
    }

    /// First `limit` records of `scope`, outside the fixed page size.
    pub async fn preview(&self, viewer: UserId, scope: &FeedScope, limit: i64) -> Result<Vec<PostRecord>, AppError> {
        self.collect(viewer, scope, limit, 0).await
    }

    async fn collect(
        &self,
        viewer: UserId,
        scope: &FeedScope,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostRecord>, AppError> {
        let query = CandidateQuery {
            scope,
            viewer,
            limit,
            offset,
        };

        let rows = tokio::time::timeout(self.deadline, self.repo.candidate_rows(&query)).await??;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut author_ids: Vec<UserId> = rows.iter().map(|row| row.user_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let profiles = tokio::time::timeout(
            self.deadline,
            self.repo.author_profiles(viewer, &author_ids),
        )
        .await??;

        let authors: HashMap<UserId, AuthorProjection> = profiles
            .into_iter()
            .map(|row| (row.id, AuthorProjection::from(row)))
            .collect();

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(author) = authors.get(&row.user_id).cloned() else {
                warn!(post_id = row.id, author = row.user_id, "skipping post with missing author profile");
                continue;
            };
            records.push(PostRecord::new(row, author, &self.share_url_prefix));
        }

        Ok(records)
    }
}
