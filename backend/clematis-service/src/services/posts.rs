/// Post publishing and likes.
///
/// Publishing fetches the video, renders a thumbnail, then extracts entities
/// and inserts the post inside one transaction so tag counters only move for
/// posts that were actually stored.
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::{like_repo, post_repo, PgEntityDirectory};
use crate::error::{AppError, Result};
use crate::media::MediaProcessor;
use crate::models::{Entity, NewPost, PostId, UserCard, UserId};
use crate::services::entities;
use crate::services::pagination::PageCursor;
use crate::services::retry::{retry_transient, RetryConfig};
use crate::services::snowflake::SnowflakeGenerator;
use crate::services::visibility::{is_visible, SocialGraph};
use crate::storage::{self, BlobStore};

const SHARE_ID_LEN: usize = 11;

/// Body of `POST /posts`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub video_url: Option<String>,
    pub video_url_webm: Option<String>,
    pub description: Option<String>,
    /// Accepted as a JSON list or a JSON-encoded string; always replaced by
    /// the entities derived from the description.
    pub entities: Option<serde_json::Value>,
    pub channel_id: Option<i64>,
    pub foursquare_venue_id: Option<String>,
    pub venue_name: Option<String>,
    pub foursquare_venue_name: Option<String>,
}

/// Validated publishing input
#[derive(Debug, Clone, PartialEq)]
pub struct PostDraft {
    pub video_url: String,
    pub description: String,
    pub client_entities: Vec<Entity>,
    pub channel_id: i64,
    pub venue_id: Option<String>,
    pub venue_name: String,
}

impl CreatePostRequest {
    /// The WebM URL wins over the MP4 one when both are present.
    pub fn validate(self) -> Result<PostDraft> {
        let video_url = self
            .video_url_webm
            .filter(|url| !url.trim().is_empty())
            .or(self.video_url.filter(|url| !url.trim().is_empty()))
            .ok_or_else(|| AppError::InvalidInput("videoUrl is required".to_string()))?;

        let client_entities = match &self.entities {
            None => Vec::new(),
            Some(serde_json::Value::String(raw)) => Entity::parse_list_str(raw),
            Some(value) => Entity::parse_list(value),
        };

        Ok(PostDraft {
            video_url,
            description: self.description.unwrap_or_default(),
            client_entities,
            channel_id: self.channel_id.unwrap_or(0),
            venue_id: self.foursquare_venue_id,
            venue_name: self
                .venue_name
                .or(self.foursquare_venue_name)
                .unwrap_or_default(),
        })
    }
}

pub fn generate_share_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SHARE_ID_LEN)
        .map(char::from)
        .collect()
}

pub struct PostService {
    pool: PgPool,
    media: Arc<MediaProcessor>,
    blobs: Arc<dyn BlobStore>,
    ids: Arc<SnowflakeGenerator>,
    graph: Arc<dyn SocialGraph>,
    retry: RetryConfig,
}

impl PostService {
    pub fn new(
        pool: PgPool,
        media: Arc<MediaProcessor>,
        blobs: Arc<dyn BlobStore>,
        ids: Arc<SnowflakeGenerator>,
        graph: Arc<dyn SocialGraph>,
    ) -> Self {
        Self {
            pool,
            media,
            blobs,
            ids,
            graph,
            retry: RetryConfig::default(),
        }
    }

    /// Publish a post for `author` and return its id.
    pub async fn create_post(&self, author: UserId, request: CreatePostRequest) -> Result<PostId> {
        let draft = request.validate()?;
        if !draft.client_entities.is_empty() {
            tracing::debug!(
                count = draft.client_entities.len(),
                "ignoring client-supplied entities"
            );
        }

        let video = self.media.fetch_video(&draft.video_url).await?;
        let thumbnail = self.media.extract_thumbnail(video).await?;
        if thumbnail.is_empty() {
            return Err(AppError::InvalidInput("thumbnail could not be generated".to_string()));
        }
        let thumbnail_url = storage::save(
            self.blobs.as_ref(),
            "thumbnails",
            "thumb.png",
            thumbnail,
            mime::IMAGE_PNG.as_ref(),
        )
        .await?;

        let id = self.ids.next_id();
        let share_id = generate_share_id();

        retry_transient(&self.retry, "publish_post", || {
            self.publish(author, &draft, id, &share_id, &thumbnail_url)
        })
        .await?;

        info!(post_id = id, author, "published post");
        Ok(id)
    }

    async fn publish(
        &self,
        author: UserId,
        draft: &PostDraft,
        id: PostId,
        share_id: &str,
        thumbnail_url: &str,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let entities = {
            let mut directory = PgEntityDirectory::new(&mut *tx);
            entities::extract(&mut directory, &draft.description).await?
        };

        let post = NewPost {
            id,
            share_id: share_id.to_string(),
            user_id: author,
            video_url: draft.video_url.clone(),
            thumbnail_url: thumbnail_url.to_string(),
            description: draft.description.clone(),
            entities,
            venue_id: draft.venue_id.clone(),
            venue_name: draft.venue_name.clone(),
            channel_id: draft.channel_id,
        };
        post_repo::insert_post(&mut *tx, &post).await?;

        tx.commit().await?;
        Ok(())
    }

    /// A post the viewer cannot see is reported as missing.
    async fn ensure_visible(&self, viewer: UserId, post_id: PostId) -> Result<()> {
        let ownership = post_repo::find_post_ownership(&self.pool, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;

        if !is_visible(self.graph.as_ref(), viewer, ownership.user_id, ownership.is_rm).await? {
            return Err(AppError::NotFound(format!("post {}", post_id)));
        }
        Ok(())
    }

    pub async fn like(&self, viewer: UserId, post_id: PostId) -> Result<()> {
        self.ensure_visible(viewer, post_id).await?;
        if !like_repo::create_like(&self.pool, post_id, viewer).await? {
            warn!(post_id, viewer, "post already liked");
        }
        Ok(())
    }

    pub async fn unlike(&self, viewer: UserId, post_id: PostId) -> Result<()> {
        self.ensure_visible(viewer, post_id).await?;
        like_repo::delete_like(&self.pool, post_id, viewer).await?;
        Ok(())
    }

    pub async fn likers(&self, viewer: UserId, post_id: PostId, cursor: PageCursor) -> Result<Vec<UserCard>> {
        self.ensure_visible(viewer, post_id).await?;
        let rows = like_repo::get_post_likers(&self.pool, viewer, post_id, cursor.limit(), cursor.offset()).await?;
        Ok(rows.into_iter().map(UserCard::from).collect())
    }
}
